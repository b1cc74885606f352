use std::fs;
use std::time::Instant;

use camino::Utf8PathBuf;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::Context;
use crate::io::as_overhead;

/// Re-encode every image under `images` at a fixed optimization level and
/// write the result under `images` in the output tree, preserving the
/// relative layout. Optimization is best-effort: a file that fails to
/// decode is logged and copied through unchanged, and an encoding that
/// comes out larger than the input is discarded in favor of the original
/// bytes. Files that are not PNG or JPEG copy through as-is.
pub fn optimize(cx: &Context) -> anyhow::Result<()> {
    let s = Instant::now();
    let images_root = cx.sources.src.join("images");
    let pattern = images_root.join("**/*");

    let mut files = Vec::new();
    for entry in glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        if path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Ok(());
    }

    let bar = ProgressBar::new(files.len() as u64).with_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("Error setting progress bar template")
            .progress_chars("#>-"),
    );

    files.par_iter().try_for_each(|path| -> anyhow::Result<()> {
        let rel = path.strip_prefix(&images_root).unwrap_or(path);
        let out = cx.sources.dist.join("images").join(rel);
        if let Some(dir) = out.parent() {
            fs::create_dir_all(dir)?;
        }

        let bytes = fs::read(path)?;
        let chosen = match reencode(&bytes, path.extension()) {
            Ok(Some(optimized)) if optimized.len() < bytes.len() => {
                tracing::debug!(
                    file = %path,
                    before = bytes.len(),
                    after = optimized.len(),
                    "optimized"
                );
                optimized
            }
            Ok(_) => bytes,
            Err(e) => {
                tracing::warn!(file = %path, "optimization failed, copying as-is: {e}");
                bytes
            }
        };

        fs::write(&out, chosen)?;
        bar.inc(1);
        Ok(())
    })?;

    bar.finish_with_message(format!("Optimized {} image(s)", files.len()));
    tracing::info!("image optimization done {}", as_overhead(s));
    Ok(())
}

/// Re-encode supported formats; `Ok(None)` means the format is passed
/// through without optimization.
fn reencode(bytes: &[u8], extension: Option<&str>) -> anyhow::Result<Option<Vec<u8>>> {
    let ext = extension.map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => {
            let img = image::load_from_memory(bytes)?;
            let mut out = Vec::new();
            let encoder = image::codecs::png::PngEncoder::new_with_quality(
                &mut out,
                image::codecs::png::CompressionType::Best,
                image::codecs::png::FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)?;
            Ok(Some(out))
        }
        Some("jpg" | "jpeg") => {
            let img = image::load_from_memory(bytes)?;
            let mut out = Vec::new();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90);
            img.write_with_encoder(encoder)?;
            Ok(Some(out))
        }
        _ => Ok(None),
    }
}
