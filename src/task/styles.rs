use std::fs;
use std::time::Instant;

use camino::Utf8PathBuf;
use glob::glob;

use crate::Context;
use crate::io::as_overhead;

/// Compile every entry stylesheet under `styles` into CSS under
/// `.tmp/styles`, mirroring the relative layout. Underscore-prefixed
/// partials are reachable through `@use`/`@import` and are not compiled
/// on their own.
///
/// A compilation error aborts this task but is logged rather than
/// returned; the rest of the build sequence keeps going. This mirrors the
/// reference tool, which routed Sass errors to a logger instead of
/// failing the stream.
pub fn compile(cx: &Context) -> anyhow::Result<()> {
    let s = Instant::now();
    let styles_root = cx.sources.src.join("styles");
    let pattern = styles_root.join("**/*.scss");

    for entry in glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        if path.file_name().is_some_and(|name| name.starts_with('_')) {
            continue;
        }

        let css = match grass::from_path(&path, &grass::Options::default()) {
            Ok(css) => css,
            Err(e) => {
                tracing::error!("sass compilation failed:\n{e}");
                return Ok(());
            }
        };

        let rel = path.strip_prefix(&styles_root).unwrap_or(&path);
        let out = cx.sources.tmp.join("styles").join(rel).with_extension("css");
        if let Some(dir) = out.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&out, css)?;
        tracing::debug!(entry = %path, out = %out, "compiled");
    }

    tracing::info!("compiled stylesheets {}", as_overhead(s));
    cx.reload();
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::Sources;

    fn sources() -> (tempfile::TempDir, Sources) {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let sources = Sources::rooted(&root);
        fs::create_dir_all(sources.src.join("styles")).unwrap();
        (temp, sources)
    }

    #[test]
    fn compiles_into_the_temporary_tree() {
        let (_temp, sources) = sources();
        fs::write(
            sources.src.join("styles/main.scss"),
            "$accent: #336699;\nbody {\n  color: $accent;\n}\n",
        )
        .unwrap();

        compile(&Context::new(sources.clone())).unwrap();

        let css = fs::read_to_string(sources.tmp.join("styles/main.css")).unwrap();
        assert!(css.contains("color: #336699"));
    }

    #[test]
    fn partials_are_not_entry_points() {
        let (_temp, sources) = sources();
        fs::write(sources.src.join("styles/_vars.scss"), "$x: 1;\n").unwrap();

        compile(&Context::new(sources.clone())).unwrap();

        assert!(!sources.tmp.join("styles/_vars.css").exists());
    }

    #[test]
    fn a_broken_stylesheet_does_not_fail_the_task() {
        let (_temp, sources) = sources();
        fs::write(sources.src.join("styles/broken.scss"), "body { color: ").unwrap();

        // Logged, not fatal.
        compile(&Context::new(sources.clone())).unwrap();
        assert!(!sources.tmp.join("styles/broken.css").exists());
    }

    #[test]
    fn missing_styles_directory_is_empty_input() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let sources = Sources::rooted(&root);

        compile(&Context::new(sources)).unwrap();
    }
}
