use camino::Utf8PathBuf;
use glob::glob;

use crate::Context;

/// Scripts pass through untouched in the development pipeline; the only
/// observable effect is a live-reload push. Concatenation and
/// minification happen in the minify task, driven by page build blocks.
pub fn passthrough(cx: &Context) -> anyhow::Result<()> {
    let pattern = cx.sources.src.join("scripts/**/*.js");
    let mut count = 0usize;

    for entry in glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        tracing::trace!(script = %path, "unchanged");
        count += 1;
    }

    tracing::debug!(count, "scripts passed through");
    cx.reload();
    Ok(())
}
