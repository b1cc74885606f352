use std::fs;
use std::time::Instant;

use crate::Context;
use crate::io::as_overhead;

/// Delete the output tree and the temporary tree.
///
/// After this task neither directory exists; they are recreated on demand
/// by the tasks that write into them.
pub fn clean(cx: &Context) -> anyhow::Result<()> {
    let s = Instant::now();

    for dir in [&cx.sources.tmp, &cx.sources.dist] {
        if fs::metadata(dir).is_ok() {
            fs::remove_dir_all(dir)?;
        }
    }

    tracing::info!("cleaned the output and temporary trees {}", as_overhead(s));
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::Sources;

    #[test]
    fn removes_both_trees_and_tolerates_absence() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let sources = Sources::rooted(&root);

        fs::create_dir_all(sources.dist.join("images")).unwrap();
        fs::create_dir_all(&sources.tmp).unwrap();

        let cx = Context::new(sources.clone());
        clean(&cx).unwrap();

        assert!(!sources.dist.exists());
        assert!(!sources.tmp.exists());

        // A second run over nothing is fine.
        clean(&cx).unwrap();
    }
}
