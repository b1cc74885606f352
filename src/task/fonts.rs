use crate::Context;
use crate::io::copy_rec;

/// Verbatim recursive copy of `fonts` into the output tree.
pub fn copy(cx: &Context) -> anyhow::Result<()> {
    let from = cx.sources.src.join("fonts");
    if !from.is_dir() {
        return Ok(());
    }

    copy_rec(&from, cx.sources.dist.join("fonts"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::Sources;

    #[test]
    fn copies_recursively_byte_for_byte() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let sources = Sources::rooted(&root);

        let nested = sources.src.join("fonts/serif");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("a.woff2"), [0u8, 1, 2, 3]).unwrap();

        copy(&Context::new(sources.clone())).unwrap();

        let out = fs::read(sources.dist.join("fonts/serif/a.woff2")).unwrap();
        assert_eq!(out, [0, 1, 2, 3]);
    }

    #[test]
    fn missing_fonts_directory_is_a_no_op() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let sources = Sources::rooted(&root);

        copy(&Context::new(sources.clone())).unwrap();
        assert!(!sources.dist.join("fonts").exists());
    }
}
