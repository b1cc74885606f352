//! The fixed directory and network contract of the build.

use camino::{Utf8Path, Utf8PathBuf};

/// Marker that introduces an include directive inside a page.
pub const INCLUDE_PREFIX: &str = "@@include";

/// Development server port, serving the source tree.
pub const DEV_PORT: u16 = 9000;

/// Production server port, serving the output tree.
pub const PROD_PORT: u16 = 9090;

/// Well-known livereload websocket port.
pub const RELOAD_PORT: u16 = 35729;

/// Directory layout shared by every task.
///
/// The contract is fixed relative to a root: sources in `src`, the
/// distributable site in `html` and intermediate compiled CSS in `.tmp`.
#[derive(Debug, Clone)]
pub struct Sources {
    pub root: Utf8PathBuf,
    pub src: Utf8PathBuf,
    pub dist: Utf8PathBuf,
    pub tmp: Utf8PathBuf,
}

impl Default for Sources {
    fn default() -> Self {
        Self::rooted(".")
    }
}

impl Sources {
    pub fn rooted(root: impl AsRef<Utf8Path>) -> Self {
        let root = root.as_ref();

        Self {
            root: root.to_owned(),
            src: root.join("src"),
            dist: root.join("html"),
            tmp: root.join(".tmp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_is_fixed() {
        let sources = Sources::default();
        assert_eq!(sources.src, Utf8PathBuf::from("./src"));
        assert_eq!(sources.dist, Utf8PathBuf::from("./html"));
        assert_eq!(sources.tmp, Utf8PathBuf::from("./.tmp"));
    }
}
