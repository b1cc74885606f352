//! Task actions, one module per build step.

pub mod clean;
pub mod fonts;
pub mod images;
pub mod include;
pub mod lint;
pub mod minify;
pub mod prettify;
pub mod scripts;
pub mod styles;
