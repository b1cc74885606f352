use std::fs;

use anyhow::{Context as _, bail};
use camino::{Utf8Path, Utf8PathBuf};
use glob::glob;

use crate::Context;
use crate::config::INCLUDE_PREFIX;

/// Includes may nest, but only this deep. The reference tool recursed
/// without a bound and a circular include simply blew the stack; a fixed
/// cap turns that into a diagnostic.
const MAX_DEPTH: usize = 64;

/// Expand every page under `views/pages` and write the result to the root
/// of the source tree, one file per page.
pub fn expand_pages(cx: &Context) -> anyhow::Result<()> {
    let pattern = cx.sources.src.join("views/pages/*.html");

    for entry in glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        let text = fs::read_to_string(&path)?;
        let base = path.parent().context("page has no parent directory")?;

        let expanded =
            expand(&text, base, 0).with_context(|| format!("while expanding '{path}'"))?;

        let name = path.file_name().context("page has no file name")?;
        fs::write(cx.sources.src.join(name), expanded)?;
        tracing::debug!(page = name, "expanded");
    }

    cx.reload();
    Ok(())
}

/// Recursively substitute include directives, depth-first: an included
/// file is fully expanded against its own directory before being spliced
/// into its parent.
fn expand(text: &str, base: &Utf8Path, depth: usize) -> anyhow::Result<String> {
    if depth > MAX_DEPTH {
        bail!("include depth exceeds {MAX_DEPTH} under '{base}', likely a circular include");
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(at) = rest.find(INCLUDE_PREFIX) {
        out.push_str(&rest[..at]);
        let after = &rest[at + INCLUDE_PREFIX.len()..];

        match parse_directive(after) {
            Some((rel, consumed)) => {
                let target = base.join(rel);
                let included = fs::read_to_string(&target)
                    .with_context(|| format!("cannot read include target '{target}'"))?;
                let nested_base = target.parent().unwrap_or(base);

                out.push_str(&expand(&included, nested_base, depth + 1)?);
                rest = &after[consumed..];
            }
            None => {
                // Marker without a well-formed directive; emit it verbatim.
                out.push_str(INCLUDE_PREFIX);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse `('path')` after the marker, tolerating whitespace and an
/// optional trailing argument which is accepted and ignored. Returns the
/// referenced path and the number of bytes consumed.
fn parse_directive(input: &str) -> Option<(&str, usize)> {
    let rest = input.trim_start();
    let rest = rest.strip_prefix('(')?;
    let rest = rest.trim_start();

    let quote = rest.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }

    let rest = &rest[1..];
    let end = rest.find(quote)?;
    let path = &rest[..end];

    let rest = &rest[end + 1..];
    let close = rest.find(')')?;
    let rest = &rest[close + 1..];

    Some((path, input.len() - rest.len()))
}
