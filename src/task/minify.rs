use std::fs;

use anyhow::{Context as _, bail};
use camino::{Utf8Path, Utf8PathBuf};
use glob::glob;

use crate::Context;

/// Kind of a build block, declared in the opening comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Js,
    Css,
}

impl BlockKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "js" => Some(BlockKind::Js),
            "css" => Some(BlockKind::Css),
            _ => None,
        }
    }

    fn ref_attr(self) -> &'static str {
        match self {
            BlockKind::Js => "src",
            BlockKind::Css => "href",
        }
    }

    fn tag(self, target: &str) -> String {
        match self {
            BlockKind::Js => format!("<script src=\"{target}\"></script>"),
            BlockKind::Css => format!("<link rel=\"stylesheet\" href=\"{target}\">"),
        }
    }
}

/// Concatenate and minify the asset blocks of every expanded page and
/// write the rewritten pages plus their bundled assets to the output tree.
///
/// A block groups the assets between its opening comment and `endbuild`:
///
/// ```html
/// <!-- build:js scripts/app.min.js -->
/// <script src="scripts/a.js"></script>
/// <script src="scripts/b.js"></script>
/// <!-- endbuild -->
/// ```
///
/// becomes a single `<script src="scripts/app.min.js"></script>`.
/// References resolve against the source tree, the temporary tree (for
/// compiled CSS) and the project root, in that order. Everything outside
/// a block passes through untouched.
pub fn minify(cx: &Context) -> anyhow::Result<()> {
    let pattern = cx.sources.src.join("*.html");
    let roots = [
        cx.sources.src.clone(),
        cx.sources.tmp.clone(),
        cx.sources.root.clone(),
    ];

    for entry in glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        let text = fs::read_to_string(&path)?;

        let rewritten = rewrite_page(&text, &roots, &cx.sources.dist)
            .with_context(|| format!("while processing '{path}'"))?;

        let name = path.file_name().context("page has no file name")?;
        fs::create_dir_all(&cx.sources.dist)?;
        fs::write(cx.sources.dist.join(name), rewritten)?;
        tracing::debug!(page = name, "minified");
    }

    Ok(())
}

fn rewrite_page(text: &str, roots: &[Utf8PathBuf], dist: &Utf8Path) -> anyhow::Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut iter = text.split_inclusive('\n').enumerate();

    while let Some((i, line)) = iter.next() {
        let Some((kind_str, target, prefix)) = parse_build_open(line) else {
            out.push_str(line);
            continue;
        };

        let lineno = i + 1;
        let kind = BlockKind::parse(kind_str)
            .with_context(|| format!("unknown build block kind '{kind_str}' on line {lineno}"))?;

        let mut refs = Vec::new();
        let mut closed = false;
        for (_, inner) in iter.by_ref() {
            if is_build_close(inner) {
                closed = true;
                break;
            }
            if let Some(reference) = extract_ref(inner, kind.ref_attr()) {
                refs.push(reference.to_string());
            }
        }

        if !closed {
            bail!("build block opened on line {lineno} is never closed");
        }
        if refs.is_empty() {
            bail!("build block on line {lineno} references no assets");
        }

        let mut concat = String::new();
        for reference in &refs {
            let resolved = resolve(reference, roots).with_context(|| {
                format!("asset '{reference}' from the block on line {lineno} was not found")
            })?;
            concat.push_str(&fs::read_to_string(&resolved)?);
            if !concat.ends_with('\n') {
                concat.push('\n');
            }
        }

        let minified = match kind {
            // Safe mode: whitespace and comments only, no dead-code passes.
            BlockKind::Js => minifier::js::minify(&concat).to_string(),
            BlockKind::Css => {
                let plain = strip_special_comments(&concat);
                minifier::css::minify(&plain)
                    .map_err(|e| anyhow::anyhow!("css minification failed: {e}"))?
                    .to_string()
            }
        };

        let out_path = dist.join(target);
        if let Some(dir) = out_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&out_path, minified)?;

        out.push_str(prefix);
        out.push_str(&kind.tag(target));
        out.push('\n');
    }

    Ok(out)
}

/// Parse `<!-- build:<kind> <target> -->`, returning the kind, the output
/// path and whatever preceded the comment on the line (kept as the
/// replacement tag's prefix).
fn parse_build_open(line: &str) -> Option<(&str, &str, &str)> {
    let at = line.find("<!--")?;
    let prefix = &line[..at];

    let inner = line[at + 4..].trim_start();
    let inner = inner.strip_prefix("build:")?;
    let end = inner.find("-->")?;
    let decl = inner[..end].trim();

    let (kind, target) = decl.split_once(char::is_whitespace)?;
    Some((kind, target.trim(), prefix))
}

fn is_build_close(line: &str) -> bool {
    line.find("<!--")
        .is_some_and(|at| line[at + 4..].trim_start().starts_with("endbuild"))
}

/// Pull the value of `attr` out of a reference line inside a block.
fn extract_ref<'a>(line: &'a str, attr: &str) -> Option<&'a str> {
    let at = find_attr(line, attr)?;
    let rest = line[at + attr.len()..].trim_start();
    let rest = rest.strip_prefix('=')?;
    let rest = rest.trim_start();

    match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let body = &rest[1..];
            let end = body.find(quote)?;
            Some(&body[..end]).filter(|s| !s.is_empty())
        }
        _ => {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(rest.len());
            Some(&rest[..end]).filter(|s| !s.is_empty())
        }
    }
}

/// Find `attr` in `line` at an attribute-name boundary, so that `src`
/// does not match inside `data-src`.
fn find_attr(line: &str, attr: &str) -> Option<usize> {
    let mut search = 0;

    while let Some(at) = line[search..].find(attr).map(|i| i + search) {
        let prev = if at == 0 {
            None
        } else {
            Some(line.as_bytes()[at - 1])
        };
        let boundary = !matches!(prev, Some(c) if c.is_ascii_alphanumeric() || c == b'-');
        if boundary {
            return Some(at);
        }
        search = at + attr.len();
    }

    None
}

fn resolve(reference: &str, roots: &[Utf8PathBuf]) -> Option<Utf8PathBuf> {
    let rel = reference.trim_start_matches('/');
    roots.iter().map(|root| root.join(rel)).find(|p| p.is_file())
}

/// Discard `/*! ... */` comments, which minification would otherwise keep.
fn strip_special_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;

    while let Some(at) = rest.find("/*!") {
        out.push_str(&rest[..at]);
        match rest[at..].find("*/") {
            Some(end) => rest = &rest[at + end + 2..],
            None => {
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
