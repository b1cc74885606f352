use std::fs;

use camino::Utf8PathBuf;
use glob::glob;

use crate::Context;
use crate::html::{self, Token};

const INDENT: &str = "  ";

/// Rewrite every page in the output tree in place with normalized
/// two-space indentation. Purely cosmetic: tag and text content is
/// untouched, and the contents of `pre`, `script`, `style` and `textarea`
/// are preserved verbatim.
pub fn prettify(cx: &Context) -> anyhow::Result<()> {
    let pattern = cx.sources.dist.join("*.html");

    for entry in glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        let text = fs::read_to_string(&path)?;
        fs::write(&path, format_html(&text))?;
        tracing::debug!(page = %path, "prettified");
    }

    Ok(())
}

/// Re-emit the token stream, one tag per line, indenting by element depth.
/// An element with nothing between its open and close tags stays on a
/// single line.
pub fn format_html(text: &str) -> String {
    let tokens = html::tokenize(text);
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut pre_depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        i += 1;

        if pre_depth > 0 {
            // Inside <pre>; copy everything through until its close.
            match token {
                Token::Open {
                    name, self_closing, ..
                } if name.eq_ignore_ascii_case("pre") && !self_closing => pre_depth += 1,
                Token::Close { name, .. } if name.eq_ignore_ascii_case("pre") => {
                    pre_depth -= 1;
                    if pre_depth == 0 {
                        depth = depth.saturating_sub(1);
                        out.push_str(token.raw());
                        out.push('\n');
                        continue;
                    }
                }
                _ => {}
            }
            out.push_str(token.raw());
            continue;
        }

        match token {
            Token::Text { raw, .. } => {
                for line in raw.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        push_line(&mut out, depth, line);
                    }
                }
            }
            Token::RawText { raw, .. } => {
                let inner = raw.trim_matches(|c| c == '\n' || c == '\r');
                if !inner.trim().is_empty() {
                    out.push_str(inner);
                    out.push('\n');
                }
            }
            Token::Doctype { raw, .. } | Token::Comment { raw, .. } => {
                push_line(&mut out, depth, raw.trim());
            }
            Token::Close { raw, .. } => {
                depth = depth.saturating_sub(1);
                push_line(&mut out, depth, raw.trim());
            }
            Token::Open {
                name,
                raw,
                self_closing,
                ..
            } => {
                if !self_closing && !html::is_void(name) {
                    if let Some(Token::Close {
                        name: close_name,
                        raw: close_raw,
                        ..
                    }) = tokens.get(i)
                    {
                        if close_name.eq_ignore_ascii_case(name) {
                            // Empty element; keep the pair on one line.
                            push_line(&mut out, depth, &format!("{}{}", raw.trim(), close_raw.trim()));
                            i += 1;
                            continue;
                        }
                    }
                }

                push_line(&mut out, depth, raw.trim());

                if name.eq_ignore_ascii_case("pre") && !self_closing {
                    pre_depth = 1;
                    depth += 1;
                } else if !self_closing && !html::is_void(name) {
                    depth += 1;
                }
            }
        }
    }

    out
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_by_element_depth() {
        let src = "<!DOCTYPE html>\n<html><body>\n<p>hi</p>\n</body></html>\n";
        let pretty = format_html(src);

        assert_eq!(
            pretty,
            "<!DOCTYPE html>\n<html>\n  <body>\n    <p>\n      hi\n    </p>\n  </body>\n</html>\n"
        );
    }

    #[test]
    fn void_elements_do_not_nest() {
        let src = "<div><br><img src=\"x.png\"></div>";
        let pretty = format_html(src);

        assert_eq!(
            pretty,
            "<div>\n  <br>\n  <img src=\"x.png\">\n</div>\n"
        );
    }

    #[test]
    fn empty_elements_stay_on_one_line() {
        let src = "<body><script src=\"app.min.js\"></script><div></div></body>";
        let pretty = format_html(src);

        assert_eq!(
            pretty,
            "<body>\n  <script src=\"app.min.js\"></script>\n  <div></div>\n</body>\n"
        );
    }

    #[test]
    fn idempotent_on_already_pretty_input() {
        let src = "<!DOCTYPE html>\n<html>\n  <body>\n    <p>\n      hi\n    </p>\n  </body>\n</html>\n";
        let once = format_html(src);
        let twice = format_html(&once);

        assert_eq!(once, twice);
        assert_eq!(once, src);
    }

    #[test]
    fn pre_content_is_preserved_verbatim() {
        let src = "<div><pre>  keep\n   me</pre></div>";
        let pretty = format_html(src);

        assert!(pretty.contains("  keep\n   me"));
    }

    #[test]
    fn script_content_is_preserved_verbatim() {
        let src = "<body><script>\nvar x = 1;\n  var y = 2;\n</script></body>";
        let pretty = format_html(src);

        assert!(pretty.contains("var x = 1;\n  var y = 2;"));
    }
}
