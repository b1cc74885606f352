use std::collections::{HashMap, HashSet};
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use glob::glob;

use crate::Context;
use crate::error::{LintError, Violation};
use crate::html::{self, Quote, Token};

/// Structural lint over every expanded page at the root of the source
/// tree. Any violation fails the task with the aggregated report; there
/// is no auto-fix.
pub fn lint(cx: &Context) -> anyhow::Result<()> {
    let pattern = cx.sources.src.join("*.html");
    let mut violations = Vec::new();

    for entry in glob(pattern.as_str())? {
        let path = Utf8PathBuf::try_from(entry?)?;
        let text = fs::read_to_string(&path)?;
        check(&path, &text, &mut violations);
    }

    if violations.is_empty() {
        tracing::info!("lint passed");
        Ok(())
    } else {
        Err(LintError { violations }.into())
    }
}

/// Run every rule over a single document.
pub fn check(file: &Utf8Path, text: &str, out: &mut Vec<Violation>) {
    let tokens = html::tokenize(text);

    doctype_first(file, &tokens, out);

    let mut open_stack: Vec<(&str, usize, usize)> = Vec::new();
    let mut seen_ids: HashMap<String, usize> = HashMap::new();

    for token in &tokens {
        match token {
            Token::Open {
                line,
                column,
                name,
                attrs,
                self_closing,
                ..
            } => {
                if name.chars().any(|c| c.is_ascii_uppercase()) {
                    push(out, file, *line, *column, "tagname-lowercase", format!(
                        "tag name <{name}> must be lowercase"
                    ));
                }

                let mut seen_attrs = HashSet::new();
                for attr in attrs {
                    if attr.name.chars().any(|c| c.is_ascii_uppercase()) {
                        push(out, file, *line, *column, "attr-lowercase", format!(
                            "attribute name '{}' must be lowercase",
                            attr.name
                        ));
                    }

                    if attr.value.is_some() && attr.quote != Quote::Double {
                        push(out, file, *line, *column, "attr-value-double-quotes", format!(
                            "value of attribute '{}' must use double quotes",
                            attr.name
                        ));
                    }

                    if !seen_attrs.insert(attr.name.to_ascii_lowercase()) {
                        push(out, file, *line, *column, "attr-no-duplication", format!(
                            "attribute '{}' appears more than once",
                            attr.name
                        ));
                    }

                    if attr.name.eq_ignore_ascii_case("id") {
                        if let Some(id) = attr.value.filter(|v| !v.is_empty()) {
                            if let Some(first) = seen_ids.insert(id.to_string(), *line) {
                                push(out, file, *line, *column, "id-unique", format!(
                                    "id '{id}' already used on line {first}"
                                ));
                            }
                        }
                    }

                    if attr.name.eq_ignore_ascii_case("src")
                        && attr.value.is_none_or(|v| v.trim().is_empty())
                    {
                        push(out, file, *line, *column, "src-not-empty", format!(
                            "src of <{name}> must not be empty"
                        ));
                    }
                }

                if !self_closing && !html::is_void(name) {
                    open_stack.push((*name, *line, *column));
                }
            }
            Token::Close {
                line, column, name, ..
            } => {
                if name.chars().any(|c| c.is_ascii_uppercase()) {
                    push(out, file, *line, *column, "tagname-lowercase", format!(
                        "tag name </{name}> must be lowercase"
                    ));
                }

                close_tag(file, name, *line, *column, &mut open_stack, out);
            }
            _ => {}
        }
    }

    for (name, line, column) in open_stack {
        push(out, file, line, column, "tag-pair", format!(
            "tag <{name}> is never closed"
        ));
    }
}

/// The first piece of markup must be the doctype declaration.
fn doctype_first(file: &Utf8Path, tokens: &[Token], out: &mut Vec<Violation>) {
    for token in tokens {
        match token {
            Token::Doctype { .. } => return,
            Token::Comment { .. } => continue,
            Token::Text { raw, .. } if raw.trim().is_empty() => continue,
            _ => {
                push(out, file, token.line(), 1, "doctype-first", String::from(
                    "doctype must be declared first",
                ));
                return;
            }
        }
    }
}

fn close_tag<'a>(
    file: &Utf8Path,
    name: &str,
    line: usize,
    column: usize,
    open_stack: &mut Vec<(&'a str, usize, usize)>,
    out: &mut Vec<Violation>,
) {
    let matching = open_stack
        .iter()
        .rposition(|(open, _, _)| open.eq_ignore_ascii_case(name));

    match matching {
        Some(at) => {
            // Anything above the match was left open.
            for (unclosed, open_line, open_column) in open_stack.drain(at + 1..) {
                push(out, file, open_line, open_column, "tag-pair", format!(
                    "tag <{unclosed}> is never closed"
                ));
            }
            open_stack.pop();
        }
        None => {
            push(out, file, line, column, "tag-pair", format!(
                "closing tag </{name}> has no opening tag"
            ));
        }
    }
}

fn push(
    out: &mut Vec<Violation>,
    file: &Utf8Path,
    line: usize,
    column: usize,
    rule: &'static str,
    message: String,
) {
    out.push(Violation {
        file: file.to_owned(),
        line,
        column,
        rule,
        message,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations(text: &str) -> Vec<Violation> {
        let mut out = Vec::new();
        check(Utf8Path::new("test.html"), text, &mut out);
        out
    }

    fn rules(text: &str) -> Vec<&'static str> {
        violations(text).into_iter().map(|v| v.rule).collect()
    }

    const VALID: &str = "<!DOCTYPE html>\n<html>\n<head><title>t</title></head>\n\
        <body><div id=\"a\"><p>hi</p></div><img src=\"x.png\"></body>\n</html>\n";

    #[test]
    fn valid_document_is_clean() {
        assert!(violations(VALID).is_empty());
    }

    #[test]
    fn unclosed_tag_reports_tag_pair_with_position() {
        let out = violations("<!DOCTYPE html>\n<html>\n<body>\n<div>\n</body>\n</html>\n");
        assert!(out.iter().any(|v| v.rule == "tag-pair" && v.line == 4));
    }

    #[test]
    fn stray_closing_tag_reports_tag_pair() {
        assert!(rules("<!DOCTYPE html>\n<html></html>\n</div>\n").contains(&"tag-pair"));
    }

    #[test]
    fn uppercase_names_are_flagged() {
        let found = rules("<!DOCTYPE html>\n<HTML CLASS=\"x\"></HTML>\n");
        assert!(found.contains(&"tagname-lowercase"));
        assert!(found.contains(&"attr-lowercase"));
    }

    #[test]
    fn single_quoted_and_unquoted_values_are_flagged() {
        assert!(rules("<!DOCTYPE html>\n<html lang='en'></html>\n")
            .contains(&"attr-value-double-quotes"));
        assert!(rules("<!DOCTYPE html>\n<html lang=en></html>\n")
            .contains(&"attr-value-double-quotes"));
    }

    #[test]
    fn duplicate_attributes_are_flagged() {
        assert!(rules("<!DOCTYPE html>\n<html lang=\"a\" lang=\"b\"></html>\n")
            .contains(&"attr-no-duplication"));
    }

    #[test]
    fn duplicate_ids_are_flagged() {
        let text = "<!DOCTYPE html>\n<html><body>\
            <div id=\"x\"></div><span id=\"x\"></span>\
            </body></html>\n";
        assert!(rules(text).contains(&"id-unique"));
    }

    #[test]
    fn empty_src_is_flagged() {
        assert!(rules("<!DOCTYPE html>\n<html><body><img src=\"\"></body></html>\n")
            .contains(&"src-not-empty"));
    }

    #[test]
    fn missing_doctype_is_flagged() {
        assert!(rules("<html></html>\n").contains(&"doctype-first"));
    }

    #[test]
    fn comments_may_precede_the_doctype() {
        assert!(!rules("<!-- banner -->\n<!DOCTYPE html>\n<html></html>\n")
            .contains(&"doctype-first"));
    }
}
