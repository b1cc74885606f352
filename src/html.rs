//! A minimal, lossless HTML tag scanner.
//!
//! The lint and prettify tasks both need to see the tag structure of a page
//! without a full DOM: lint walks tags with their source positions, and
//! prettify re-emits the token stream with normalized indentation. The
//! scanner is lenient; anything it cannot make sense of is passed through
//! as text. Concatenating the `raw` slices of all tokens reproduces the
//! input byte for byte.

/// Quoting style of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
    Unquoted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
    pub quote: Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Doctype {
        line: usize,
        raw: &'a str,
    },
    Comment {
        line: usize,
        raw: &'a str,
    },
    Open {
        line: usize,
        column: usize,
        name: &'a str,
        attrs: Vec<Attr<'a>>,
        self_closing: bool,
        raw: &'a str,
    },
    Close {
        line: usize,
        column: usize,
        name: &'a str,
        raw: &'a str,
    },
    Text {
        line: usize,
        raw: &'a str,
    },
    /// Content of a raw-text element (`script`, `style`, `textarea`),
    /// preserved verbatim up to the matching close tag.
    RawText {
        line: usize,
        raw: &'a str,
    },
}

impl<'a> Token<'a> {
    pub fn raw(&self) -> &'a str {
        match self {
            Token::Doctype { raw, .. }
            | Token::Comment { raw, .. }
            | Token::Open { raw, .. }
            | Token::Close { raw, .. }
            | Token::Text { raw, .. }
            | Token::RawText { raw, .. } => raw,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Token::Doctype { line, .. }
            | Token::Comment { line, .. }
            | Token::Open { line, .. }
            | Token::Close { line, .. }
            | Token::Text { line, .. }
            | Token::RawText { line, .. } => *line,
        }
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Whether `name` is a void element, which never takes a closing tag.
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| name.eq_ignore_ascii_case(v))
}

pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut col = 1;

    while pos < src.len() {
        let rest = &src[pos..];

        if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
            let raw = &rest[..end];
            tokens.push(Token::Comment { line, raw });
            advance(raw, &mut line, &mut col);
            pos += end;
        } else if rest.starts_with("<!") {
            let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            let raw = &rest[..end];
            tokens.push(Token::Doctype { line, raw });
            advance(raw, &mut line, &mut col);
            pos += end;
        } else if rest.starts_with("</") {
            match rest.find('>') {
                Some(gt) => {
                    let raw = &rest[..gt + 1];
                    let name = rest[2..gt].trim();
                    tokens.push(Token::Close {
                        line,
                        column: col,
                        name,
                        raw,
                    });
                    advance(raw, &mut line, &mut col);
                    pos += gt + 1;
                }
                None => {
                    tokens.push(Token::Text { line, raw: rest });
                    pos = src.len();
                }
            }
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
        {
            match scan_tag(rest) {
                Some(tag_len) => {
                    let raw = &rest[..tag_len];
                    let (name, attrs, self_closing) = parse_tag(raw);
                    let tag_line = line;
                    let tag_col = col;
                    advance(raw, &mut line, &mut col);
                    pos += tag_len;

                    let raw_text = !self_closing
                        && matches!(
                            name.to_ascii_lowercase().as_str(),
                            "script" | "style" | "textarea"
                        );

                    tokens.push(Token::Open {
                        line: tag_line,
                        column: tag_col,
                        name,
                        attrs,
                        self_closing,
                        raw,
                    });

                    if raw_text {
                        let content = &src[pos..];
                        let end = find_close_tag(content, name).unwrap_or(content.len());
                        if end > 0 {
                            let raw = &content[..end];
                            tokens.push(Token::RawText { line, raw });
                            advance(raw, &mut line, &mut col);
                            pos += end;
                        }
                    }
                }
                None => {
                    // Unterminated tag; pass the remainder through as text.
                    tokens.push(Token::Text { line, raw: rest });
                    pos = src.len();
                }
            }
        } else {
            // Text runs until the next tag opener; a lone '<' that opened
            // no tag is swallowed into the text.
            let first = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            let end = rest[first..]
                .find('<')
                .map(|i| i + first)
                .unwrap_or(rest.len());
            let raw = &rest[..end];
            tokens.push(Token::Text { line, raw });
            advance(raw, &mut line, &mut col);
            pos += end;
        }
    }

    tokens
}

/// Length of the tag starting at the beginning of `rest`, including the
/// terminating `>`. Quoted attribute values may contain `>`.
fn scan_tag(rest: &str) -> Option<usize> {
    let mut in_quote: Option<char> = None;

    for (i, c) in rest.char_indices() {
        match in_quote {
            Some(q) => {
                if c == q {
                    in_quote = None;
                }
            }
            None => match c {
                '"' | '\'' => in_quote = Some(c),
                '>' => return Some(i + 1),
                _ => {}
            },
        }
    }

    None
}

fn parse_tag(raw: &str) -> (&str, Vec<Attr<'_>>, bool) {
    let inner = raw.strip_prefix('<').unwrap_or(raw);
    let inner = inner.strip_suffix('>').unwrap_or(inner);
    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (inner, false),
    };

    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = &inner[..name_end];
    let attrs = parse_attrs(&inner[name_end..]);

    (name, attrs, self_closing)
}

fn parse_attrs(mut rest: &str) -> Vec<Attr<'_>> {
    let mut attrs = Vec::new();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        if name_end == 0 {
            // Stray '='; skip it.
            rest = &rest[1..];
            continue;
        }

        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let (value, next) = match body.find(q) {
                        Some(end) => (&body[..end], &body[end + 1..]),
                        None => (body, ""),
                    };
                    attrs.push(Attr {
                        name,
                        value: Some(value),
                        quote: if q == '"' { Quote::Double } else { Quote::Single },
                    });
                    rest = next;
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    attrs.push(Attr {
                        name,
                        value: Some(&after_eq[..end]),
                        quote: Quote::Unquoted,
                    });
                    rest = &after_eq[end..];
                }
            }
        } else {
            attrs.push(Attr {
                name,
                value: None,
                quote: Quote::Unquoted,
            });
        }
    }

    attrs
}

/// Byte offset of the `</name` closing the current raw-text element,
/// matched case-insensitively.
fn find_close_tag(content: &str, name: &str) -> Option<usize> {
    let mut search = 0;

    while let Some(at) = content[search..].find("</").map(|i| i + search) {
        let after = &content[at + 2..];

        if after.len() >= name.len()
            && after.as_bytes()[..name.len()].eq_ignore_ascii_case(name.as_bytes())
        {
            let next = after.as_bytes().get(name.len()).copied();
            let terminated = match next {
                None | Some(b'>') => true,
                Some(c) => c.is_ascii_whitespace(),
            };
            if terminated {
                return Some(at);
            }
        }

        search = at + 2;
    }

    None
}

fn advance(consumed: &str, line: &mut usize, col: &mut usize) {
    for c in consumed.chars() {
        if c == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    }
}
