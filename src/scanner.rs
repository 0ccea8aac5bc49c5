//! A small TypeScript tokenizer.
//!
//! It only understands as much of the language as bundling needs: where
//! identifiers, string literals and braces are, and which spans are comments,
//! templates or regular expressions and must be left alone. Scanning never
//! fails; an unterminated construct simply runs to the end of the input.

use std::ops::Range;

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword, including `#private` names.
    Ident,
    /// Single- or double-quoted string literal.
    String,
    /// Template literal, including any `${}` substitutions.
    Template,
    /// Numeric literal.
    Number,
    /// Regular expression literal.
    Regex,
    /// Any other single character.
    Punct(char),
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// What was scanned.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Whether a line break separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    /// The source text of this token.
    #[must_use]
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    /// Whether this is the identifier `word`.
    #[must_use]
    pub fn is_ident(&self, src: &str, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(src) == word
    }

    /// Whether this is the punctuation character `c`.
    #[must_use]
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

/// A `/// <reference ... />` directive from the top of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDirective {
    /// Attribute name: `path`, `types`, `lib` or `no-default-lib`.
    pub attribute: String,
    /// Attribute value.
    pub value: String,
    /// Span of the whole line, including its line break.
    pub span: Range<usize>,
}

/// Result of scanning one file.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// Tokens in source order.
    pub tokens: Vec<Token>,
    /// Reference directives that precede the first token.
    pub references: Vec<ReferenceDirective>,
}

const REGEX_PRECEDING_KEYWORDS: [&str; 14] = [
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Scans `src` into tokens.
#[must_use]
pub fn scan(src: &str) -> Scan {
    Scanner { src, bytes: src.as_bytes(), pos: 0, out: Scan::default() }.run()
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Scan,
}

impl Scanner<'_> {
    fn run(mut self) -> Scan {
        if self.src.starts_with('\u{feff}') {
            self.pos = '\u{feff}'.len_utf8();
        }
        let mut newline_before = false;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b'\n' => {
                    newline_before = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => {
                    let start = self.pos;
                    self.skip_line();
                    if self.out.tokens.is_empty() {
                        self.collect_reference(start);
                    }
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    if self.skip_block_comment() {
                        newline_before = true;
                    }
                }
                _ => {
                    let start = self.pos;
                    let kind = self.scan_token(b);
                    self.out.tokens.push(Token { kind, start, end: self.pos, newline_before });
                    newline_before = false;
                }
            }
        }
        self.out
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_line(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    /// Skips `/* ... */`, returning whether it spanned a line break.
    fn skip_block_comment(&mut self) -> bool {
        let body_start = self.pos + 2;
        let end = self.src[body_start..].find("*/").map_or(self.bytes.len(), |i| body_start + i + 2);
        let multiline = self.src[self.pos..end].contains('\n');
        self.pos = end;
        multiline
    }

    fn collect_reference(&mut self, start: usize) {
        let line = &self.src[start..self.pos];
        let Some((attribute, value)) = parse_reference(line) else {
            return;
        };
        let end = if self.pos < self.bytes.len() { self.pos + 1 } else { self.pos };
        self.out.references.push(ReferenceDirective { attribute, value, span: start..end });
    }

    fn scan_token(&mut self, b: u8) -> TokenKind {
        match b {
            b'\'' | b'"' => {
                self.skip_string(b);
                TokenKind::String
            }
            b'`' => {
                self.pos += 1;
                self.skip_template_rest();
                TokenKind::Template
            }
            b'0'..=b'9' => {
                self.skip_number();
                TokenKind::Number
            }
            b'.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => {
                self.skip_number();
                TokenKind::Number
            }
            b'/' if self.regex_allowed() => {
                self.skip_regex();
                TokenKind::Regex
            }
            b'#' if self.peek(1).is_some_and(is_ident_start) => {
                self.pos += 1;
                self.skip_ident();
                TokenKind::Ident
            }
            _ if is_ident_start(b) => {
                self.skip_ident();
                TokenKind::Ident
            }
            _ => {
                let c = self.src[self.pos..].chars().next().unwrap_or('\u{fffd}');
                self.pos += c.len_utf8();
                TokenKind::Punct(c)
            }
        }
    }

    fn skip_ident(&mut self) {
        while self.pos < self.bytes.len() && is_ident_part(self.bytes[self.pos]) {
            self.pos += 1;
        }
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => return,
                c => {
                    self.pos += 1;
                    if c == quote {
                        return;
                    }
                }
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    /// Skips the rest of a template after its opening backtick.
    fn skip_template_rest(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_substitution();
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    /// Skips a `${ ... }` body up to and including its closing brace.
    fn skip_substitution(&mut self) {
        let mut depth = 0usize;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    self.pos += 1;
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                q @ (b'\'' | b'"') => self.skip_string(q),
                b'`' => {
                    self.pos += 1;
                    self.skip_template_rest();
                }
                b'/' if self.peek(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek(1) == Some(b'*') => {
                    self.skip_block_comment();
                }
                _ => self.pos += 1,
            }
        }
    }

    fn skip_number(&mut self) {
        let hex = self.bytes[self.pos] == b'0'
            && matches!(self.peek(1), Some(b'x' | b'X' | b'b' | b'B' | b'o' | b'O'));
        self.pos += 1;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            let exponent_sign = !hex
                && matches!(c, b'+' | b'-')
                && matches!(self.bytes[self.pos - 1], b'e' | b'E');
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.out.tokens.last() {
            None => true,
            Some(prev) => match prev.kind {
                TokenKind::Punct(c) => !matches!(c, ')' | ']' | '}'),
                TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&prev.text(self.src)),
                _ => false,
            },
        }
    }

    fn skip_regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => return,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    self.skip_ident();
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Parses `/// <reference name="value" />`, returning the first attribute.
fn parse_reference(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("///")?.trim_start().strip_prefix("<reference")?;
    let rest = rest.trim_start();
    let eq = rest.find('=')?;
    let attribute = rest[..eq].trim();
    if !matches!(attribute, "path" | "types" | "lib" | "no-default-lib") {
        return None;
    }
    let value = rest[eq + 1..].trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let close = value[1..].find(quote)?;
    Some((attribute.to_string(), value[1..=close].to_string()))
}

/// The value of a string literal token, with simple escapes resolved.
#[must_use]
pub fn string_value(raw: &str) -> String {
    let mut chars = raw.chars();
    let quote = chars.next();
    let body = chars.as_str();
    let body = match quote {
        Some(q) => body.strip_suffix(q).unwrap_or(body),
        None => body,
    };

    let mut out = String::with_capacity(body.len());
    let mut iter = body.chars().peekable();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('\r') => {
                if iter.peek() == Some(&'\n') {
                    iter.next();
                }
            }
            Some('\n') | None => {}
            Some('x') => {
                let hex: String = iter.by_ref().take(2).collect();
                push_code_point(&mut out, &hex);
            }
            Some('u') => {
                let hex: String = if iter.peek() == Some(&'{') {
                    iter.next();
                    iter.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    iter.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex);
            }
            Some(other) => out.push(other),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push('\u{fffd}'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        scan(src).tokens.iter().map(|t| (t.kind, t.text(src))).collect()
    }

    #[test]
    fn import_statement() {
        assert_eq!(
            kinds("import Bar from './Bar';"),
            vec![
                (TokenKind::Ident, "import"),
                (TokenKind::Ident, "Bar"),
                (TokenKind::Ident, "from"),
                (TokenKind::String, "'./Bar'"),
                (TokenKind::Punct(';'), ";"),
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_track_newlines() {
        let src = "a /* x\n y */ b // from 'z'\nc";
        let scan = scan(src);
        let texts: Vec<_> = scan.tokens.iter().map(|t| t.text(src)).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert!(scan.tokens[1].newline_before);
        assert!(scan.tokens[2].newline_before);
    }

    #[test]
    fn template_substitutions_nest() {
        let src = "type T = `a${`b${'}'}`}c`; x";
        let toks = kinds(src);
        assert_eq!(toks[3], (TokenKind::Template, "`a${`b${'}'}`}c`"));
        assert_eq!(toks.last(), Some(&(TokenKind::Ident, "x")));
    }

    #[test]
    fn regex_versus_division() {
        let src = "const r = /from '[x]'/g; const d = a / b / c;";
        let toks = kinds(src);
        assert!(toks.contains(&(TokenKind::Regex, "/from '[x]'/g")));
        assert_eq!(toks.iter().filter(|t| t.0 == TokenKind::Punct('/')).count(), 2);
    }

    #[test]
    fn reference_directives_before_first_token() {
        let src = "/// <reference types=\"node\" />\n/// <reference path='./globals.d.ts'/>\nexport {};\n/// <reference lib=\"dom\" />\n";
        let scan = scan(src);
        assert_eq!(scan.references.len(), 2);
        assert_eq!(scan.references[0].attribute, "types");
        assert_eq!(scan.references[0].value, "node");
        assert_eq!(&src[scan.references[0].span.clone()], "/// <reference types=\"node\" />\n");
        assert_eq!(scan.references[1].attribute, "path");
        assert_eq!(scan.references[1].value, "./globals.d.ts");
    }

    #[test]
    fn unterminated_constructs_run_to_end() {
        let src = "x = 'abc";
        let toks = kinds(src);
        assert_eq!(toks.last(), Some(&(TokenKind::String, "'abc")));
        assert_eq!(kinds("/* open").len(), 0);
        assert_eq!(kinds("`a${b").last().map(|t| t.0), Some(TokenKind::Template));
    }

    #[test]
    fn private_names_and_numbers() {
        let toks = kinds("#secret: 1.5e-3; 0xFF");
        assert_eq!(toks[0], (TokenKind::Ident, "#secret"));
        assert_eq!(toks[2], (TokenKind::Number, "1.5e-3"));
        assert_eq!(toks[4], (TokenKind::Number, "0xFF"));
    }

    #[test]
    fn string_values_unescape() {
        assert_eq!(string_value("'./Bar'"), "./Bar");
        assert_eq!(string_value(r#""a\"b\\c""#), "a\"b\\c");
        assert_eq!(string_value(r"'\x41B\u{43}'"), "ABC");
        assert_eq!(string_value("'unterminated"), "unterminated");
    }
}
