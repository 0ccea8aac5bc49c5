//! Rewrites one declaration file for inclusion in a bundle.
//!
//! Module specifiers are passed through a resolver and re-emitted
//! single-quoted. Top-of-file `types`, `lib` and `path` reference directives
//! are lifted out for the bundle header, since anywhere below it they are
//! plain comments. For external modules the file is also made valid inside a
//! `declare module` block by dropping `declare` modifiers.

use std::collections::BTreeSet;

use crate::paths;
use crate::scanner::{self, ReferenceDirective, Token, TokenKind};

/// Which kinds of export a module has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportKinds {
    /// `export default`, `export =` or `export { x as default }`.
    pub default: bool,
    /// Any other exported binding.
    pub named: bool,
}

/// A rewritten declaration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewritten {
    /// Declaration text ready to be placed in a module block.
    pub text: String,
    /// Whether the file has a top-level `import` or `export`.
    pub external_module: bool,
    /// Export analysis of the file.
    pub exports: ExportKinds,
    /// `types`, `lib` and `path` directives removed from the top of the file.
    /// `path` values are still relative to the file.
    pub hoisted_references: Vec<ReferenceDirective>,
}

const DECLARATION_KEYWORDS: [&str; 11] = [
    "const",
    "let",
    "var",
    "function",
    "class",
    "interface",
    "type",
    "enum",
    "namespace",
    "abstract",
    "async",
];

/// Where a module specifier token appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecifierSite {
    /// `from 'x'`, `import 'x'`, `import('x')` or `require('x')`.
    Import,
    /// A relative `declare module './x'` augmentation.
    Augmentation,
}

/// Rewrites `text`, mapping every module specifier through `resolve`.
///
/// `resolve` receives the unescaped specifier and returns the specifier to
/// write; returning the input unchanged keeps it.
pub fn rewrite_declaration(text: &str, mut resolve: impl FnMut(&str) -> String) -> Rewritten {
    let scan = scanner::scan(text);
    let tokens = &scan.tokens;
    let mut edits: Vec<(usize, usize, String)> = Vec::new();

    for (index, site) in specifier_tokens(text, tokens) {
        let token = tokens[index];
        let value = scanner::string_value(token.text(text));
        if site == SpecifierSite::Augmentation && !paths::is_relative_specifier(&value) {
            continue;
        }
        edits.push((token.start, token.end, quote(&resolve(&value))));
    }

    let external_module = is_external_module(text, tokens);
    let exports = analyze_exports(text, tokens);

    let mut hoisted_references = Vec::new();
    for reference in &scan.references {
        if matches!(reference.attribute.as_str(), "types" | "lib" | "path") {
            edits.push((reference.span.start, reference.span.end, String::new()));
            hoisted_references.push(reference.clone());
        }
    }
    if external_module {
        for (start, end) in declare_modifiers(text, tokens) {
            edits.push((start, end, String::new()));
        }
    }

    edits.sort_by_key(|(start, _, _)| *start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        if start < cursor {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str(&replacement);
        cursor = end;
    }
    out.push_str(&text[cursor..]);

    Rewritten { text: out, external_module, exports, hoisted_references }
}

/// Names of all non-relative `declare module 'x'` declarations in `text`.
#[must_use]
pub fn declared_module_names(text: &str) -> BTreeSet<String> {
    let tokens = scanner::scan(text).tokens;
    specifier_tokens(text, &tokens)
        .into_iter()
        .filter(|(_, site)| *site == SpecifierSite::Augmentation)
        .map(|(index, _)| scanner::string_value(tokens[index].text(text)))
        .filter(|name| !paths::is_relative_specifier(name))
        .collect()
}

/// Every import, export and require specifier in `text`, in source order.
#[must_use]
pub fn module_specifiers(text: &str) -> Vec<String> {
    let tokens = scanner::scan(text).tokens;
    specifier_tokens(text, &tokens)
        .into_iter()
        .filter(|(_, site)| *site == SpecifierSite::Import)
        .map(|(index, _)| scanner::string_value(tokens[index].text(text)))
        .collect()
}

fn specifier_tokens(text: &str, tokens: &[Token]) -> Vec<(usize, SpecifierSite)> {
    let mut found = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Ident {
            continue;
        }
        let next = tokens.get(i + 1);
        let after = tokens.get(i + 2);
        let is_string = |t: Option<&Token>| t.is_some_and(|t| t.kind == TokenKind::String);
        let prev = i.checked_sub(1).map(|p| &tokens[p]);

        match token.text(text) {
            "from" | "import" if is_string(next) => found.push((i + 1, SpecifierSite::Import)),
            "import" if next.is_some_and(|t| t.is_punct('(')) && is_string(after) => {
                found.push((i + 2, SpecifierSite::Import));
            }
            "require"
                if prev.is_some_and(|p| p.is_punct('='))
                    && next.is_some_and(|t| t.is_punct('('))
                    && is_string(after) =>
            {
                found.push((i + 2, SpecifierSite::Import));
            }
            "module" if is_string(next) && !prev.is_some_and(|p| p.is_punct('.')) => {
                found.push((i + 1, SpecifierSite::Augmentation));
            }
            _ => {}
        }
    }
    found
}

/// Brace depth before each token.
fn depths(tokens: &[Token]) -> Vec<usize> {
    let mut depth = 0usize;
    tokens
        .iter()
        .map(|t| {
            if t.is_punct('}') {
                depth = depth.saturating_sub(1);
            }
            let current = depth;
            if t.is_punct('{') {
                depth += 1;
            }
            current
        })
        .collect()
}

fn at_statement_start(tokens: &[Token], i: usize) -> bool {
    match i.checked_sub(1) {
        None => true,
        Some(p) => {
            tokens[i].newline_before
                || tokens[p].is_punct(';')
                || tokens[p].is_punct('{')
                || tokens[p].is_punct('}')
        }
    }
}

fn is_external_module(text: &str, tokens: &[Token]) -> bool {
    let depths = depths(tokens);
    tokens.iter().enumerate().any(|(i, token)| {
        if depths[i] != 0 || !at_statement_start(tokens, i) {
            return false;
        }
        let next = tokens.get(i + 1);
        if token.is_ident(text, "export") {
            return next.is_some();
        }
        token.is_ident(text, "import")
            && next.is_some_and(|n| !n.is_punct('(') && !n.is_punct('.'))
    })
}

fn analyze_exports(text: &str, tokens: &[Token]) -> ExportKinds {
    let depths = depths(tokens);
    let mut kinds = ExportKinds::default();
    for (i, token) in tokens.iter().enumerate() {
        if depths[i] != 0 || !token.is_ident(text, "export") || !at_statement_start(tokens, i) {
            continue;
        }
        let Some(next) = tokens.get(i + 1) else { continue };
        if next.is_ident(text, "default") || next.is_punct('=') {
            kinds.default = true;
        } else if next.is_ident(text, "as") {
            // `export as namespace X` only names a UMD global.
        } else if next.is_punct('{') {
            export_clause(text, &tokens[i + 2..], &mut kinds);
        } else if next.is_ident(text, "type")
            && tokens.get(i + 2).is_some_and(|t| t.is_punct('{'))
        {
            export_clause(text, &tokens[i + 3..], &mut kinds);
        } else {
            kinds.named = true;
        }
    }
    kinds
}

/// Classifies the names in `{ a, b as default }` starting after the brace.
fn export_clause(text: &str, tokens: &[Token], kinds: &mut ExportKinds) {
    let mut last_name: Option<&str> = None;
    for token in tokens {
        let ends_entry = token.is_punct(',') || token.is_punct('}');
        if ends_entry {
            match last_name.take() {
                Some("default") => kinds.default = true,
                Some(_) => kinds.named = true,
                None => {}
            }
            if token.is_punct('}') {
                return;
            }
        } else if token.kind == TokenKind::Ident || token.kind == TokenKind::String {
            last_name = Some(token.text(text));
        }
    }
}

/// Spans of removable top-level `declare` modifiers, each running to the
/// start of the following token.
fn declare_modifiers(text: &str, tokens: &[Token]) -> Vec<(usize, usize)> {
    let depths = depths(tokens);
    let mut spans = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if depths[i] != 0 || !token.is_ident(text, "declare") {
            continue;
        }
        let Some(next) = tokens.get(i + 1) else { continue };
        if next.newline_before || next.kind != TokenKind::Ident {
            continue;
        }
        let keyword = next.text(text);
        let is_declaration = DECLARATION_KEYWORDS.contains(&keyword)
            || (keyword == "module" && tokens.get(i + 2).is_some_and(|t| t.kind == TokenKind::Ident));
        if !is_declaration {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| &tokens[p]);
        let after_modifier =
            prev.is_some_and(|p| p.is_ident(text, "export") || p.is_ident(text, "default"));
        if at_statement_start(tokens, i) || after_modifier {
            spans.push((token.start, next.start));
        }
    }
    spans
}

fn quote(specifier: &str) -> String {
    let mut out = String::with_capacity(specifier.len() + 2);
    out.push('\'');
    for c in specifier.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}
