//! Assembles the bundle text.

use std::collections::HashSet;

/// How the synthesized main module re-exports the entry module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAliasStyle {
    /// ES module re-exports, for ES2015 and later targets.
    EsModule {
        /// Re-export the default export.
        default: bool,
        /// Re-export named exports.
        named: bool,
    },
    /// `import main = require(...)` / `export = main`.
    ExportAssignment,
}

/// Writes bundle output with a fixed line ending and indentation.
#[derive(Debug)]
pub struct BundleWriter {
    eol: String,
    indent: String,
    out: String,
    references: HashSet<(String, String)>,
}

impl BundleWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new(eol: &str, indent: &str) -> Self {
        Self {
            eol: eol.to_string(),
            indent: indent.to_string(),
            out: String::new(),
            references: HashSet::new(),
        }
    }

    /// Writes `/// <reference path="..." />`.
    pub fn reference_path(&mut self, path: &str) {
        self.reference("path", path);
    }

    /// Writes `/// <reference types="..." />`.
    pub fn reference_types(&mut self, name: &str) {
        self.reference("types", name);
    }

    /// Writes a reference directive once; repeats are ignored.
    pub fn reference(&mut self, attribute: &str, value: &str) {
        if !self.references.insert((attribute.to_string(), value.to_string())) {
            return;
        }
        self.out.push_str(&format!("/// <reference {attribute}=\"{value}\" />"));
        self.out.push_str(&self.eol);
    }

    /// Writes `declare module 'name' { ... }` around `body`.
    pub fn module_block(&mut self, name: &str, body: &str) {
        self.open_module(name);
        for line in body_lines(body) {
            if !line.trim().is_empty() {
                self.out.push_str(&self.indent);
                self.out.push_str(line);
            }
            self.out.push_str(&self.eol);
        }
        self.close_module();
    }

    /// Writes a global declaration file as-is.
    pub fn raw(&mut self, text: &str) {
        for line in body_lines(text) {
            self.out.push_str(line);
            self.out.push_str(&self.eol);
        }
    }

    /// Writes the module `name` re-exporting the module `main`.
    pub fn main_alias(&mut self, name: &str, main: &str, style: MainAliasStyle) {
        self.open_module(name);
        let main = quote(main);
        let lines = match style {
            MainAliasStyle::EsModule { default, named } => {
                let mut lines = Vec::new();
                if default {
                    lines.push(format!("export {{default}} from {main};"));
                }
                if named || !default {
                    lines.push(format!("export * from {main};"));
                }
                lines
            }
            MainAliasStyle::ExportAssignment => {
                vec![format!("import main = require({main});"), "export = main;".to_string()]
            }
        };
        for line in lines {
            self.out.push_str(&self.indent);
            self.out.push_str(&line);
            self.out.push_str(&self.eol);
        }
        self.close_module();
    }

    /// The finished bundle.
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    fn open_module(&mut self, name: &str) {
        self.out.push_str(&format!("declare module {} {{", quote(name)));
        self.out.push_str(&self.eol);
    }

    fn close_module(&mut self) {
        self.out.push('}');
        self.out.push_str(&self.eol);
    }
}

/// Lines of `text` without trailing blank lines or source map comments.
fn body_lines(text: &str) -> impl Iterator<Item = &str> {
    text.trim_end()
        .lines()
        .filter(|line| !line.starts_with("//# sourceMappingURL="))
        .map(|line| line.trim_end_matches('\r'))
}

fn quote(name: &str) -> String {
    format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
}
