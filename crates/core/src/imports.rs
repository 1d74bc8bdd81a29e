//! Import extraction for JavaScript and TypeScript modules
//!
//! Sources are parsed with oxc, so specifiers inside comments or string
//! literals never count and malformed files are reported instead of
//! producing a partial import list.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportExpression, Program,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;

/// Module specifiers referenced by `source`, in source order, de-duplicated
///
/// Covers static `import`, `export ... from`, `import("x")` and
/// `require("x")` with a string literal argument. Type-only imports are
/// skipped. Files are parsed as ES modules first and as scripts second, so
/// sloppy-mode CommonJS is accepted; the module parse error is returned when
/// both fail.
pub fn scan_imports(path: &Path, source: &str) -> Result<Vec<String>, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());

    let module = Parser::new(&allocator, source, source_type.with_module(true)).parse();
    if module.errors.is_empty() && !module.panicked {
        return Ok(collect(&module.program));
    }

    let script = Parser::new(&allocator, source, source_type.with_script(true)).parse();
    if script.errors.is_empty() && !script.panicked {
        return Ok(collect(&script.program));
    }

    Err(module
        .errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "parser aborted".to_string()))
}

fn collect(program: &Program<'_>) -> Vec<String> {
    let mut collector = SpecifierCollector::default();
    collector.visit_program(program);
    collector.specifiers
}

#[derive(Default)]
struct SpecifierCollector {
    specifiers: Vec<String>,
}

impl SpecifierCollector {
    fn push(&mut self, specifier: &str) {
        if !self.specifiers.iter().any(|s| s == specifier) {
            self.specifiers.push(specifier.to_string());
        }
    }
}

impl<'a> Visit<'a> for SpecifierCollector {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        if !it.import_kind.is_type() {
            self.push(it.source.value.as_str());
        }
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        self.push(it.source.value.as_str());
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source {
            self.push(source.value.as_str());
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if let Expression::StringLiteral(literal) = &it.source {
            self.push(literal.value.as_str());
        }
        walk::walk_import_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            if callee.name.as_str() == "require" && it.arguments.len() == 1 {
                if let Some(Argument::StringLiteral(literal)) = it.arguments.first() {
                    self.push(literal.value.as_str());
                }
            }
        }
        walk::walk_call_expression(self, it);
    }
}
