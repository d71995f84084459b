//! Symbols-file and exports-file emission (spec.md §4.4, §4.5).
//!
//! Each file is a user-provided JS fragment annotated with import/export
//! declarations. Parsing the fragment's raw text into an AST is out of
//! scope (spec.md §1) — a `SourceFragment` carries the body as opaque
//! source text plus its free identifiers, as already computed by that
//! external facility. What *is* in scope is deciding, from the
//! structured import/export declarations, what preamble/postamble
//! statements surround that body.

use crate::ast::{Expr, Stmt};
use crate::error::Error;
use crate::mangle::Mangler;
use crate::requirements::{ImportSpecifier, RequirementsTable};
use crate::symbol_table::{DefinedBy, SymbolKind, SymbolTable};

/// An already-parsed, already scope-analyzed JS source fragment: the
/// free-standing body code a symbols/exports file supplies around its
/// import/export declarations.
#[derive(Debug, Clone, Default)]
pub struct SourceFragment {
    pub text: String,
    pub free_identifiers: Vec<String>,
}

/// A reference to an external JS module from within one file: either the
/// whole module bound to a local alias, or one named member pulled off
/// it.
#[derive(Debug, Clone)]
pub enum RequirementImport {
    WholeModule { local_alias: String },
    Named(ImportSpecifier),
}

/// One file's request to import `module_specifier`, by one or more
/// `RequirementImport`s.
#[derive(Debug, Clone)]
pub struct RequirementUse {
    pub module_specifier: String,
    pub imports: Vec<RequirementImport>,
}

/// A symbol this file consumes (a lateBind placeholder over `__symbols`).
/// `binding` is the local variable name the generated `let` declares;
/// `symbol_name` is the key the symbol table / `__symbols` object knows
/// it by. They're equal unless the file renames on import.
#[derive(Debug, Clone)]
pub struct SymbolImport {
    pub symbol_name: String,
    pub binding: String,
}

/// A symbol this file *defines* for wasm to import — the file's own body
/// assigns `__symbols[name] = ...` itself; this only registers the
/// definition (and its kind) in the symbol table so other files'
/// imports of it resolve and get the right `isCallable` flag.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub symbol_name: String,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolsFile {
    pub requirement_uses: Vec<RequirementUse>,
    pub symbol_imports: Vec<SymbolImport>,
    pub symbol_defs: Vec<SymbolDef>,
    pub body: SourceFragment,
}

#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    pub local_name: Option<String>,
    pub exported_name: String,
}

impl ExportSpecifier {
    /// The source-side reference: `local_name` if present, else
    /// `exported_name`.
    pub fn source_ref(&self) -> &str {
        self.local_name.as_deref().unwrap_or(&self.exported_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportsFile {
    pub requirement_uses: Vec<RequirementUse>,
    pub symbol_imports: Vec<SymbolImport>,
    pub exports: Vec<ExportSpecifier>,
    pub body: SourceFragment,
}

/// Registers every definition a file contributes ahead of emission, so
/// later files' imports of it resolve regardless of input order.
pub fn register_definitions(file: &SymbolsFile, table: &mut SymbolTable) -> Result<(), Error> {
    for def in &file.symbol_defs {
        table.define(&def.symbol_name, def.kind, DefinedBy::JsSymbolsFile)?;
    }
    Ok(())
}

/// `append_imports` (spec.md §4.4): emits, in order, requirement renaming
/// declarations, named requirement-member declarations, the symbol
/// imports' `let`, then their lateBind assignments.
#[allow(clippy::too_many_arguments)]
pub fn append_imports(
    stmts: &mut Vec<Stmt>,
    requirement_uses: &[RequirementUse],
    symbol_imports: &[SymbolImport],
    requirements: &mut RequirementsTable,
    symbols: &SymbolTable,
    mangler: &mut Mangler,
    late_bind_name: &str,
    symbols_object_name: &str,
) {
    // Pass 1: whole-module renaming declarations.
    for use_ in requirement_uses {
        let local_var = requirements
            .get_or_insert(&use_.module_specifier, mangler)
            .local_variable_name
            .clone();
        for import in &use_.imports {
            if let RequirementImport::WholeModule { local_alias } = import {
                if local_alias != &local_var {
                    stmts.push(Stmt::Const {
                        name: local_alias.clone(),
                        init: Expr::ident(local_var.clone()),
                    });
                }
            }
        }
    }

    // Pass 2: named member declarations.
    for use_ in requirement_uses {
        let local_var = requirements
            .get_or_insert(&use_.module_specifier, mangler)
            .local_variable_name
            .clone();
        for import in &use_.imports {
            if let RequirementImport::Named(spec) = import {
                requirements
                    .get_or_insert(&use_.module_specifier, mangler)
                    .imports
                    .push(spec.clone());
                stmts.push(Stmt::Const {
                    name: spec.local_binding_name.clone(),
                    init: Expr::member(Expr::ident(local_var.clone()), spec.effective_name().to_string()),
                });
            }
        }
    }

    // Pass 3: the symbol imports' uninitialised `let`.
    if !symbol_imports.is_empty() {
        stmts.push(Stmt::LetUninit {
            names: symbol_imports.iter().map(|s| s.binding.clone()).collect(),
        });
    }

    // Pass 4: lateBind assignments.
    for sym in symbol_imports {
        let is_callable = symbols.is_callable(&sym.symbol_name);
        let assignment = Expr::assign(
            Expr::ident(sym.binding.clone()),
            Expr::index(Expr::ident(symbols_object_name), Expr::Str(sym.symbol_name.clone())),
        );
        // Parenthesised per spec.md §4.4: an arrow whose body is a bare
        // assignment expression reads the same either way, but the spec's
        // own text wraps it and so do we.
        let binder = Expr::Arrow(vec![], Box::new(Expr::Paren(Box::new(assignment))));
        let call = Expr::call(
            Expr::ident(late_bind_name.to_string()),
            vec![binder, Expr::Raw(is_callable.to_string())],
        );
        stmts.push(Stmt::Expr(Expr::assign(Expr::ident(sym.binding.clone()), call)));
    }
}

/// `append_exports` (spec.md §4.4/§4.5): `<export_identifier>['<exported_name>'] = <source_ref>;`
/// for each export, in declaration order.
pub fn append_exports(stmts: &mut Vec<Stmt>, exports: &[ExportSpecifier], export_identifier: &str) {
    for export in exports {
        stmts.push(Stmt::Expr(Expr::assign(
            Expr::index(Expr::ident(export_identifier), Expr::Str(export.exported_name.clone())),
            source_ref_expr(export.source_ref()),
        )));
    }
}

/// Builds an expression for a (possibly dotted) source reference like
/// `"$.ajax"` as a proper member-access chain (`Expr::Member(Expr::Ident("$"),
/// "ajax")`) rather than one opaque identifier. This matters beyond
/// rendering: the scope analyzer (`ast.rs`) only treats `Expr::Ident` as a
/// free-variable occurrence, so a dotted reference built as one `Ident`
/// would report the whole dotted string as an undeclared global instead of
/// checking just its leading identifier.
fn source_ref_expr(source_ref: &str) -> Expr {
    let mut segments = source_ref.split('.');
    let root = segments.next().unwrap_or(source_ref);
    segments.fold(Expr::ident(root), |acc, field| Expr::member(acc, field))
}

fn body_stmt(body: &SourceFragment) -> Option<Stmt> {
    if body.text.trim().is_empty() {
        return None;
    }
    Some(Stmt::Raw {
        text: body.text.clone(),
        declares: Vec::new(),
        free: body.free_identifiers.clone(),
    })
}

impl SymbolsFile {
    /// Emits this file's whole contribution: imports, then its body.
    #[allow(clippy::too_many_arguments)]
    pub fn emit(
        &self,
        stmts: &mut Vec<Stmt>,
        requirements: &mut RequirementsTable,
        symbols: &SymbolTable,
        mangler: &mut Mangler,
        late_bind_name: &str,
        symbols_object_name: &str,
    ) {
        append_imports(
            stmts,
            &self.requirement_uses,
            &self.symbol_imports,
            requirements,
            symbols,
            mangler,
            late_bind_name,
            symbols_object_name,
        );
        if let Some(stmt) = body_stmt(&self.body) {
            stmts.push(stmt);
        }
    }
}

impl ExportsFile {
    /// Emits this file's whole contribution: imports, then its body,
    /// then its exports onto `__exports`.
    #[allow(clippy::too_many_arguments)]
    pub fn emit(
        &self,
        stmts: &mut Vec<Stmt>,
        requirements: &mut RequirementsTable,
        symbols: &SymbolTable,
        mangler: &mut Mangler,
        late_bind_name: &str,
        symbols_object_name: &str,
        exports_object_name: &str,
    ) {
        append_imports(
            stmts,
            &self.requirement_uses,
            &self.symbol_imports,
            requirements,
            symbols,
            mangler,
            late_bind_name,
            symbols_object_name,
        );
        if let Some(stmt) = body_stmt(&self.body) {
            stmts.push(stmt);
        }
        append_exports(stmts, &self.exports, exports_object_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn mangler() -> Mangler {
        Mangler::with_rng(ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn renamed_requirement_binding_emits_const() {
        let mut requirements = RequirementsTable::new();
        let mut mangler = mangler();
        let symbols = SymbolTable::new();
        let file = SymbolsFile {
            requirement_uses: vec![RequirementUse {
                module_specifier: "jQuery".to_string(),
                imports: vec![RequirementImport::WholeModule {
                    local_alias: "$".to_string(),
                }],
            }],
            ..Default::default()
        };
        let mut stmts = Vec::new();
        file.emit(&mut stmts, &mut requirements, &symbols, &mut mangler, "lateBind", "__symbols");

        let req_var = requirements.in_order()[0].local_variable_name.clone();
        let src = stmts[0].to_source();
        assert_eq!(src, format!("const $ = {};", req_var));
    }

    #[test]
    fn unrenamed_whole_module_binding_emits_nothing() {
        let mut requirements = RequirementsTable::new();
        let mut mangler = mangler();
        let symbols = SymbolTable::new();
        let req_var_preview = requirements.get_or_insert("jQuery", &mut mangler).local_variable_name.clone();

        let mut requirements2 = RequirementsTable::new();
        let mut mangler2 = mangler();
        let file = SymbolsFile {
            requirement_uses: vec![RequirementUse {
                module_specifier: "jQuery".to_string(),
                imports: vec![RequirementImport::WholeModule {
                    local_alias: req_var_preview.clone(),
                }],
            }],
            ..Default::default()
        };
        let mut stmts = Vec::new();
        file.emit(&mut stmts, &mut requirements2, &symbols, &mut mangler2, "lateBind", "__symbols");
        assert!(stmts.is_empty());
    }

    #[test]
    fn symbol_import_emits_let_then_latebind() {
        let mut requirements = RequirementsTable::new();
        let mut mangler = mangler();
        let mut symbols = SymbolTable::new();
        symbols
            .define("foo", SymbolKind::Function, DefinedBy::WasmExport)
            .unwrap();

        let file = SymbolsFile {
            symbol_imports: vec![SymbolImport {
                symbol_name: "foo".to_string(),
                binding: "foo".to_string(),
            }],
            ..Default::default()
        };
        let mut stmts = Vec::new();
        file.emit(&mut stmts, &mut requirements, &symbols, &mut mangler, "lateBind", "__symbols");

        assert_eq!(stmts[0].to_source(), "let foo;");
        assert_eq!(
            stmts[1].to_source(),
            "foo = lateBind(() => (foo = __symbols['foo']), true);"
        );
    }

    #[test]
    fn export_specifier_prefers_local_name() {
        let spec = ExportSpecifier {
            local_name: Some("$.ajax".to_string()),
            exported_name: "ajax".to_string(),
        };
        assert_eq!(spec.source_ref(), "$.ajax");
    }

    #[test]
    fn exports_file_emits_export_assignment() {
        let mut requirements = RequirementsTable::new();
        let mut mangler = mangler();
        let symbols = SymbolTable::new();
        let file = ExportsFile {
            exports: vec![ExportSpecifier {
                local_name: Some("$.ajax".to_string()),
                exported_name: "ajax".to_string(),
            }],
            ..Default::default()
        };
        let mut stmts = Vec::new();
        file.emit(&mut stmts, &mut requirements, &symbols, &mut mangler, "lateBind", "__symbols", "__exports");
        assert_eq!(stmts[0].to_source(), "__exports['ajax'] = $.ajax;");
    }
}
