//! A deliberately small JS expression/statement representation, used only
//! to build *our own* generated script and print it back to source.
//!
//! This stands in for the "JS-AST construction facility" and "AST
//! printer" that spec.md §1 names as external collaborators. Parsing
//! *other* people's JavaScript (the symbols/exports file bodies) is still
//! out of scope: those bodies are carried as opaque source text plus a
//! pre-computed free-identifier set (see `files::SourceFragment`), not
//! parsed here. This module only needs to express what the generator
//! itself constructs, so it covers declarations, member/call expressions,
//! object literals, and a `Raw` escape hatch for verbatim boilerplate
//! (the late-binder runtime, the UMD wrapper skeleton) whose free/bound
//! identifiers we annotate by hand since we wrote the text ourselves.

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(String),
    Str(String),
    Raw(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Assign(Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
    /// `new <inner>`, e.g. `new WebAssembly.Memory({...})`.
    New(Box<Expr>),
    Object(Vec<(String, Expr)>),
    Arrow(Vec<String>, Box<Expr>),
    /// A verbatim chunk of already-rendered source text, used for
    /// sub-expressions assembled by a template (e.g. `new
    /// WebAssembly.Memory({...})`). Declares/references are supplied by
    /// the caller rather than derived structurally.
    Template { text: String, free: Vec<String> },
}

impl Expr {
    pub fn ident<S: Into<String>>(s: S) -> Expr {
        Expr::Ident(s.into())
    }

    pub fn member<S: Into<String>>(obj: Expr, field: S) -> Expr {
        Expr::Member(Box::new(obj), field.into())
    }

    pub fn index(obj: Expr, key: Expr) -> Expr {
        Expr::Index(Box::new(obj), Box::new(key))
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(Box::new(callee), args)
    }

    pub fn assign(target: Expr, value: Expr) -> Expr {
        Expr::Assign(Box::new(target), Box::new(value))
    }

    fn collect_free(&self, bound: &BTreeSet<String>, out: &mut BTreeSet<String>) {
        match self {
            Expr::Ident(name) => {
                if !bound.contains(name) {
                    out.insert(name.clone());
                }
            }
            Expr::Str(_) => {}
            Expr::Raw(_) => {}
            Expr::Member(obj, _) => obj.collect_free(bound, out),
            Expr::Index(obj, key) => {
                obj.collect_free(bound, out);
                key.collect_free(bound, out);
            }
            Expr::Call(callee, args) => {
                callee.collect_free(bound, out);
                for a in args {
                    a.collect_free(bound, out);
                }
            }
            Expr::Assign(target, value) => {
                target.collect_free(bound, out);
                value.collect_free(bound, out);
            }
            Expr::Paren(inner) => inner.collect_free(bound, out),
            Expr::New(inner) => inner.collect_free(bound, out),
            Expr::Object(fields) => {
                for (_, v) in fields {
                    v.collect_free(bound, out);
                }
            }
            Expr::Arrow(params, body) => {
                let mut inner = bound.clone();
                inner.extend(params.iter().cloned());
                body.collect_free(&inner, out);
            }
            Expr::Template { free, .. } => {
                for name in free {
                    if !bound.contains(name) {
                        out.insert(name.clone());
                    }
                }
            }
        }
    }

    pub fn to_source(&self) -> String {
        match self {
            Expr::Ident(name) => name.clone(),
            Expr::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Expr::Raw(text) => text.clone(),
            Expr::Member(obj, field) => format!("{}.{}", obj.to_source(), field),
            Expr::Index(obj, key) => format!("{}[{}]", obj.to_source(), key.to_source()),
            Expr::Call(callee, args) => format!(
                "{}({})",
                callee.to_source(),
                args.iter().map(Expr::to_source).collect::<Vec<_>>().join(", ")
            ),
            Expr::Assign(target, value) => format!("{} = {}", target.to_source(), value.to_source()),
            Expr::Paren(inner) => format!("({})", inner.to_source()),
            Expr::New(inner) => format!("new {}", inner.to_source()),
            Expr::Object(fields) => {
                let body = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_source()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", body)
            }
            Expr::Arrow(params, body) => format!("({}) => {}", params.join(", "), body.to_source()),
            Expr::Template { text, .. } => text.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `const <name> = <init>;`
    Const { name: String, init: Expr },
    /// `let <names[0]>, <names[1]>, ...;` — uninitialised.
    LetUninit { names: Vec<String> },
    /// A bare expression statement: `<expr>;`
    Expr(Expr),
    /// A verbatim block of source text (the late-binder runtime, the
    /// `wrapExport` helper, ...), with manually declared bound names
    /// (identifiers it introduces into the surrounding scope) and free
    /// names (identifiers it references that must resolve to an extern
    /// or an outer binding).
    Raw {
        text: String,
        declares: Vec<String>,
        free: Vec<String>,
    },
    /// `return <expr>;`
    Return(Expr),
}

impl Stmt {
    pub fn declares(&self) -> Vec<String> {
        match self {
            Stmt::Const { name, .. } => vec![name.clone()],
            Stmt::LetUninit { names } => names.clone(),
            Stmt::Raw { declares, .. } => declares.clone(),
            Stmt::Expr(_) | Stmt::Return(_) => Vec::new(),
        }
    }

    fn collect_free(&self, bound: &BTreeSet<String>, out: &mut BTreeSet<String>) {
        match self {
            Stmt::Const { init, .. } => init.collect_free(bound, out),
            Stmt::LetUninit { .. } => {}
            Stmt::Expr(e) => e.collect_free(bound, out),
            Stmt::Return(e) => e.collect_free(bound, out),
            Stmt::Raw { free, .. } => {
                for name in free {
                    if !bound.contains(name) {
                        out.insert(name.clone());
                    }
                }
            }
        }
    }

    pub fn to_source(&self) -> String {
        match self {
            Stmt::Const { name, init } => format!("const {} = {};", name, init.to_source()),
            Stmt::LetUninit { names } => format!("let {};", names.join(", ")),
            Stmt::Expr(e) => format!("{};", e.to_source()),
            Stmt::Return(e) => format!("return {};", e.to_source()),
            Stmt::Raw { text, .. } => text.clone(),
        }
    }
}

/// An ordered top-level statement sequence — the "Script (under
/// construction)" of spec.md §3. Top-level `var`/`function`-style
/// declarations are treated as sequentially visible to every later
/// statement, matching JS's own top-level hoisting/TDZ behaviour closely
/// enough for a single flat factory body (no nested blocks shadow these
/// names anywhere in the generated output).
#[derive(Debug, Default, Clone)]
pub struct Script {
    pub stmts: Vec<Stmt>,
}

impl Script {
    pub fn new() -> Script {
        Script::default()
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    pub fn extend(&mut self, stmts: impl IntoIterator<Item = Stmt>) {
        self.stmts.extend(stmts);
    }

    /// Every identifier referenced free of any top-level declaration in
    /// this script, given a pre-bound set of externs/parameters that are
    /// legally in scope from outside (e.g. the factory's own parameters).
    pub fn free_identifiers(&self, outer_bound: &BTreeSet<String>) -> BTreeSet<String> {
        let mut bound = outer_bound.clone();
        for stmt in &self.stmts {
            bound.extend(stmt.declares());
        }
        let mut out = BTreeSet::new();
        for stmt in &self.stmts {
            stmt.collect_free(&bound, &mut out);
        }
        out
    }

    pub fn to_source(&self) -> String {
        self.stmts.iter().map(Stmt::to_source).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_identifiers_excludes_top_level_declarations() {
        let mut script = Script::new();
        script.push(Stmt::Const {
            name: "__exports".to_string(),
            init: Expr::Object(vec![]),
        });
        script.push(Stmt::Expr(Expr::assign(
            Expr::index(Expr::ident("__exports"), Expr::Str("ajax".to_string())),
            Expr::member(Expr::ident("$"), "ajax"),
        )));

        let free = script.free_identifiers(&BTreeSet::new());
        assert!(free.contains("$"));
        assert!(!free.contains("__exports"));
    }

    #[test]
    fn raw_node_contributes_its_declared_free_names_only() {
        let mut script = Script::new();
        script.push(Stmt::Raw {
            text: "function lateBind_abc(binder, isCallable) { return new Proxy({}, {}); }".to_string(),
            declares: vec!["lateBind_abc".to_string()],
            free: vec!["Proxy".to_string()],
        });
        script.push(Stmt::Expr(Expr::call(Expr::ident("lateBind_abc"), vec![])));

        let free = script.free_identifiers(&BTreeSet::new());
        assert_eq!(free, BTreeSet::from(["Proxy".to_string()]));
    }
}
