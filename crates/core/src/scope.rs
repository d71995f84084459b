//! The generator's only post-hoc safety check: after the full script is
//! built, enumerate every free identifier and reject the build if any is
//! outside the externs allowlist.

use std::collections::BTreeSet;

use crate::ast::Script;
use crate::error::Error;

/// Identifiers legally allowed to appear free in the generated script,
/// regardless of user-declared externs: the runtime dependency surface
/// named in spec.md §6.
pub fn builtin_externs() -> BTreeSet<String> {
    [
        "WebAssembly",
        "Reflect",
        "Proxy",
        "Object",
        "Promise",
        "Error",
        "global",
        "self",
        "module",
        "exports",
        "require",
        "define",
        "__dirname",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Walks `script` and fails with `Error::UnboundVariable` listing every
/// offending name (one per line, per spec.md §7) if any free identifier
/// falls outside `externs`. `pre_bound` names outer bindings that are
/// legitimately in scope even though they aren't declared anywhere in
/// `script` itself — e.g. the factory's own parameters, which are bound
/// by the UMD wrapper's function signature around the script.
pub fn verify_with_bound(script: &Script, externs: &BTreeSet<String>, pre_bound: &BTreeSet<String>) -> Result<(), Error> {
    let free = script.free_identifiers(pre_bound);
    let mut offenders: Vec<String> = free.difference(externs).cloned().collect();
    if offenders.is_empty() {
        return Ok(());
    }
    offenders.sort();
    Err(Error::UnboundVariable(offenders))
}

/// `verify_with_bound` with no extra pre-bound names.
pub fn verify(script: &Script, externs: &BTreeSet<String>) -> Result<(), Error> {
    verify_with_bound(script, externs, &BTreeSet::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};

    #[test]
    fn accepts_script_referencing_only_externs() {
        let mut script = Script::new();
        script.push(Stmt::Expr(Expr::call(
            Expr::member(Expr::ident("WebAssembly"), "instantiate"),
            vec![],
        )));
        let mut externs = builtin_externs();
        externs.insert("WebAssembly".to_string());
        assert!(verify(&script, &externs).is_ok());
    }

    #[test]
    fn rejects_leaked_global() {
        let mut script = Script::new();
        script.push(Stmt::Expr(Expr::member(Expr::ident("window"), "foo")));
        let err = verify(&script, &builtin_externs()).unwrap_err();
        match err {
            Error::UnboundVariable(names) => assert_eq!(names, vec!["window".to_string()]),
            other => panic!("expected UnboundVariable, got {other:?}"),
        }
    }
}
