//! Process-wide (per-link) registry of every named symbol that crosses the
//! JS/wasm boundary.

use std::collections::HashMap;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Value,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinedBy {
    JsSymbolsFile,
    WasmExport,
    MemoryDefinition,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub defined_by: DefinedBy,
}

/// Registry of every symbol definition seen so far, and every import of a
/// symbol, across all input files and the wasm module. Unresolved or
/// doubly-defined symbols are link-time fatal errors.
#[derive(Debug, Default)]
pub struct SymbolTable {
    defined: HashMap<String, Symbol>,
    imported: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Registers a definition. Returns `DuplicateSymbol` if `name` was
    /// already defined by a previous call.
    pub fn define(&mut self, name: &str, kind: SymbolKind, defined_by: DefinedBy) -> Result<(), Error> {
        if self.defined.contains_key(name) {
            return Err(Error::DuplicateSymbol(name.to_string()));
        }
        self.defined.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                kind,
                defined_by,
            },
        );
        Ok(())
    }

    /// Records that some file imports `name`. Resolution is checked later
    /// by `finish`, since a symbol may be defined by a file processed after
    /// the one that imports it.
    pub fn note_import(&mut self, name: &str) {
        self.imported.push(name.to_string());
    }

    /// The kind of `name` if known. Per spec.md §4.4, an import whose
    /// symbol is *unknown* at generation time is still treated as
    /// callable — only a known non-function kind suppresses `isCallable`.
    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        self.defined.get(name).map(|s| s.kind)
    }

    /// `true` if `name`'s kind is unknown or `Function` — the `isCallable`
    /// flag passed to the late-binder runtime.
    pub fn is_callable(&self, name: &str) -> bool {
        match self.kind_of(name) {
            None | Some(SymbolKind::Function) => true,
            Some(SymbolKind::Value) | Some(SymbolKind::Memory) => false,
        }
    }

    /// Checks every noted import resolves to a definition. Call once all
    /// files and the wasm view have registered their definitions.
    pub fn finish(&self) -> Result<(), Error> {
        for name in &self.imported {
            if !self.defined.contains_key(name) {
                return Err(Error::UnresolvedSymbol(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_definition_is_fatal() {
        let mut t = SymbolTable::new();
        t.define("foo", SymbolKind::Function, DefinedBy::WasmExport).unwrap();
        let err = t
            .define("foo", SymbolKind::Function, DefinedBy::JsSymbolsFile)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSymbol(ref n) if n == "foo"));
    }

    #[test]
    fn unresolved_import_is_fatal() {
        let mut t = SymbolTable::new();
        t.note_import("bar");
        let err = t.finish().unwrap_err();
        assert!(matches!(err, Error::UnresolvedSymbol(ref n) if n == "bar"));
    }

    #[test]
    fn unknown_symbol_is_treated_as_callable() {
        let t = SymbolTable::new();
        assert!(t.is_callable("never_defined"));
    }

    #[test]
    fn value_symbol_is_not_callable() {
        let mut t = SymbolTable::new();
        t.define("memory", SymbolKind::Memory, DefinedBy::MemoryDefinition).unwrap();
        assert!(!t.is_callable("memory"));
    }
}
