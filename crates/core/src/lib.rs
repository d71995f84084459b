//! `js-ld-core`: the module generator at the heart of `js-ld`.
//!
//! Resolves cross-module symbol references between JavaScript and
//! WebAssembly in the presence of mutual circular imports, synthesises a
//! JS program that performs late binding of those symbols via reflective
//! proxies, verifies by static scope analysis that no undeclared global
//! escapes, and emits a UMD wrapper whose factory parameters match the
//! declared external module requirements.
//!
//! This crate is the generator only: parsing CLI arguments, reading
//! files, parsing JS fragments, and parsing the wasm binary's raw bytes
//! into a [`WasmView`] are driven by `js-ld` (the `crates/cli` package)
//! except for the wasm byte-level read itself, which lives in
//! [`wasm_view`] since `parity-wasm` already covers it cheaply.

mod ast;
mod error;
mod files;
mod generator;
mod mangle;
mod postamble;
mod requirements;
mod runtime;
mod scope;
mod symbol_table;
mod umd;
mod wasm_view;

pub use error::Error;
pub use files::{
    ExportSpecifier, ExportsFile, RequirementImport, RequirementUse, SourceFragment, SymbolDef, SymbolImport,
    SymbolsFile,
};
pub use generator::{GeneratorInput, ModuleGenerator};
pub use requirements::ImportSpecifier;
pub use scope::builtin_externs;
pub use symbol_table::SymbolKind;
pub use wasm_view::{MemoryDefinition, MemoryLimits, WasmExport, WasmImport, WasmView};

pub use postamble::SYMBOLS_MODULE;
