use std::io;

/// The taxonomy of link-time failures. Every one is fatal: the generator
/// raises exactly one of these and stops, leaving reporting/formatting to
/// the driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unbound variables:\n{}", .0.join("\n"))]
    UnboundVariable(Vec<String>),

    #[error("unresolved symbol: `{0}` is imported but never defined")]
    UnresolvedSymbol(String),

    #[error("duplicate symbol: `{0}` is defined more than once")]
    DuplicateSymbol(String),

    #[error("wasm shape error: {0}")]
    WasmShape(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
