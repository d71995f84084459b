//! Structural view over an input wasm binary: imports grouped by module
//! name, exports, memory definitions, and the `__wasm_call_ctors` flag.
//!
//! This is the "Wasm reader" collaborator named in spec.md §1 as
//! out-of-scope for the generator's hard engineering, but a concrete
//! implementation is needed to drive the generator end-to-end, so it's
//! built here on `parity-wasm` the same way the teacher's `cli-support`
//! crate reads wasm (`parity_wasm::elements::*`).

use std::collections::BTreeMap;

use parity_wasm::elements::{External, Internal, Module};

use crate::error::Error;
use crate::symbol_table::SymbolKind;

/// A single import, as read off the wasm binary's import section.
#[derive(Debug, Clone)]
pub struct WasmImport {
    pub field: String,
    pub kind: SymbolKind,
}

/// A single export, as read off the wasm binary's export section.
#[derive(Debug, Clone)]
pub struct WasmExport {
    pub field: String,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    pub min: u32,
    pub max: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MemoryDefinition {
    pub name: String,
    pub limits: MemoryLimits,
}

/// Structural view of the input wasm module.
#[derive(Debug, Default)]
pub struct WasmView {
    /// Imports grouped by module name, in declaration order within each
    /// group.
    pub imports_by_module: BTreeMap<String, Vec<WasmImport>>,
    pub exports: Vec<WasmExport>,
    pub memories: Vec<MemoryDefinition>,
    pub needs_call_ctors: bool,
}

impl WasmView {
    /// Reads a `WasmView` out of a parsed wasm module. `symbols_module` is
    /// the fixed import-module name that the symbols object (`__symbols`)
    /// fulfils; imports under any other module name are left for the
    /// driver/UMD layer to satisfy from requirement objects.
    pub fn from_module(module: &Module, symbols_module: &str) -> Result<WasmView, Error> {
        let mut view = WasmView::default();

        if let Some(section) = module.import_section() {
            for entry in section.entries() {
                let kind = match entry.external() {
                    External::Function(_) => SymbolKind::Function,
                    External::Global(_) => SymbolKind::Value,
                    External::Memory(_) => SymbolKind::Memory,
                    External::Table(_) => {
                        return Err(Error::WasmShape(format!(
                            "table imports are not supported (import `{}`.`{}`)",
                            entry.module(),
                            entry.field()
                        )))
                    }
                };
                view.imports_by_module
                    .entry(entry.module().to_string())
                    .or_default()
                    .push(WasmImport {
                        field: entry.field().to_string(),
                        kind,
                    });
            }
        }

        if let Some(section) = module.export_section() {
            for entry in section.entries() {
                let kind = match entry.internal() {
                    Internal::Function(_) => SymbolKind::Function,
                    Internal::Global(_) => SymbolKind::Value,
                    Internal::Memory(_) => SymbolKind::Memory,
                    Internal::Table(_) => continue,
                };
                if entry.field() == "__wasm_call_ctors" {
                    view.needs_call_ctors = true;
                }
                view.exports.push(WasmExport {
                    field: entry.field().to_string(),
                    kind,
                });
            }
        }

        // Memories declared *by* the wasm module (as opposed to imported)
        // are not host-supplied, so they aren't reflected as
        // `MemoryDefinition`s here: spec.md §4.3/§6 only asks the host to
        // pre-populate `__symbols` for memories the wasm module *imports*
        // under the symbols module name.
        if let Some(section) = module.import_section() {
            for entry in section.entries() {
                if entry.module() != symbols_module {
                    continue;
                }
                if let External::Memory(mem_ty) = entry.external() {
                    let limits = mem_ty.limits();
                    view.memories.push(MemoryDefinition {
                        name: entry.field().to_string(),
                        limits: MemoryLimits {
                            min: limits.initial(),
                            max: limits.maximum(),
                        },
                    });
                }
            }
        }

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(min: u32, max: Option<u32>) -> MemoryLimits {
        MemoryLimits { min, max }
    }

    #[test]
    fn memory_without_max_has_no_maximum_key_represented() {
        let l = limits(1, None);
        assert_eq!(l.min, 1);
        assert!(l.max.is_none());
    }

    #[test]
    fn memory_with_max_keeps_both() {
        let l = limits(1, Some(4));
        assert_eq!(l.min, 1);
        assert_eq!(l.max, Some(4));
    }
}
