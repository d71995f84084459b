//! The module generator (spec.md §2 component 5, §4): orchestrates the
//! six-phase emission — preamble, symbol-file bodies, export-file
//! bodies, postamble, UMD wrapper, scope verification.

use std::collections::BTreeSet;

use crate::ast::{Expr, Script, Stmt};
use crate::error::Error;
use crate::files::{register_definitions, ExportsFile, SymbolsFile};
use crate::mangle::Mangler;
use crate::postamble::{self, PostambleNames};
use crate::requirements::RequirementsTable;
use crate::runtime;
use crate::scope;
use crate::symbol_table::{DefinedBy, SymbolKind, SymbolTable};
use crate::umd::{self, UmdNames};
use crate::wasm_view::WasmView;

/// Everything the generator needs for one link: the structured,
/// already-parsed view of the wasm module and of every symbols/exports
/// file, plus the externs allowlist and naming knobs.
pub struct GeneratorInput {
    pub wasm: WasmView,
    pub wasm_filename: String,
    pub symbols_files: Vec<SymbolsFile>,
    pub exports_files: Vec<ExportsFile>,
    pub externs: BTreeSet<String>,
    pub module_name: String,
}

/// Drives one link from structured input to a finished UMD script. A
/// thin builder, mirroring the teacher's `Bindgen` struct: construct with
/// `new`, tweak with setters, call `generate` once.
pub struct ModuleGenerator {
    mangler: Mangler,
}

impl ModuleGenerator {
    pub fn new() -> ModuleGenerator {
        ModuleGenerator { mangler: Mangler::new() }
    }

    /// For tests: inject a deterministic mangler.
    pub fn with_mangler(mangler: Mangler) -> ModuleGenerator {
        ModuleGenerator { mangler }
    }

    pub fn generate(&mut self, input: GeneratorInput) -> Result<String, Error> {
        let GeneratorInput {
            wasm,
            wasm_filename,
            symbols_files,
            exports_files,
            externs,
            module_name,
        } = input;

        let exports_object = self.mangler.stable("__exports");
        // `__symbols` is a mangled internal name per spec.md §4.1/§4.3 (only
        // `__root`/`__exports` are the two never-mangled public names), so
        // it is drawn from the same per-build random suffix pool as
        // `lateBind`/`__fetcher`/etc. and threaded through emission below.
        let symbols_object = self.mangler.mangle("__symbols");
        let late_bind_name = self.mangler.mangle("lateBind");
        let root_name = self.mangler.mangle("__root");
        let fetcher_name = self.mangler.mangle("__fetcher");
        let is_node_name = self.mangler.mangle("__isNode");
        let current_script_name = self.mangler.mangle("__currentScript");

        let mut symbol_table = SymbolTable::new();
        let mut requirements = RequirementsTable::new();

        // Phase 0 (ahead of emission): register every definition so
        // resolution doesn't depend on input order.
        for file in &symbols_files {
            register_definitions(file, &mut symbol_table)?;
        }
        for export in &wasm.exports {
            if export.field == "__wasm_call_ctors" {
                continue;
            }
            symbol_table.define(&export.field, export.kind, DefinedBy::WasmExport)?;
        }
        for mem in &wasm.memories {
            symbol_table.define(&mem.name, SymbolKind::Memory, DefinedBy::MemoryDefinition)?;
        }
        for file in &symbols_files {
            for sym in &file.symbol_imports {
                symbol_table.note_import(&sym.symbol_name);
            }
        }
        for file in &exports_files {
            for sym in &file.symbol_imports {
                symbol_table.note_import(&sym.symbol_name);
            }
        }
        symbol_table.finish()?;
        log::debug!(
            "symbol table resolved: {} symbols files, {} exports files, {} wasm exports, {} memories",
            symbols_files.len(),
            exports_files.len(),
            wasm.exports.len(),
            wasm.memories.len()
        );

        let mut factory_body_script = Script::new();

        // Phase 1: preamble.
        factory_body_script.push(runtime::late_bind_stmt(&late_bind_name));
        factory_body_script.push(Stmt::Const {
            name: exports_object.clone(),
            init: Expr::Object(vec![]),
        });
        factory_body_script.push(Stmt::Const {
            name: symbols_object.clone(),
            init: Expr::Object(vec![]),
        });

        // Phase 1b: memory pre-population, before any instantiation work
        // (spec.md §8 property 4). Placed in the preamble since it must
        // lexically precede `instantiateStreaming`.
        let postamble_names = PostambleNames {
            exports_object: &exports_object,
            symbols_object: &symbols_object,
            fetcher: &fetcher_name,
        };
        factory_body_script.extend(postamble::memory_preamble(&wasm, &postamble_names));

        // Phase 2: symbols-file bodies, in input order.
        for file in &symbols_files {
            let mut stmts = Vec::new();
            file.emit(
                &mut stmts,
                &mut requirements,
                &symbol_table,
                &mut self.mangler,
                &late_bind_name,
                &symbols_object,
            );
            factory_body_script.extend(stmts);
        }

        // Phase 3: exports-file bodies, in input order.
        for file in &exports_files {
            let mut stmts = Vec::new();
            file.emit(
                &mut stmts,
                &mut requirements,
                &symbol_table,
                &mut self.mangler,
                &late_bind_name,
                &symbols_object,
                &exports_object,
            );
            factory_body_script.extend(stmts);
        }

        // Phase 4: postamble (wasm instantiation). May register further
        // requirements for non-symbols wasm import modules.
        let postamble_stmt = postamble::build(&wasm, &mut requirements, &mut self.mangler, &wasm_filename, &postamble_names);
        factory_body_script.push(postamble_stmt);

        // Phase 5/6: the factory's own parameters (__root, __fetcher, one
        // per requirement) are legally bound inside it — scope
        // verification treats them as pre-bound, not free.

        // Phase 6: scope verification, over the factory body *before* it
        // is flattened into the UMD wrapper's verbatim text — this is
        // where free-variable tracking is structural and exact (spec.md
        // §8 property 1). The UMD boilerplate itself is hand-written
        // verbatim text whose only free names are the fixed runtime
        // surface declared alongside it in `umd::wrap`.
        let mut full_externs = scope::builtin_externs();
        full_externs.extend(externs);
        let factory_params: BTreeSet<String> = [root_name.clone(), fetcher_name.clone()]
            .into_iter()
            .chain(requirements.in_order().iter().map(|r| r.local_variable_name.clone()))
            .collect();
        scope::verify_with_bound(&factory_body_script, &full_externs, &factory_params)?;
        log::debug!(
            "scope check passed with {} requirements in positional order",
            requirements.in_order().len()
        );

        let umd_names = UmdNames {
            root: &root_name,
            fetcher: &fetcher_name,
            is_node: &is_node_name,
            current_script: &current_script_name,
        };
        let umd_stmt = umd::wrap(&factory_body_script.to_source(), &module_name, &requirements, &umd_names);

        let mut final_script = Script::new();
        final_script.push(umd_stmt);

        Ok(format!("\"use strict\";\n{}\n", final_script.to_source()))
    }
}

impl Default for ModuleGenerator {
    fn default() -> ModuleGenerator {
        ModuleGenerator::new()
    }
}
