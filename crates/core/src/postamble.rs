//! Wasm instantiation (spec.md §4.6): the factory's trailing `return`
//! statement, which streams-instantiates the wasm binary, wires wasm
//! exports back into `__symbols` (so symbols-file lateBind placeholders
//! resolve once instantiation settles), optionally calls
//! `__wasm_call_ctors`, and resolves to the frozen `__exports`.

use crate::ast::{Expr, Stmt};
use crate::mangle::Mangler;
use crate::requirements::RequirementsTable;
use crate::wasm_view::WasmView;

/// The fixed wasm import-module name whose imports are entirely
/// fulfilled by `__symbols`. Spec.md §9 leaves this as an open question
/// owned by the wasm-reader collaborator's contract; `js-ld-core` fixes
/// it to one constant rather than exposing it as a knob, since nothing
/// in spec.md asks the driver to vary it per link.
pub const SYMBOLS_MODULE: &str = "js_ld_symbols";

pub struct PostambleNames<'a> {
    pub exports_object: &'a str,
    pub symbols_object: &'a str,
    pub fetcher: &'a str,
}

fn memory_object_literal(limits: &crate::wasm_view::MemoryLimits) -> Expr {
    let mut fields = vec![("initial".to_string(), Expr::Raw(limits.min.to_string()))];
    if let Some(max) = limits.max {
        fields.push(("maximum".to_string(), Expr::Raw(max.to_string())));
    }
    Expr::Object(fields)
}

/// Builds the statements that must run *before* `instantiateStreaming`:
/// one `__symbols[name] = new WebAssembly.Memory({...})` per memory
/// definition (spec.md §8 property 4).
pub fn memory_preamble(view: &WasmView, names: &PostambleNames) -> Vec<Stmt> {
    view.memories
        .iter()
        .map(|mem| {
            Stmt::Expr(Expr::assign(
                Expr::index(Expr::ident(names.symbols_object), Expr::Str(mem.name.clone())),
                Expr::New(Box::new(Expr::call(
                    Expr::member(Expr::ident("WebAssembly"), "Memory"),
                    vec![memory_object_literal(&mem.limits)],
                ))),
            ))
        })
        .collect()
}

/// Builds the trailing `return instantiateStreaming(...).then(...)`
/// statement.
pub fn build(
    view: &WasmView,
    requirements: &mut RequirementsTable,
    mangler: &mut Mangler,
    wasm_filename: &str,
    names: &PostambleNames,
) -> Stmt {
    let mut import_object_fields = vec![(
        format!("'{}'", SYMBOLS_MODULE),
        Expr::ident(names.symbols_object),
    )];

    for module_name in view.imports_by_module.keys() {
        if module_name == SYMBOLS_MODULE {
            continue;
        }
        let local_var = requirements.get_or_insert(module_name, mangler).local_variable_name.clone();
        import_object_fields.push((format!("'{}'", module_name), Expr::ident(local_var)));
    }

    let instantiate_call = format!(
        "WebAssembly.instantiateStreaming({fetcher}('{wasm}'), {imports})",
        fetcher = names.fetcher,
        wasm = wasm_filename,
        imports = Expr::Object(import_object_fields).to_source(),
    );

    let wrap_export_and_wiring = build_export_wiring(view, names);

    let call_ctors = if view.needs_call_ctors {
        "    es['__wasm_call_ctors']();\n"
    } else {
        ""
    };

    let text = format!(
        r#"return (async () => {instantiate}.then(wasmInstance => {{
    const es = wasmInstance.instance.exports;
    let wasmEx;
    function wrapExport(name) {{
        const raw = es[name];
        return function (...args) {{
            if (wasmEx) {{
                throw new Error('WebAssembly previously threw: ' + wasmEx);
            }}
            try {{
                return raw.apply(null, args);
            }} catch (e) {{
                wasmEx = e;
                throw e;
            }}
        }};
    }}
{wiring}{call_ctors}    return Object.freeze({exports_object});
}}))();"#,
        instantiate = instantiate_call,
        wiring = wrap_export_and_wiring,
        call_ctors = call_ctors,
        exports_object = names.exports_object,
    );

    Stmt::Raw {
        text,
        declares: Vec::new(),
        free: vec!["WebAssembly".to_string(), "Object".to_string(), "Error".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mangle::Mangler;
    use crate::wasm_view::{MemoryDefinition, MemoryLimits};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn names() -> PostambleNames<'static> {
        PostambleNames {
            exports_object: "__exports",
            symbols_object: "__symbols",
            fetcher: "__fetcher",
        }
    }

    #[test]
    fn memory_without_max_has_one_key() {
        let mut view = WasmView::default();
        view.memories.push(MemoryDefinition {
            name: "memory".to_string(),
            limits: MemoryLimits { min: 1, max: None },
        });
        let stmts = memory_preamble(&view, &names());
        assert_eq!(
            stmts[0].to_source(),
            "__symbols['memory'] = new WebAssembly.Memory({initial: 1});"
        );
    }

    #[test]
    fn memory_with_max_has_both_keys() {
        let mut view = WasmView::default();
        view.memories.push(MemoryDefinition {
            name: "memory".to_string(),
            limits: MemoryLimits { min: 1, max: Some(4) },
        });
        let stmts = memory_preamble(&view, &names());
        assert_eq!(
            stmts[0].to_source(),
            "__symbols['memory'] = new WebAssembly.Memory({initial: 1, maximum: 4});"
        );
    }

    #[test]
    fn symbols_module_always_present_in_import_object() {
        let view = WasmView::default();
        let mut requirements = RequirementsTable::new();
        let mut mangler = Mangler::with_rng(ChaCha8Rng::seed_from_u64(9));
        let stmt = build(&view, &mut requirements, &mut mangler, "out_bg.wasm", &names());
        let text = match &stmt {
            Stmt::Raw { text, .. } => text,
            _ => unreachable!(),
        };
        assert!(text.contains(&format!("'{}': __symbols", SYMBOLS_MODULE)));
    }

    #[test]
    fn call_ctors_emitted_after_wiring_before_return() {
        let mut view = WasmView::default();
        view.needs_call_ctors = true;
        view.exports.push(crate::wasm_view::WasmExport {
            field: "__wasm_call_ctors".to_string(),
            kind: crate::symbol_table::SymbolKind::Function,
        });
        let mut requirements = RequirementsTable::new();
        let mut mangler = Mangler::with_rng(ChaCha8Rng::seed_from_u64(9));
        let stmt = build(&view, &mut requirements, &mut mangler, "out_bg.wasm", &names());
        let text = match &stmt {
            Stmt::Raw { text, .. } => text,
            _ => unreachable!(),
        };
        let ctors_idx = text.find("__wasm_call_ctors']();").unwrap();
        let freeze_idx = text.find("Object.freeze(__exports)").unwrap();
        assert!(ctors_idx < freeze_idx);
    }
}

fn build_export_wiring(view: &WasmView, names: &PostambleNames) -> String {
    use crate::symbol_table::SymbolKind;
    let mut out = String::new();
    for export in &view.exports {
        if export.field == "__wasm_call_ctors" {
            continue;
        }
        let rhs = match export.kind {
            SymbolKind::Function => format!("wrapExport('{name}')", name = export.field),
            SymbolKind::Value | SymbolKind::Memory => format!("es['{name}']", name = export.field),
        };
        out.push_str(&format!(
            "    {symbols}['{name}'] = {rhs};\n",
            symbols = names.symbols_object,
            name = export.field,
            rhs = rhs,
        ));
    }
    out
}
