//! The UMD wrapper (spec.md §4.7): wraps the completed factory body in a
//! loader-detecting IIFE usable under AMD, CommonJS, or browser globals.
//!
//! Emitted as one `Stmt::Raw` (the whole thing is a single expression
//! statement per spec.md §6's file-format requirement), with the
//! factory's requirement names spliced in at the three call sites so the
//! AMD dependency list, the CommonJS `require` sequence, and the
//! browser-global reads all list the same N requirements in the same
//! order (spec.md §8 property 3).

use crate::ast::Stmt;
use crate::requirements::RequirementsTable;

pub struct UmdNames<'a> {
    pub root: &'a str,
    pub fetcher: &'a str,
    pub is_node: &'a str,
    pub current_script: &'a str,
}

/// Wraps `factory_body` (already-rendered source of the factory's
/// statements) in the UMD runner, given the module's declared name and
/// the requirements table in positional order.
pub fn wrap(factory_body: &str, module_name: &str, requirements: &RequirementsTable, names: &UmdNames) -> Stmt {
    let reqs = requirements.in_order();
    let specifiers: Vec<String> = reqs.iter().map(|r| format!("'{}'", r.module_specifier)).collect();
    let param_names: Vec<String> = reqs.iter().map(|r| r.local_variable_name.clone()).collect();

    let amd_deps = specifiers.join(", ");
    let cjs_requires = reqs
        .iter()
        .map(|r| format!("require('{}')", r.module_specifier))
        .collect::<Vec<_>>()
        .join(", ");
    let root_reads = reqs
        .iter()
        .map(|r| format!("{}['{}']", names.root, r.module_specifier))
        .collect::<Vec<_>>()
        .join(", ");

    let factory_params = {
        let mut v = vec![names.root.to_string(), names.fetcher.to_string()];
        v.extend(param_names.clone());
        v.join(", ")
    };

    let mut free = vec![
        "global".to_string(),
        "self".to_string(),
        "module".to_string(),
        "require".to_string(),
        "define".to_string(),
        "__dirname".to_string(),
        "Error".to_string(),
        "WebAssembly".to_string(),
        "Object".to_string(),
        "Array".to_string(),
    ];
    free.dedup();

    let text = format!(
        r#"(function (factory) {{
    "use strict";
    let {root}, {is_node} = false;
    if (typeof global === 'object' && global && Object.prototype.toString.call(global) === '[object global]') {{
        {root} = global;
        {is_node} = true;
    }} else if (typeof self === 'object' && self && typeof Object !== 'undefined' && typeof Array !== 'undefined') {{
        {root} = self;
    }} else {{
        throw new Error('Unable to detect global object');
    }}
    const define = {root}.define;
    const {current_script} = {is_node} ? __dirname : {root}.document.currentScript.src;
    const {fetcher} = {is_node}
        ? function (path) {{
            const join = require('path').join;
            const fs = require('fs');
            return Promise.resolve(fs.readFileSync(join({current_script}, '..', path)));
        }}
        : function (path) {{
            const url = new {root}.URL(path, {current_script});
            return {root}.fetch(url.toString());
        }};
    factory = factory.bind(null, {root}, {fetcher});
    if (typeof define === 'function' && define.amd) {{
        define('{module_name}', [{amd_deps}], factory);
    }} else if (typeof module === 'object' && module.exports) {{
        module['exports'] = factory({cjs_requires});
    }} else {{
        {root}['{module_name}'] = factory({root_reads});
    }}
}})(function ({factory_params}) {{
{factory_body}
}});"#,
        root = names.root,
        is_node = names.is_node,
        fetcher = names.fetcher,
        current_script = names.current_script,
        module_name = module_name,
        amd_deps = amd_deps,
        cjs_requires = cjs_requires,
        root_reads = root_reads,
        factory_params = factory_params,
        factory_body = factory_body,
    );

    Stmt::Raw {
        text,
        declares: Vec::new(),
        free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mangle::Mangler;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn positional_requirement_order_matches_everywhere() {
        let mut mangler = Mangler::with_rng(ChaCha8Rng::seed_from_u64(3));
        let mut table = RequirementsTable::new();
        table.get_or_insert("jQuery", &mut mangler);
        table.get_or_insert("lodash", &mut mangler);

        let names = UmdNames {
            root: "__root",
            fetcher: "__fetcher",
            is_node: "__isNode",
            current_script: "__currentScript",
        };
        let stmt = wrap("return {};", "out", &table, &names);
        let text = match &stmt {
            Stmt::Raw { text, .. } => text.clone(),
            _ => unreachable!(),
        };

        let jquery_idx_amd = text.find("['jQuery', 'lodash']").expect("amd deps in order");
        let req_idx = text
            .find("require('jQuery'), require('lodash')")
            .expect("cjs requires in order");
        let root_idx = text
            .find("__root['jQuery'], __root['lodash']")
            .expect("browser-global reads in order");
        assert!(jquery_idx_amd > 0 && req_idx > 0 && root_idx > 0);

        let params = table
            .in_order()
            .iter()
            .map(|r| r.local_variable_name.clone())
            .collect::<Vec<_>>()
            .join(", ");
        assert!(text.contains(&format!("function (__root, __fetcher, {})", params)));
    }
}
