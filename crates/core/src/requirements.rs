//! Process-wide registry of external JS modules the output depends on.
//!
//! Order is observable: it determines the positional argument order of the
//! UMD factory (spec.md §8 property 3), so insertion order is preserved
//! and never re-sorted.

use std::collections::HashMap;

use crate::mangle::Mangler;

/// `{exported_name, local_binding_name}` consumed from a requirement.
#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    pub exported_name: Option<String>,
    pub local_binding_name: String,
}

impl ImportSpecifier {
    /// The name transmitted to the source side: `exported_name` if
    /// present, else `local_binding_name`.
    pub fn effective_name(&self) -> &str {
        self.exported_name.as_deref().unwrap_or(&self.local_binding_name)
    }
}

#[derive(Debug, Clone)]
pub struct Requirement {
    pub module_specifier: String,
    pub local_variable_name: String,
    pub imports: Vec<ImportSpecifier>,
}

/// Keyed by `module_specifier`; exposes its contents in first-seen order.
#[derive(Debug, Default)]
pub struct RequirementsTable {
    order: Vec<String>,
    by_specifier: HashMap<String, Requirement>,
}

impl RequirementsTable {
    pub fn new() -> RequirementsTable {
        RequirementsTable::default()
    }

    /// Returns (creating if necessary) the `Requirement` for
    /// `module_specifier`, assigning it a freshly mangled local variable
    /// name the first time it's seen.
    pub fn get_or_insert(&mut self, module_specifier: &str, mangler: &mut Mangler) -> &mut Requirement {
        if !self.by_specifier.contains_key(module_specifier) {
            self.order.push(module_specifier.to_string());
            // `Mangler::mangle` memoises by its base-name argument, so each
            // distinct requirement needs a distinct base name here or every
            // requirement would collapse onto the same local variable.
            let local_variable_name = mangler.mangle(&format!("__req_{}", self.order.len()));
            self.by_specifier.insert(
                module_specifier.to_string(),
                Requirement {
                    module_specifier: module_specifier.to_string(),
                    local_variable_name,
                    imports: Vec::new(),
                },
            );
        }
        self.by_specifier.get_mut(module_specifier).unwrap()
    }

    /// All requirements in table (first-seen) order.
    pub fn in_order(&self) -> Vec<&Requirement> {
        self.order.iter().map(|spec| &self.by_specifier[spec]).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn preserves_first_seen_order() {
        let mut mangler = Mangler::with_rng(ChaCha8Rng::seed_from_u64(7));
        let mut table = RequirementsTable::new();
        table.get_or_insert("zeta", &mut mangler);
        table.get_or_insert("alpha", &mut mangler);
        table.get_or_insert("zeta", &mut mangler);

        let specs: Vec<_> = table
            .in_order()
            .into_iter()
            .map(|r| r.module_specifier.clone())
            .collect();
        assert_eq!(specs, vec!["zeta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn distinct_requirements_get_distinct_local_names() {
        let mut mangler = Mangler::with_rng(ChaCha8Rng::seed_from_u64(7));
        let mut table = RequirementsTable::new();
        let a = table.get_or_insert("jQuery", &mut mangler).local_variable_name.clone();
        let b = table.get_or_insert("lodash", &mut mangler).local_variable_name.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn effective_name_prefers_exported_name() {
        let renamed = ImportSpecifier {
            exported_name: Some("ajax".to_string()),
            local_binding_name: "doAjax".to_string(),
        };
        assert_eq!(renamed.effective_name(), "ajax");

        let plain = ImportSpecifier {
            exported_name: None,
            local_binding_name: "get".to_string(),
        };
        assert_eq!(plain.effective_name(), "get");
    }
}
