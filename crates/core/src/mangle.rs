//! Identifier conventions: stable public names vs. per-build mangled ones.

use std::collections::HashMap;

use rand::RngCore;

/// Draws fresh mangled identifiers for one generator run. Every mangled
/// name is drawn once, at first request, and cached — every later request
/// for the same base name returns the identical string for the lifetime of
/// this `Mangler`. Two separate `Mangler`s differ with overwhelming
/// probability.
pub struct Mangler {
    rng: Box<dyn RngCore>,
    cache: HashMap<String, String>,
}

impl Mangler {
    pub fn new() -> Mangler {
        Mangler {
            rng: Box::new(rand::rngs::OsRng),
            cache: HashMap::new(),
        }
    }

    /// For tests: inject a deterministic RNG so suffix stability can be
    /// asserted without flaking.
    pub fn with_rng<R: RngCore + 'static>(rng: R) -> Mangler {
        Mangler {
            rng: Box::new(rng),
            cache: HashMap::new(),
        }
    }

    /// `mangle(s) -> s + "_" + hex48(secure_random)`. Used for every
    /// internal identifier that might otherwise collide with user code.
    /// Stable within one `Mangler`: the same `s` always yields the same
    /// mangled string for the rest of this run.
    pub fn mangle(&mut self, s: &str) -> String {
        if let Some(existing) = self.cache.get(s) {
            return existing.clone();
        }
        let mangled = format!("{}_{:012x}", s, Self::next_u48(&mut self.rng));
        self.cache.insert(s.to_string(), mangled.clone());
        mangled
    }

    /// `stable(s) -> s`, used only for names that are part of the public
    /// contract with user modules (`__root`, `__exports`).
    pub fn stable(&self, s: &str) -> String {
        s.to_string()
    }

    fn next_u48(rng: &mut dyn RngCore) -> u64 {
        rng.next_u64() & 0x0000_ffff_ffff_ffff
    }
}

impl Default for Mangler {
    fn default() -> Mangler {
        Mangler::new()
    }
}
