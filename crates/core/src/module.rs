//! Prelude module surface.
//!
//! A `ModuleMap` is how the host hands the language its prelude: modules
//! keyed by name, each mapping identifiers to a type scheme, a value, and
//! the content address the elaborator pins occurrences to. The LSP core
//! reads it for completion and the evaluator consumes the derived pinned
//! environment.

use crate::hash::VcHash;
use crate::types::TypeScheme;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// The pinned environment `P`: content address → value, resolving every
/// pinned reference in an elaborated script.
pub type PinnedEnv = HashMap<VcHash, Value>;

/// One exported prelude binding.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub scheme: TypeScheme,
    pub value: Value,
    pub hash: VcHash,
}

/// A named module: identifier → entry, iteration in name order.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub entries: BTreeMap<String, ModuleEntry>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, ident: &str) -> Option<&ModuleEntry> {
        self.entries.get(ident)
    }
}

/// The full prelude: module name → module, iteration in name order.
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    modules: BTreeMap<String, Module>,
}

impl ModuleMap {
    pub fn new() -> ModuleMap {
        ModuleMap::default()
    }

    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(|s| s.as_str())
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Every binding under its user-visible name: unqualified for the base
    /// module, `Module.name` otherwise.
    pub fn qualified_names(&self) -> Vec<(String, &ModuleEntry)> {
        let mut out = Vec::new();
        for module in self.modules.values() {
            for (ident, entry) in &module.entries {
                if module.name == BASE_MODULE {
                    out.push((ident.clone(), entry));
                } else {
                    out.push((format!("{}.{}", module.name, ident), entry));
                }
            }
        }
        out
    }

    /// The pinned environment every entry's hash resolves through.
    pub fn pinned_env(&self) -> PinnedEnv {
        let mut env = PinnedEnv::new();
        for module in self.modules.values() {
            for entry in module.entries.values() {
                env.insert(entry.hash, entry.value.clone());
            }
        }
        env
    }
}

/// Name of the module whose bindings are available unqualified.
pub const BASE_MODULE: &str = "Base";
