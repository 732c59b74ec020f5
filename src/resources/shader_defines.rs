//! Shader Define System
//!
//! A define set is the list of preprocessor toggles compiled into one shader
//! variant. Keys and values are interned [`Symbol`]s so that in-process
//! comparison and hashing never touch string data.
//!
//! # Two notions of identity
//!
//! - [`ShaderDefines::compute_hash`] / `Eq` are fast and order-independent
//!   *within one process*: entries are kept sorted by symbol id.
//! - [`ShaderDefines::canonical_text`] sorts by the define *name* and is
//!   stable across processes; it is what variant keys are built from.
//!
//! ```rust,ignore
//! use layer_material::resources::ShaderDefines;
//!
//! let mut defines = ShaderDefines::new();
//! defines.set("DIFFUSE", "1");
//! defines.set("NUM_BONE_INFLUENCERS", "4");
//!
//! assert_eq!(defines.canonical_text(), "DIFFUSE=1;NUM_BONE_INFLUENCERS=4");
//! ```

use std::hash::{Hash, Hasher};

use crate::utils::interner::{self, Symbol};

/// A collection of shader define entries, kept sorted by symbol.
#[derive(Debug, Clone, Default)]
pub struct ShaderDefines {
    defines: Vec<(Symbol, Symbol)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            defines: Vec::with_capacity(capacity),
        }
    }

    /// Set a define, replacing any existing value.
    pub fn set(&mut self, key: &str, value: &str) {
        let key_sym = interner::intern(key);
        let value_sym = interner::intern(value);
        self.set_symbol(key_sym, value_sym);
    }

    /// Set a boolean define. `false` removes the entry so that disabled
    /// features never appear in the define block.
    pub fn set_flag(&mut self, key: &str, enabled: bool) {
        if enabled {
            self.set(key, "1");
        } else {
            self.remove(key);
        }
    }

    /// Set an integer define. Integer defines are always present.
    pub fn set_int(&mut self, key: &str, value: u32) {
        self.set(key, &value.to_string());
    }

    #[inline]
    pub fn set_symbol(&mut self, key: Symbol, value: Symbol) {
        match self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => {
                self.defines[idx].1 = value;
            }
            Err(idx) => {
                self.defines.insert(idx, (key, value));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        interner::get(key).is_some_and(|key_sym| self.remove_symbol(key_sym))
    }

    #[inline]
    pub fn remove_symbol(&mut self, key: Symbol) -> bool {
        if let Ok(idx) = self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            self.defines.remove(idx);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        interner::get(key).is_some_and(|key_sym| {
            self.defines
                .binary_search_by_key(&key_sym, |&(k, _)| k)
                .is_ok()
        })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        let key_sym = interner::get(key)?;
        self.defines
            .binary_search_by_key(&key_sym, |&(k, _)| k)
            .ok()
            .map(|idx| interner::resolve(self.defines[idx].1))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Iterate entries in symbol order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &(Symbol, Symbol)> {
        self.defines.iter()
    }

    /// Entries as strings, sorted by define name.
    #[must_use]
    pub fn canonical_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs: Vec<_> = self
            .defines
            .iter()
            .map(|&(k, v)| (interner::resolve(k), interner::resolve(v)))
            .collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
        pairs
    }

    /// `NAME=value` pairs sorted by name and joined with `;`.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        self.canonical_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Preprocessor block handed to the shader compiler, one `#define` per
    /// line in canonical order.
    #[must_use]
    pub fn define_block(&self) -> String {
        let mut block = String::new();
        for (k, v) in self.canonical_pairs() {
            block.push_str("#define ");
            block.push_str(k);
            block.push(' ');
            block.push_str(v);
            block.push('\n');
        }
        block
    }

    /// In-process content hash.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        use std::hash::BuildHasher;

        rustc_hash::FxBuildHasher.hash_one(self)
    }
}

impl Hash for ShaderDefines {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.defines.hash(state);
    }
}

impl PartialEq for ShaderDefines {
    fn eq(&self, other: &Self) -> bool {
        self.defines == other.defines
    }
}

impl Eq for ShaderDefines {}

impl From<&[(&str, &str)]> for ShaderDefines {
    fn from(defines: &[(&str, &str)]) -> Self {
        let mut result = Self::with_capacity(defines.len());
        for (k, v) in defines {
            result.set(k, v);
        }
        result
    }
}
