//! Utility Module
//!
//! - [`interner`]: String interning for define names and values
//!
//! Interned strings (Symbols) compare in O(1):
//!
//! ```rust,ignore
//! use layer_material::utils::interner;
//!
//! let a = interner::intern("DIFFUSE");
//! let b = interner::intern("DIFFUSE");
//! assert_eq!(a, b);
//! ```

pub mod interner;

pub use interner::Symbol;
