//! Global string interner
//!
//! Converts define names and values into integer [`Symbol`]s so define sets
//! can be compared and hashed without touching string data.

use lasso::{Spur, ThreadedRodeo};
use once_cell::sync::Lazy;

static INTERNER: Lazy<ThreadedRodeo> = Lazy::new(ThreadedRodeo::new);

static PRELOADED: Lazy<()> = Lazy::new(|| {
    for name in COMMON_MACROS {
        intern(name);
    }
});

const COMMON_MACROS: [&str; 25] = [
    // Textures
    "DIFFUSE",
    "DIFFUSEDIRECTUV",
    "BUMP",
    "BUMPDIRECTUV",
    "MAINUV1",
    "MAINUV2",
    "ALPHAFROMDIFFUSE",
    // Misc
    "CLIPPLANE",
    "ALPHATEST",
    "POINTSIZE",
    "FOG",
    // Lights
    "SPECULARTERM",
    "SHADOWS",
    // Attributes
    "NORMAL",
    "UV1",
    "UV2",
    "VERTEXCOLOR",
    "VERTEXALPHA",
    "NUM_BONE_INFLUENCERS",
    "BonesPerMesh",
    "INSTANCES",
    // Values
    "0",
    "1",
    "2",
    "3",
];

/// Compact integer identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if it is already known.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up a string without interning it.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the define names used by the layer material so the first
/// resolution pass does not pay for them on the hot path. Runs once per
/// process; later calls are free.
pub fn preload_common_macros() {
    Lazy::force(&PRELOADED);
}
