//! Error Types
//!
//! This module defines the error types used by the material plugin.
//!
//! # Overview
//!
//! The main error type [`MaterialError`] covers the failure modes of variant
//! resolution and of the surrounding material surface:
//! - Resources (textures, programs) that are not loaded yet
//! - Cache slots that reference a stale or freed program
//! - Program compilation failures reported by the host
//! - Descriptor (de)serialization errors
//!
//! Readiness is not an exceptional condition: the resolver reports it as an
//! outcome value. `LayerMaterial::require_ready_for_submesh` turns a
//! not-ready outcome into `ResourceNotReady` for callers that want an error.
//!
//! # Usage
//!
//! ```rust,ignore
//! use layer_material::errors::{MaterialError, Result};
//!
//! fn load() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the LayerMaterial plugin.
#[derive(Error, Debug)]
pub enum MaterialError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// A texture or program is not loaded yet. Retry on a later pass.
    #[error("Resource not ready: {0}")]
    ResourceNotReady(String),

    /// The cache slot referenced a program the host no longer knows about.
    ///
    /// The slot has already been cleared when this is returned; the next
    /// resolution performs a full recompute.
    #[error("Invalid cache slot state: {0}")]
    InvalidSlotState(String),

    /// The host failed to compile a program for the requested variant.
    #[error("Program compilation failed for '{shader}': {reason}")]
    ProgramCompileFailed {
        /// Shader name of the failed request
        shader: String,
        /// Host-provided failure description
        reason: String,
    },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// A descriptor referenced a texture the lookup could not provide.
    #[error("Unknown texture: {0}")]
    UnknownTexture(String),

    /// A descriptor declared a custom type other than `LayerMaterial`.
    #[error("Unsupported material type: {0}")]
    UnsupportedMaterialType(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, MaterialError>`.
pub type Result<T> = std::result::Result<T, MaterialError>;
