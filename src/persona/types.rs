//! Core types for the persona catalog.
//!
//! A persona is a named system-prompt template shaping the model's tone and
//! behavior. The catalog is static: loaded once, immutable for the process.

use serde::{Deserialize, Serialize};

/// A persona definition from the static catalog.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    /// Lookup key. Lowercase; lookups are case-insensitive.
    pub name: &'static str,

    /// Human-readable display name.
    pub display_name: &'static str,

    /// Short description shown in listings.
    pub description: &'static str,

    /// System prompt injected at the head of every provider call.
    pub prompt: &'static str,

    /// Restricted personas are admin-only.
    pub restricted: bool,
}

/// Listing entry handed to the command layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaListing {
    pub display_name: String,
    pub description: String,
    pub restricted: bool,
}

impl From<&Persona> for PersonaListing {
    fn from(p: &Persona) -> Self {
        Self {
            display_name: p.display_name.to_string(),
            description: p.description.to_string(),
            restricted: p.restricted,
        }
    }
}
