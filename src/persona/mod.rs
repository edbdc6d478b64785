//! Persona system: named system-prompt templates.
//!
//! Personas shape the model's tone and behavior. The catalog is split into a
//! public set and a restricted (admin-only) set; access control over the
//! restricted set is enforced by callers via [`PersonaRegistry::can_use`].

pub mod registry;
pub mod types;

pub use registry::{PersonaRegistry, DEFAULT_PERSONA};
pub use types::{Persona, PersonaListing};
