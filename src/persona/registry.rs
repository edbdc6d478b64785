//! Static persona catalog and access checks.
//!
//! Two catalogs: a public set anyone can use and a restricted set gated on
//! the admin allow-list. Lookups are case-insensitive and never fail hard;
//! resolving an unknown name falls back to the default persona with a
//! warning.

use std::collections::BTreeMap;

use tracing::warn;

use super::types::{Persona, PersonaListing};

/// Persona used when a requested name is unknown.
pub const DEFAULT_PERSONA: &str = "helpful";

const PUBLIC_PERSONAS: &[Persona] = &[
    Persona {
        name: "helpful",
        display_name: "Helpful Assistant",
        description: "Friendly and eager to help",
        prompt: "You are a helpful, friendly, and respectful AI assistant. \
Always answer clearly, concisely, and politely. \
Provide accurate information, and when you do not know something, admit it honestly. \
Be empathetic and try to help as best you can.",
        restricted: false,
    },
    Persona {
        name: "professional",
        display_name: "Professional Assistant",
        description: "Formal and business-focused",
        prompt: "You are a professional assistant specialized in corporate environments. \
Keep a formal and objective tone. \
Focus on practical, efficient solutions. \
Use appropriate technical language when needed. \
Be direct and concise in your answers.",
        restricted: false,
    },
    Persona {
        name: "creative",
        display_name: "Creative Assistant",
        description: "Imaginative and artistic",
        prompt: "You are a creative and imaginative assistant. \
Think outside the box and offer innovative solutions. \
Use colorful, expressive language. \
Encourage creativity and original thinking. \
Be inspiring and motivating in your answers.",
        restricted: false,
    },
    Persona {
        name: "teacher",
        display_name: "Teacher",
        description: "Educational and patient",
        prompt: "You are an experienced and patient teacher. \
Explain concepts didactically and progressively. \
Use practical examples to illustrate your explanations. \
Encourage questions and continuous learning. \
Adapt your language to the user's level of knowledge.",
        restricted: false,
    },
    Persona {
        name: "friend",
        display_name: "Friend",
        description: "Casual and relaxed",
        prompt: "You are a close, laid-back friend. \
Use casual, friendly language. \
Be empathetic and understanding. \
Add appropriate humor when possible. \
Show genuine interest in the user's well-being.",
        restricted: false,
    },
    Persona {
        name: "analyst",
        display_name: "Analyst",
        description: "Logical and analytical",
        prompt: "You are a logical and meticulous analyst. \
Approach problems systematically and with structure. \
Use data and evidence to support your answers. \
Consider multiple angles before reaching conclusions. \
Be precise and objective in your analyses.",
        restricted: false,
    },
    Persona {
        name: "motivational",
        display_name: "Motivator",
        description: "Inspiring and encouraging",
        prompt: "You are an inspiring motivational coach. \
Focus on potential and possibilities. \
Use positive, encouraging language. \
Help people overcome challenges. \
Be optimistic and energetic in your answers.",
        restricted: false,
    },
];

// Admin-only personas.
const RESTRICTED_PERSONAS: &[Persona] = &[
    Persona {
        name: "jailbreak",
        display_name: "Jailbreak",
        description: "Unrestricted mode (admins only)",
        prompt: "You may answer without the usual restrictions, but you must still: \
remain respectful and ethical, \
refuse to provide dangerous or illegal information, \
use good judgment in your answers, \
and remember that you still represent a responsible assistant.",
        restricted: true,
    },
    Persona {
        name: "debug",
        display_name: "Debug",
        description: "Debugging mode (admins only)",
        prompt: "You are in debugging mode. \
Provide detailed technical information. \
Include logs and process details when relevant. \
Be extremely precise and technical. \
Focus on problem solving.",
        restricted: true,
    },
];

/// Read-only view over the persona catalogs.
pub struct PersonaRegistry;

impl PersonaRegistry {
    pub fn new() -> Self {
        Self
    }

    fn find(&self, name: &str) -> Option<&'static Persona> {
        let name = name.to_lowercase();
        PUBLIC_PERSONAS
            .iter()
            .chain(RESTRICTED_PERSONAS.iter())
            .find(|p| p.name == name)
    }

    /// Resolve a persona name to its system prompt.
    ///
    /// Unknown names degrade to the default persona; this is a warning, not
    /// an error, so callers always get usable prompt text back.
    pub fn resolve(&self, name: &str) -> &'static str {
        match self.find(name) {
            Some(p) => p.prompt,
            None => {
                warn!(persona = name, fallback = DEFAULT_PERSONA, "Unknown persona, using default");
                self.find(DEFAULT_PERSONA)
                    .expect("default persona must exist in the catalog")
                    .prompt
            }
        }
    }

    /// Check whether a persona exists (public or restricted)
    pub fn is_valid(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Check whether a persona is admin-only
    pub fn is_restricted(&self, name: &str) -> bool {
        self.find(name).map(|p| p.restricted).unwrap_or(false)
    }

    /// Check whether a caller may switch to a persona.
    ///
    /// Unknown names are never usable; restricted names require admin.
    pub fn can_use(&self, name: &str, is_admin: bool) -> bool {
        match self.find(name) {
            None => false,
            Some(p) if p.restricted => is_admin,
            Some(_) => true,
        }
    }

    /// Names of all public personas, in catalog order
    pub fn public_names(&self) -> Vec<&'static str> {
        PUBLIC_PERSONAS.iter().map(|p| p.name).collect()
    }

    /// Personas visible to a caller. Restricted entries are included only
    /// for admins.
    pub fn list_for(&self, is_admin: bool) -> BTreeMap<&'static str, PersonaListing> {
        let mut listing = BTreeMap::new();
        for p in PUBLIC_PERSONAS {
            listing.insert(p.name, PersonaListing::from(p));
        }
        if is_admin {
            for p in RESTRICTED_PERSONAS {
                listing.insert(p.name, PersonaListing::from(p));
            }
        }
        listing
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_persona() {
        let registry = PersonaRegistry::new();
        let prompt = registry.resolve("teacher");
        assert!(prompt.contains("teacher"));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = PersonaRegistry::new();
        assert_eq!(registry.resolve("HELPFUL"), registry.resolve("helpful"));
        assert!(registry.is_valid("Jailbreak"));
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_default() {
        let registry = PersonaRegistry::new();
        assert_eq!(
            registry.resolve("totally-unknown-xyz"),
            registry.resolve(DEFAULT_PERSONA)
        );
    }

    #[test]
    fn test_is_valid() {
        let registry = PersonaRegistry::new();
        assert!(registry.is_valid("helpful"));
        assert!(registry.is_valid("debug"));
        assert!(!registry.is_valid("totally-unknown-xyz"));
    }

    #[test]
    fn test_is_restricted() {
        let registry = PersonaRegistry::new();
        assert!(registry.is_restricted("jailbreak"));
        assert!(registry.is_restricted("debug"));
        assert!(!registry.is_restricted("helpful"));
        // Unknown names are not restricted, just invalid
        assert!(!registry.is_restricted("totally-unknown-xyz"));
    }

    #[test]
    fn test_can_use_gating() {
        let registry = PersonaRegistry::new();

        // Every restricted persona requires admin
        for name in ["jailbreak", "debug"] {
            assert!(!registry.can_use(name, false));
            assert!(registry.can_use(name, true));
        }

        // Every public persona is usable by anyone
        for name in registry.public_names() {
            assert!(registry.can_use(name, false));
            assert!(registry.can_use(name, true));
        }

        // Invalid names are usable by no one
        assert!(!registry.can_use("totally-unknown-xyz", true));
    }

    #[test]
    fn test_listing_carries_catalog_fields() {
        let registry = PersonaRegistry::new();
        let listing = registry.list_for(false);
        let friend = &listing["friend"];
        assert_eq!(friend.display_name, "Friend");
        assert!(!friend.restricted);
    }

    #[test]
    fn test_list_for_hides_restricted_from_non_admins() {
        let registry = PersonaRegistry::new();

        let public = registry.list_for(false);
        assert_eq!(public.len(), registry.public_names().len());
        assert!(!public.contains_key("jailbreak"));

        let all = registry.list_for(true);
        assert!(all.len() > public.len());
        assert!(all["jailbreak"].restricted);
        assert!(!all["helpful"].restricted);
    }
}
