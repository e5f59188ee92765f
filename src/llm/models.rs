//! Selectable tutor models
//!
//! The hosted provider accepts any model id; this catalog fixes the ones
//! offered to students and the response budget each gets.

use serde::Serialize;

/// Model used when the request does not name one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Token budget for models outside the catalog
const DEFAULT_MAX_TOKENS: u32 = 800;

/// Model definition with metadata
#[derive(Debug, Clone, Serialize)]
pub struct ModelDef {
    /// Model id sent to the provider (e.g., "gpt-4o")
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Completion budget in tokens
    pub max_tokens: u32,
}

/// Get all model definitions, in display order
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gpt-4o",
            name: "GPT-4o",
            description: "Most capable model",
            max_tokens: 1200,
        },
        ModelDef {
            id: "gpt-4o-mini",
            name: "GPT-4o Mini",
            description: "Fast and efficient",
            max_tokens: 800,
        },
        ModelDef {
            id: "gpt-3.5-turbo",
            name: "GPT-3.5 Turbo",
            description: "Quick responses",
            max_tokens: 800,
        },
    ]
}

/// Look up a model by id
pub fn find_model(id: &str) -> Option<&'static ModelDef> {
    all_models().iter().find(|m| m.id == id)
}

/// Completion budget for a model id; the premium model gets the larger one
pub fn max_tokens_for(model_id: &str) -> u32 {
    find_model(model_id).map_or(DEFAULT_MAX_TOKENS, |m| m.max_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_model_gets_larger_budget() {
        assert_eq!(max_tokens_for("gpt-4o"), 1200);
        assert_eq!(max_tokens_for("gpt-4o-mini"), 800);
        assert_eq!(max_tokens_for("some-other-model"), 800);
    }

    #[test]
    fn test_default_model_is_in_catalog() {
        assert!(find_model(DEFAULT_MODEL).is_some());
    }
}
