//! Model catalog
//!
//! The engine only needs two facts about a model: whether it accepts a
//! reasoning-effort setting, and whether it is a research model (which
//! takes the preview flavour of the web search tool).

/// Model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// No reasoning controls
    Normal,
    /// Accepts `reasoning.effort`
    Reasoning,
    /// Deep research models
    Research,
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// Identifier sent upstream (e.g., "gpt-4.1")
    pub id: &'static str,
    pub kind: ModelKind,
    /// Human-readable description
    pub description: &'static str,
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        // Reasoning models
        ModelDef {
            id: "o3",
            kind: ModelKind::Reasoning,
            description: "Standard performance model",
        },
        ModelDef {
            id: "o3-pro",
            kind: ModelKind::Reasoning,
            description: "Enhanced professional model",
        },
        ModelDef {
            id: "o4-mini",
            kind: ModelKind::Reasoning,
            description: "Compact flagship model",
        },
        // Research models
        ModelDef {
            id: "o4-mini-deep-research",
            kind: ModelKind::Research,
            description: "Deep research model",
        },
        ModelDef {
            id: "o3-deep-research",
            kind: ModelKind::Research,
            description: "Deep research model",
        },
        // Normal models
        ModelDef {
            id: "codex-mini-latest",
            kind: ModelKind::Normal,
            description: "Coding assistant model",
        },
        ModelDef {
            id: "gpt-4.1",
            kind: ModelKind::Normal,
            description: "Next-gen flagship model",
        },
        ModelDef {
            id: "gpt-4.1-mini",
            kind: ModelKind::Normal,
            description: "Compact GPT-4.1 model",
        },
        ModelDef {
            id: "gpt-4.5-preview",
            kind: ModelKind::Normal,
            description: "Preview of upcoming GPT-4.5",
        },
        ModelDef {
            id: "gpt-4o",
            kind: ModelKind::Normal,
            description: "Multimodal flagship model",
        },
    ]
}

/// Default model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4.1";

pub fn find_model(id: &str) -> Option<&'static ModelDef> {
    all_models().iter().find(|m| m.id == id)
}

/// Models outside the catalog are treated as normal.
pub fn supports_reasoning(id: &str) -> bool {
    find_model(id).is_some_and(|m| m.kind == ModelKind::Reasoning)
}

pub fn is_research_model(id: &str) -> bool {
    find_model(id).is_some_and(|m| m.kind == ModelKind::Research)
}

pub fn models_of_kind(kind: ModelKind) -> impl Iterator<Item = &'static ModelDef> {
    all_models().iter().filter(move |m| m.kind == kind)
}
