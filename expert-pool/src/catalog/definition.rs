//! Expert template definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Expertise tier of an expert template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExpertTier {
    #[default]
    #[serde(rename = "tier1-core")]
    Core,
    #[serde(rename = "tier2-specialized")]
    Specialized,
    #[serde(rename = "tier3-experimental")]
    Experimental,
}

impl fmt::Display for ExpertTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpertTier::Core => write!(f, "tier1-core"),
            ExpertTier::Specialized => write!(f, "tier2-specialized"),
            ExpertTier::Experimental => write!(f, "tier3-experimental"),
        }
    }
}

/// What an expert declares it will and will not do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundaries {
    #[serde(default)]
    pub will: Vec<String>,
    #[serde(default)]
    pub will_not: Vec<String>,
}

/// Immutable expert template.
///
/// Definitions are produced by an external loader and handed to
/// [`ExpertCatalog`](super::ExpertCatalog); nothing in this crate mutates
/// them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertDefinition {
    pub expert_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tier: ExpertTier,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub behavioral_mindset: String,
    #[serde(default)]
    pub key_actions: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub boundaries: Boundaries,
    /// Capacity override for this expert type. `None` uses the pool default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<usize>,
}

fn default_category() -> String {
    "general".to_string()
}

impl ExpertDefinition {
    /// Create a definition with the given id and display name and empty lists.
    pub fn new(expert_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            expert_id: expert_id.into(),
            name: name.into(),
            description: String::new(),
            category: default_category(),
            tier: ExpertTier::default(),
            triggers: Vec::new(),
            focus_areas: Vec::new(),
            behavioral_mindset: String::new(),
            key_actions: Vec::new(),
            outputs: Vec::new(),
            boundaries: Boundaries::default(),
            max_instances: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tier(mut self, tier: ExpertTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = triggers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_focus_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.focus_areas = areas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_behavioral_mindset(mut self, mindset: impl Into<String>) -> Self {
        self.behavioral_mindset = mindset.into();
        self
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }
}
