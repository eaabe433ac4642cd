//! Read-only expert catalog.

pub mod definition;

pub use definition::{Boundaries, ExpertDefinition, ExpertTier};

use crate::error::CatalogError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Ordered, immutable mapping from expert id to [`ExpertDefinition`].
///
/// Insertion order is preserved and is the order the selector uses to break
/// score ties.
#[derive(Debug, Clone, Default)]
pub struct ExpertCatalog {
    experts: Vec<Arc<ExpertDefinition>>,
    index: HashMap<String, usize>,
}

impl ExpertCatalog {
    /// Build a catalog, rejecting empty or duplicate ids.
    pub fn new<I>(definitions: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = ExpertDefinition>,
    {
        let mut experts = Vec::new();
        let mut index = HashMap::new();

        for def in definitions {
            if def.expert_id.trim().is_empty() {
                return Err(CatalogError::EmptyExpertId);
            }
            if index.contains_key(&def.expert_id) {
                return Err(CatalogError::DuplicateExpert(def.expert_id));
            }
            index.insert(def.expert_id.clone(), experts.len());
            experts.push(Arc::new(def));
        }

        info!("Loaded expert catalog with {} definitions", experts.len());
        Ok(Self { experts, index })
    }

    pub fn get(&self, expert_id: &str) -> Option<&Arc<ExpertDefinition>> {
        self.index.get(expert_id).map(|&i| &self.experts[i])
    }

    pub fn contains(&self, expert_id: &str) -> bool {
        self.index.contains_key(expert_id)
    }

    /// Definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExpertDefinition>> {
        self.experts.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.experts.iter().map(|def| def.expert_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.experts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experts.is_empty()
    }
}
