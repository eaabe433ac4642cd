//! Relevance scoring of expert templates against a task description.
//!
//! Scoring is a pure function of the catalog and the task text. Each rule
//! contributes a fixed weight:
//!
//! | rule | weight |
//! |------|--------|
//! | trigger phrase found verbatim in the task | 3.0 per phrase |
//! | otherwise, trigger word found as a standalone task word | 1.0 per word |
//! | word shared by description and task | 0.5 per word |
//! | category name found in the task | 1.0 |
//! | focus area found verbatim in the task | 2.0 per area |
//! | trigger phrase found verbatim in the context | 1.0 per phrase |
//!
//! Ties are broken by catalog order: the earlier entry wins.

use crate::catalog::{ExpertCatalog, ExpertDefinition, ExpertTier};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const TRIGGER_EXACT_WEIGHT: f64 = 3.0;
const TRIGGER_WORD_WEIGHT: f64 = 1.0;
const DESCRIPTION_WORD_WEIGHT: f64 = 0.5;
const CATEGORY_WEIGHT: f64 = 1.0;
const FOCUS_AREA_WEIGHT: f64 = 2.0;
const CONTEXT_TRIGGER_WEIGHT: f64 = 1.0;

/// Number of matched triggers listed in an explanation.
const EXPLAIN_TRIGGER_LIMIT: usize = 3;

/// Per-rule contributions to an expert's relevance score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub trigger_exact: f64,
    pub trigger_words: f64,
    pub description_overlap: f64,
    pub category: f64,
    pub focus_areas: f64,
    pub context: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.trigger_exact
            + self.trigger_words
            + self.description_overlap
            + self.category
            + self.focus_areas
            + self.context
    }
}

/// An expert id paired with its score for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredExpert {
    pub expert_id: String,
    pub score: f64,
}

/// Human-readable account of why an expert matches a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionExplanation {
    pub expert_id: String,
    pub name: String,
    pub matched_triggers: Vec<String>,
    pub matched_focus_areas: Vec<String>,
    pub description: String,
    pub tier: ExpertTier,
    pub score: f64,
}

impl fmt::Display for SelectionExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Selected '{}' because:", self.name)?;
        if !self.matched_triggers.is_empty() {
            writeln!(f, "- Matched triggers: {}", self.matched_triggers.join(", "))?;
        }
        if !self.matched_focus_areas.is_empty() {
            writeln!(f, "- Focus areas: {}", self.matched_focus_areas.join(", "))?;
        }
        writeln!(f, "- Specialization: {}", self.description)?;
        writeln!(f, "- Tier: {}", self.tier)?;
        write!(f, "- Score: {:.2}", self.score)
    }
}

/// Punctuation that may end a task word without being part of it.
const SENTENCE_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Lowercased, whitespace-split words, kept exactly as written.
fn words(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Lowercased task words with sentence punctuation trimmed, so "database,"
/// matches the trigger word "database" while "c#" stays distinct from "c".
fn sentence_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(SENTENCE_PUNCTUATION).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Verbatim, case-insensitive containment. `haystack` must already be lowercase.
/// Blank needles never match.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack.contains(&needle.to_lowercase())
}

/// Scores catalog entries against task descriptions.
#[derive(Debug, Clone)]
pub struct Selector {
    catalog: Arc<ExpertCatalog>,
}

impl Selector {
    pub fn new(catalog: Arc<ExpertCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<ExpertCatalog> {
        &self.catalog
    }

    /// Relevance of `expert` for `task`. Always `>= 0`.
    pub fn score(&self, task: &str, expert: &ExpertDefinition, context: Option<&str>) -> f64 {
        self.score_breakdown(task, expert, context).total()
    }

    /// Relevance of `expert` for `task`, split by scoring rule.
    pub fn score_breakdown(
        &self,
        task: &str,
        expert: &ExpertDefinition,
        context: Option<&str>,
    ) -> ScoreBreakdown {
        let task_lower = task.to_lowercase();
        let task_words = words(task);
        let task_terms = sentence_words(task);
        let mut breakdown = ScoreBreakdown::default();

        for trigger in &expert.triggers {
            if contains_phrase(&task_lower, trigger) {
                breakdown.trigger_exact += TRIGGER_EXACT_WEIGHT;
            } else {
                let hits = words(trigger)
                    .iter()
                    .filter(|w| task_terms.contains(*w))
                    .count();
                breakdown.trigger_words += hits as f64 * TRIGGER_WORD_WEIGHT;
            }
        }

        let overlap = words(&expert.description).intersection(&task_words).count();
        breakdown.description_overlap = overlap as f64 * DESCRIPTION_WORD_WEIGHT;

        if contains_phrase(&task_lower, &expert.category) {
            breakdown.category = CATEGORY_WEIGHT;
        }

        breakdown.focus_areas = expert
            .focus_areas
            .iter()
            .filter(|area| contains_phrase(&task_lower, area))
            .count() as f64
            * FOCUS_AREA_WEIGHT;

        if let Some(context) = context {
            let context_lower = context.to_lowercase();
            breakdown.context = expert
                .triggers
                .iter()
                .filter(|trigger| contains_phrase(&context_lower, trigger))
                .count() as f64
                * CONTEXT_TRIGGER_WEIGHT;
        }

        breakdown
    }

    /// Every catalog entry with its score, highest first. Equal scores keep
    /// catalog order.
    pub fn rank(&self, task: &str, context: Option<&str>) -> Vec<ScoredExpert> {
        let mut ranked: Vec<ScoredExpert> = self
            .catalog
            .iter()
            .map(|def| ScoredExpert {
                expert_id: def.expert_id.clone(),
                score: self.score(task, def, context),
            })
            .collect();

        // Stable sort keeps catalog order among equal scores.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// The highest-scoring expert, or `None` when nothing scores above zero.
    pub fn select_best(&self, task: &str, context: Option<&str>) -> Option<ScoredExpert> {
        let mut best: Option<ScoredExpert> = None;

        for def in self.catalog.iter() {
            let score = self.score(task, def, context);
            let threshold = best.as_ref().map_or(0.0, |b| b.score);
            if score > threshold {
                best = Some(ScoredExpert {
                    expert_id: def.expert_id.clone(),
                    score,
                });
            }
        }

        match &best {
            Some(b) => info!("Selected '{}' with score {:.2}", b.expert_id, b.score),
            None => warn!("No suitable expert found for task: {}", preview(task)),
        }
        best
    }

    /// Up to `k` expert ids scoring at least `min_score`, highest first.
    pub fn select_top_k(&self, task: &str, k: usize, min_score: f64) -> Vec<String> {
        let selected: Vec<String> = self
            .rank(task, None)
            .into_iter()
            .filter(|s| s.score >= min_score)
            .take(k)
            .map(|s| s.expert_id)
            .collect();

        debug!("Selected {} experts for task", selected.len());
        selected
    }

    /// Why `expert_id` matches `task`, or `None` for an unknown id.
    pub fn explain(&self, expert_id: &str, task: &str) -> Option<SelectionExplanation> {
        let expert = self.catalog.get(expert_id)?;
        let task_lower = task.to_lowercase();

        let matched_triggers = expert
            .triggers
            .iter()
            .filter(|t| contains_phrase(&task_lower, t))
            .take(EXPLAIN_TRIGGER_LIMIT)
            .cloned()
            .collect();
        let matched_focus_areas = expert
            .focus_areas
            .iter()
            .filter(|a| contains_phrase(&task_lower, a))
            .cloned()
            .collect();

        Some(SelectionExplanation {
            expert_id: expert.expert_id.clone(),
            name: expert.name.clone(),
            matched_triggers,
            matched_focus_areas,
            description: expert.description.clone(),
            tier: expert.tier,
            score: self.score(task, expert, None),
        })
    }
}

fn preview(task: &str) -> &str {
    match task.char_indices().nth(50) {
        Some((idx, _)) => &task[..idx],
        None => task,
    }
}
