//! Tag selection rules
//!
//! A [`RuleSet`] bounds how many tags of each category a selection may carry.
//! [`validate`] checks a resolved selection against a rule set. It has no side
//! effects and is shared verbatim by question creation and tag search, each of
//! which passes its own rule set.
//!
//! Check order is fixed and the first failure is returned:
//! 1. every category present in the selection is within `[min, max]`
//!    (categories visited in name order, unlisted ones use `default`);
//! 2. every listed category with `min > 0` is present.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::Tag;

/// Inclusive bounds on the number of tags selected from one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Minimum number of tags (inclusive)
    pub min: u32,
    /// Maximum number of tags (inclusive)
    pub max: u32,
}

impl CategoryRule {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Rule applied to categories a rule set does not mention.
    pub const fn fallback() -> Self {
        Self::new(0, 99)
    }

    /// Whether the bounds themselves are consistent.
    pub fn is_well_formed(&self) -> bool {
        self.min <= self.max
    }

    pub fn is_required(&self) -> bool {
        self.min > 0
    }
}

impl Default for CategoryRule {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Per-category selection bounds plus a fallback for unlisted categories.
///
/// Serialized flat, with `default` as a reserved key:
///
/// ```yaml
/// subject: { min: 1, max: 2 }
/// difficulty: { min: 1, max: 1 }
/// default: { min: 0, max: 99 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rule for any category not listed in `categories`
    #[serde(default = "CategoryRule::fallback")]
    pub default: CategoryRule,
    /// Explicitly configured categories
    #[serde(flatten)]
    pub categories: BTreeMap<String, CategoryRule>,
}

impl RuleSet {
    /// Create a rule set with only a fallback rule.
    pub fn new(default: CategoryRule) -> Self {
        Self {
            default,
            categories: BTreeMap::new(),
        }
    }

    /// Add or replace the rule for a category.
    pub fn with_category(mut self, category: impl Into<String>, min: u32, max: u32) -> Self {
        self.categories
            .insert(category.into(), CategoryRule::new(min, max));
        self
    }

    /// Rule governing `category`, falling back to `default`.
    pub fn rule_for(&self, category: &str) -> CategoryRule {
        self.categories
            .get(category)
            .copied()
            .unwrap_or(self.default)
    }

    /// Name of the first entry whose `max` is below its `min`, if any.
    pub fn first_malformed(&self) -> Option<&str> {
        if !self.default.is_well_formed() {
            return Some("default");
        }
        self.categories
            .iter()
            .find(|(_, rule)| !rule.is_well_formed())
            .map(|(name, _)| name.as_str())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(CategoryRule::fallback())
    }
}

/// Number of selected tags per category, derived fresh for every check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSummary(BTreeMap<String, u32>);

impl SelectionSummary {
    /// Count tags per category. A tag id appearing twice is counted once.
    pub fn from_tags(tags: &[Tag]) -> Self {
        let mut seen = BTreeSet::new();
        let mut counts = BTreeMap::new();
        for tag in tags {
            if seen.insert(tag.id) {
                *counts.entry(tag.category.clone()).or_insert(0) += 1;
            }
        }
        Self(counts)
    }

    pub fn count(&self, category: &str) -> u32 {
        self.0.get(category).copied().unwrap_or(0)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains_key(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(category, count)| (category.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of distinct tags counted.
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

/// Why a tag selection was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("category '{category}' needs at least {min} tag(s), got {count}")]
    BelowMinimum { category: String, min: u32, count: u32 },

    #[error("category '{category}' allows at most {max} tag(s), got {count}")]
    AboveMaximum { category: String, max: u32, count: u32 },

    #[error("category '{category}' is required (at least {min} tag(s))")]
    MissingRequiredCategory { category: String, min: u32 },
}

impl Violation {
    /// Category the violation refers to
    pub fn category(&self) -> &str {
        match self {
            Self::BelowMinimum { category, .. }
            | Self::AboveMaximum { category, .. }
            | Self::MissingRequiredCategory { category, .. } => category,
        }
    }
}

/// Check a resolved tag selection against `rules`.
///
/// Returns the per-category summary on success, or the first violation found.
/// An empty selection is accepted as input and fails only if some listed
/// category is required.
pub fn validate(tags: &[Tag], rules: &RuleSet) -> Result<SelectionSummary, Violation> {
    let summary = SelectionSummary::from_tags(tags);

    for (category, count) in summary.iter() {
        let rule = rules.rule_for(category);
        if count < rule.min {
            return Err(Violation::BelowMinimum {
                category: category.to_string(),
                min: rule.min,
                count,
            });
        }
        if count > rule.max {
            return Err(Violation::AboveMaximum {
                category: category.to_string(),
                max: rule.max,
                count,
            });
        }
    }

    for (category, rule) in &rules.categories {
        if rule.is_required() && !summary.contains(category) {
            return Err(Violation::MissingRequiredCategory {
                category: category.clone(),
                min: rule.min,
            });
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: i64, category: &str) -> Tag {
        Tag::new(id, format!("tag-{}", id), category)
    }

    fn creation_rules() -> RuleSet {
        RuleSet::new(CategoryRule::fallback())
            .with_category("subject", 1, 2)
            .with_category("difficulty", 1, 1)
            .with_category("progress", 1, 1)
    }

    #[test]
    fn test_valid_selection_returns_summary() {
        let tags = vec![
            tag(1, "subject"),
            tag(2, "subject"),
            tag(3, "difficulty"),
            tag(4, "progress"),
        ];

        let summary = validate(&tags, &creation_rules()).expect("selection should pass");

        assert_eq!(summary.count("subject"), 2);
        assert_eq!(summary.count("difficulty"), 1);
        assert_eq!(summary.count("progress"), 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_above_maximum() {
        let tags = vec![
            tag(1, "subject"),
            tag(2, "subject"),
            tag(3, "subject"),
            tag(4, "difficulty"),
            tag(5, "progress"),
        ];

        let err = validate(&tags, &creation_rules()).unwrap_err();

        assert_eq!(
            err,
            Violation::AboveMaximum {
                category: "subject".to_string(),
                max: 2,
                count: 3,
            }
        );
    }

    #[test]
    fn test_below_minimum_for_present_category() {
        let rules = RuleSet::default().with_category("topic", 2, 3);
        let tags = vec![tag(1, "topic")];

        let err = validate(&tags, &rules).unwrap_err();

        assert_eq!(
            err,
            Violation::BelowMinimum {
                category: "topic".to_string(),
                min: 2,
                count: 1,
            }
        );
    }

    #[test]
    fn test_missing_required_category() {
        let tags = vec![tag(1, "subject"), tag(2, "difficulty")];

        let err = validate(&tags, &creation_rules()).unwrap_err();

        assert_eq!(
            err,
            Violation::MissingRequiredCategory {
                category: "progress".to_string(),
                min: 1,
            }
        );
    }

    #[test]
    fn test_empty_selection_checks_required_categories() {
        let err = validate(&[], &creation_rules()).unwrap_err();
        // Categories are visited in name order
        assert_eq!(err.category(), "difficulty");

        let relaxed = RuleSet::default().with_category("difficulty", 0, 2);
        let summary = validate(&[], &relaxed).expect("nothing is required");
        assert!(summary.is_empty());
    }

    #[test]
    fn test_range_checks_run_before_missing_checks() {
        // subject is over its cap and progress is missing; the range failure wins
        let tags = vec![
            tag(1, "subject"),
            tag(2, "subject"),
            tag(3, "subject"),
            tag(4, "difficulty"),
        ];

        let err = validate(&tags, &creation_rules()).unwrap_err();

        assert!(matches!(err, Violation::AboveMaximum { .. }));
    }

    #[test]
    fn test_unlisted_category_uses_default_rule() {
        let rules = RuleSet::new(CategoryRule::new(0, 1));
        let tags = vec![tag(1, "misc"), tag(2, "misc")];

        let err = validate(&tags, &rules).unwrap_err();

        assert_eq!(
            err,
            Violation::AboveMaximum {
                category: "misc".to_string(),
                max: 1,
                count: 2,
            }
        );
    }

    #[test]
    fn test_default_rule_is_never_required() {
        // A required default applies only to categories that are present
        let rules = RuleSet::new(CategoryRule::new(1, 5));
        assert!(validate(&[], &rules).is_ok());
    }

    #[test]
    fn test_duplicate_tags_counted_once() {
        let rules = RuleSet::default().with_category("subject", 1, 1);
        let tags = vec![tag(7, "subject"), tag(7, "subject")];

        let summary = validate(&tags, &rules).expect("same tag twice is one tag");
        assert_eq!(summary.count("subject"), 1);
    }

    #[test]
    fn test_first_malformed() {
        assert_eq!(creation_rules().first_malformed(), None);

        let bad = creation_rules().with_category("level", 3, 1);
        assert_eq!(bad.first_malformed(), Some("level"));

        let bad_default = RuleSet::new(CategoryRule::new(2, 1));
        assert_eq!(bad_default.first_malformed(), Some("default"));
    }

    #[test]
    fn test_rule_set_yaml_shape() {
        let yaml = "subject: { min: 1, max: 3 }\ndefault: { min: 0, max: 10 }\n";
        let rules: RuleSet = serde_yaml::from_str(yaml).expect("valid rule set");

        assert_eq!(rules.default, CategoryRule::new(0, 10));
        assert_eq!(rules.rule_for("subject"), CategoryRule::new(1, 3));
        assert_eq!(rules.rule_for("other"), CategoryRule::new(0, 10));
        assert_eq!(rules.categories.len(), 1);
    }

    #[test]
    fn test_violation_serializes_with_kind() {
        let violation = Violation::MissingRequiredCategory {
            category: "progress".to_string(),
            min: 1,
        };

        let value = serde_json::to_value(&violation).unwrap();

        assert_eq!(value["kind"], "missing_required_category");
        assert_eq!(value["category"], "progress");
        assert_eq!(value["min"], 1);
    }
}
