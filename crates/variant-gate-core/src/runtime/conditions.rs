// crates/variant-gate-core/src/runtime/conditions.rs
// ============================================================================
// Module: Variant Gate Condition Matching
// Description: Condition-set evaluation against a visitor context.
// Purpose: Convert targeting rules into a single boolean match outcome.
// Dependencies: crate::core, regex
// ============================================================================

//! ## Overview
//! Condition evaluation follows OR-within-axis, AND-across-axes semantics:
//! an axis passes when any of its non-empty entries matches the context
//! value, and the set passes when every axis that has valid entries passes.
//! `other` entries AND a minimum-visit-count threshold with a referrer URL
//! pattern.
//!
//! Malformed positive regex patterns never match. Malformed `NotRegex`
//! patterns evaluate to a pass: the broken rule behaves as "not applicable"
//! instead of excluding all traffic from the experiment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;

use crate::core::AxisRule;
use crate::core::ConditionKind;
use crate::core::ConditionSet;
use crate::core::OtherRule;
use crate::runtime::url_match::match_url;

// ============================================================================
// SECTION: Condition Context
// ============================================================================

/// Resolved context values the condition set is evaluated against.
///
/// The device field carries the already-classified category label; the
/// orchestrator derives it from the raw user agent before matching.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// Classified device category label (`PC`, `SP`, `Tablet`, `other`).
    pub device: &'a str,
    /// Browser name.
    pub browser: &'a str,
    /// Operating system name.
    pub os: &'a str,
    /// Visitor language.
    pub language: &'a str,
    /// Visit count reported by the SDK.
    pub visit_count: u32,
    /// Referrer URL of the current page view.
    pub referrer: &'a str,
}

// ============================================================================
// SECTION: Condition Evaluation
// ============================================================================

/// Evaluates a condition set against a visitor context.
///
/// Axes without valid entries are vacuously true; an empty set always
/// matches.
#[must_use]
pub fn matches_conditions(conditions: &ConditionSet, context: &ConditionContext<'_>) -> bool {
    axis_matches(&conditions.device, context.device)
        && axis_matches(&conditions.browser, context.browser)
        && axis_matches(&conditions.os, context.os)
        && axis_matches(&conditions.language, context.language)
        && conditions.other.iter().all(|rule| other_rule_matches(rule, context))
}

/// Evaluates one axis: OR over entries with a non-empty pattern value.
fn axis_matches(rules: &[AxisRule], context_value: &str) -> bool {
    let mut saw_valid_entry = false;
    for rule in rules {
        if rule.value.is_empty() {
            continue;
        }
        saw_valid_entry = true;
        if rule_matches(rule, context_value) {
            return true;
        }
    }
    !saw_valid_entry
}

/// Evaluates a single axis entry against the context value.
fn rule_matches(rule: &AxisRule, context_value: &str) -> bool {
    match rule.condition {
        ConditionKind::Exact => context_value == rule.value,
        ConditionKind::Contains => context_value.contains(rule.value.as_str()),
        ConditionKind::StartsWith => context_value.starts_with(rule.value.as_str()),
        ConditionKind::EndsWith => context_value.ends_with(rule.value.as_str()),
        ConditionKind::Regex => {
            Regex::new(&rule.value).is_ok_and(|regex| regex.is_match(context_value))
        }
        ConditionKind::OneOf => rule.values.iter().any(|value| value == context_value),
        ConditionKind::NotRegex => {
            // A malformed negative pattern passes instead of blocking all
            // traffic; see the module overview.
            Regex::new(&rule.value).map_or(true, |regex| !regex.is_match(context_value))
        }
        ConditionKind::NotStartsWith => !context_value.starts_with(rule.value.as_str()),
        ConditionKind::NotEndsWith => !context_value.ends_with(rule.value.as_str()),
        ConditionKind::NotContains => !context_value.contains(rule.value.as_str()),
        ConditionKind::NotOneOf => !rule.values.iter().any(|value| value == context_value),
    }
}

/// Evaluates one visit-count / referrer entry.
fn other_rule_matches(rule: &OtherRule, context: &ConditionContext<'_>) -> bool {
    let threshold = rule.visit_count.unwrap_or(0);
    if context.visit_count < threshold {
        return false;
    }
    match rule.referrer.as_deref() {
        None => true,
        Some(pattern) => match_url(context.referrer, pattern),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions."
    )]

    use super::ConditionContext;
    use super::matches_conditions;
    use crate::core::AxisRule;
    use crate::core::ConditionKind;
    use crate::core::ConditionSet;
    use crate::core::OtherRule;

    fn context<'a>(device: &'a str, language: &'a str) -> ConditionContext<'a> {
        ConditionContext {
            device,
            browser: "Chrome",
            os: "Mac OS X",
            language,
            visit_count: 1,
            referrer: "",
        }
    }

    fn exact(value: &str) -> AxisRule {
        AxisRule {
            value: value.to_string(),
            condition: ConditionKind::Exact,
            values: Vec::new(),
        }
    }

    #[test]
    fn empty_set_matches_everything() {
        let set = ConditionSet::default();
        assert!(matches_conditions(&set, &context("PC", "en")));
    }

    #[test]
    fn entries_within_axis_are_ored() {
        let set = ConditionSet {
            device: vec![exact("PC"), exact("SP")],
            ..ConditionSet::default()
        };
        assert!(matches_conditions(&set, &context("PC", "en")));
        assert!(matches_conditions(&set, &context("SP", "en")));
        assert!(!matches_conditions(&set, &context("Tablet", "en")));
    }

    #[test]
    fn axes_are_anded() {
        let set = ConditionSet {
            device: vec![exact("PC"), exact("SP")],
            language: vec![exact("en")],
            ..ConditionSet::default()
        };
        assert!(matches_conditions(&set, &context("PC", "en")));
        assert!(matches_conditions(&set, &context("SP", "en")));
        assert!(!matches_conditions(&set, &context("PC", "ja")));
    }

    #[test]
    fn empty_value_entries_are_skipped() {
        let set = ConditionSet {
            device: vec![exact("")],
            ..ConditionSet::default()
        };
        // The lone entry is invalid, so the axis is vacuously true.
        assert!(matches_conditions(&set, &context("Tablet", "en")));
    }

    #[test]
    fn malformed_positive_regex_fails_closed() {
        let set = ConditionSet {
            browser: vec![AxisRule {
                value: "([unclosed".to_string(),
                condition: ConditionKind::Regex,
                values: Vec::new(),
            }],
            ..ConditionSet::default()
        };
        assert!(!matches_conditions(&set, &context("PC", "en")));
    }

    #[test]
    fn malformed_negative_regex_fails_open() {
        let set = ConditionSet {
            browser: vec![AxisRule {
                value: "([unclosed".to_string(),
                condition: ConditionKind::NotRegex,
                values: Vec::new(),
            }],
            ..ConditionSet::default()
        };
        assert!(matches_conditions(&set, &context("PC", "en")));
    }

    #[test]
    fn one_of_uses_membership_list() {
        let set = ConditionSet {
            language: vec![AxisRule {
                value: "any".to_string(),
                condition: ConditionKind::OneOf,
                values: vec!["en".to_string(), "fr".to_string()],
            }],
            ..ConditionSet::default()
        };
        assert!(matches_conditions(&set, &context("PC", "en")));
        assert!(!matches_conditions(&set, &context("PC", "ja")));
    }

    #[test]
    fn other_rule_ands_visit_count_and_referrer() {
        let set = ConditionSet {
            other: vec![OtherRule {
                visit_count: Some(3),
                referrer: Some("google".to_string()),
            }],
            ..ConditionSet::default()
        };
        let mut ctx = context("PC", "en");
        ctx.visit_count = 5;
        ctx.referrer = "https://www.google.com/search";
        assert!(matches_conditions(&set, &ctx));

        ctx.visit_count = 2;
        assert!(!matches_conditions(&set, &ctx));

        ctx.visit_count = 5;
        ctx.referrer = "https://duckduckgo.com";
        assert!(!matches_conditions(&set, &ctx));
    }

    #[test]
    fn multiple_other_rules_are_anded() {
        let set = ConditionSet {
            other: vec![
                OtherRule {
                    visit_count: Some(2),
                    referrer: None,
                },
                OtherRule {
                    visit_count: None,
                    referrer: Some("news".to_string()),
                },
            ],
            ..ConditionSet::default()
        };
        let mut ctx = context("PC", "en");
        ctx.visit_count = 4;
        ctx.referrer = "https://news.example.com";
        assert!(matches_conditions(&set, &ctx));

        ctx.referrer = "https://blog.example.com";
        assert!(!matches_conditions(&set, &ctx));
    }
}
