// crates/variant-gate-core/src/runtime/url_match.rs
// ============================================================================
// Module: Variant Gate URL Matching
// Description: Literal-substring and /pattern/flags URL matching.
// Purpose: Shared URL predicate for target, exclude, and referrer rules.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! URL patterns come in two forms. A pattern written as `/<body>/<flags>`
//! is compiled as a regular expression with the given flags; anything else
//! is a literal substring test. A blank pattern matches everything, and a
//! pattern whose regex fails to compile matches nothing (fail closed).

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use regex::RegexBuilder;

// ============================================================================
// SECTION: URL Matching
// ============================================================================

/// Tests a URL value against a target/exclude/referrer pattern.
///
/// Blank patterns always match. `/<body>/<flags>` patterns are evaluated as
/// regular expressions; malformed bodies or unknown flags never match.
#[must_use]
pub fn match_url(value: &str, pattern: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return true;
    }
    match parse_slash_pattern(pattern) {
        Some((body, flags)) => {
            compile_pattern(body, flags).is_some_and(|regex| regex.is_match(value))
        }
        None => value.contains(pattern),
    }
}

/// Splits a `/<body>/<flags>` pattern into body and flags.
///
/// Returns `None` when the pattern is not in slash form, in which case the
/// caller falls back to a literal substring test.
fn parse_slash_pattern(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    Some((&rest[..close], &rest[close + 1..]))
}

/// Compiles a slash-form pattern body with its flag characters.
///
/// Supported flags: `i` (case-insensitive), `m` (multi-line), `s`
/// (dot-matches-newline), `x` (ignore whitespace). The JavaScript-specific
/// `g` and `u` flags are accepted and ignored: `g` only affects iteration
/// and `u` matches this engine's default Unicode handling. Any other flag
/// makes the pattern invalid.
fn compile_pattern(body: &str, flags: &str) -> Option<Regex> {
    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'g' | 'u' => {}
            _ => return None,
        }
    }
    builder.build().ok()
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

    use super::match_url;

    #[test]
    fn blank_pattern_matches_everything() {
        assert!(match_url("https://example.com/pricing", ""));
        assert!(match_url("", "   "));
    }

    #[test]
    fn literal_pattern_is_substring_test() {
        assert!(match_url("https://example.com/pricing", "/pricing"));
        assert!(!match_url("https://example.com/about", "/pricing"));
    }

    #[test]
    fn slash_pattern_is_regex() {
        assert!(match_url("https://example.com/item/42", r"/item\/\d+/"));
        assert!(!match_url("https://example.com/item/abc", r"/item\/\d+/"));
    }

    #[test]
    fn case_insensitive_flag_is_honored() {
        assert!(match_url("https://example.com/Pricing", "/pricing/i"));
        assert!(!match_url("https://example.com/Pricing", "/pricing/"));
    }

    #[test]
    fn malformed_regex_never_matches() {
        assert!(!match_url("anything", "/([unclosed/"));
    }

    #[test]
    fn unknown_flag_never_matches() {
        assert!(!match_url("anything", "/any/q"));
    }

    #[test]
    fn javascript_global_flag_is_ignored() {
        assert!(match_url("https://example.com/a", "/example/g"));
    }
}
