// crates/variant-gate-auth/src/origin.rs
// ============================================================================
// Module: Variant Gate Origin Validation
// Description: Per-project origin allow-listing with wildcard subdomains.
// Purpose: Decide whether a request's declared origin is permitted.
// Dependencies: variant-gate-core, url
// ============================================================================

//! ## Overview
//! Origin validation tests a request's `Origin` header against the owning
//! project's allow-list, falling back to a globally configured list when the
//! project carries none. Patterns are exact origins or wildcard-subdomain
//! forms such as `https://*.example.com`; a wildcard requires the request
//! scheme to match and the request hostname to equal the pattern domain or
//! end with `.<domain>` on a label boundary.
//!
//! ## Invariants
//! - A request without an `Origin` header is allowed (same-origin and
//!   server-to-server traffic); the signature check still gates integrity.
//! - With both lists empty, production deployments deny (fail closed) and
//!   non-production deployments allow.
//! - Validation has no side effects; callers log rejections.

// ============================================================================
// SECTION: Imports
// ============================================================================

use url::Url;
use variant_gate_core::Project;

// ============================================================================
// SECTION: Origin Patterns
// ============================================================================

/// One parsed allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPattern {
    /// Exact normalized origin match.
    Exact(String),
    /// Wildcard subdomain match (`<scheme>://*.<domain>`).
    WildcardSubdomain {
        /// Required request scheme.
        scheme: String,
        /// Domain suffix the request hostname must equal or end with.
        domain: String,
    },
}

impl OriginPattern {
    /// Parses a raw allow-list entry into a normalized matcher.
    ///
    /// Returns `None` for blank entries or wildcard forms with an empty
    /// domain, which can never match anything.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_origin(raw);
        if normalized.is_empty() {
            return None;
        }
        if let Some((scheme, rest)) = normalized.split_once("://")
            && let Some(domain) = rest.strip_prefix("*.")
        {
            if domain.is_empty() {
                return None;
            }
            return Some(Self::WildcardSubdomain {
                scheme: scheme.to_string(),
                domain: domain.to_string(),
            });
        }
        Some(Self::Exact(normalized))
    }

    /// Returns true when the pattern admits the given request origin.
    ///
    /// The origin is supplied both in normalized string form (for exact
    /// matches) and parsed form (for wildcard hostname comparison).
    fn matches(&self, normalized_origin: &str, parsed: Option<&Url>) -> bool {
        match self {
            Self::Exact(expected) => normalized_origin == expected,
            Self::WildcardSubdomain {
                scheme,
                domain,
            } => {
                let Some(url) = parsed else {
                    return false;
                };
                if url.scheme() != scheme {
                    return false;
                }
                let Some(host) = url.host_str() else {
                    return false;
                };
                let host = host.to_ascii_lowercase();
                host == *domain || is_subdomain_of(&host, domain)
            }
        }
    }
}

/// Returns true when `host` ends with `.<domain>` on a label boundary.
///
/// Guards against suffix confusion: `example.com.evil.com` must not match
/// the domain `example.com`, and `notexample.com` must not match either.
fn is_subdomain_of(host: &str, domain: &str) -> bool {
    if host.len() <= domain.len() || !host.ends_with(domain) {
        return false;
    }
    let boundary = host.len() - domain.len() - 1;
    host.as_bytes().get(boundary) == Some(&b'.')
}

/// Normalizes an origin string: trim, strip trailing slash, lowercase.
fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

// ============================================================================
// SECTION: Origin Validator
// ============================================================================

/// Origin allow-list validator with a global fallback list.
#[derive(Debug, Clone, Default)]
pub struct OriginValidator {
    /// Globally configured fallback patterns.
    global: Vec<OriginPattern>,
    /// When true (production), an empty effective list denies all
    /// cross-origin requests instead of allowing them.
    production: bool,
}

impl OriginValidator {
    /// Builds a validator from raw global allow-list entries.
    #[must_use]
    pub fn new<I, S>(global_origins: I, production: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let global = global_origins
            .into_iter()
            .filter_map(|entry| OriginPattern::parse(entry.as_ref()))
            .collect();
        Self {
            global,
            production,
        }
    }

    /// Decides whether a request origin is permitted for a project.
    ///
    /// `None` means the request carried no `Origin` header and is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: Option<&str>, project: Option<&Project>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        let normalized = normalize_origin(origin);
        let parsed = Url::parse(&normalized).ok();

        let project_patterns: Vec<OriginPattern> = project
            .map(|project| {
                project
                    .allowed_origins
                    .iter()
                    .filter_map(|entry| OriginPattern::parse(entry))
                    .collect()
            })
            .unwrap_or_default();

        let effective: &[OriginPattern] =
            if project_patterns.is_empty() { &self.global } else { &project_patterns };

        if effective.is_empty() {
            return !self.production;
        }
        effective.iter().any(|pattern| pattern.matches(&normalized, parsed.as_ref()))
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

    use super::OriginPattern;

    #[test]
    fn blank_entries_parse_to_nothing() {
        assert!(OriginPattern::parse("").is_none());
        assert!(OriginPattern::parse("   ").is_none());
        assert!(OriginPattern::parse("https://*.").is_none());
    }

    #[test]
    fn exact_entries_normalize() {
        let pattern = OriginPattern::parse(" https://Example.com/ ").expect("valid entry");
        assert_eq!(pattern, OriginPattern::Exact("https://example.com".to_string()));
    }

    #[test]
    fn wildcard_entries_split_scheme_and_domain() {
        let pattern = OriginPattern::parse("https://*.example.com").expect("valid entry");
        assert_eq!(
            pattern,
            OriginPattern::WildcardSubdomain {
                scheme: "https".to_string(),
                domain: "example.com".to_string(),
            }
        );
    }
}
