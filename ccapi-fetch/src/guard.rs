//! Development-time path guard.
//!
//! Some routes take a numeric user id. Passing something like `me` still
//! reaches the backend but returns a confusing 422, so in dev mode the
//! executor warns with enough context to find the call site.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// A route whose id segment must be numeric.
struct IdRoute {
    name: &'static str,
    re: Regex,
}

static ID_ROUTES: LazyLock<Vec<IdRoute>> = LazyLock::new(|| {
    [
        ("admin/users/:user_id", r"(?i)^admin/users/([^/?]+)(?:[/?]|$)"),
        ("actions/recent/:user_id", r"(?i)^actions/recent/([^/?]+)(?:[/?]|$)"),
        ("rewards/users/:user_id", r"(?i)^rewards/users/([^/?]+)(?:[/?]|$)"),
    ]
    .into_iter()
    .map(|(name, pattern)| IdRoute {
        name,
        re: Regex::new(pattern).expect("Invalid regex"),
    })
    .collect()
});

/// A non-numeric id segment on a numeric-id route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathViolation {
    /// Route pattern that matched.
    pub route: &'static str,
    /// Decoded id segment.
    pub segment: String,
}

/// Returns the first numeric-id route whose segment is not all digits.
///
/// `path` is the normalized request path (no leading slash).
pub fn check_path(path: &str) -> Option<PathViolation> {
    ID_ROUTES.iter().find_map(|route| {
        let raw = route.re.captures(path)?.get(1)?.as_str();
        let segment = urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());

        let numeric = !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit());
        (!numeric).then_some(PathViolation {
            route: route.name,
            segment,
        })
    })
}

/// Warns once if `path` violates a numeric-id route. Never blocks.
pub fn warn_on_violation(path: &str, url: &str) {
    if let Some(violation) = check_path(path) {
        warn!(
            matched = violation.route,
            segment = %violation.segment,
            path,
            url,
            "Non-numeric user_id segment"
        );
    }
}
