//! Subject normalization for fuzzy thread matching.

use std::sync::LazyLock;

use regex::Regex;

/// Leading markers stripped from subjects: reply markers with an optional
/// bracketed counter (`re:`, `re[2]:`), forward markers (`fw:`, `fwd:`) and
/// the `[external]` tag mail gateways prepend.
static LEADING_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:re|fw|fwd)(?:\[\d+\])?:\s*|\[external\]\s*)+").unwrap()
});

/// Stripping is re-applied until the string stops changing. The cap keeps
/// termination guaranteed even on input engineered to keep matching.
const MAX_STRIP_PASSES: usize = 16;

/// Normalize a subject line: trim, lowercase, strip leading reply/forward/
/// external markers to a fixed point.
///
/// Total and idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(subject: &str) -> String {
    let mut current = subject.trim().to_lowercase();

    for _ in 0..MAX_STRIP_PASSES {
        let stripped = LEADING_MARKERS.replace(&current, "").trim().to_string();
        if stripped == current {
            break;
        }
        current = stripped;
    }

    current
}
