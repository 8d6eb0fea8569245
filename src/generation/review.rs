//! Self-review verdict parsing
//!
//! The reviewer answers in two lines: `TRUE`/`FALSE` (does the page need
//! fixes), then a comma-separated list of issues.

/// Parsed reviewer answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// No fixes needed
    Clean,
    /// Fixes needed; carries the issue line verbatim
    NeedsFixes(String),
    /// Reply did not follow the two-line format
    Unparsable,
}

impl ReviewVerdict {
    pub fn parse(reply: &str) -> Self {
        let mut lines = reply.trim().lines().map(str::trim);
        let first = lines.next().unwrap_or("");

        if first.eq_ignore_ascii_case("FALSE") {
            return ReviewVerdict::Clean;
        }
        if first.eq_ignore_ascii_case("TRUE") {
            if let Some(issues) = lines.next().filter(|line| !line.is_empty()) {
                return ReviewVerdict::NeedsFixes(issues.to_string());
            }
        }
        ReviewVerdict::Unparsable
    }

    /// Issues to hand to the repair pass; `None` means skip repair
    ///
    /// Unparsable replies fail open and never block the page.
    pub fn issues(&self) -> Option<&str> {
        match self {
            ReviewVerdict::NeedsFixes(issues) => Some(issues),
            ReviewVerdict::Clean | ReviewVerdict::Unparsable => None,
        }
    }
}
