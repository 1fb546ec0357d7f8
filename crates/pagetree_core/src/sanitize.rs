use engine_logging::engine_warn;

/// Substrings that must never survive into a single path segment.
const FORBIDDEN: &[&str] = &["..", "/", "\\", ">", "<", ":", "\"", "|", "?", "*"];

/// Map an arbitrary page title onto a string usable as one path segment.
///
/// Every forbidden substring is replaced by `_`. Strings without forbidden
/// characters come back unchanged, and sanitizing twice is the same as once.
pub fn sanitize_filename(raw: &str) -> String {
    let mut name = raw.to_string();
    for forbidden in FORBIDDEN {
        if name.contains(forbidden) {
            engine_warn!(
                "Dangerous page title: {:?}, {:?} found, replacing it with \"_\"",
                raw,
                forbidden
            );
            name = name.replace(forbidden, "_");
        }
    }
    name
}

/// Case-insensitive title prefixes whose pages (and subtrees) are left out of a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnorePatterns {
    prefixes: Vec<String>,
}

impl IgnorePatterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    /// Parse the comma separated form used on the command line.
    pub fn from_comma_separated(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn matches(&self, title: &str) -> bool {
        let lowered = title.to_lowercase();
        self.prefixes.iter().any(|p| lowered.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_filename, IgnorePatterns};

    #[test]
    fn parent_reference_collapses_before_single_dots() {
        assert_eq!(sanitize_filename("a...b"), "a_.b");
        assert_eq!(sanitize_filename("a_.b"), "a_.b");
    }

    #[test]
    fn blank_patterns_are_dropped() {
        let patterns = IgnorePatterns::from_comma_separated(" , Archive,,");
        assert!(!patterns.is_empty());
        assert!(patterns.matches("ARCHIVE 2019"));
        assert!(!patterns.matches("Home"));
        assert!(IgnorePatterns::from_comma_separated(" , ").is_empty());
    }
}
