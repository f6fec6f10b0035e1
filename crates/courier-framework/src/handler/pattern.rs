use std::fmt;

use regex::{Captures, Regex};

/// A route pattern that must match the whole input.
#[derive(Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compiles `source` anchored at both ends.
    pub fn compile(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&format!(r"\A(?:{source})\z"))?;
        Ok(Self { source, regex })
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern matches all of `input`.
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    /// Captures of a full match of `input`.
    pub fn captures<'h>(&self, input: &'h str) -> Option<Captures<'h>> {
        self.regex.captures(input)
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.source)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_match_only() {
        let pattern = RoutePattern::compile("/start").unwrap();
        assert!(pattern.is_match("/start"));
        assert!(!pattern.is_match("/start now"));
        assert!(!pattern.is_match("please /start"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let pattern = RoutePattern::compile("yes|no").unwrap();
        assert!(pattern.is_match("no"));
        assert!(!pattern.is_match("yesno"));
        assert!(!pattern.is_match("nope"));
    }

    #[test]
    fn test_captures_keep_group_numbers() {
        let pattern = RoutePattern::compile(r"/add (\d+) (\d+)").unwrap();
        let caps = pattern.captures("/add 2 3").unwrap();
        assert_eq!(&caps[0], "/add 2 3");
        assert_eq!(&caps[1], "2");
        assert_eq!(&caps[2], "3");
        assert_eq!(pattern.to_string(), r"/add (\d+) (\d+)");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RoutePattern::compile("(unclosed").is_err());
    }
}
