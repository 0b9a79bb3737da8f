//! Structured country/variable identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default separator between country and variable in combined names ("US.y")
pub const DEFAULT_SEPARATOR: &str = ".";

/// Identifier of one endogenous variable of the global model
///
/// Combined names are split once when a posterior is loaded; everything
/// downstream indexes arrays by position and carries these alongside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId {
    pub country: String,
    pub variable: String,
}

impl VariableId {
    pub fn new(country: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            variable: variable.into(),
        }
    }

    /// Split a combined name at the first occurrence of `separator`
    ///
    /// A name without the separator is treated as a variable of an unnamed
    /// country, which is how single-country models come through.
    pub fn parse(name: &str, separator: &str) -> Self {
        match name.split_once(separator) {
            Some((country, variable)) if !separator.is_empty() => Self::new(country, variable),
            _ => Self::new("", name),
        }
    }

    /// Combined label using the given separator
    pub fn label(&self, separator: &str) -> String {
        if self.country.is_empty() {
            self.variable.clone()
        } else {
            format!("{}{}{}", self.country, separator, self.variable)
        }
    }

    /// Whether `name` refers to this identifier, either as a combined label
    /// or as a bare variable name of a single-country model
    pub fn matches(&self, name: &str, separator: &str) -> bool {
        self.label(separator) == name || (self.country.is_empty() && self.variable == name)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label(DEFAULT_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_combined_name() {
        let id = VariableId::parse("US.y", ".");
        assert_eq!(id.country, "US");
        assert_eq!(id.variable, "y");
        assert_eq!(id.label("."), "US.y");
    }

    #[test]
    fn test_parse_splits_on_first_separator() {
        let id = VariableId::parse("EA.stir.long", ".");
        assert_eq!(id.country, "EA");
        assert_eq!(id.variable, "stir.long");
    }

    #[test]
    fn test_parse_without_separator() {
        let id = VariableId::parse("Dp", ".");
        assert_eq!(id.country, "");
        assert_eq!(id.to_string(), "Dp");
        assert!(id.matches("Dp", "."));
    }
}
