//! Parameter name validation
//!
//! Parameter names end up as identifiers in generated scripts, so they
//! follow the identifier grammar: a letter or `_`, then letters, digits
//! or `_`. Any Unicode letter or digit is accepted.

use cygnet_core::{Error, Result};

/// True if `name` is a valid parameter identifier
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Validate a parameter name, returning `InvalidParameterName` on failure
pub fn validate_parameter_name(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidParameterName(name.to_string()))
    }
}

/// Validate every name, failing on the first invalid one
pub fn validate_parameter_names<'a, I>(names: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().try_for_each(validate_parameter_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_identifier("name"));
        assert!(is_valid_identifier("_x1"));
        assert!(is_valid_identifier("élan"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier("🐼"));

        let err = validate_parameter_name("🐼").unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter name: 🐼");
    }

    #[test]
    fn test_validate_many_stops_at_first_failure() {
        let err = validate_parameter_names(["ok", "no way", "1st"]).unwrap_err();
        assert_eq!(err, Error::InvalidParameterName("no way".to_string()));
    }

    proptest! {
        #[test]
        fn prop_ascii_identifiers_are_valid(name in "[a-zA-Z_][a-zA-Z0-9_]{0,20}") {
            prop_assert!(is_valid_identifier(&name));
        }

        #[test]
        fn prop_leading_digit_is_invalid(name in "[0-9][a-zA-Z0-9_]{0,20}") {
            prop_assert!(validate_parameter_name(&name).is_err());
        }
    }
}
