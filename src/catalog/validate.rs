//! Parameter validation.
//!
//! One validator per [`ParameterKind`] variant, resolved by a `match` rather
//! than runtime type-string comparison. Validators are pure: no filesystem
//! checks happen here, `file` and `directory` values are treated as opaque
//! strings once non-empty.

use std::fmt;

use crate::catalog::{ParameterKind, ParameterSpec};

/// Why a single parameter value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    Empty,
    NotInteger,
    NotNumber,
    ContainsWhitespace,
}

/// A rejected parameter, named for aggregated reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub parameter: String,
    pub failure: ValidationFailure,
}

impl fmt::Display for ValidationError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.failure {
            ValidationFailure::Empty => write!(f, "\"{}\" is empty", self.parameter),
            ValidationFailure::NotInteger => write!(f, "\"{}\" should be an integer", self.parameter),
            ValidationFailure::NotNumber => write!(f, "\"{}\" should be a number", self.parameter),
            ValidationFailure::ContainsWhitespace => write!(f, "\"{}\" should contain no space characters", self.parameter),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate one value against its spec.
///
/// A missing or empty value only fails when the spec is `required`; every
/// other rule applies to non-empty values.
pub fn validate(
    value: Option<&str>,
    spec: &ParameterSpec,
) -> std::result::Result<(), ValidationError> {
    let reject = |failure| {
        Err(ValidationError {
            parameter: spec.name.clone(),
            failure,
        })
    };

    // xmlcontent is passed through verbatim, emptiness included
    if spec.kind == ParameterKind::XmlContent {
        return Ok(());
    }

    let value = match value {
        None | Some("") => {
            if spec.required {
                return reject(ValidationFailure::Empty);
            }
            return Ok(());
        }
        Some(v) => v,
    };

    match spec.kind {
        ParameterKind::Int => {
            if value.parse::<i64>().is_err() {
                return reject(ValidationFailure::NotInteger);
            }
        }
        ParameterKind::Float => {
            match value.parse::<f64>() {
                Ok(number) if number.is_finite() => {}
                _ => return reject(ValidationFailure::NotNumber),
            }
        }
        ParameterKind::String => {
            if value.split(' ').count() != 1 {
                return reject(ValidationFailure::ContainsWhitespace);
            }
        }
        // opaque once non-empty; existence checks belong to the executor
        ParameterKind::File | ParameterKind::Directory => {}
        ParameterKind::XmlContent => unreachable!(),
    }
    Ok(())
}

/// Validate a set of `(spec, value)` pairs, collecting every failure message.
pub fn validate_all<'a, I>(pairs: I) -> std::result::Result<(), Vec<String>>
where
    I: IntoIterator<Item = (&'a ParameterSpec, Option<String>)>,
{
    let messages: Vec<String> = pairs
        .into_iter()
        .filter_map(|(spec, value)| validate(value.as_deref(), spec).err())
        .map(|e| e.to_string())
        .collect();

    if messages.is_empty() {
        Ok(())
    } else {
        Err(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(
        name: &str,
        kind: ParameterKind,
        required: bool,
    ) -> ParameterSpec {
        ParameterSpec {
            name: name.to_string(),
            kind,
            required,
            ..Default::default()
        }
    }

    #[test]
    fn test_int_validation() {
        let s = spec("iterations", ParameterKind::Int, true);
        assert!(validate(Some("42"), &s).is_ok());
        assert!(validate(Some("-7"), &s).is_ok());

        let err = validate(Some("4.2"), &s).unwrap_err();
        assert_eq!(err.failure, ValidationFailure::NotInteger);
        assert_eq!(err.to_string(), "\"iterations\" should be an integer");

        let err = validate(None, &s).unwrap_err();
        assert_eq!(err.failure, ValidationFailure::Empty);
        assert_eq!(err.to_string(), "\"iterations\" is empty");
    }

    #[test]
    fn test_int_optional_allows_empty() {
        let s = spec("iterations", ParameterKind::Int, false);
        assert!(validate(None, &s).is_ok());
        assert!(validate(Some(""), &s).is_ok());
        assert!(validate(Some("abc"), &s).is_err());
    }

    #[test]
    fn test_float_validation() {
        let s = spec("threshold", ParameterKind::Float, true);
        assert!(validate(Some("0.5"), &s).is_ok());
        assert!(validate(Some("-1e3"), &s).is_ok());
        assert_eq!(validate(Some("abc"), &s).unwrap_err().failure, ValidationFailure::NotNumber);
        assert_eq!(validate(Some("inf"), &s).unwrap_err().failure, ValidationFailure::NotNumber);
    }

    #[test]
    fn test_string_rejects_spaces() {
        let s = spec("prefix", ParameterKind::String, false);
        assert!(validate(Some("mesh_0"), &s).is_ok());
        let err = validate(Some("two words"), &s).unwrap_err();
        assert_eq!(err.failure, ValidationFailure::ContainsWhitespace);
        assert_eq!(err.to_string(), "\"prefix\" should contain no space characters");
    }

    #[test]
    fn test_file_and_directory_are_opaque() {
        let file = spec("input_volume", ParameterKind::File, true);
        assert!(validate(Some("volumes/brain scan.mhd"), &file).is_ok());
        assert_eq!(validate(Some(""), &file).unwrap_err().failure, ValidationFailure::Empty);

        let dir = spec("work_dir", ParameterKind::Directory, false);
        assert!(validate(None, &dir).is_ok());
    }

    #[test]
    fn test_xmlcontent_always_passes() {
        let s = spec("transform", ParameterKind::XmlContent, true);
        assert!(validate(Some("<a b=\"1\"> </a>"), &s).is_ok());
        assert!(validate(None, &s).is_ok());
        assert!(validate(Some(""), &s).is_ok());
    }

    #[test]
    fn test_validate_all_aggregates() {
        let specs = vec![spec("iterations", ParameterKind::Int, true), spec("threshold", ParameterKind::Float, true), spec("prefix", ParameterKind::String, false)];
        let values = vec![None, Some("abc".to_string()), Some("ok".to_string())];

        let messages = validate_all(specs.iter().zip(values)).unwrap_err();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("iterations"));
        assert!(messages[1].contains("threshold"));
    }
}
