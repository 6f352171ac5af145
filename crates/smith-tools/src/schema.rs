//! Declarative argument descriptors and the single shared validation
//! routine every tool's schema is checked against (spec.md §9 — avoids
//! coupling the core to any one JSON-schema validation library).

use serde_json::Value;

use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
}

impl ArgSpec {
    pub const fn required(name: &'static str, ty: ArgType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, ty: ArgType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

fn matches_type(value: &Value, ty: ArgType) -> bool {
    match ty {
        ArgType::String => value.is_string(),
        ArgType::Integer => value.is_i64() || value.is_u64(),
        ArgType::Boolean => value.is_boolean(),
        ArgType::Array => value.is_array(),
        ArgType::Object => value.is_object(),
    }
}

/// Validate `args` against `spec`: every required field must be present and
/// type-correct; optional fields, if present, must still be type-correct.
/// Unknown fields are ignored (matches the wire envelope's tolerance for
/// unknown fields, spec.md §6).
pub fn validate(spec: &[ArgSpec], args: &Value) -> Result<(), ToolError> {
    let obj = args
        .as_object()
        .ok_or_else(|| ToolError::BadArguments("arguments must be a JSON object".to_string()))?;

    for field in spec {
        match obj.get(field.name) {
            Some(value) if value.is_null() && !field.required => {}
            Some(value) => {
                if !matches_type(value, field.ty) {
                    return Err(ToolError::BadArguments(format!(
                        "field '{}' has wrong type (expected {:?})",
                        field.name, field.ty
                    )));
                }
            }
            None if field.required => {
                return Err(ToolError::BadArguments(format!(
                    "missing required field '{}'",
                    field.name
                )));
            }
            None => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_valid_args() {
        let spec = [
            ArgSpec::required("path", ArgType::String),
            ArgSpec::optional("recursive", ArgType::Boolean),
        ];
        assert!(validate(&spec, &json!({"path": "a.txt"})).is_ok());
        assert!(validate(&spec, &json!({"path": "a.txt", "recursive": true})).is_ok());
    }

    #[test]
    fn rejects_missing_required() {
        let spec = [ArgSpec::required("path", ArgType::String)];
        let err = validate(&spec, &json!({})).unwrap_err();
        assert!(matches!(err, ToolError::BadArguments(_)));
    }

    #[test]
    fn rejects_wrong_type() {
        let spec = [ArgSpec::required("path", ArgType::String)];
        let err = validate(&spec, &json!({"path": 5})).unwrap_err();
        assert!(matches!(err, ToolError::BadArguments(_)));
    }

    #[test]
    fn ignores_unknown_fields() {
        let spec = [ArgSpec::required("path", ArgType::String)];
        assert!(validate(&spec, &json!({"path": "a.txt", "extra": true})).is_ok());
    }
}
