use serde_json::Value;

use crate::error::CommandError;

/// Typed access to request arguments.
///
/// Every accessor fails with `InvalidArgument` on a missing required field or a
/// type mismatch; nothing is coerced. JSON `null` counts as absent.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    value: &'a Value,
}

impl<'a> Arguments<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.value.get(name).filter(|v| !v.is_null())
    }

    fn required(&self, name: &str) -> Result<&'a Value, CommandError> {
        self.get(name)
            .ok_or_else(|| CommandError::invalid_argument(format!("Missing argument '{}'", name)))
    }

    pub fn i64(&self, name: &str) -> Result<i64, CommandError> {
        let value = self.required(name)?;
        value.as_i64().ok_or_else(|| mismatch(name, "an integer", value))
    }

    pub fn i64_opt(&self, name: &str) -> Result<Option<i64>, CommandError> {
        self.get(name)
            .map(|value| value.as_i64().ok_or_else(|| mismatch(name, "an integer", value)))
            .transpose()
    }

    pub fn i64_or(&self, name: &str, default: i64) -> Result<i64, CommandError> {
        Ok(self.i64_opt(name)?.unwrap_or(default))
    }

    pub fn str(&self, name: &str) -> Result<&'a str, CommandError> {
        let value = self.required(name)?;
        value.as_str().ok_or_else(|| mismatch(name, "a string", value))
    }

    pub fn str_or(&self, name: &str, default: &'a str) -> Result<&'a str, CommandError> {
        match self.get(name) {
            Some(value) => value.as_str().ok_or_else(|| mismatch(name, "a string", value)),
            None => Ok(default),
        }
    }

    pub fn bool_opt(&self, name: &str) -> Result<Option<bool>, CommandError> {
        self.get(name)
            .map(|value| value.as_bool().ok_or_else(|| mismatch(name, "a boolean", value)))
            .transpose()
    }

    pub fn array(&self, name: &str) -> Result<&'a [Value], CommandError> {
        let value = self.required(name)?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| mismatch(name, "an array", value))
    }

    pub fn object(&self, name: &str) -> Result<Arguments<'a>, CommandError> {
        let value = self.required(name)?;
        if value.is_object() {
            Ok(Arguments::new(value))
        } else {
            Err(mismatch(name, "an object", value))
        }
    }

    /// A list of strings; absent means empty.
    pub fn strings_or_empty(&self, name: &str) -> Result<Vec<String>, CommandError> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| mismatch(name, "an array of strings", value))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| mismatch(name, "an array of strings", value))
            })
            .collect()
    }
}

fn mismatch(name: &str, expected: &str, found: &Value) -> CommandError {
    CommandError::invalid_argument(format!(
        "Argument '{}' must be {}, found {}",
        name, expected, found
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;
    use serde_json::json;

    #[test]
    fn test_required_integer() {
        let value = json!({"threadId": 5});
        let args = Arguments::new(&value);
        assert_eq!(args.i64("threadId"), Ok(5));
        assert_eq!(args.i64("frameId").unwrap_err().code, ResultCode::InvalidArgument);
    }

    #[test]
    fn test_type_mismatch_is_not_coerced() {
        let value = json!({"threadId": "5", "levels": 1.5});
        let args = Arguments::new(&value);
        assert_eq!(args.i64("threadId").unwrap_err().code, ResultCode::InvalidArgument);
        assert!(args.i64_or("levels", 0).is_err());
    }

    #[test]
    fn test_defaults_apply_to_absent_and_null() {
        let value = json!({"condition": null});
        let args = Arguments::new(&value);
        assert_eq!(args.str_or("condition", ""), Ok(""));
        assert_eq!(args.i64_or("startFrame", 0), Ok(0));
        assert_eq!(args.bool_opt("terminateDebuggee"), Ok(None));
    }

    #[test]
    fn test_null_arguments_behave_as_empty_object() {
        let value = Value::Null;
        let args = Arguments::new(&value);
        assert_eq!(args.strings_or_empty("args"), Ok(Vec::new()));
        assert!(args.str("cwd").is_err());
    }

    #[test]
    fn test_strings_or_empty_rejects_mixed_arrays() {
        let value = json!({"args": ["a", 1]});
        let args = Arguments::new(&value);
        assert!(args.strings_or_empty("args").is_err());
    }

    #[test]
    fn test_nested_object() {
        let value = json!({"source": {"path": "/src/main.cs"}});
        let args = Arguments::new(&value);
        assert_eq!(args.object("source").unwrap().str("path"), Ok("/src/main.cs"));
        assert!(Arguments::new(&json!({"source": 1})).object("source").is_err());
    }
}
