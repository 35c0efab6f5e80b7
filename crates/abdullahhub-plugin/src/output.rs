//! Interpreting what a plugin returned.

use serde_json::{Value, json};

use crate::error::PluginError;

/// A plugin ran to completion and answered with a contract-conforming object.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The plugin reported `success: true`.
    Succeeded(Value),
    /// The plugin reported `success: false`.
    Declined {
        /// The plugin's `error` field, or a generic message.
        error: String,
        /// Everything the plugin returned.
        output: Value,
    },
}

impl ExecutionOutcome {
    /// Classify a plugin's raw output.
    ///
    /// The output must be an object with a boolean `success` field.
    pub fn from_output(output: Value) -> Result<Self, PluginError> {
        let success = match output.get("success") {
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(PluginError::InvalidOutput(
                    "'success' must be a boolean".into(),
                ));
            }
            None if output.is_object() => {
                return Err(PluginError::InvalidOutput("missing 'success' field".into()));
            }
            None => return Err(PluginError::InvalidOutput("expected a JSON object".into())),
        };

        if success {
            Ok(Self::Succeeded(output))
        } else {
            let error = output
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Plugin execution failed")
                .to_string();
            Ok(Self::Declined { error, output })
        }
    }

    /// Whether the plugin reported success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// The error message of a declined execution.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Succeeded(_) => None,
            Self::Declined { error, .. } => Some(error),
        }
    }

    /// The HTTP body relayed to the caller.
    pub fn into_body(self) -> Value {
        match self {
            Self::Succeeded(output) => json!({"success": true, "result": output}),
            Self::Declined { error, output } => {
                json!({"success": false, "error": error, "result": output})
            }
        }
    }
}

/// Build a successful plugin answer, merging `fields` into `{"success": true}`.
pub fn success(fields: Value) -> Value {
    let mut body = json!({"success": true});
    if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), fields) {
        target.extend(extra);
    }
    body
}

/// Build a declined plugin answer.
pub fn failure(error: impl Into<String>) -> Value {
    json!({"success": false, "error": error.into()})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_body() {
        let outcome = ExecutionOutcome::from_output(success(json!({"image": "abc"}))).unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            outcome.into_body(),
            json!({"success": true, "result": {"success": true, "image": "abc"}})
        );
    }

    #[test]
    fn test_declined_body() {
        let outcome = ExecutionOutcome::from_output(failure("No image provided")).unwrap();
        assert_eq!(outcome.error(), Some("No image provided"));
        let body = outcome.into_body();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No image provided");
        assert_eq!(body["result"]["error"], "No image provided");
    }

    #[test]
    fn test_declined_without_message() {
        let outcome = ExecutionOutcome::from_output(json!({"success": false})).unwrap();
        assert_eq!(outcome.error(), Some("Plugin execution failed"));
    }

    #[test]
    fn test_contract_violations() {
        assert!(ExecutionOutcome::from_output(json!([1, 2])).is_err());
        assert!(ExecutionOutcome::from_output(json!({"result": 1})).is_err());
        assert!(ExecutionOutcome::from_output(json!({"success": "yes"})).is_err());
    }
}
