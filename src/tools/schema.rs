//! Tool parameter schemas
//!
//! Read-only descriptions of what a tool accepts. The registry hands these
//! to the planner (to enumerate tools in prompts) and uses them to validate
//! argument records at the dispatch boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// JSON Schema type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Check a JSON value against this kind
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One declared tool parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,

    /// Closed set of accepted values, when the parameter is an enum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

impl ToolParameter {
    /// Required parameter
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
            allowed: None,
        }
    }

    /// Optional parameter
    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
            allowed: None,
        }
    }

    /// Restrict to a closed value set
    pub fn with_allowed(mut self, allowed: Vec<String>) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// A tool's full parameter schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolSchema {
    /// Create a schema
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Vec<ToolParameter>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Render as a JSON Schema object for function advertisement
    pub fn to_json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = serde_json::json!({
                "type": param.kind.type_name(),
                "description": param.description,
            });
            if let Some(allowed) = &param.allowed {
                prop["enum"] = serde_json::json!(allowed);
            }
            properties.insert(param.name.clone(), prop);
            if param.required {
                required.push(param.name.clone());
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Render a one-line summary for embedding in planner prompts
    pub fn render_for_prompt(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                let req = if p.required { "required" } else { "optional" };
                format!("{}: {} ({})", p.name, p.kind.type_name(), req)
            })
            .collect::<Vec<_>>()
            .join(", ");
        if params.is_empty() {
            format!("- {}: {}", self.name, self.description)
        } else {
            format!("- {}: {} [{}]", self.name, self.description, params)
        }
    }

    /// Validate an argument record against this schema
    ///
    /// Checks that required parameters are present and that present values
    /// match their declared kind. Unknown keys pass through untouched.
    pub fn validate_args(&self, args: &Value) -> Result<(), String> {
        let object = args.as_object().ok_or_else(|| "arguments must be an object".to_string())?;

        for param in &self.parameters {
            match object.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(format!("missing required parameter '{}'", param.name));
                    }
                }
                Some(value) => {
                    if !param.kind.matches(value) {
                        return Err(format!(
                            "parameter '{}' expects {}, got {}",
                            param.name,
                            param.kind.type_name(),
                            json_type_name(value)
                        ));
                    }
                    if let Some(allowed) = &param.allowed
                        && let Some(s) = value.as_str()
                        && !allowed.iter().any(|a| a == s)
                    {
                        return Err(format!("parameter '{}' must be one of {:?}", param.name, allowed));
                    }
                }
            }
        }
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_schema() -> ToolSchema {
        ToolSchema::new(
            "write_file",
            "Write content to a file",
            vec![
                ToolParameter::required("file_path", ParamKind::String, "Path to write"),
                ToolParameter::optional("content", ParamKind::String, "Content to write"),
            ],
        )
    }

    #[test]
    fn test_to_json_schema() {
        let schema = write_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["file_path"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["file_path"]));
    }

    #[test]
    fn test_render_for_prompt() {
        let line = write_schema().render_for_prompt();
        assert!(line.starts_with("- write_file:"));
        assert!(line.contains("file_path: string (required)"));
        assert!(line.contains("content: string (optional)"));
    }

    #[test]
    fn test_validate_args_ok() {
        let schema = write_schema();
        assert!(schema.validate_args(&serde_json::json!({"file_path": "a.txt", "content": "x"})).is_ok());
        // optional content may be absent or null (null means "generate later")
        assert!(schema.validate_args(&serde_json::json!({"file_path": "a.txt"})).is_ok());
        assert!(schema.validate_args(&serde_json::json!({"file_path": "a.txt", "content": null})).is_ok());
    }

    #[test]
    fn test_validate_args_missing_required() {
        let schema = write_schema();
        let err = schema.validate_args(&serde_json::json!({"content": "x"})).unwrap_err();
        assert!(err.contains("file_path"));
    }

    #[test]
    fn test_validate_args_wrong_type() {
        let schema = write_schema();
        let err = schema.validate_args(&serde_json::json!({"file_path": 42})).unwrap_err();
        assert!(err.contains("expects string"));
    }

    #[test]
    fn test_validate_args_enum() {
        let schema = ToolSchema::new(
            "git",
            "Version control operations",
            vec![
                ToolParameter::required("operation", ParamKind::String, "Operation to run")
                    .with_allowed(vec!["status".into(), "diff".into(), "commit".into()]),
            ],
        );
        assert!(schema.validate_args(&serde_json::json!({"operation": "status"})).is_ok());
        assert!(schema.validate_args(&serde_json::json!({"operation": "rebase"})).is_err());
    }
}
