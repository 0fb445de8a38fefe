//! Tool descriptors and their JSON Schema rendering
//!
//! A [`ToolDescriptor`] is the typed form of a tool definition: an ordered
//! parameter list rather than a free-form schema. The server renders it into
//! the `inputSchema` of a [`Tool`]; the client reads it back from one.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::mcp::types::Tool;

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    /// JSON Schema type name
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }

    fn from_schema(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ParamType::String),
            "number" => Some(ParamType::Number),
            "integer" => Some(ParamType::Integer),
            "boolean" => Some(ParamType::Boolean),
            _ => None,
        }
    }

    /// Whether a JSON value is acceptable for this type
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub optional: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A parameter the caller must supply
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            optional: false,
            default: None,
        }
    }

    /// A parameter that may be omitted, filled from `default` when present
    pub fn optional(
        name: &str,
        param_type: ParamType,
        description: &str,
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            optional: true,
            default,
        }
    }
}

/// Typed description of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
        }
    }

    /// Render the parameter list as a JSON Schema object
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut prop = json!({
                "type": param.param_type.as_str(),
                "description": param.description,
            });
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.clone(), prop);

            if !param.optional {
                required.push(Value::String(param.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Wire form of the descriptor
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema(),
        }
    }

    /// Read a descriptor back from a wire tool definition.
    ///
    /// Properties with a type outside [`ParamType`] are treated as strings.
    /// Required parameters come first, in the order of the `required` list.
    pub fn from_tool(tool: &Tool) -> Self {
        let schema = &tool.input_schema;
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut params = Vec::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, prop) in properties {
                let param_type = prop
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(ParamType::from_schema)
                    .unwrap_or(ParamType::String);

                params.push(ParamSpec {
                    name: name.clone(),
                    param_type,
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    optional: !required.contains(&name.as_str()),
                    default: prop.get("default").cloned(),
                });
            }
        }

        params.sort_by_key(|p| {
            required
                .iter()
                .position(|r| *r == p.name)
                .unwrap_or(usize::MAX)
        });

        Self {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            params,
        }
    }

    /// Short call signature, e.g. `list_files([directory: string = "."])`
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| match (&p.default, p.optional) {
                (Some(default), _) => format!("[{}: {} = {}]", p.name, p.param_type, default),
                (None, true) => format!("[{}: {}]", p.name, p.param_type),
                (None, false) => format!("{}: {}", p.name, p.param_type),
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!("{}({})", self.name, params)
    }
}
