use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Descriptor for tool function parameters
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDescriptor {
    pub r#type: String,
    pub function: FunctionDescriptor,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Describe a function tool
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Trait for LLM tools
#[async_trait]
pub trait LlmTool: Send + Sync {
    /// Execute the tool with given arguments
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value>;

    /// Get tool descriptor for LLM
    fn descriptor(&self) -> ToolDescriptor;

    /// Name the model uses to request this tool
    fn name(&self) -> String {
        self.descriptor().function.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_descriptor_serialization() {
        let descriptor = ToolDescriptor::function(
            "test_tool",
            "A test tool",
            json!({
                "type": "object",
                "properties": {
                    "arg1": {"type": "string"}
                }
            }),
        );

        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("test_tool"));
        assert!(json.contains("A test tool"));
        assert!(json.contains("\"type\":\"function\""));
    }

    #[test]
    fn test_tool_descriptor_deserialization() {
        let json = r#"{
            "type": "function",
            "function": {
                "name": "get_recipe",
                "description": "Get recipe from a meal name",
                "parameters": {"type": "object"}
            }
        }"#;

        let descriptor: ToolDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.r#type, "function");
        assert_eq!(descriptor.function.name, "get_recipe");
        assert_eq!(descriptor.function.description, "Get recipe from a meal name");
    }

    struct MockTool;

    #[async_trait]
    impl LlmTool for MockTool {
        async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Ok(json!("result"))
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::function("mock_tool", "A mock tool", json!({}))
        }
    }

    #[test]
    fn test_tool_name_from_descriptor() {
        let tool = MockTool;
        assert_eq!(tool.name(), "mock_tool");
    }

    #[tokio::test]
    async fn test_tool_run() {
        let tool = MockTool;
        let result = tool.run(&HashMap::new()).await.unwrap();
        assert_eq!(result, json!("result"));
    }
}
