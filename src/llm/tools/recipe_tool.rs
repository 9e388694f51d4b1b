use crate::apis::{ApiRecipe, RecipeApiClient};
use crate::error::{AssistantError, Result};
use crate::llm::tools::{LlmTool, ToolDescriptor};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

pub const TOOL_NAME: &str = "get_recipe";

/// Arguments the model supplies to the recipe tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecipeRequest {
    /// Name of the recipe
    pub name: String,
}

/// Recipe returned to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub servings: String,
}

impl From<ApiRecipe> for Recipe {
    fn from(data: ApiRecipe) -> Self {
        Self {
            title: data.title,
            ingredients: split_items(&data.ingredients, &["INGREDIENTS:"]),
            instructions: split_items(&data.instructions, &["'DIRECTIONS:", "DIRECTIONS:"]),
            servings: data.servings,
        }
    }
}

fn split_items(raw: &str, prefixes: &[&str]) -> Vec<String> {
    let cleaned = prefixes.iter().fold(raw.to_string(), |acc, prefix| acc.replace(prefix, ""));
    cleaned
        .split('|')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Tool that looks up a recipe by meal name
///
/// # Examples
///
/// ```ignore
/// use recipe_assistant::apis::RecipeApiClient;
/// use recipe_assistant::config::RecipeApiConfig;
/// use recipe_assistant::llm::tools::recipe_tool::RecipeTool;
///
/// let client = RecipeApiClient::new(RecipeApiConfig::from_env())?;
/// let tool = RecipeTool::new(client);
/// ```
#[derive(Clone)]
pub struct RecipeTool {
    client: RecipeApiClient,
}

impl RecipeTool {
    pub fn new(client: RecipeApiClient) -> Self {
        Self { client }
    }

    fn parameters_schema() -> Value {
        let mut schema = serde_json::to_value(schemars::schema_for!(RecipeRequest))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        schema
    }
}

#[async_trait]
impl LlmTool for RecipeTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let request: RecipeRequest =
            serde_json::from_value(Value::Object(args.clone().into_iter().collect())).map_err(
                |e| AssistantError::InvalidArgument(format!("get_recipe expects a name: {}", e)),
            )?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(AssistantError::InvalidArgument(
                "name parameter cannot be empty".to_string(),
            ));
        }

        let data = self
            .client
            .get_recipes(name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::ToolError(format!("No recipe found for '{}'", name)))?;

        let recipe = Recipe::from(data);
        let rendered = serde_json::to_string_pretty(&recipe)?;
        info!("Recipe found: {}", recipe.title);

        Ok(Value::String(rendered))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(TOOL_NAME, "Get recipe from a meal name", Self::parameters_schema())
    }
}
