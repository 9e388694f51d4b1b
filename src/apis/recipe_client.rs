use crate::config::RecipeApiConfig;
use crate::error::{AssistantError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// A recipe as returned by the recipe API.
///
/// Ingredients and instructions arrive as single `|`-separated strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRecipe {
    pub title: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub servings: String,
    #[serde(default)]
    pub instructions: String,
}

/// HTTP client for the recipe lookup API
#[derive(Clone)]
pub struct RecipeApiClient {
    client: Client,
    config: RecipeApiConfig,
}

impl RecipeApiClient {
    pub fn new(config: RecipeApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Search recipes by meal name
    pub async fn get_recipes(&self, name: &str) -> Result<Vec<ApiRecipe>> {
        let api_url = format!(
            "{}recipe?query={}",
            with_trailing_slash(&self.config.base_url),
            urlencoding::encode(name)
        );
        info!("Invoking recipe API using endpoint {}", api_url);

        let response = self
            .client
            .get(&api_url)
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Recipe API error: {} - {}", status, body);
            return Err(AssistantError::ApiError(format!(
                "Recipe API returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

fn with_trailing_slash(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> RecipeApiClient {
        RecipeApiClient::new(RecipeApiConfig {
            api_key: "ninja-key".to_string(),
            base_url: format!("{}/v1/", server.url()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_with_trailing_slash() {
        assert_eq!(with_trailing_slash("http://x/v1"), "http://x/v1/");
        assert_eq!(with_trailing_slash("http://x/v1/"), "http://x/v1/");
    }

    #[tokio::test]
    async fn test_get_recipes_sends_key_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/recipe")
            .match_query(mockito::Matcher::UrlEncoded(
                "query".to_string(),
                "chicken parmesan".to_string(),
            ))
            .match_header("X-Api-Key", "ninja-key")
            .with_status(200)
            .with_body(
                r#"[{"title":"Chicken Parmesan","ingredients":"1 chicken|Cheese","servings":"4 Servings","instructions":"Bake it."}]"#,
            )
            .create_async()
            .await;

        let recipes = client_for(&server).get_recipes("chicken parmesan").await.unwrap();

        mock.assert_async().await;
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].title, "Chicken Parmesan");
        assert_eq!(recipes[0].servings, "4 Servings");
    }

    #[tokio::test]
    async fn test_get_recipes_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/recipe")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":"Invalid API Key."}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_recipes("soup").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, AssistantError::ApiError(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_get_recipes_empty_result() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/recipe")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let recipes = client_for(&server).get_recipes("nothing").await.unwrap();
        assert!(recipes.is_empty());
    }
}
