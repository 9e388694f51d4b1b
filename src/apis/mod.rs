pub mod recipe_client;

pub use recipe_client::{ApiRecipe, RecipeApiClient};
