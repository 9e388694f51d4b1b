pub mod recipe_tool;
pub mod registry;
mod tool;

pub use recipe_tool::RecipeTool;
pub use registry::{ToolOutcome, ToolRegistry};
pub use tool::{FunctionDescriptor, LlmTool, ToolDescriptor};
