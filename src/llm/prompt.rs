//! Chat prompt template: fixed system instructions, the chat history, then the current
//! user input.

use crate::llm::models::LlmMessage;

pub const RECIPE_ASSISTANT_SYSTEM_PROMPT: &str = "You are a helpful recipe assistant that provides cooking recipes, nutritional information.\n\
Respond in a friendly, conversational manner.";

const INPUT_PLACEHOLDER: &str = "{input}";

#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    system: String,
    human: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::recipe_assistant()
    }
}

impl PromptTemplate {
    /// Create a template; `human` may contain `{input}` where the user's text goes
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            human: human.into(),
        }
    }

    pub fn recipe_assistant() -> Self {
        Self::new(RECIPE_ASSISTANT_SYSTEM_PROMPT, INPUT_PLACEHOLDER)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Fill the human template with the user's input
    pub fn format_input(&self, input: &str) -> String {
        self.human.replace(INPUT_PLACEHOLDER, input)
    }

    /// Messages for one model invocation: system, history, then the formatted input
    pub fn render(&self, history: &[LlmMessage], input: &str) -> Vec<LlmMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(LlmMessage::system(&self.system));
        messages.extend(history.iter().cloned());
        messages.push(LlmMessage::user(self.format_input(input)));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::MessageRole;

    #[test]
    fn test_recipe_assistant_template() {
        let template = PromptTemplate::default();
        assert!(template.system().starts_with("You are a helpful recipe assistant"));
        assert_eq!(template.format_input("How do I make risotto?"), "How do I make risotto?");
    }

    #[test]
    fn test_render_orders_system_history_input() {
        let template = PromptTemplate::recipe_assistant();
        let history = vec![LlmMessage::user("Hi"), LlmMessage::assistant("Hello! Hungry?")];

        let messages = template.render(&history, "Something with spinach");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1], history[0]);
        assert_eq!(messages[2], history[1]);
        assert_eq!(messages[3].role, MessageRole::User);
        assert_eq!(messages[3].content.as_deref(), Some("Something with spinach"));
    }

    #[test]
    fn test_custom_human_template() {
        let template = PromptTemplate::new("Be terse.", "Question: {input}");
        let messages = template.render(&[], "boil an egg?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.as_deref(), Some("Be terse."));
        assert_eq!(messages[1].content.as_deref(), Some("Question: boil an egg?"));
    }
}
