//! OpenAI-compatible completion client (OpenAI, Groq, local gateways)

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use chat2bi_sql::{CompletionClient, CompletionError, GenerationParams};

use crate::config::LlmConfig;

pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The whole prompt goes out as a single user message
    fn request(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?,
        )];

        CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .temperature(params.temperature)
            .top_p(params.top_p)
            .max_completion_tokens(params.max_tokens)
            .build()
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, CompletionError> {
        let request = self
            .request(prompt, params)
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(CompletionError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_generation_params() {
        let client = OpenAiCompletionClient::new(&LlmConfig::default(), "test-key".to_string());
        let params = GenerationParams::default();

        let request = client.request("How many users?", &params).unwrap();
        assert_eq!(request.model, "llama3-8b-8192");
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.max_completion_tokens, Some(500));
        assert_eq!(request.messages.len(), 1);
        assert!(matches!(request.messages[0], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_model_from_config() {
        let config = LlmConfig {
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            ..LlmConfig::default()
        };
        let client = OpenAiCompletionClient::new(&config, "test-key".to_string());
        assert_eq!(client.model(), "gpt-4o-mini");
    }
}
