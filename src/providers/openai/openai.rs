use anyhow::{anyhow, Result};
use async_openai::{
    config::{AzureConfig, Config, OpenAIConfig},
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs,
        FunctionCall, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

use crate::agent::{Message, ToolCall, ToolSpec};
use crate::config::ProviderConfig;
use crate::providers::traits::{AssistantTurn, CompletionProvider, EmbeddingProvider};
use crate::providers::utils::{is_transient_openai, RetryPolicy};

/// Chat and embedding client over any OpenAI-compatible backend. Sampling
/// temperature is pinned to zero so answers are reproducible.
#[derive(Clone)]
pub struct OpenAIProvider<C: Config> {
    chat_client: Client<C>,
    embedding_client: Client<C>,
    chat_model: String,
    embedding_model: String,
    retry: RetryPolicy,
}

impl OpenAIProvider<OpenAIConfig> {
    pub fn openai(api_key: Option<String>, chat_model: String, embedding_model: String) -> Self {
        let mut config = OpenAIConfig::new();
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        let client = Client::with_config(config);
        Self {
            chat_client: client.clone(),
            embedding_client: client,
            chat_model,
            embedding_model,
            retry: RetryPolicy::default(),
        }
    }
}

impl OpenAIProvider<AzureConfig> {
    pub fn azure(
        api_key: &str,
        endpoint: &str,
        api_version: &str,
        chat_deployment: String,
        embedding_deployment: String,
    ) -> Self {
        let base = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_version(api_version)
            .with_api_key(api_key);
        Self {
            chat_client: Client::with_config(base.clone().with_deployment_id(chat_deployment.as_str())),
            embedding_client: Client::with_config(
                base.with_deployment_id(embedding_deployment.as_str()),
            ),
            chat_model: chat_deployment,
            embedding_model: embedding_deployment,
            retry: RetryPolicy::default(),
        }
    }
}

impl<C: Config + Send + Sync + 'static> OpenAIProvider<C> {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn create_chat(&self, request: CreateChatCompletionRequest) -> Result<AssistantTurn> {
        let client = &self.chat_client;
        let response = self
            .retry
            .run("chat completion", is_transient_openai, move || {
                let request = request.clone();
                async move { client.chat().create(request).await.map_err(anyhow::Error::from) }
            })
            .await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| anyhow!("No response content"))?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(AssistantTurn {
            content: message.content,
            tool_calls,
        })
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let converted = match message {
        Message::System { content } => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(content.as_str())
                .build()?,
        ),
        Message::Human { content } => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(content.as_str())
                .build()?,
        ),
        Message::Ai { content, tool_calls } => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(text) = content {
                builder.content(text.as_str());
            }
            if !tool_calls.is_empty() {
                builder.tool_calls(
                    tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            ChatCompletionRequestMessage::Assistant(builder.build()?)
        }
        Message::Tool { call_id, content, .. } => ChatCompletionRequestMessage::Tool(
            ChatCompletionRequestToolMessageArgs::default()
                .content(content.as_str())
                .tool_call_id(call_id.as_str())
                .build()?,
        ),
    };
    Ok(converted)
}

fn to_tool(spec: &ToolSpec) -> Result<ChatCompletionTool> {
    Ok(ChatCompletionToolArgs::default()
        .r#type(ChatCompletionToolType::Function)
        .function(
            FunctionObjectArgs::default()
                .name(spec.name.as_str())
                .description(spec.description.as_str())
                .parameters(spec.parameters.clone())
                .build()?,
        )
        .build()?)
}

#[async_trait]
impl<C: Config + Send + Sync + 'static> CompletionProvider for OpenAIProvider<C> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .temperature(0.0)
            .messages(vec![to_request_message(&Message::human(prompt))?])
            .build()?;

        self.create_chat(request)
            .await?
            .content
            .ok_or_else(|| anyhow!("No response content"))
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantTurn> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.chat_model).temperature(0.0).messages(messages);
        if !tools.is_empty() {
            args.tools(tools.iter().map(to_tool).collect::<Result<Vec<_>>>()?);
        }

        self.create_chat(args.build()?).await
    }

    fn get_model_info(&self) -> String {
        self.chat_model.clone()
    }
}

#[async_trait]
impl<C: Config + Send + Sync + 'static> EmbeddingProvider for OpenAIProvider<C> {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(texts.to_vec())
            .build()?;

        let client = &self.embedding_client;
        let mut response = self
            .retry
            .run("embedding", is_transient_openai, move || {
                let request = request.clone();
                async move { client.embeddings().create(request).await.map_err(anyhow::Error::from) }
            })
            .await?;

        response.data.sort_by_key(|entry| entry.index);
        anyhow::ensure!(
            response.data.len() == texts.len(),
            "OpenAI returned {} embeddings for {} inputs",
            response.data.len(),
            texts.len()
        );
        Ok(response.data.into_iter().map(|entry| entry.embedding).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned from OpenAI"))
    }
}

/// Builds the chat and embedding providers selected by configuration.
pub fn build_providers(
    config: &ProviderConfig,
) -> (Arc<dyn CompletionProvider>, Arc<dyn EmbeddingProvider>) {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            chat_model,
            embedding_model,
        } => {
            let provider = Arc::new(OpenAIProvider::openai(
                api_key.clone(),
                chat_model.clone(),
                embedding_model.clone(),
            ));
            let chat: Arc<dyn CompletionProvider> = provider.clone();
            let embeddings: Arc<dyn EmbeddingProvider> = provider;
            (chat, embeddings)
        }
        ProviderConfig::Azure {
            api_key,
            endpoint,
            api_version,
            chat_deployment,
            embedding_deployment,
        } => {
            let provider = Arc::new(OpenAIProvider::azure(
                api_key,
                endpoint,
                api_version,
                chat_deployment.clone(),
                embedding_deployment.clone(),
            ));
            let chat: Arc<dyn CompletionProvider> = provider.clone();
            let embeddings: Arc<dyn EmbeddingProvider> = provider;
            (chat, embeddings)
        }
    }
}
