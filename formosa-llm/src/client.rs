use crate::{
    ChatProvider,
    chat::{ChatMessage, ChatRequest, ChatResponse, Role, ToolCall},
    error::LlmError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Resolve a `{prefix}/{model}` identifier into its OpenAI-compatible endpoint.
///
/// Providers without a prefix (plain `gpt-4o-mini`) default to OpenAI.
pub fn provider_endpoint(qualified_model: &str) -> Result<(Url, &str), LlmError> {
    let (prefix, model) = match qualified_model.split_once('/') {
        Some((prefix, model)) => (prefix, model),
        None => ("openai", qualified_model),
    };

    let base = match prefix {
        "openai" => "https://api.openai.com/v1/",
        "gemini" => "https://generativelanguage.googleapis.com/v1beta/openai/",
        "anthropic" => "https://api.anthropic.com/v1/",
        other => return Err(LlmError::UnknownProvider(other.to_string())),
    };

    let url = Url::parse(base)
        .and_then(|base| base.join("chat/completions"))
        .map_err(|error| LlmError::Configuration(error.to_string()))?;

    Ok((url, model))
}

/// OpenAI-compatible chat-completions client.
///
/// One client is built per runtime from the model catalog row: qualified model name plus
/// the API key read from the row's environment variable.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl OpenAiCompatClient {
    pub fn new(qualified_model: &str, api_key: String) -> Result<Self, LlmError> {
        let (endpoint, _) = provider_endpoint(qualified_model)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    /// Override the endpoint, eg/ for a local OpenAI-compatible server.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    r#type: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCallFunction {
    name: String,
    /// JSON-encoded arguments object.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

fn to_wire_message(message: &ChatMessage) -> WireMessage<'_> {
    WireMessage {
        role: message.role,
        content: message.content.as_deref(),
        tool_calls: (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    r#type: "function".to_string(),
                    function: WireToolCallFunction {
                        name: call.name.to_string(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect()
        }),
        tool_call_id: message.tool_call_id.as_deref(),
    }
}

fn from_wire_tool_call(call: WireToolCall) -> ToolCall {
    // Providers encode arguments as a JSON string; empty means no arguments
    let arguments = if call.function.arguments.trim().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_str(&call.function.arguments)
            .unwrap_or(serde_json::Value::String(call.function.arguments))
    };

    ToolCall {
        id: call.id,
        name: SmolStr::new(&call.function.name),
        arguments,
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let model = request
            .model
            .split_once('/')
            .map(|(_, model)| model)
            .unwrap_or(&request.model);

        let wire = WireRequest {
            model,
            messages: request.messages.iter().map(to_wire_message).collect(),
            tools: request
                .tools
                .iter()
                .map(|tool| WireTool {
                    r#type: "function",
                    function: WireFunction {
                        name: tool.name.as_str(),
                        description: &tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
        };

        debug!(model, messages = request.messages.len(), "chat completion request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Status { status, body });
        }

        let parsed: WireResponse =
            serde_json::from_str(&body).map_err(|error| LlmError::Deserialise {
                error,
                payload: body,
            })?;

        let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(from_wire_tool_call)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_endpoint_resolution() {
        let (url, model) = provider_endpoint("openai/gpt-4o-mini").unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(model, "gpt-4o-mini");

        let (url, model) = provider_endpoint("gemini/gemini-2.0-flash").unwrap();
        assert!(url.as_str().contains("generativelanguage"));
        assert_eq!(model, "gemini-2.0-flash");

        // No prefix defaults to OpenAI
        let (url, _) = provider_endpoint("gpt-4o-mini").unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

        assert!(matches!(
            provider_endpoint("mystery/model"),
            Err(LlmError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_wire_tool_call_argument_decoding() {
        let call = WireToolCall {
            id: "call_1".into(),
            r#type: "function".into(),
            function: WireToolCallFunction {
                name: "buy_stock".into(),
                arguments: r#"{"ticker": "2330", "quantity": 1000}"#.into(),
            },
        };

        let decoded = from_wire_tool_call(call);
        assert_eq!(decoded.name, "buy_stock");
        assert_eq!(decoded.arguments["quantity"], 1000);

        let empty = WireToolCall {
            id: "call_2".into(),
            r#type: "function".into(),
            function: WireToolCallFunction {
                name: "get_portfolio_status".into(),
                arguments: String::new(),
            },
        };
        assert!(from_wire_tool_call(empty).arguments.as_object().unwrap().is_empty());
    }
}
