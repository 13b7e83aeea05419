use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fmt, sync::Arc};
use thiserror::Error;

/// JSON-schema description of one tool, as presented to the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolSchema {
    pub name: SmolStr,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    pub fn new(
        name: impl AsRef<str>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: SmolStr::new(name.as_ref()),
            description: description.into(),
            parameters,
        }
    }
}

/// Failure of one tool invocation. Surfaced back to the model as a tool result rather
/// than aborting the run, unless the runtime decides otherwise.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Invocation(String),
}

/// Executable side of a tool, carrying its bound dependencies.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

/// A named tool: schema the model sees plus the invoker the runtime dispatches to.
#[derive(Clone)]
pub struct Tool {
    pub schema: ToolSchema,
    pub invoker: Arc<dyn ToolInvoker>,
}

impl Tool {
    pub fn new(schema: ToolSchema, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { schema, invoker }
    }

    pub fn name(&self) -> &str {
        self.schema.name.as_str()
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
