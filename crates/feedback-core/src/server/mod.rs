//! Tool server launched by AI clients
//!
//! Started with `--mcp-mode` from the snippet produced by
//! [`client_config`](crate::source::client_config). It speaks line-delimited
//! JSON-RPC on stdio and exposes one tool, `feedback`, which writes a request
//! file for the console and blocks until that request is answered or
//! cancelled.
//!
//! ```text
//! AI client ──stdio──> ToolServer ──> FeedbackRequester ──> feedback_requests/
//!                                              ^
//!                                              └── polls feedback_responses/
//! ```

mod feedback_tool;

pub use feedback_tool::{FeedbackOutcome, FeedbackRequester, DEFAULT_CONTEXT, DEFAULT_POLL_INTERVAL};

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::Result;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const FEEDBACK_TOOL: &str = "feedback";

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
}

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() },
    })
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

/// Descriptor returned from `tools/list`
pub fn feedback_tool_definition() -> Value {
    json!({
        "name": FEEDBACK_TOOL,
        "description": "Interactive feedback tool - displays AI response and waits for user feedback.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "ai_response": { "type": "string", "description": "The AI's response to display" },
                "context": { "type": "string", "description": "Optional context for the session" },
            },
            "required": ["ai_response"],
        },
    })
}

pub struct ToolServer {
    requester: FeedbackRequester,
    server_name: String,
    server_version: String,
}

impl ToolServer {
    pub fn new(requester: FeedbackRequester) -> Self {
        Self {
            requester,
            server_name: "feedback-desk".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Handle one JSON-RPC message. Notifications get `None`.
    pub async fn handle_request(&self, request: Value) -> Option<Value> {
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(id) = request.get("id").cloned() else {
            debug!("Notification {}", method);
            return None;
        };

        let response = match method {
            methods::INITIALIZE => success(id, self.initialize_result()),
            methods::PING | methods::LOGGING_SET_LEVEL => success(id, json!({})),
            methods::TOOLS_LIST => success(id, json!({ "tools": [feedback_tool_definition()] })),
            methods::RESOURCES_LIST => success(id, json!({ "resources": [] })),
            methods::PROMPTS_LIST => success(id, json!({ "prompts": [] })),
            methods::TOOLS_CALL => self.handle_tools_call(id, request.get("params")).await,
            other => error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", other),
            ),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.server_name,
                "version": self.server_version,
            },
        })
    }

    async fn handle_tools_call(&self, id: Value, params: Option<&Value>) -> Value {
        let Some(params) = params else {
            return error(id, error_codes::INVALID_PARAMS, "Missing params");
        };

        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        if name != FEEDBACK_TOOL {
            return error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Tool '{}' not found", name),
            );
        }

        let arguments = params.get("arguments");
        let Some(ai_response) = arguments
            .and_then(|args| args.get("ai_response"))
            .and_then(Value::as_str)
        else {
            return error(
                id,
                error_codes::INVALID_PARAMS,
                "Missing 'ai_response' argument",
            );
        };
        // A `source` argument is ignored; the launch environment decides it
        let context = arguments
            .and_then(|args| args.get("context"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CONTEXT);

        match self.requester.request(ai_response, context).await {
            Ok(outcome) => success(id, tool_result(outcome.to_value().to_string(), false)),
            Err(e) => {
                warn!("Feedback tool failed: {}", e);
                success(id, tool_result(format!("Tool execution failed: {}", e), true))
            }
        }
    }

    /// Serve requests from `reader` until it reaches end of input
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            "Tool server started for source {}",
            self.requester.raw_source()
        );
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    warn!("Unparseable message from client: {}", e);
                    Some(error(Value::Null, error_codes::PARSE_ERROR, "Parse error"))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("Client closed the connection, tool server stopping");
        Ok(())
    }
}
