//! Identity of the AI tool that raised a feedback request
//!
//! Also builds the configuration snippet each client pastes into its MCP
//! server list to launch the tool server with the right source tag.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

/// Name the tool server is registered under in client configs
pub const SERVER_KEY: &str = "cc-mcp";

/// Environment variable the client config uses to tag requests
pub const SOURCE_ENV: &str = "MCP_SOURCE";

/// Flag that starts the binary as a tool server
pub const TOOL_SERVER_FLAG: &str = "--mcp-mode";

/// Tools Cursor may run without prompting
const CURSOR_AUTO_APPROVE: [&str; 1] = ["feedback"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum AiSource {
    Cursor,
    Augment,
    ClaudeDesktop,
    ChatGpt,
    Custom(String),
    #[default]
    Unknown,
}

impl FromStr for AiSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "cursor" => AiSource::Cursor,
            "augment" => AiSource::Augment,
            "claude-desktop" | "claude_desktop" => AiSource::ClaudeDesktop,
            "chatgpt" | "chat-gpt" | "chat_gpt" => AiSource::ChatGpt,
            "unknown" | "" => AiSource::Unknown,
            custom => AiSource::Custom(custom.to_string()),
        })
    }
}

impl AiSource {
    pub fn display_name(&self) -> &str {
        match self {
            AiSource::Cursor => "Cursor AI",
            AiSource::Augment => "Augment AI",
            AiSource::ClaudeDesktop => "Claude Desktop",
            AiSource::ChatGpt => "ChatGPT",
            AiSource::Custom(name) => name,
            AiSource::Unknown => "Unknown AI Tool",
        }
    }

    /// Value passed to the tool server through `MCP_SOURCE`
    pub fn tag(&self) -> String {
        match self {
            AiSource::Cursor => "cursor".to_string(),
            AiSource::Augment => "augment".to_string(),
            AiSource::ClaudeDesktop => "claude-desktop".to_string(),
            AiSource::ChatGpt => "chatgpt".to_string(),
            AiSource::Custom(name) => name.to_lowercase().replace(' ', "-"),
            AiSource::Unknown => "unknown".to_string(),
        }
    }
}

impl fmt::Display for AiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Raw source tag for this tool-server process, `unknown` when unset
pub fn source_from_env() -> String {
    std::env::var(SOURCE_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| AiSource::Unknown.tag())
}

/// Client configuration snippet that launches the tool server for `source`
pub fn client_config(source: &AiSource, exe_path: &str) -> Value {
    let mut server = json!({
        "command": exe_path,
        "args": [TOOL_SERVER_FLAG],
        "env": {
            SOURCE_ENV: source.tag(),
        },
    });

    if *source == AiSource::Cursor {
        server["autoApprove"] = json!(CURSOR_AUTO_APPROVE);
    }

    json!({
        "mcpServers": {
            SERVER_KEY: server,
        }
    })
}
