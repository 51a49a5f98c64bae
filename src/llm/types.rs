use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model-initiated request to invoke a tool mid-turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Tool arguments as parsed JSON, e.g. `{"query": "..."}`.
    pub arguments: Value,
}

/// Declaration of a callable tool offered to the chat model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments.
    pub parameters: Value,
}

/// One entry of a conversation history.
///
/// Assistant messages may carry pending tool calls; tool messages are always
/// causally preceded by the assistant message that requested them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        call_id: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(content: impl Into<String>, call_id: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            call_id: call_id.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Whether this is an assistant message requesting at least one tool.
    pub fn requests_tools(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Message::Tool { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_reports_pending_tool_calls() {
        let plain = Message::assistant("hello");
        assert!(!plain.requests_tools());

        let requesting = Message::assistant_with_tools(
            "",
            vec![ToolCall {
                id: "call-1".to_string(),
                name: "retrieve".to_string(),
                arguments: json!({"query": "term limits"}),
            }],
        );
        assert!(requesting.requests_tools());
        assert_eq!(requesting.tool_calls().len(), 1);
    }

    #[test]
    fn messages_round_trip_through_serde() {
        let message = Message::tool("Source: ...", "call-7");
        let encoded = serde_json::to_string(&message).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.is_tool_result());
        assert_eq!(decoded.content(), "Source: ...");
    }
}
