//! Conversation thread shape shared by the provider adapter, the plan
//! executor, and the instruction composer.

use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in a thread. Flat rather than content-parts-based: the
/// plan executor and rule engine only ever need plain text plus the
/// tool-call bookkeeping fields, never multi-part/image content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text)
    }

    pub fn assistant_with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
            name: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
            name: None,
        }
    }

    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            tool_call_id: None,
            tool_calls: None,
            name: None,
        }
    }
}

/// An ordered sequence of messages. A thin newtype rather than a bare
/// `Vec<Message>` so `buildThread`-style helpers can live as methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thread(pub Vec<Message>);

impl Thread {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, message: Message) -> &mut Self {
        self.0.push(message);
        self
    }

    pub fn extended(&self, messages: impl IntoIterator<Item = Message>) -> Self {
        let mut out = self.0.clone();
        out.extend(messages);
        Self(out)
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    /// Concatenate several branch threads in declaration order, dropping
    /// leading system messages from all but the first (each branch only
    /// needs one system preamble once merged).
    pub fn concat(branches: impl IntoIterator<Item = Thread>) -> Self {
        let mut out = Vec::new();
        for (i, branch) in branches.into_iter().enumerate() {
            for message in branch.0 {
                if i > 0 && matches!(message.role, Role::System) {
                    continue;
                }
                out.push(message);
            }
        }
        Self(out)
    }
}

impl FromIterator<Message> for Thread {
    fn from_iter<T: IntoIterator<Item = Message>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_preserves_declaration_order_and_drops_extra_system_messages() {
        let a = Thread(vec![Message::system("sys"), Message::user("first")]);
        let b = Thread(vec![Message::system("sys"), Message::user("second")]);
        let merged = Thread::concat([a, b]);
        assert_eq!(merged.0.len(), 3);
        assert_eq!(merged.0[0].content, "sys");
        assert_eq!(merged.0[1].content, "first");
        assert_eq!(merged.0[2].content, "second");
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = Message::tool_result("call-1", "42");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call-1"));
        assert!(matches!(msg.role, Role::Tool));
    }
}
