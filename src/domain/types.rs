use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "system" => Some(MessageRole::System),
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            "tool" => Some(MessageRole::Tool),
            _ => None,
        }
    }
}

/// Attribution for a tool-result message: which tool produced it and with
/// which arguments. Recorded by the dispatcher so the composer never has to
/// re-scan free text to recover it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMetadata {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Tool identifier, set on `tool`-role messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_metadata: Option<CallMetadata>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            call_metadata: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn tool_result(content: impl Into<String>, metadata: CallMetadata) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            name: Some(metadata.tool_name.clone()),
            call_metadata: Some(metadata),
        }
    }
}

/// Ordered turn history shared between the loop controller and the
/// generation engine. Append-mostly: the only in-place mutation is the
/// composer replacing the final unfinalized assistant message.
///
/// Invariant: every `tool`-role message is preceded, earlier in the same
/// turn, by the `assistant`-role message whose directive produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    /// Whether the history already opens with a system turn. Front ends that
    /// hand over bare role/content pairs use this to decide on injection.
    pub fn has_system_turn(&self) -> bool {
        matches!(
            self.messages.first(),
            Some(message) if message.role == MessageRole::System
        )
    }

    /// In-place replacement of the final message. Reserved for the response
    /// composer. Returns false on an empty conversation, which cannot occur
    /// after a completed GENERATING pass.
    pub(crate) fn replace_last(&mut self, message: ChatMessage) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                *last = message;
                true
            }
            None => false,
        }
    }

    /// Drops the trailing message if it is a user turn. Callers retract the
    /// in-flight user input after a fatal generation failure.
    pub fn retract_pending_user(&mut self) -> bool {
        if matches!(self.messages.last(), Some(m) if m.role == MessageRole::User) {
            self.messages.pop();
            return true;
        }
        false
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_carries_name_and_metadata() {
        let mut arguments = Map::new();
        arguments.insert("address".into(), Value::String("0xabc".into()));
        let message = ChatMessage::tool_result(
            "1.5",
            CallMetadata {
                tool_name: "get_eth_balance".into(),
                arguments,
            },
        );
        assert_eq!(message.role, MessageRole::Tool);
        assert_eq!(message.name.as_deref(), Some("get_eth_balance"));
        assert_eq!(message.call_metadata.unwrap().tool_name, "get_eth_balance");
    }

    #[test]
    fn retract_pending_user_only_pops_user_turns() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::system("be helpful"));
        conversation.push(ChatMessage::user("hello"));
        assert!(conversation.retract_pending_user());
        assert_eq!(conversation.len(), 1);
        assert!(!conversation.retract_pending_user());
    }

    #[test]
    fn system_turn_detection() {
        let mut conversation = Conversation::new();
        assert!(!conversation.has_system_turn());
        conversation.push(ChatMessage::user("hi"));
        assert!(!conversation.has_system_turn());

        let with_system =
            Conversation::from_messages(vec![ChatMessage::system("x"), ChatMessage::user("hi")]);
        assert!(with_system.has_system_turn());
    }
}
