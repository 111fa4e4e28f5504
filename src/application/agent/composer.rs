use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{ChatMessage, Conversation, MessageRole};

use super::models::TerminationReason;
use super::runtime::parser;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Why the last directive never reached a tool; surfaced in the final
/// message so an invalid call is never silently swallowed.
#[derive(Debug)]
pub(crate) enum InvalidCall {
    Decode(String),
    MissingArguments,
}

/// Assembles the user-visible answer once no further tool call is pending:
/// an attribution line for the last tool used, any invalid-call or cutoff
/// note, a labeled reasoning section, and the cleaned answer body. The raw
/// unfinalized generation is replaced in place; when finalization was forced
/// while a tool result is still the last message, the composed message is
/// appended instead so the tool output survives.
pub(crate) fn finalize(
    conversation: &mut Conversation,
    invalid_call: Option<&InvalidCall>,
    termination: TerminationReason,
) -> String {
    let attribution = last_tool_attribution(conversation);
    let latest_assistant = conversation
        .iter()
        .rev()
        .find(|message| message.role == MessageRole::Assistant)
        .map(|message| message.content.clone())
        .unwrap_or_default();
    let (body, reasoning) = strip_reasoning(&latest_assistant);
    let body = body.trim().to_string();

    let mut sections: Vec<String> = Vec::new();
    if let Some((name, arguments)) = attribution {
        let rendered = serde_json::to_string(&Value::Object(arguments))
            .unwrap_or_else(|_| "{}".to_string());
        sections.push(format!(
            "[This answer used tool: {name} with arguments {rendered}]"
        ));
    }
    match invalid_call {
        Some(InvalidCall::Decode(detail)) => {
            sections.push(format!("[The last tool call could not be decoded: {detail}]"));
        }
        Some(InvalidCall::MissingArguments) => {
            sections.push(
                "[The last tool call was malformed: missing tool name or arguments]".to_string(),
            );
        }
        None => {}
    }
    if termination == TerminationReason::MaxIterations {
        sections.push(
            "[Maximum tool iterations reached before the answer was complete]".to_string(),
        );
    }
    if let Some(reasoning) = reasoning {
        sections.push(format!("Reasoning:\n{reasoning}"));
    }

    let composed = if sections.is_empty() {
        if body.is_empty() {
            "(no answer was produced)".to_string()
        } else {
            body
        }
    } else if body.is_empty() {
        sections.join("\n\n")
    } else {
        format!("{}\n\nAnswer:\n{body}", sections.join("\n\n"))
    };

    let finalized = ChatMessage::assistant(composed.clone());
    if matches!(conversation.last(), Some(message) if message.role == MessageRole::Assistant) {
        conversation.replace_last(finalized);
    } else {
        conversation.push(finalized);
    }
    debug!(length = composed.len(), "Final response composed");
    composed
}

/// Recovers `{tool, arguments}` for the most recent tool result. The
/// dispatcher records this as metadata on the message itself; scanning
/// assistant text for the producing directive is the fallback for
/// histories recorded without it.
fn last_tool_attribution(conversation: &Conversation) -> Option<(String, Map<String, Value>)> {
    let tool_message = conversation
        .iter()
        .rev()
        .find(|message| message.role == MessageRole::Tool)?;
    if let Some(metadata) = &tool_message.call_metadata {
        return Some((metadata.tool_name.clone(), metadata.arguments.clone()));
    }

    let name = tool_message
        .name
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    for message in conversation.iter().rev() {
        if message.role != MessageRole::Assistant {
            continue;
        }
        if let Ok(Some(directive)) = parser::parse_directive(&message.content) {
            if directive.name.as_deref() == Some(name.as_str()) {
                return Some((name, directive.arguments.unwrap_or_default()));
            }
        }
    }
    Some((name, Map::new()))
}

/// Removes every `<think>…</think>` span from the text and captures the
/// first non-empty one. An unterminated block stays visible untouched.
fn strip_reasoning(text: &str) -> (String, Option<String>) {
    let mut visible = String::with_capacity(text.len());
    let mut reasoning: Option<String> = None;
    let mut rest = text;
    loop {
        let Some(open) = rest.find(THINK_OPEN) else {
            visible.push_str(rest);
            break;
        };
        visible.push_str(&rest[..open]);
        let after_open = &rest[open + THINK_OPEN.len()..];
        let Some(close) = after_open.find(THINK_CLOSE) else {
            visible.push_str(&rest[open..]);
            break;
        };
        let content = after_open[..close].trim();
        if reasoning.is_none() && !content.is_empty() {
            reasoning = Some(content.to_string());
        }
        rest = &after_open[close + THINK_CLOSE.len()..];
    }
    (visible, reasoning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallMetadata;
    use serde_json::json;

    fn tool_message_with_metadata() -> ChatMessage {
        let mut arguments = Map::new();
        arguments.insert("address".into(), json!("0xabc"));
        ChatMessage::tool_result(
            "1.5",
            CallMetadata {
                tool_name: "get_eth_balance".into(),
                arguments,
            },
        )
    }

    #[test]
    fn strips_every_think_block_and_keeps_the_first() {
        let (visible, reasoning) =
            strip_reasoning("<think>first</think>answer<think>second</think> tail");
        assert_eq!(visible, "answer tail");
        assert_eq!(reasoning.as_deref(), Some("first"));
    }

    #[test]
    fn unterminated_think_block_stays_visible() {
        let (visible, reasoning) = strip_reasoning("prefix <think>never closed");
        assert_eq!(visible, "prefix <think>never closed");
        assert!(reasoning.is_none());
    }

    #[test]
    fn replaces_the_final_assistant_message_in_place() {
        let mut conversation = Conversation::from_messages(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("<think>plan</think>hello there"),
        ]);
        let composed = finalize(&mut conversation, None, TerminationReason::Completed);
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last().unwrap().content, composed);
        assert!(composed.contains("Reasoning:\nplan"));
        assert!(composed.contains("hello there"));
    }

    #[test]
    fn attribution_comes_from_recorded_metadata() {
        let mut conversation = Conversation::from_messages(vec![
            ChatMessage::user("balance of 0xabc?"),
            ChatMessage::assistant("<tool_call>{\"name\":\"get_eth_balance\",\"arguments\":{\"address\":\"0xabc\"}}</tool_call>"),
            tool_message_with_metadata(),
            ChatMessage::assistant("The balance is 1.5 ETH."),
        ]);
        let composed = finalize(&mut conversation, None, TerminationReason::Completed);
        assert!(composed.contains("get_eth_balance"));
        assert!(composed.contains("{\"address\":\"0xabc\"}"));
        assert!(composed.contains("Answer:\nThe balance is 1.5 ETH."));
    }

    #[test]
    fn attribution_falls_back_to_rescanning_assistant_text() {
        let mut bare_tool = ChatMessage::new(MessageRole::Tool, "33.2");
        bare_tool.name = Some("calculate".to_string());
        let mut conversation = Conversation::from_messages(vec![
            ChatMessage::assistant("<tool_call>{\"name\":\"calculate\",\"arguments\":{\"expression\":\"3*10.4+2\"}}</tool_call>"),
            bare_tool,
            ChatMessage::assistant("The result is 33.2."),
        ]);
        let composed = finalize(&mut conversation, None, TerminationReason::Completed);
        assert!(composed.contains("calculate"));
        assert!(composed.contains("\"expression\":\"3*10.4+2\""));
    }

    #[test]
    fn appends_when_forced_to_finalize_on_a_tool_result() {
        let mut conversation = Conversation::from_messages(vec![
            ChatMessage::assistant("<tool_call>{\"name\":\"get_eth_balance\",\"arguments\":{\"address\":\"0xabc\"}}</tool_call>"),
            tool_message_with_metadata(),
        ]);
        let composed = finalize(&mut conversation, None, TerminationReason::MaxIterations);
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.last().unwrap().role, MessageRole::Assistant);
        assert!(composed.contains("Maximum tool iterations reached"));
        // The tool result message is preserved, not overwritten.
        assert_eq!(conversation.messages()[1].content, "1.5");
    }

    #[test]
    fn empty_answer_still_produces_a_visible_message() {
        let mut conversation = Conversation::from_messages(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("<think>only reasoning</think>"),
        ]);
        let composed = finalize(&mut conversation, None, TerminationReason::Completed);
        assert!(!composed.trim().is_empty());
        assert!(composed.contains("Reasoning:\nonly reasoning"));
    }

    #[test]
    fn invalid_call_note_is_visible() {
        let mut conversation = Conversation::from_messages(vec![ChatMessage::assistant(
            "<tool_call>{broken</tool_call>",
        )]);
        let composed = finalize(
            &mut conversation,
            Some(&InvalidCall::Decode("expected value at line 1".into())),
            TerminationReason::Completed,
        );
        assert!(composed.contains("could not be decoded"));
    }
}
