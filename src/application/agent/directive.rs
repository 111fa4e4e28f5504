use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A structured tool-invocation request extracted from generated text.
/// Lives only for the duration of one dispatch.
///
/// Both fields stay optional at this layer: the parser reports only whether
/// the payload decoded as the expected record shape, and the dispatcher
/// decides whether an incomplete directive is actionable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParsedDirective {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

/// A marker pair was present but its payload was not the expected record.
/// Distinct from "no directive found", which is the normal terminal path.
#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("tool call payload is not a valid directive: {0}")]
    Decode(#[from] serde_json::Error),
}
