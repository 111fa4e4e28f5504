use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ParsedDirective, ToolRuntime};

/// Outcome of resolving and invoking one directive. Every failure mode is
/// data; nothing raised by a tool crosses this boundary.
#[derive(Debug)]
pub(crate) enum DispatchResult {
    Success(String),
    ToolNotFound,
    InvocationFailed(String),
    MissingArguments,
}

impl ToolRuntime {
    /// Resolves a directive against the registry and invokes the tool,
    /// blocking until it returns or the deadline elapses. Argument values
    /// pass through untouched; the tool validates its own required
    /// parameters.
    pub(crate) async fn dispatch(
        &self,
        directive: &ParsedDirective,
        timeout: Option<Duration>,
    ) -> DispatchResult {
        let Some(name) = directive.name.as_deref().filter(|name| !name.is_empty()) else {
            warn!("Directive is missing a tool name");
            return DispatchResult::MissingArguments;
        };
        let Some(arguments) = directive.arguments.as_ref() else {
            warn!(tool = %name, "Directive is missing an arguments mapping");
            return DispatchResult::MissingArguments;
        };
        let Some(tool) = self.registry().lookup(name) else {
            warn!(requested_tool = %name, "Unknown tool requested by the engine");
            return DispatchResult::ToolNotFound;
        };

        debug!(tool = %name, "Dispatching tool call");
        let invocation = tool.invoke(arguments.clone());
        let invoked = match timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(invoked) => invoked,
                Err(_) => {
                    warn!(tool = %name, "Tool invocation timed out");
                    return DispatchResult::InvocationFailed(format!(
                        "timed out after {}s",
                        limit.as_secs()
                    ));
                }
            },
            None => invocation.await,
        };
        match invoked {
            Ok(value) => {
                info!(tool = %name, success = true, "Tool executed");
                DispatchResult::Success(render_result(&value))
            }
            Err(error) => {
                warn!(tool = %name, %error, "Tool execution failed");
                DispatchResult::InvocationFailed(error.to_string())
            }
        }
    }
}

fn render_result(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooling::{Tool, ToolInvokeError, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::{Map, json};
    use std::sync::Arc;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the payload back."
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
            match arguments.get("payload") {
                Some(payload) => Ok(payload.clone()),
                None => Err(ToolInvokeError::InvalidArguments(
                    "'payload' is required".into(),
                )),
            }
        }
    }

    fn runtime() -> ToolRuntime {
        let registry = ToolRegistry::new(vec![Arc::new(EchoTool)]).unwrap();
        ToolRuntime::new(Arc::new(registry))
    }

    fn directive(name: Option<&str>, arguments: Option<Value>) -> ParsedDirective {
        ParsedDirective {
            name: name.map(String::from),
            arguments: arguments.and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            }),
        }
    }

    #[tokio::test]
    async fn success_renders_string_results_verbatim() {
        let result = runtime()
            .dispatch(
                &directive(Some("echo"), Some(json!({"payload": "hi"}))),
                None,
            )
            .await;
        assert!(matches!(result, DispatchResult::Success(text) if text == "hi"));
    }

    #[tokio::test]
    async fn success_renders_structured_results_as_json() {
        let result = runtime()
            .dispatch(
                &directive(Some("echo"), Some(json!({"payload": {"a": 1}}))),
                None,
            )
            .await;
        assert!(matches!(result, DispatchResult::Success(text) if text == "{\"a\":1}"));
    }

    #[tokio::test]
    async fn unknown_name_is_tool_not_found_never_a_fault() {
        let result = runtime()
            .dispatch(&directive(Some("missing"), Some(json!({}))), None)
            .await;
        assert!(matches!(result, DispatchResult::ToolNotFound));
    }

    #[tokio::test]
    async fn missing_name_or_arguments_is_flagged() {
        let runtime = runtime();
        assert!(matches!(
            runtime
                .dispatch(&directive(None, Some(json!({}))), None)
                .await,
            DispatchResult::MissingArguments
        ));
        assert!(matches!(
            runtime
                .dispatch(&directive(Some("echo"), None), None)
                .await,
            DispatchResult::MissingArguments
        ));
    }

    struct StalledTool;

    #[async_trait]
    impl Tool for StalledTool {
        fn name(&self) -> &str {
            "stalled"
        }

        fn description(&self) -> &str {
            "Never returns."
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, _arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn slow_tool_hits_the_deadline_as_data() {
        let registry = ToolRegistry::new(vec![Arc::new(StalledTool)]).unwrap();
        let runtime = ToolRuntime::new(Arc::new(registry));
        let result = runtime
            .dispatch(
                &directive(Some("stalled"), Some(json!({}))),
                Some(Duration::from_millis(20)),
            )
            .await;
        assert!(matches!(
            result,
            DispatchResult::InvocationFailed(message) if message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn tool_errors_become_invocation_failures() {
        let result = runtime()
            .dispatch(&directive(Some("echo"), Some(json!({}))), None)
            .await;
        assert!(matches!(
            result,
            DispatchResult::InvocationFailed(message) if message.contains("'payload' is required")
        ));
    }
}
