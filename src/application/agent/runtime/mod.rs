mod execution;
pub(crate) mod parser;

pub(crate) use execution::DispatchResult;

use std::sync::Arc;

use crate::tooling::{ToolRegistry, ToolSchema};

pub(super) use super::directive::{DirectiveError, ParsedDirective};

/// Glue between the loop controller and the session's tool registry.
pub(crate) struct ToolRuntime {
    registry: Arc<ToolRegistry>,
}

impl ToolRuntime {
    pub(crate) fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub(crate) fn schemas(&self) -> Vec<ToolSchema> {
        self.registry.schemas()
    }
}
