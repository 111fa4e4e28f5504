use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::interface::{Tool, ToolSchema};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate tool name registered: {0}")]
    DuplicateName(String),
}

/// Immutable, session-scoped mapping from tool name to its capability.
/// Built once at startup; duplicate names are a configuration fault, not a
/// runtime condition. Lookup is by exact, case-sensitive name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(tools.len());
        for (position, tool) in tools.iter().enumerate() {
            let name = tool.name().to_string();
            if index.insert(name.clone(), position).is_some() {
                return Err(RegistryError::DuplicateName(name));
            }
        }
        debug!(tool_count = tools.len(), "Tool registry constructed");
        Ok(Self { tools, index })
    }

    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|position| &self.tools[*position])
    }

    /// Declared schemas in registration order, for the generation engine.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|tool| tool.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
