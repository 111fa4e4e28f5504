mod error;
mod interface;
mod registry;

pub mod builtin;

pub use error::ToolInvokeError;
pub use interface::{Tool, ToolSchema};
pub use registry::{RegistryError, ToolRegistry};
