//! Builtin tool families registered at startup.

pub mod eth;
pub mod math;

use std::sync::Arc;

use crate::config::EtherscanConfig;

use super::Tool;

/// Full builtin tool set in registration order: math first, then the
/// Etherscan family, matching the order the tools are advertised in.
pub fn all(etherscan: EtherscanConfig) -> Vec<Arc<dyn Tool>> {
    let client = Arc::new(eth::EtherscanClient::new(etherscan));
    let mut tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(math::CalculateTool),
        Arc::new(math::AverageTool),
    ];
    tools.extend(eth::tools(client));
    tools
}
