//! Etherscan-backed Ethereum tools: balances, transactions, gas price, and
//! contract source inspection.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::EtherscanConfig;

use super::super::{Tool, ToolInvokeError};

const WEI_PER_ETH: f64 = 1e18;
const DEFAULT_TRANSACTION_LIMIT: usize = 10;
const SOURCE_PREVIEW_CHARS: usize = 3000;
const SERVICE: &str = "Etherscan";

/// Shared HTTP client for the Etherscan API family.
pub struct EtherscanClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl EtherscanClient {
    pub fn new(config: EtherscanConfig) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url,
            api_key: config.api_key,
        }
    }

    /// Raw API query; returns the whole response body.
    async fn query(&self, params: &[(&str, &str)]) -> Result<Value, ToolInvokeError> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));
        debug!(action = ?params.iter().find(|(k, _)| *k == "action"), "Querying Etherscan");
        let body = self
            .http
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ToolInvokeError::Http {
                service: SERVICE.to_string(),
                source,
            })?
            .json::<Value>()
            .await
            .map_err(|source| ToolInvokeError::Http {
                service: SERVICE.to_string(),
                source,
            })?;
        Ok(body)
    }

    /// Query for endpoints that report `status`/`message`/`result`; fails
    /// when the API signals an unsuccessful status.
    async fn query_checked(&self, params: &[(&str, &str)]) -> Result<Value, ToolInvokeError> {
        let mut body = self.query(params).await?;
        let status = body.get("status").and_then(Value::as_str);
        if status != Some("1") {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(ToolInvokeError::Upstream {
                service: SERVICE.to_string(),
                message,
            });
        }
        Ok(body
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

/// The Etherscan tool family in declaration order.
pub fn tools(client: Arc<EtherscanClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetEthBalanceTool {
            client: client.clone(),
        }),
        Arc::new(WeiToEthTool),
        Arc::new(EthToWeiTool),
        Arc::new(GetLatestTransactionsTool {
            client: client.clone(),
        }),
        Arc::new(GetTransactionStatusTool {
            client: client.clone(),
        }),
        Arc::new(GetEthGasPriceTool {
            client: client.clone(),
        }),
        Arc::new(AnalyzeContractTool { client }),
    ]
}

fn required_str<'a>(
    arguments: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolInvokeError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolInvokeError::InvalidArguments(format!("'{key}' must be a string")))
}

fn wei_string_to_eth(wei: &str) -> Result<f64, ToolInvokeError> {
    let wei: u128 = wei.trim().parse().map_err(|_| {
        ToolInvokeError::InvalidArguments(format!("'{wei}' is not a valid Wei value"))
    })?;
    Ok(wei as f64 / WEI_PER_ETH)
}

pub struct GetEthBalanceTool {
    client: Arc<EtherscanClient>,
}

#[async_trait]
impl Tool for GetEthBalanceTool {
    fn name(&self) -> &str {
        "get_eth_balance"
    }

    fn description(&self) -> &str {
        "Get the ETH balance of an address. This tool allows you to check the current ETH balance of a specified Ethereum address. The balance is returned in ETH."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "description": "Ethereum address to check the balance of. Must be a valid Ethereum address.",
                }
            },
            "required": ["address"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let address = required_str(&arguments, "address")?;
        let result = self
            .client
            .query_checked(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;
        let wei = result.as_str().ok_or_else(|| ToolInvokeError::Upstream {
            service: SERVICE.to_string(),
            message: "balance result is not a string".into(),
        })?;
        Ok(json!(wei_string_to_eth(wei)?))
    }
}

pub struct WeiToEthTool;

#[async_trait]
impl Tool for WeiToEthTool {
    fn name(&self) -> &str {
        "wei_to_eth"
    }

    fn description(&self) -> &str {
        "Convert Wei to ETH. This tool converts a given amount in Wei to its equivalent in ETH."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "wei_value": {
                    "type": "string",
                    "description": "Amount in Wei to convert. Must be a valid Wei value.",
                }
            },
            "required": ["wei_value"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let wei = match arguments.get("wei_value") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => {
                return Err(ToolInvokeError::InvalidArguments(
                    "'wei_value' must be a Wei amount".into(),
                ));
            }
        };
        Ok(json!(wei_string_to_eth(&wei)?))
    }
}

pub struct EthToWeiTool;

#[async_trait]
impl Tool for EthToWeiTool {
    fn name(&self) -> &str {
        "eth_to_wei"
    }

    fn description(&self) -> &str {
        "Convert ETH to Wei. This tool converts a given amount in ETH to its equivalent in Wei."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "eth_value": {
                    "type": "number",
                    "description": "Amount in ETH to convert. Must be a valid ETH value.",
                }
            },
            "required": ["eth_value"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let eth = arguments
            .get("eth_value")
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ToolInvokeError::InvalidArguments("'eth_value' must be a number".into())
            })?;
        Ok(json!(format!("{:.0}", eth * WEI_PER_ETH)))
    }
}

pub struct GetLatestTransactionsTool {
    client: Arc<EtherscanClient>,
}

#[async_trait]
impl Tool for GetLatestTransactionsTool {
    fn name(&self) -> &str {
        "get_latest_transactions"
    }

    fn description(&self) -> &str {
        "Get the latest transactions of an address. This tool retrieves a list of the most recent transactions associated with a given Ethereum address. You can specify the maximum number of transactions to return. Please carefully check the unit."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "description": "Ethereum address to check the transactions of. Must be a valid Ethereum address.",
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of transactions to return. Defaults to 10 if not specified.",
                }
            },
            "required": ["address"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let address = required_str(&arguments, "address")?;
        let limit = arguments
            .get("limit")
            .and_then(Value::as_u64)
            .map(|limit| limit as usize)
            .unwrap_or(DEFAULT_TRANSACTION_LIMIT);
        let result = self
            .client
            .query_checked(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "desc"),
            ])
            .await?;
        let Value::Array(transactions) = result else {
            return Err(ToolInvokeError::Upstream {
                service: SERVICE.to_string(),
                message: "transaction list result is not an array".into(),
            });
        };

        let mut recent = Vec::with_capacity(limit.min(transactions.len()));
        for mut transaction in transactions.into_iter().take(limit) {
            if let Some(wei) = transaction.get("value").and_then(Value::as_str) {
                let eth = wei_string_to_eth(wei)?;
                if let Some(object) = transaction.as_object_mut() {
                    object.insert("value".into(), json!(eth));
                }
            }
            recent.push(transaction);
        }
        Ok(Value::Array(recent))
    }
}

pub struct GetTransactionStatusTool {
    client: Arc<EtherscanClient>,
}

#[async_trait]
impl Tool for GetTransactionStatusTool {
    fn name(&self) -> &str {
        "get_transaction_status"
    }

    fn description(&self) -> &str {
        "Get the status of a transaction. This tool checks the status of a specific Ethereum transaction based on its transaction hash. It returns whether the transaction was successful or failed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tx_hash": {
                    "type": "string",
                    "description": "Transaction hash to check the status of. Must be a valid Ethereum transaction hash.",
                }
            },
            "required": ["tx_hash"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let tx_hash = required_str(&arguments, "tx_hash")?;
        let result = self
            .client
            .query_checked(&[
                ("module", "transaction"),
                ("action", "gettxreceiptstatus"),
                ("txhash", tx_hash),
            ])
            .await?;
        let success = result.get("status").and_then(Value::as_str) == Some("1");
        Ok(json!(if success { "Success" } else { "Fail" }))
    }
}

pub struct GetEthGasPriceTool {
    client: Arc<EtherscanClient>,
}

#[async_trait]
impl Tool for GetEthGasPriceTool {
    fn name(&self) -> &str {
        "get_eth_gas_price"
    }

    fn description(&self) -> &str {
        "Get the current ETH gas price. This tool fetches the current recommended gas price for Ethereum transactions. The gas price is returned in Gwei."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": [],
        })
    }

    async fn invoke(&self, _arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let result = self
            .client
            .query_checked(&[("module", "gastracker"), ("action", "gasoracle")])
            .await?;
        let proposed = result
            .get("ProposeGasPrice")
            .and_then(Value::as_str)
            .and_then(|price| price.parse::<f64>().ok())
            .ok_or_else(|| ToolInvokeError::Upstream {
                service: SERVICE.to_string(),
                message: "gas oracle did not report a proposed price".into(),
            })?;
        Ok(json!(proposed))
    }
}

pub struct AnalyzeContractTool {
    client: Arc<EtherscanClient>,
}

#[async_trait]
impl Tool for AnalyzeContractTool {
    fn name(&self) -> &str {
        "analyze_contract_by_address"
    }

    fn description(&self) -> &str {
        "Analyze whether a given Ethereum address is a smart contract address and retrieve its source code if verified. Use this tool when the user asks whether an address is a contract, whether it's a proxy contract, what functions it has, or if it is secure. If the address is not a contract, the tool will return a message indicating so. If it is a contract, it will return the Solidity source code."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "description": "The Ethereum address to analyze. Must be a valid Ethereum address.",
                }
            },
            "required": ["address"],
        })
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let address = required_str(&arguments, "address")?;

        // A contract address has bytecode; an externally owned account reports "0x".
        let bytecode_response = self
            .client
            .query(&[
                ("module", "proxy"),
                ("action", "eth_getCode"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;
        let bytecode = bytecode_response
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolInvokeError::Upstream {
                service: SERVICE.to_string(),
                message: "failed to retrieve bytecode".into(),
            })?;
        if bytecode.is_empty() || bytecode == "0x" {
            return Ok(json!(format!(
                "Address {address} is not a contract address."
            )));
        }

        let source_response = self
            .client
            .query(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address),
            ])
            .await?;
        let raw_code = source_response
            .get("result")
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("SourceCode"))
            .and_then(Value::as_str)
            .unwrap_or("");
        if raw_code.is_empty() {
            return Ok(json!(format!(
                "Address {address} is a contract address, but it has not been verified or there is no source code available."
            )));
        }

        let source = extract_source_code(raw_code);
        let preview: String = source.chars().take(SOURCE_PREVIEW_CHARS).collect();
        Ok(json!(format!(
            "Address {address} is a contract address:\n\n{preview}..."
        )))
    }
}

/// Flattens verified contract source: Remix multi-file JSON becomes one
/// annotated listing; plain single-file Solidity passes through.
fn extract_source_code(source_code: &str) -> String {
    let source_code = source_code.trim();

    if source_code.is_empty() {
        return "This address does not disclose the contract source code or has not been verified."
            .to_string();
    }

    if source_code.starts_with('{') && source_code.ends_with('}') {
        match serde_json::from_str::<Value>(source_code) {
            Ok(parsed) => {
                if let Some(sources) = parsed.get("sources").and_then(Value::as_object) {
                    let blocks: Vec<String> = sources
                        .iter()
                        .map(|(filename, info)| {
                            let code = info.get("content").and_then(Value::as_str).unwrap_or("");
                            format!("// File: {filename}\n{code}")
                        })
                        .collect();
                    return blocks.join("\n\n");
                }
            }
            Err(_) => {
                return format!(
                    "JSON parsing failed. Returning the original source code:\n\n{source_code}"
                );
            }
        }
    }

    source_code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wei_string_conversion() {
        assert_eq!(wei_string_to_eth("1000000000000000000").unwrap(), 1.0);
        assert_eq!(wei_string_to_eth("500000000000000000").unwrap(), 0.5);
        assert!(wei_string_to_eth("not-a-number").is_err());
    }

    #[tokio::test]
    async fn eth_to_wei_formats_integer_string() {
        let mut arguments = Map::new();
        arguments.insert("eth_value".into(), json!(1.5));
        let value = EthToWeiTool.invoke(arguments).await.unwrap();
        assert_eq!(value, json!("1500000000000000000"));
    }

    #[tokio::test]
    async fn wei_to_eth_accepts_string_and_number() {
        let mut arguments = Map::new();
        arguments.insert("wei_value".into(), json!("2000000000000000000"));
        assert_eq!(
            WeiToEthTool.invoke(arguments).await.unwrap(),
            json!(2.0)
        );

        let mut arguments = Map::new();
        arguments.insert("wei_value".into(), json!(2000000000000000000u64));
        assert_eq!(
            WeiToEthTool.invoke(arguments).await.unwrap(),
            json!(2.0)
        );
    }

    #[test]
    fn remix_json_sources_are_flattened() {
        let raw = r#"{"sources": {"A.sol": {"content": "contract A {}"}, "B.sol": {"content": "contract B {}"}}}"#;
        let flattened = extract_source_code(raw);
        assert!(flattened.contains("// File: A.sol"));
        assert!(flattened.contains("contract B {}"));
    }

    #[test]
    fn malformed_source_json_falls_back_to_raw() {
        let raw = "{not json at all";
        assert_eq!(extract_source_code(raw), raw);

        let wrapped = "{\"sources\": oops}";
        assert!(extract_source_code(wrapped).starts_with("JSON parsing failed."));
    }

    #[test]
    fn plain_solidity_passes_through() {
        let raw = "pragma solidity ^0.8.0; contract C {}";
        assert_eq!(extract_source_code(raw), raw);
    }
}
