//! Contract-backed formula
//!
//! Binds to a formula contract that is already deployed on an Ethereum node
//! and evaluates it through JSON-RPC `eth_call`.
//!
//! Calldata is the 4-byte `balancedWeights` selector followed by the five
//! arguments as big-endian `uint256` words. Return data is read back as a
//! sequence of 32-byte unsigned words, one per weight.

use std::thread;
use std::time::Duration;

use num_bigint::{BigInt, Sign};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ContractConfig;
use crate::error::{HarnessError, InvocationFailure};
use crate::formula::{FormulaDeployment, WeightsFormula};
use crate::grid::TestCase;

const WORD_BYTES: usize = 32;
const SELECTOR_BYTES: usize = 4;
const RECEIPT_POLL_ATTEMPTS: u32 = 20;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Serialize)]
struct CallRequest<'a> {
    to: &'a str,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
}

#[derive(Debug)]
enum RpcFailure {
    /// The node answered with a JSON-RPC error object (reverts land here)
    Node {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    Transport(String),
}

impl From<RpcFailure> for InvocationFailure {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Node {
                code,
                message,
                data,
            } => match data {
                Some(data) => InvocationFailure::Revert(format!("{} ({}): {}", message, code, data)),
                None => InvocationFailure::Revert(format!("{} ({})", message, code)),
            },
            RpcFailure::Transport(msg) => InvocationFailure::Transport(msg),
        }
    }
}

impl From<RpcFailure> for HarnessError {
    fn from(failure: RpcFailure) -> Self {
        HarnessError::Setup(InvocationFailure::from(failure).to_string())
    }
}

/// Blocking JSON-RPC client for one node.
struct RpcClient {
    http: reqwest::blocking::Client,
    url: String,
}

impl RpcClient {
    fn new(url: &str, timeout: Duration) -> Result<Self, HarnessError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarnessError::Setup(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    fn call<T, R>(&self, method: &'static str, params: T) -> Result<Option<R>, RpcFailure>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(|e| RpcFailure::Transport(format!("HTTP request failed: {}", e)))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .map_err(|e| RpcFailure::Transport(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(RpcFailure::Node {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        Ok(rpc_response.result)
    }

    /// Like [`call`](Self::call), but a missing result is a transport failure.
    fn call_required<T, R>(&self, method: &'static str, params: T) -> Result<R, RpcFailure>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        self.call(method, params)?
            .ok_or_else(|| RpcFailure::Transport("No result in RPC response".to_string()))
    }
}

/// Handle on a bound formula contract.
pub struct ContractFormula {
    name: String,
    client: RpcClient,
    address: String,
    selector: [u8; SELECTOR_BYTES],
    from: Option<String>,
    outputs: Option<usize>,
}

impl ContractFormula {
    fn eth_call(&self, data: String) -> Result<String, InvocationFailure> {
        let request = CallRequest {
            to: &self.address,
            data,
            from: self.from.as_deref(),
        };
        Ok(self
            .client
            .call_required("eth_call", (request, "latest"))?)
    }
}

impl WeightsFormula for ContractFormula {
    fn name(&self) -> &str {
        &self.name
    }

    fn balanced_weights(&self, case: &TestCase) -> Result<Vec<BigInt>, InvocationFailure> {
        let calldata = encode_call(&self.selector, &case.arguments())?;
        let returned = self.eth_call(calldata)?;
        let weights = decode_words(&returned)?;

        if let Some(expected) = self.outputs
            && weights.len() != expected
        {
            return Err(InvocationFailure::Decode(format!(
                "expected {} words, got {}",
                expected,
                weights.len()
            )));
        }
        Ok(weights)
    }
}

/// Binding step for a deployed formula contract.
///
/// `init` verifies code exists at the address and, when an `init()` selector
/// is configured, sends that transaction once and waits for its receipt.
pub struct ContractDeployment {
    config: ContractConfig,
}

impl ContractDeployment {
    pub fn new(config: ContractConfig) -> Self {
        Self { config }
    }

    fn send_init(
        &self,
        client: &RpcClient,
        selector: [u8; SELECTOR_BYTES],
        from: &str,
    ) -> Result<(), HarnessError> {
        let tx = CallRequest {
            to: &self.config.address,
            data: format!("0x{}", hex::encode(selector)),
            from: Some(from),
        };
        let tx_hash: String = client.call_required("eth_sendTransaction", (tx,))?;
        debug!(contract = %self.config.name, %tx_hash, "Sent init() transaction");

        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt: Option<Value> = client.call("eth_getTransactionReceipt", (&tx_hash,))?;
            if let Some(receipt) = receipt {
                let status = receipt.get("status").and_then(Value::as_str);
                if status == Some("0x0") {
                    return Err(HarnessError::Setup(format!(
                        "{}: init() transaction {} reverted",
                        self.config.name, tx_hash
                    )));
                }
                return Ok(());
            }
            thread::sleep(RECEIPT_POLL_INTERVAL);
        }

        Err(HarnessError::Setup(format!(
            "{}: init() transaction {} was not mined",
            self.config.name, tx_hash
        )))
    }
}

impl FormulaDeployment for ContractDeployment {
    type Handle = ContractFormula;

    fn init(self) -> Result<ContractFormula, HarnessError> {
        info!(
            contract = %self.config.name,
            address = %self.config.address,
            rpc = %self.config.rpc_url,
            "Binding formula contract"
        );

        let selector = parse_selector(&self.config.weights_selector)?;
        let init_selector = self
            .config
            .init_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;
        let init_call = match init_selector {
            Some(selector) => {
                let from = self.config.from.clone().ok_or_else(|| {
                    HarnessError::Config(format!(
                        "{}: init_selector requires a `from` account",
                        self.config.name
                    ))
                })?;
                Some((selector, from))
            }
            None => None,
        };

        let client = RpcClient::new(
            &self.config.rpc_url,
            Duration::from_secs(self.config.timeout_secs),
        )?;

        let code: String =
            client.call_required("eth_getCode", (&self.config.address, "latest"))?;
        if code.trim_start_matches("0x").is_empty() {
            return Err(HarnessError::Setup(format!(
                "{}: no contract code at {}",
                self.config.name, self.config.address
            )));
        }
        debug!(
            contract = %self.config.name,
            code_bytes = code.trim_start_matches("0x").len() / 2,
            "Contract code found"
        );

        match init_call {
            Some((selector, from)) => self.send_init(&client, selector, &from)?,
            None => info!(contract = %self.config.name, "No init selector, binding as-is"),
        }

        Ok(ContractFormula {
            name: self.config.name,
            client,
            address: self.config.address,
            selector,
            from: self.config.from,
            outputs: self.config.outputs,
        })
    }
}

/// Parse a `0x`-prefixed 4-byte function selector.
pub fn parse_selector(text: &str) -> Result<[u8; SELECTOR_BYTES], HarnessError> {
    let bytes = hex::decode(text.trim().trim_start_matches("0x"))
        .map_err(|e| HarnessError::Config(format!("Invalid selector {}: {}", text, e)))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        HarnessError::Config(format!(
            "Selector {} must be {} bytes, got {}",
            text,
            SELECTOR_BYTES,
            bytes.len()
        ))
    })
}

/// ABI-encode a call with `uint256` arguments.
///
/// # Errors
/// * `Domain` - an argument is negative or wider than 256 bits
pub fn encode_call(
    selector: &[u8; SELECTOR_BYTES],
    args: &[&BigInt],
) -> Result<String, InvocationFailure> {
    let mut data = Vec::with_capacity(SELECTOR_BYTES + WORD_BYTES * args.len());
    data.extend_from_slice(selector);

    for arg in args {
        let (sign, bytes) = arg.to_bytes_be();
        if sign == Sign::Minus {
            return Err(InvocationFailure::Domain(format!(
                "{} is not a uint256",
                arg
            )));
        }
        if bytes.len() > WORD_BYTES {
            return Err(InvocationFailure::Domain(format!(
                "{} overflows uint256",
                arg
            )));
        }
        data.extend(std::iter::repeat_n(0u8, WORD_BYTES - bytes.len()));
        data.extend_from_slice(&bytes);
    }

    Ok(format!("0x{}", hex::encode(data)))
}

/// Split `eth_call` return data into unsigned 32-byte words.
///
/// # Errors
/// * `Decode` - not hex, empty, or not a whole number of words
pub fn decode_words(data: &str) -> Result<Vec<BigInt>, InvocationFailure> {
    let bytes = hex::decode(data.trim_start_matches("0x"))
        .map_err(|e| InvocationFailure::Decode(format!("invalid hex: {}", e)))?;
    if bytes.is_empty() {
        return Err(InvocationFailure::Decode("empty return data".to_string()));
    }
    if bytes.len() % WORD_BYTES != 0 {
        return Err(InvocationFailure::Decode(format!(
            "{} bytes is not a whole number of words",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks(WORD_BYTES)
        .map(|word| BigInt::from_bytes_be(Sign::Plus, word))
        .collect())
}
