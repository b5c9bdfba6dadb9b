use std::fs;
use std::str::FromStr;

use num_bigint::BigInt;
use serde::{Deserialize, Deserializer};

use crate::error::HarnessError;
use crate::grid::Grid;
use crate::invoker::FailureMatch;
use crate::sample::{SampleRange, uniform_distribution};

#[derive(Debug, Deserialize, Clone)]
pub struct EmulationConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub failure_match: FailureMatch,
    #[serde(default)]
    pub grid: GridConfig,
    /// Formula under test
    pub candidate: ContractConfig,
    /// Formula it must agree with
    pub reference: ContractConfig,
}

/// Sample ranges. `balance` feeds both balance arguments, `rate` both rates.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct GridConfig {
    pub staked: RangeConfig,
    pub balance: RangeConfig,
    pub rate: RangeConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        let pow10 = |exp: usize| num_traits::pow(BigInt::from(10), exp);
        Self {
            staked: RangeConfig {
                minimum: pow10(23),
                maximum: pow10(24),
                count: 10,
            },
            balance: RangeConfig {
                minimum: pow10(23),
                maximum: pow10(24),
                count: 10,
            },
            rate: RangeConfig {
                minimum: BigInt::from(100_000),
                maximum: BigInt::from(900_000),
                count: 10,
            },
        }
    }
}

impl GridConfig {
    /// Build the five sample ranges in argument order.
    pub fn build(&self) -> Result<Grid, HarnessError> {
        Grid::new(
            self.staked.sample()?,
            self.balance.sample()?,
            self.balance.sample()?,
            self.rate.sample()?,
            self.rate.sample()?,
        )
    }
}

/// Bounds are decimal strings so token amounts above 2^64 survive YAML.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RangeConfig {
    #[serde(deserialize_with = "big_int_from_str")]
    pub minimum: BigInt,
    #[serde(deserialize_with = "big_int_from_str")]
    pub maximum: BigInt,
    pub count: usize,
}

/// A deployed formula contract reachable over Ethereum JSON-RPC.
#[derive(Debug, Deserialize, Clone)]
pub struct ContractConfig {
    pub name: String,
    pub rpc_url: String,
    pub address: String,
    /// 4-byte selector of `balancedWeights(uint256,uint256,uint256,uint256,uint256)`
    pub weights_selector: String,
    /// 4-byte selector of `init()`, sent once before the run when present
    #[serde(default)]
    pub init_selector: Option<String>,
    /// Sender for `eth_call` and the `init()` transaction
    #[serde(default)]
    pub from: Option<String>,
    /// Expected number of returned words; unchecked when absent
    #[serde(default)]
    pub outputs: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RangeConfig {
    pub fn sample(&self) -> Result<SampleRange, HarnessError> {
        uniform_distribution(&self.minimum, &self.maximum, self.count)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn big_int_from_str<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    BigInt::from_str(text.trim().replace('_', "").as_str()).map_err(serde::de::Error::custom)
}

impl EmulationConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, HarnessError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    pub fn from_file(path: &str) -> Result<Self, HarnessError> {
        let content = fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("Failed to read {}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, HarnessError> {
        serde_yaml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))
    }
}
