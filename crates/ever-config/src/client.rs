//! Client configuration blob
//!
//! Mirrors the JSON object the engine accepts in `tc_create_context`. Every
//! field is optional: anything left unset is omitted from the serialized blob
//! and the engine falls back to its own default.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Word counts accepted for mnemonic phrases
pub const MNEMONIC_WORD_COUNTS: [u8; 5] = [12, 15, 18, 21, 24];

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Binding identification reported to the engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingConfig>,

    /// Network settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,

    /// Crypto settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto: Option<CryptoConfig>,

    /// ABI settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<AbiConfig>,

    /// BOC cache settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boc: Option<BocConfig>,

    /// Proof verification settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proofs: Option<ProofsConfig>,

    /// Directory for the engine's local storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_storage_path: Option<String>,
}

/// Binding identification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Network protocol used to perform GraphQL queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkQueriesProtocol {
    /// Each GraphQL query uses a separate HTTP request
    #[serde(rename = "HTTP")]
    Http,
    /// All GraphQL queries are served over a single web socket connection
    #[serde(rename = "WS")]
    WebSocket,
}

/// Network settings
///
/// Durations are milliseconds, as the engine expects them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_retries_count: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reconnect_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_retries_count: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_processing_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_of_sync_threshold: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sending_endpoint_count: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_detection_interval: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries_protocol: Option<NetworkQueriesProtocol>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_remp_status_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_remp_status_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_id: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
}

/// Mnemonic dictionary, serialized as its numeric engine code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub enum MnemonicDictionary {
    Ton,
    English,
    ChineseSimplified,
    ChineseTraditional,
    French,
    Italian,
    Japanese,
    Korean,
    Spanish,
}

impl From<MnemonicDictionary> for u8 {
    fn from(dictionary: MnemonicDictionary) -> Self {
        match dictionary {
            MnemonicDictionary::Ton => 0,
            MnemonicDictionary::English => 1,
            MnemonicDictionary::ChineseSimplified => 2,
            MnemonicDictionary::ChineseTraditional => 3,
            MnemonicDictionary::French => 4,
            MnemonicDictionary::Italian => 5,
            MnemonicDictionary::Japanese => 6,
            MnemonicDictionary::Korean => 7,
            MnemonicDictionary::Spanish => 8,
        }
    }
}

impl TryFrom<u8> for MnemonicDictionary {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => MnemonicDictionary::Ton,
            1 => MnemonicDictionary::English,
            2 => MnemonicDictionary::ChineseSimplified,
            3 => MnemonicDictionary::ChineseTraditional,
            4 => MnemonicDictionary::French,
            5 => MnemonicDictionary::Italian,
            6 => MnemonicDictionary::Japanese,
            7 => MnemonicDictionary::Korean,
            8 => MnemonicDictionary::Spanish,
            other => return Err(format!("unknown mnemonic dictionary {}", other)),
        })
    }
}

/// Crypto settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CryptoConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic_dictionary: Option<MnemonicDictionary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic_word_count: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdkey_derivation_path: Option<String>,
}

/// ABI settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct AbiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workchain: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_expiration_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_expiration_timeout_grow_factor: Option<f32>,
}

/// BOC cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BocConfig {
    /// Maximum BOC cache size in kilobytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_size: Option<u32>,
}

/// Proof verification settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProofsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_in_local_storage: Option<bool>,
}

impl ClientConfig {
    /// Recommended settings for talking to the given endpoints
    pub fn with_endpoints<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            binding: None,
            network: Some(NetworkConfig {
                endpoints: endpoints.into_iter().map(Into::into).collect(),
                message_retries_count: Some(5),
                message_processing_timeout: Some(40_000),
                wait_for_timeout: Some(40_000),
                out_of_sync_threshold: Some(15_000),
                sending_endpoint_count: Some(1),
                latency_detection_interval: Some(60_000),
                max_latency: Some(60_000),
                query_timeout: Some(60_000),
                first_remp_status_timeout: Some(1_000),
                next_remp_status_timeout: Some(5_000),
                ..NetworkConfig::default()
            }),
            crypto: Some(CryptoConfig {
                mnemonic_dictionary: Some(MnemonicDictionary::English),
                mnemonic_word_count: Some(12),
                hdkey_derivation_path: None,
            }),
            abi: Some(AbiConfig {
                workchain: Some(0),
                message_expiration_timeout: Some(40_000),
                message_expiration_timeout_grow_factor: Some(1.5),
            }),
            boc: None,
            proofs: None,
            local_storage_path: None,
        }
    }

    /// Load client configuration from a TOML file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges the engine would otherwise reject at context creation
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(network) = &self.network {
            if network.endpoints.iter().any(|e| e.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "network.endpoints".to_string(),
                    reason: "endpoint cannot be empty".to_string(),
                });
            }
            if network.sending_endpoint_count == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "network.sending_endpoint_count".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        if let Some(count) = self.crypto.as_ref().and_then(|c| c.mnemonic_word_count) {
            if !MNEMONIC_WORD_COUNTS.contains(&count) {
                return Err(ConfigError::InvalidValue {
                    field: "crypto.mnemonic_word_count".to_string(),
                    reason: format!("{} is not one of {:?}", count, MNEMONIC_WORD_COUNTS),
                });
            }
        }

        if let Some(factor) = self
            .abi
            .as_ref()
            .and_then(|a| a.message_expiration_timeout_grow_factor)
        {
            if !(factor > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: "abi.message_expiration_timeout_grow_factor".to_string(),
                    reason: format!("{} must be positive", factor),
                });
            }
        }

        Ok(())
    }

    /// Configured endpoints, empty when no network section is present
    pub fn endpoints(&self) -> &[String] {
        self.network
            .as_ref()
            .map(|n| n.endpoints.as_slice())
            .unwrap_or(&[])
    }

    /// Mutable network section, created on first access
    pub fn network_mut(&mut self) -> &mut NetworkConfig {
        self.network.get_or_insert_with(NetworkConfig::default)
    }
}

/// Endpoints of the production network
pub fn mainnet_endpoints() -> Vec<String> {
    vec!["https://mainnet.evercloud.dev/graphql/".to_string()]
}

/// Endpoints of the developer network
pub fn devnet_endpoints() -> Vec<String> {
    vec!["https://devnet.evercloud.dev/graphql/".to_string()]
}

/// Endpoints of a local node
pub fn localnet_endpoints() -> Vec<String> {
    vec![
        "http://0.0.0.0/".to_string(),
        "http://127.0.0.1/".to_string(),
        "http://localhost/".to_string(),
    ]
}
