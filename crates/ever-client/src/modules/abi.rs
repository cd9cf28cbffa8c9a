//! `abi.*` methods and the shapes shared with processing

use crate::client::Client;
use crate::error::ClientResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contract ABI, in one of the forms the engine accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Abi {
    Contract(Value),
    /// ABI as a JSON string
    Json(String),
    /// Handle of an ABI registered in the engine
    Handle(u32),
    Serialized(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub public: String,
    pub secret: String,
}

/// How a message gets signed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Signer {
    /// Unsigned message
    #[default]
    None,
    /// Unsigned message plus `data_to_sign` for signing elsewhere
    External { public_key: String },
    Keys { keys: KeyPair },
    SigningBox { handle: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSet {
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<FunctionHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeploySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workchain_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_pubkey: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfEncodeMessage {
    pub abi: Abi,
    /// Target address; omit for deploy messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_set: Option<DeploySet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_set: Option<CallSet>,
    pub signer: Signer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_try_index: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOfEncodeMessage {
    /// Message BOC, base64
    pub message: String,
    #[serde(default)]
    pub data_to_sign: Option<String>,
    pub address: String,
    pub message_id: String,
}

/// Borrowed handle for `abi.*` calls
pub struct AbiModule<'a> {
    client: &'a Client,
}

impl AbiModule<'_> {
    pub async fn encode_message(
        &self,
        params: &ParamsOfEncodeMessage,
    ) -> ClientResult<ResultOfEncodeMessage> {
        self.client.get_result("abi.encode_message", params).await
    }
}

impl Client {
    pub fn abi(&self) -> AbiModule<'_> {
        AbiModule { client: self }
    }
}
