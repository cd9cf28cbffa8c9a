//! `processing.*` methods: sending messages and waiting for their results
//!
//! With `send_events` set, the engine reports progress as stream events while
//! the call runs. They are decoded into [`ProcessingEvent`] and handed to the
//! caller's callback in arrival order.

use super::abi::{Abi, ParamsOfEncodeMessage};
use crate::client::Client;
use crate::error::{ClientResult, ForeignError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Progress of message processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProcessingEvent {
    WillFetchFirstBlock {
        #[serde(default)]
        message_id: String,
        #[serde(default)]
        message_dst: String,
    },
    FetchFirstBlockFailed {
        error: ForeignError,
        #[serde(default)]
        message_id: String,
        #[serde(default)]
        message_dst: String,
    },
    WillSend {
        shard_block_id: String,
        message_id: String,
        #[serde(default)]
        message_dst: String,
        message: String,
    },
    DidSend {
        shard_block_id: String,
        message_id: String,
        #[serde(default)]
        message_dst: String,
        message: String,
    },
    SendFailed {
        shard_block_id: String,
        message_id: String,
        #[serde(default)]
        message_dst: String,
        message: String,
        error: ForeignError,
    },
    WillFetchNextBlock {
        shard_block_id: String,
        message_id: String,
        #[serde(default)]
        message_dst: String,
        message: String,
    },
    FetchNextBlockFailed {
        shard_block_id: String,
        message_id: String,
        #[serde(default)]
        message_dst: String,
        message: String,
        error: ForeignError,
    },
    MessageExpired {
        message_id: String,
        #[serde(default)]
        message_dst: String,
        message: String,
        error: ForeignError,
    },
    /// Event kinds this binding does not model
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfSendMessage {
    /// Message BOC, base64
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<Abi>,
    pub send_events: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOfSendMessage {
    /// Last shard block before sending; the starting point for waiting
    pub shard_block_id: String,
    #[serde(default)]
    pub sending_endpoints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfWaitForTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<Abi>,
    pub message: String,
    pub shard_block_id: String,
    pub send_events: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sending_endpoints: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedOutput {
    #[serde(default)]
    pub out_messages: Vec<Option<Value>>,
    #[serde(default)]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultOfProcessMessage {
    pub transaction: Value,
    #[serde(default)]
    pub out_messages: Vec<String>,
    #[serde(default)]
    pub decoded: Option<DecodedOutput>,
    #[serde(default)]
    pub fees: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfProcessMessage {
    pub message_encode_params: ParamsOfEncodeMessage,
    pub send_events: bool,
}

/// Borrowed handle for `processing.*` calls
pub struct ProcessingModule<'a> {
    client: &'a Client,
}

impl ProcessingModule<'_> {
    pub async fn send_message<F>(
        &self,
        params: &ParamsOfSendMessage,
        on_event: F,
    ) -> ClientResult<ResultOfSendMessage>
    where
        F: FnMut(ProcessingEvent),
    {
        self.client
            .get_result_with_events("processing.send_message", params, on_event)
            .await
    }

    pub async fn wait_for_transaction<F>(
        &self,
        params: &ParamsOfWaitForTransaction,
        on_event: F,
    ) -> ClientResult<ResultOfProcessMessage>
    where
        F: FnMut(ProcessingEvent),
    {
        self.client
            .get_result_with_events("processing.wait_for_transaction", params, on_event)
            .await
    }

    /// Encode, send and wait in one call
    pub async fn process_message<F>(
        &self,
        params: &ParamsOfProcessMessage,
        on_event: F,
    ) -> ClientResult<ResultOfProcessMessage>
    where
        F: FnMut(ProcessingEvent),
    {
        self.client
            .get_result_with_events("processing.process_message", params, on_event)
            .await
    }
}

impl Client {
    pub fn processing(&self) -> ProcessingModule<'_> {
        ProcessingModule { client: self }
    }
}
