//! `utils.*` methods

use crate::client::Client;
use crate::error::ClientResult;
use serde::{Deserialize, Serialize};

/// Target format for address conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AddressStringFormat {
    AccountId,
    Hex,
    Base64 { url: bool, test: bool, bounce: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsOfConvertAddress {
    pub address: String,
    pub output_format: AddressStringFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOfConvertAddress {
    pub address: String,
}

pub struct UtilsModule<'a> {
    client: &'a Client,
}

impl UtilsModule<'_> {
    pub async fn convert_address(
        &self,
        params: &ParamsOfConvertAddress,
    ) -> ClientResult<ResultOfConvertAddress> {
        self.client.get_result("utils.convert_address", params).await
    }
}

impl Client {
    pub fn utils(&self) -> UtilsModule<'_> {
        UtilsModule { client: self }
    }
}
