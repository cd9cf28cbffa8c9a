//! `client.*` methods: engine identification and app-request replies

use crate::client::Client;
use crate::error::ClientResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOfVersion {
    /// Engine version, e.g. `1.14.0`
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfoDependency {
    pub name: String,
    pub git_commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultOfBuildInfo {
    #[serde(default)]
    pub build_number: u32,
    #[serde(default)]
    pub dependencies: Vec<BuildInfoDependency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultOfGetApiReference {
    pub api: Value,
}

/// Reply to an application request the engine made during a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppRequestResult {
    Error { text: String },
    Ok { result: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfResolveAppRequest {
    pub app_request_id: u32,
    pub result: AppRequestResult,
}

impl Client {
    pub async fn version(&self) -> ClientResult<ResultOfVersion> {
        self.get_result("client.version", &()).await
    }

    pub async fn build_info(&self) -> ClientResult<ResultOfBuildInfo> {
        self.get_result("client.build_info", &()).await
    }

    /// Full description of the engine's API
    pub async fn get_api_reference(&self) -> ClientResult<ResultOfGetApiReference> {
        self.get_result("client.get_api_reference", &()).await
    }

    pub async fn resolve_app_request(
        &self,
        params: &ParamsOfResolveAppRequest,
    ) -> ClientResult<()> {
        self.get_response("client.resolve_app_request", params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_app_request_result_tags() {
        let ok = AppRequestResult::Ok {
            result: json!({"signed": "te6cc"}),
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"type": "Ok", "result": {"signed": "te6cc"}})
        );

        let err: AppRequestResult =
            serde_json::from_value(json!({"type": "Error", "text": "denied"})).unwrap();
        assert_eq!(
            err,
            AppRequestResult::Error {
                text: "denied".to_string()
            }
        );
    }

    #[test]
    fn test_build_info_tolerates_missing_fields() {
        let info: ResultOfBuildInfo = serde_json::from_value(json!({})).unwrap();
        assert_eq!(info, ResultOfBuildInfo::default());
    }
}
