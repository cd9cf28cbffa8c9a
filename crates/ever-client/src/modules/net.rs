//! `net.*` methods: GraphQL queries and subscriptions
//!
//! Subscriptions are streaming calls. The engine's first fragment carries the
//! subscription handle (`{"handle": n}`); every later fragment carries one
//! item (`{"result": ...}`) until the subscription is cancelled.

use crate::client::Client;
use crate::error::ClientResult;
use crate::reader::{decode, Subscription};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Extra time granted past the engine-side `wait_for_collection` timeout
/// before the call is abandoned locally
pub const WAIT_FOR_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub path: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfQueryCollection {
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Projection, e.g. `"id balance"`
    pub result: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub order: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultOfQueryCollection {
    pub result: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfWaitForCollection {
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub result: String,
    /// Engine-side timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultOfWaitForCollection {
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfSubscribeCollection {
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub result: String,
}

/// Raw GraphQL subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsOfSubscribe {
    pub subscription: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOfSubscribeCollection {
    pub handle: u32,
}

#[derive(Deserialize)]
struct SubscriptionItem {
    result: Value,
}

/// A live engine-side subscription
#[derive(Debug)]
pub struct NetSubscription {
    handle: u32,
    inner: Subscription,
}

impl NetSubscription {
    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn request_id(&self) -> u32 {
        self.inner.request_id()
    }

    /// Next subscription item, `None` once the subscription has ended
    pub async fn next(&mut self) -> Option<ClientResult<Value>> {
        let item = self.inner.next_decoded::<SubscriptionItem>().await?;
        Some(item.map(|item| item.result))
    }

    pub fn into_stream(self) -> impl Stream<Item = ClientResult<Value>> {
        stream::unfold(self, |mut subscription| async move {
            let item = subscription.next().await?;
            Some((item, subscription))
        })
    }
}

/// Borrowed handle for `net.*` calls
pub struct NetModule<'a> {
    client: &'a Client,
}

impl NetModule<'_> {
    pub async fn query_collection(
        &self,
        params: &ParamsOfQueryCollection,
    ) -> ClientResult<ResultOfQueryCollection> {
        self.client.get_result("net.query_collection", params).await
    }

    /// Wait for a document matching the filter to appear.
    ///
    /// With an explicit `timeout`, the call is also abandoned locally once
    /// that timeout plus [`WAIT_FOR_GRACE`] has passed.
    pub async fn wait_for_collection(
        &self,
        params: &ParamsOfWaitForCollection,
    ) -> ClientResult<ResultOfWaitForCollection> {
        match params.timeout {
            Some(ms) => {
                let local = Duration::from_millis(u64::from(ms)) + WAIT_FOR_GRACE;
                self.client
                    .get_result_with_timeout("net.wait_for_collection", params, local)
                    .await
            }
            None => self.client.get_result("net.wait_for_collection", params).await,
        }
    }

    pub async fn subscribe_collection(
        &self,
        params: &ParamsOfSubscribeCollection,
    ) -> ClientResult<NetSubscription> {
        self.open("net.subscribe_collection", params).await
    }

    pub async fn subscribe(&self, params: &ParamsOfSubscribe) -> ClientResult<NetSubscription> {
        self.open("net.subscribe", params).await
    }

    /// End a subscription: stop local delivery, then cancel it in the engine
    pub async fn unsubscribe(&self, subscription: &mut NetSubscription) -> ClientResult<()> {
        subscription.inner.close();
        self.client
            .get_response(
                "net.unsubscribe",
                &ResultOfSubscribeCollection {
                    handle: subscription.handle,
                },
            )
            .await?;
        Ok(())
    }

    /// Suspend all network activity, keeping subscriptions registered
    pub async fn suspend(&self) -> ClientResult<()> {
        self.client.get_response("net.suspend", &()).await?;
        Ok(())
    }

    pub async fn resume(&self) -> ClientResult<()> {
        self.client.get_response("net.resume", &()).await?;
        Ok(())
    }

    async fn open<P: Serialize>(&self, method: &str, params: &P) -> ClientResult<NetSubscription> {
        let mut inner = self.client.subscribe(method, params)?;

        // A stream that closes before reporting a handle decodes as null and fails
        let first = inner.next().await.unwrap_or_else(|| Ok(Vec::new()))?;
        let ResultOfSubscribeCollection { handle } = decode(&first)?;

        tracing::debug!(request_id = inner.request_id(), handle, method, "subscription opened");
        Ok(NetSubscription { handle, inner })
    }
}

impl Client {
    pub fn net(&self) -> NetModule<'_> {
        NetModule { client: self }
    }
}
