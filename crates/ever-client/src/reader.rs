//! Response readers
//!
//! A [`PendingResponse`] aggregates a call's fragments into one result. A
//! [`Subscription`] exposes them one at a time as a stream.
//!
//! Both wait on the call's sink and the client's shutdown signal together, so
//! destroying the client wakes every reader with `TransportClosed`.

use crate::correlation::{CallControl, CorrelationTable, RequestId, SinkReceiver, Signal};
use crate::error::{ClientError, ClientResult, ForeignError};
use crate::ffi::ResponseStatus;
use futures_util::stream::{self, Stream};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Decode a payload; an empty payload decodes as JSON `null`
pub(crate) fn decode<T: DeserializeOwned>(payload: &[u8]) -> ClientResult<T> {
    let payload: &[u8] = if payload.is_empty() { b"null" } else { payload };
    serde_json::from_slice(payload).map_err(ClientError::Decode)
}

/// Reader-side half of a registered call.
///
/// Dropped before the call is done (sink drained, cancelled, or woken by
/// shutdown), it cancels the call so the table entry does not outlive it.
#[derive(Debug)]
struct CallReader {
    request_id: RequestId,
    receiver: SinkReceiver,
    control: Arc<CallControl>,
    table: Arc<CorrelationTable>,
    shutdown: Signal,
    done: bool,
}

impl CallReader {
    /// Give up on the call: stop its sink and drop its table entry.
    ///
    /// Returns `false` if the final fragment was already claimed, in which
    /// case the call stays readable.
    fn cancel(&mut self) -> bool {
        if !self.control.claim_cancellation() {
            return false;
        }
        self.done = true;
        self.receiver.close();
        self.table.remove(self.request_id);
        true
    }
}

impl Drop for CallReader {
    fn drop(&mut self) {
        if !self.done && self.cancel() {
            tracing::debug!(request_id = self.request_id, "abandoned request cancelled");
        }
    }
}

/// Handle to an issued request whose responses have not been read yet
#[derive(Debug)]
pub struct PendingResponse {
    reader: CallReader,
}

impl PendingResponse {
    pub(crate) fn new(
        request_id: RequestId,
        receiver: SinkReceiver,
        control: Arc<CallControl>,
        table: Arc<CorrelationTable>,
        shutdown: Signal,
    ) -> Self {
        Self {
            reader: CallReader {
                request_id,
                receiver,
                control,
                table,
                shutdown,
                done: false,
            },
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.reader.request_id
    }

    /// Drain the call and return the first success payload.
    ///
    /// If any error fragment arrived, the first one is returned instead. A call
    /// that ends without a success payload yields empty bytes.
    pub async fn wait(self) -> ClientResult<Vec<u8>> {
        self.collect(None, |_| {}).await
    }

    /// Like [`wait`](Self::wait), decoding the payload into `T`
    pub async fn wait_decoded<T: DeserializeOwned>(self) -> ClientResult<T> {
        decode(&self.wait().await?)
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    ///
    /// On timeout the call is cancelled and removed. If its final fragment was
    /// already claimed when the timer fired, the result is returned instead.
    pub async fn wait_with_timeout(self, timeout: Duration) -> ClientResult<Vec<u8>> {
        self.collect(Some(timeout), |_| {}).await
    }

    /// Like [`wait`](Self::wait), passing every stream-event payload to
    /// `on_event` in arrival order
    pub async fn wait_with_events<F>(self, on_event: F) -> ClientResult<Vec<u8>>
    where
        F: FnMut(&[u8]),
    {
        self.collect(None, on_event).await
    }

    /// Read the responses one at a time instead of aggregating them
    pub fn into_subscription(self) -> Subscription {
        Subscription {
            reader: self.reader,
            exhausted: false,
        }
    }

    async fn collect<F>(
        mut self,
        timeout: Option<Duration>,
        mut on_event: F,
    ) -> ClientResult<Vec<u8>>
    where
        F: FnMut(&[u8]),
    {
        let reader = &mut self.reader;
        let mut data: Option<Vec<u8>> = None;
        let mut error: Option<ForeignError> = None;

        let mut deadline_armed = timeout.is_some();
        let deadline = tokio::time::sleep(timeout.unwrap_or_default());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                _ = reader.shutdown.fired() => {
                    reader.done = true;
                    tracing::debug!(request_id = reader.request_id, "reader woken by shutdown");
                    return Err(ClientError::TransportClosed);
                }

                fragment = reader.receiver.recv() => match fragment {
                    None => {
                        reader.done = true;
                        break;
                    }
                    Some(fragment) => match fragment.status {
                        ResponseStatus::Success => {
                            if data.is_none() {
                                data = Some(fragment.payload);
                            }
                        }
                        ResponseStatus::Error => {
                            if error.is_none() {
                                error = Some(ForeignError::from_payload(&fragment.payload));
                            }
                        }
                        ResponseStatus::StreamEvent => on_event(&fragment.payload),
                        ResponseStatus::StreamTerminated | ResponseStatus::Unknown(_) => {}
                    },
                },

                _ = &mut deadline, if deadline_armed => {
                    if reader.cancel() {
                        let timeout = timeout.unwrap_or_default();
                        tracing::debug!(
                            request_id = reader.request_id,
                            ?timeout,
                            "request timed out"
                        );
                        return Err(ClientError::Timeout(timeout));
                    }
                    // Final fragment is in flight; keep draining
                    deadline_armed = false;
                }
            }
        }

        match error {
            Some(error) => Err(ClientError::Foreign(error)),
            None => Ok(data.unwrap_or_default()),
        }
    }
}

/// Ordered sequence of a streaming call's payloads.
///
/// Yields success and stream-event payloads in arrival order and ends when the
/// engine closes the stream. An error fragment is yielded once as `Err` and
/// ends the sequence. Dropping an unfinished subscription cancels the call
/// locally.
#[derive(Debug)]
pub struct Subscription {
    reader: CallReader,
    exhausted: bool,
}

impl Subscription {
    pub fn request_id(&self) -> RequestId {
        self.reader.request_id
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Next payload, `None` once the sequence has ended
    pub async fn next(&mut self) -> Option<ClientResult<Vec<u8>>> {
        loop {
            if self.exhausted {
                return None;
            }

            let fragment = tokio::select! {
                biased;

                _ = self.reader.shutdown.fired() => {
                    self.exhausted = true;
                    self.reader.done = true;
                    return Some(Err(ClientError::TransportClosed));
                }

                fragment = self.reader.receiver.recv() => fragment,
            };

            let Some(fragment) = fragment else {
                self.exhausted = true;
                self.reader.done = true;
                return None;
            };

            match fragment.status {
                ResponseStatus::Error => {
                    self.close();
                    return Some(Err(ForeignError::from_payload(&fragment.payload).into()));
                }
                // Closing fragments often carry no payload
                _ if fragment.payload.is_empty() => continue,
                _ => return Some(Ok(fragment.payload)),
            }
        }
    }

    /// Next payload decoded into `T`. A decode failure ends the sequence.
    pub async fn next_decoded<T: DeserializeOwned>(&mut self) -> Option<ClientResult<T>> {
        let item = match self.next().await? {
            Ok(payload) => decode(&payload),
            Err(e) => Err(e),
        };
        if item.is_err() {
            self.close();
        }
        Some(item)
    }

    /// Stop the sequence locally.
    ///
    /// Fires the call's cancel signal, closes its sink and removes its table
    /// entry. Fragments that were already buffered are discarded. This does
    /// not tell the engine; see `Client::unsubscribe`.
    pub fn close(&mut self) {
        self.exhausted = true;
        if !self.reader.cancel() {
            // Final fragment already claimed; its delivery removed the entry
            self.reader.receiver.close();
        }
    }

    /// Adapt into a `Stream` of decoded items
    pub fn into_stream<T: DeserializeOwned>(self) -> impl Stream<Item = ClientResult<T>> {
        stream::unfold(self, |mut subscription| async move {
            let item = subscription.next_decoded().await?;
            Some((item, subscription))
        })
    }
}
