//! Streaming calls and subscriptions

mod common;

use common::*;
use ever_client::modules::net::ParamsOfSubscribeCollection;
use ever_client::{ClientError, Delivery};
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_stream_yields_items_then_ends() {
    let engine = Arc::new(ScriptedEngine::scripted(vec![(
        "test.subscribe_x",
        vec![
            (STREAM_EVENT, r#"{"n":1}"#, false),
            (STREAM_EVENT, r#"{"n":2}"#, false),
            (STREAM_EVENT, r#"{"n":3}"#, false),
            (STREAM_TERMINATED, "", true),
        ],
    )]));
    let client = active_client(engine);

    let items: Vec<Value> = client
        .subscribe("test.subscribe_x", &())
        .unwrap()
        .into_stream::<Value>()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(items, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_stream_error_is_last_item() {
    let engine = Arc::new(ScriptedEngine::scripted(vec![(
        "test.subscribe_x",
        vec![
            (STREAM_EVENT, r#"{"n":1}"#, false),
            (ERROR, r#"{"code":4,"message":"lost"}"#, false),
            (STREAM_EVENT, r#"{"n":2}"#, false),
        ],
    )]));
    let client = active_client(engine);

    let items: Vec<_> = client
        .subscribe("test.subscribe_x", &())
        .unwrap()
        .into_stream::<Value>()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &json!({"n": 1}));
    assert_eq!(items[1].as_ref().unwrap_err().foreign_code(), Some(4));
}

#[tokio::test]
async fn test_unsubscribe_removes_pending_call() {
    let engine = Arc::new(ScriptedEngine::silent());
    let client = active_client(Arc::clone(&engine));

    let mut subscription = client.subscribe("test.subscribe_x", &()).unwrap();
    let id = subscription.request_id();
    assert!(client.is_pending(id));

    assert!(client.unsubscribe(id));
    assert!(!client.is_pending(id));
    assert!(!client.unsubscribe(id));

    assert_eq!(
        engine.ingress().deliver(id, b"{}".to_vec(), STREAM_EVENT, false),
        Delivery::UnknownRequest
    );
    assert!(subscription.next().await.is_none());
}

#[tokio::test]
async fn test_unsubscribe_unknown_id_is_noop() {
    let client = active_client(Arc::new(ScriptedEngine::silent()));
    assert!(!client.unsubscribe(4242));
}

#[tokio::test]
async fn test_dropping_subscription_releases_call() {
    let client = active_client(Arc::new(ScriptedEngine::silent()));

    let subscription = client.subscribe("test.subscribe_x", &()).unwrap();
    let id = subscription.request_id();
    drop(subscription);

    assert!(!client.is_pending(id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsubscribe_racing_final_delivery_never_hangs() {
    let engine = Arc::new(ScriptedEngine::silent());
    let client = active_client(Arc::clone(&engine));

    for _ in 0..100 {
        let mut subscription = client.subscribe("test.subscribe_x", &()).unwrap();
        let id = subscription.request_id();
        let ingress = engine.ingress();

        let deliverer = std::thread::spawn(move || {
            ingress.deliver(id, b"\"last\"".to_vec(), SUCCESS, true)
        });
        let unsubscribed = client.unsubscribe(id);
        let delivered = deliverer.join().unwrap() == Delivery::Delivered;

        let first = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("subscription blocked");

        // Exactly one side wins; a delivered final is never lost
        assert_ne!(unsubscribed, delivered);
        if delivered {
            assert_eq!(first.unwrap().unwrap(), b"\"last\"");
        } else {
            assert!(first.is_none());
        }
        assert!(!client.is_pending(id));
    }
}

#[tokio::test]
async fn test_destroy_ends_subscription() {
    let client = active_client(Arc::new(ScriptedEngine::silent()));
    let mut subscription = client.subscribe("test.subscribe_x", &()).unwrap();

    client.destroy();

    assert!(matches!(
        subscription.next().await,
        Some(Err(ClientError::TransportClosed))
    ));
    assert!(subscription.next().await.is_none());
}

// ============================================================================
// net subscriptions
// ============================================================================

fn collection_params() -> ParamsOfSubscribeCollection {
    ParamsOfSubscribeCollection {
        collection: "transactions".to_string(),
        filter: Some(json!({"account_addr": {"eq": "0:abc"}})),
        result: "id".to_string(),
    }
}

#[tokio::test]
async fn test_subscribe_collection_reports_handle_and_items() {
    let engine = Arc::new(ScriptedEngine::scripted(vec![
        (
            "net.subscribe_collection",
            vec![
                (SUCCESS, r#"{"handle":42}"#, false),
                (STREAM_EVENT, r#"{"result":{"id":"a"}}"#, false),
                (STREAM_EVENT, r#"{"result":{"id":"b"}}"#, false),
            ],
        ),
        ("net.unsubscribe", vec![(SUCCESS, "", true)]),
    ]));
    let client = active_client(Arc::clone(&engine));

    let mut subscription = client
        .net()
        .subscribe_collection(&collection_params())
        .await
        .unwrap();
    assert_eq!(subscription.handle(), 42);

    assert_eq!(subscription.next().await.unwrap().unwrap(), json!({"id": "a"}));
    assert_eq!(subscription.next().await.unwrap().unwrap(), json!({"id": "b"}));

    client.net().unsubscribe(&mut subscription).await.unwrap();

    assert!(!client.is_pending(subscription.request_id()));
    assert!(subscription.next().await.is_none());

    let calls = engine.calls();
    assert_eq!(calls[0].params_json()["collection"], "transactions");
    assert_eq!(calls[1].method, "net.unsubscribe");
    assert_eq!(calls[1].params_json(), json!({"handle": 42}));
}

#[tokio::test]
async fn test_subscribe_collection_error_before_handle() {
    let engine = Arc::new(ScriptedEngine::scripted(vec![(
        "net.subscribe_collection",
        vec![(ERROR, r#"{"code":601,"message":"not connected"}"#, true)],
    )]));
    let client = active_client(engine);

    let err = client
        .net()
        .subscribe_collection(&collection_params())
        .await
        .unwrap_err();

    assert_eq!(err.foreign_code(), Some(601));
}

#[tokio::test]
async fn test_subscribe_closed_without_handle_fails_to_decode() {
    let engine = Arc::new(ScriptedEngine::scripted(vec![(
        "net.subscribe",
        vec![(STREAM_TERMINATED, "", true)],
    )]));
    let client = active_client(engine);

    let params = ever_client::modules::net::ParamsOfSubscribe {
        subscription: "blocks { id }".to_string(),
        variables: None,
    };
    let err = client.net().subscribe(&params).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}
