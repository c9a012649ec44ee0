mod common;

use std::{sync::Arc, time::Duration};

use common::{ManualTransport, ScriptedTransport};
use serde_json::{Value, json};
use sitekit::{
    content::BookDraft,
    core::cache::CacheStore,
    endpoint::Endpoint,
    runtime::{
        events::ClientEvent,
        handle::{ClientConfig, ClientError, ClientHandle, QuerySubscription, RefetchSignals, spawn_client},
    },
};
use tokio::time::timeout;

fn spawn_with(
    transport: Arc<dyn sitekit::transport::Transport>,
    signals: &RefetchSignals,
    gc_grace_ms: u64,
) -> ClientHandle {
    let config = ClientConfig {
        gc_grace_ms,
        ..ClientConfig::default()
    };
    spawn_client(CacheStore::new(), transport, signals, config)
}

async fn wait_for_data(sub: &mut QuerySubscription<Value>, expected: &Value) {
    timeout(Duration::from_secs(1), async {
        loop {
            if sub.view().data.as_ref() == Some(expected) {
                return;
            }
            sub.changed().await.expect("changed");
        }
    })
    .await
    .expect("data never arrived");
}

#[tokio::test]
async fn two_subscribers_share_one_in_flight_request() {
    let (transport, mut pending) = ManualTransport::new();
    let signals = RefetchSignals::new();
    let client = spawn_with(transport, &signals, 60_000);

    let mut first: QuerySubscription<Value> =
        client.query(Endpoint::GetPublicBooks).await.expect("query");
    let mut second: QuerySubscription<Value> =
        client.query(Endpoint::GetPublicBooks).await.expect("query");

    let request = timeout(Duration::from_secs(1), pending.recv())
        .await
        .expect("request")
        .expect("recv");
    assert_eq!(request.route(), "GET /books");
    // The joiner shares the in-flight call rather than issuing its own.
    assert!(pending.try_recv().is_err());

    request.respond_json(200, json!(["dune"]));

    let a = first.resolved().await.expect("resolve");
    let b = second.resolved().await.expect("resolve");
    assert_eq!(a.data, Some(json!(["dune"])));
    assert_eq!(b.data, Some(json!(["dune"])));

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn mutation_invalidates_and_refetches_subscribed_entries() {
    let transport = ScriptedTransport::new();
    transport.enqueue("GET /newsletter/subscribers", 200, json!([{ "v": 1 }]));
    transport.enqueue("GET /newsletter/subscribers", 200, json!([{ "v": 2 }]));
    transport.respond_always(
        "PATCH /newsletter/subscribers/abc/toggle-status",
        200,
        json!({}),
    );

    let signals = RefetchSignals::new();
    let client = spawn_with(transport.clone(), &signals, 60_000);
    let mut events = client.events();

    let mut sub: QuerySubscription<Value> =
        client.query(Endpoint::GetSubscribers).await.expect("query");
    let view = sub.resolved().await.expect("resolve");
    assert_eq!(view.data, Some(json!([{ "v": 1 }])));

    client
        .toggle_subscriber_status("abc".to_string())
        .await
        .expect("toggle");

    wait_for_data(&mut sub, &json!([{ "v": 2 }])).await;
    assert_eq!(transport.calls("GET /newsletter/subscribers"), 2);

    let mut saw_invalidation = false;
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Invalidated {
            refetched,
            marked_stale,
        } = event
        {
            assert_eq!(refetched, 1);
            assert_eq!(marked_stale, 0);
            saw_invalidation = true;
        }
    }
    assert!(saw_invalidation);

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn out_of_order_responses_resolve_to_newest_generation() {
    let (transport, mut pending) = ManualTransport::new();
    let signals = RefetchSignals::new();
    let client = spawn_with(transport, &signals, 60_000);
    let mut events = client.events();

    let mut sub: QuerySubscription<Value> =
        client.query(Endpoint::GetPublicBooks).await.expect("query");

    // Generation 1 is parked unresolved.
    let first_fetch = timeout(Duration::from_secs(1), pending.recv())
        .await
        .expect("request")
        .expect("recv");
    assert_eq!(first_fetch.route(), "GET /books");

    // A createBook mutation invalidates Books, issuing generation 2.
    let mutating = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .create_book(BookDraft {
                    title: "New Book".to_string(),
                    author: "A. Uthor".to_string(),
                    description: "desc".to_string(),
                    price: None,
                    purchase_link: None,
                    image: None,
                })
                .await
        })
    };

    let create = timeout(Duration::from_secs(1), pending.recv())
        .await
        .expect("request")
        .expect("recv");
    assert_eq!(create.route(), "POST /books");
    create.respond_json(201, json!({ "id": "b1" }));
    mutating.await.expect("join").expect("create");

    let second_fetch = timeout(Duration::from_secs(1), pending.recv())
        .await
        .expect("request")
        .expect("recv");
    assert_eq!(second_fetch.route(), "GET /books");

    // Newer generation resolves first; the older one must be discarded.
    second_fetch.respond_json(200, json!(["with-new-book"]));
    wait_for_data(&mut sub, &json!(["with-new-book"])).await;
    first_fetch.respond_json(200, json!(["stale-listing"]));

    let dropped = timeout(Duration::from_secs(1), async {
        loop {
            match events.recv().await.expect("event") {
                ClientEvent::StaleResponseDropped { generation, .. } => return generation,
                _ => continue,
            }
        }
    })
    .await
    .expect("stale drop event");
    assert_eq!(dropped, 1);

    assert_eq!(sub.view().data, Some(json!(["with-new-book"])));

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn focus_signal_refetches_subscribed_entries() {
    let transport = ScriptedTransport::new();
    transport.enqueue("GET /books", 200, json!(["v1"]));
    transport.enqueue("GET /books", 200, json!(["v2"]));

    let signals = RefetchSignals::new();
    let client = spawn_with(transport.clone(), &signals, 60_000);

    let mut sub: QuerySubscription<Value> =
        client.query(Endpoint::GetPublicBooks).await.expect("query");
    let view = sub.resolved().await.expect("resolve");
    assert_eq!(view.data, Some(json!(["v1"])));

    signals.focus();
    wait_for_data(&mut sub, &json!(["v2"])).await;
    assert_eq!(transport.calls("GET /books"), 2);

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn reconnect_signal_refetches_subscribed_entries() {
    let transport = ScriptedTransport::new();
    transport.enqueue("GET /admin/social-media", 200, json!({ "twitter": null }));
    transport.enqueue(
        "GET /admin/social-media",
        200,
        json!({ "twitter": "https://x.com/author" }),
    );

    let signals = RefetchSignals::new();
    let client = spawn_with(transport.clone(), &signals, 60_000);

    let mut sub: QuerySubscription<Value> =
        client.query(Endpoint::GetSocialMedia).await.expect("query");
    sub.resolved().await.expect("resolve");

    signals.reconnect();
    wait_for_data(&mut sub, &json!({ "twitter": "https://x.com/author" })).await;
    assert_eq!(transport.calls("GET /admin/social-media"), 2);

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn response_after_last_unsubscribe_is_unobservable() {
    let (transport, mut pending) = ManualTransport::new();
    let signals = RefetchSignals::new();
    // Zero grace: entries collect as soon as their last subscriber goes.
    let client = spawn_with(transport, &signals, 0);
    let mut events = client.events();

    let sub: QuerySubscription<Value> =
        client.query(Endpoint::GetPublicBooks).await.expect("query");
    let parked = timeout(Duration::from_secs(1), pending.recv())
        .await
        .expect("request")
        .expect("recv");

    drop(sub);
    tokio::time::sleep(Duration::from_millis(30)).await;
    parked.respond_json(200, json!(["late"]));
    tokio::time::sleep(Duration::from_millis(30)).await;

    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, ClientEvent::FetchApplied { .. }),
            "late response must not apply: {event:?}"
        );
    }

    // A fresh subscription starts over with its own request.
    let _sub2: QuerySubscription<Value> =
        client.query(Endpoint::GetPublicBooks).await.expect("query");
    let request = timeout(Duration::from_secs(1), pending.recv())
        .await
        .expect("request")
        .expect("recv");
    assert_eq!(request.route(), "GET /books");

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn failed_mutation_surfaces_structured_error() {
    let transport = ScriptedTransport::new();
    transport.respond_always("DELETE /blogs/x", 500, json!({ "message": "boom" }));

    let signals = RefetchSignals::new();
    let client = spawn_with(transport, &signals, 60_000);
    let mut events = client.events();

    let err = client
        .delete_blog_post("x".to_string())
        .await
        .expect_err("must fail");
    match err {
        ClientError::Api(api) => {
            assert_eq!(api.status, 500);
            assert_eq!(api.human_message(), "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("event")
        .expect("recv");
    assert_eq!(
        event,
        ClientEvent::MutationFailed {
            endpoint: "deleteBlogPost",
            status: 500,
        }
    );

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn kind_misuse_is_rejected_without_network_traffic() {
    let transport = ScriptedTransport::new();
    let signals = RefetchSignals::new();
    let client = spawn_with(transport.clone(), &signals, 60_000);

    let err = client
        .query::<Value>(Endpoint::DeleteBlogPost {
            id: "x".to_string(),
        })
        .await
        .expect_err("mutation is not a query");
    assert!(matches!(err, ClientError::NotAQuery("deleteBlogPost")));

    let err = client
        .mutate(Endpoint::GetPublicBooks)
        .await
        .expect_err("query is not a mutation");
    assert!(matches!(err, ClientError::NotAMutation("getPublicBooks")));

    assert!(transport.requests().is_empty());

    client.shutdown().await.expect("shutdown");
}
