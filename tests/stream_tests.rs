use futures_util::{SinkExt, StreamExt};
use riptide::core::types::Channel;
use riptide::exchanges::hydromancer::{
    EventKind, StreamClient, StreamConfig, StreamEvent, StreamStatus,
};
use secrecy::Secret;
use serde_json::Value;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

type ServerWs = WebSocketStream<TcpStream>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// Accept one connection and walk it through a successful authentication.
async fn accept_and_auth(listener: &TcpListener, expected_key: &str) -> ServerWs {
    let (socket, _) = timeout(RECV_TIMEOUT, listener.accept()).await.unwrap().unwrap();
    let mut ws = accept_async(socket).await.unwrap();

    let frame = timeout(RECV_TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
    let value: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(value["type"], "auth");
    assert_eq!(value["apiKey"], expected_key);

    ws.send(Message::Text(
        r#"{"type":"auth","success":true}"#.to_string(),
    ))
    .await
    .unwrap();
    ws
}

async fn next_json(ws: &mut ServerWs) -> Value {
    let frame = timeout(RECV_TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
    serde_json::from_str(frame.to_text().unwrap()).unwrap()
}

#[tokio::test]
async fn authenticates_replays_subscriptions_and_dispatches_ticks() {
    let (listener, url) = start_server().await;
    let stream = StreamClient::new(url, Secret::new("test-key".to_string()));

    // Staged while disconnected; must hit the wire only after auth.
    stream
        .subscribe(Channel::Ticker, Some("BTC-USD"))
        .await
        .unwrap();
    let (_id, mut ticks) = stream.listen(EventKind::Ticker);

    stream.connect().await.unwrap();
    let mut server = accept_and_auth(&listener, "test-key").await;

    let replayed = next_json(&mut server).await;
    assert_eq!(replayed["type"], "subscribe");
    assert_eq!(replayed["channel"], "ticker");
    assert_eq!(replayed["symbol"], "BTC-USD");

    server
        .send(Message::Text(
            r#"{"type":"ticker","symbol":"BTC-USD","price":50000}"#.to_string(),
        ))
        .await
        .unwrap();

    let event = timeout(RECV_TIMEOUT, ticks.recv()).await.unwrap().unwrap();
    match event {
        StreamEvent::Ticker(update) => {
            assert_eq!(update.symbol, "BTC-USD");
            assert_eq!(update.price.to_string(), "50000");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(stream.is_live());

    stream.disconnect().await;
    assert_eq!(stream.status(), StreamStatus::Disconnected);
}

#[tokio::test]
async fn duplicate_subscriptions_produce_no_extra_wire_traffic() {
    let (listener, url) = start_server().await;
    let stream = StreamClient::new(url, Secret::new("k".to_string()));

    stream.connect().await.unwrap();
    let mut server = accept_and_auth(&listener, "k").await;

    stream
        .subscribe(Channel::OrderBook, Some("ETH-USD"))
        .await
        .unwrap();
    let first = next_json(&mut server).await;
    assert_eq!(first["type"], "subscribe");

    // Second subscribe for the same pair: the ack sequences the worker, so if
    // a frame had been written it would precede this point. Expect silence.
    stream
        .subscribe(Channel::OrderBook, Some("ETH-USD"))
        .await
        .unwrap();
    assert!(timeout(Duration::from_millis(300), server.next())
        .await
        .is_err());

    stream
        .unsubscribe(Channel::OrderBook, Some("ETH-USD"))
        .await
        .unwrap();
    let second = next_json(&mut server).await;
    assert_eq!(second["type"], "unsubscribe");
    assert_eq!(second["symbol"], "ETH-USD");

    // Unsubscribing an absent member is a no-op on the wire.
    stream
        .unsubscribe(Channel::OrderBook, Some("ETH-USD"))
        .await
        .unwrap();
    assert!(timeout(Duration::from_millis(300), server.next())
        .await
        .is_err());

    stream.disconnect().await;
}

#[tokio::test]
async fn unexpected_close_reconnects_and_replays_the_set() {
    let (listener, url) = start_server().await;
    let stream = StreamClient::new(url, Secret::new("k".to_string()));
    let (_id, mut lifecycle) = stream.listen(EventKind::Lifecycle);

    stream
        .subscribe(Channel::Trades, Some("BTC-USD"))
        .await
        .unwrap();
    stream.connect().await.unwrap();

    let mut server = accept_and_auth(&listener, "k").await;
    let replayed = next_json(&mut server).await;
    assert_eq!(replayed["type"], "subscribe");

    // Kill the connection from the server side.
    drop(server);

    // The client schedules a backoff and dials again; the set is replayed on
    // the fresh connection without any caller involvement.
    let mut server = accept_and_auth(&listener, "k").await;
    let replayed = next_json(&mut server).await;
    assert_eq!(replayed["type"], "subscribe");
    assert_eq!(replayed["channel"], "trades");
    assert_eq!(replayed["symbol"], "BTC-USD");

    let mut saw_lost = false;
    let mut live_again = false;
    while let Ok(Some(event)) = timeout(Duration::from_secs(1), lifecycle.recv()).await {
        match event {
            StreamEvent::ConnectionLost => saw_lost = true,
            StreamEvent::Live if saw_lost => {
                live_again = true;
                break;
            }
            _ => {}
        }
    }
    assert!(saw_lost);
    assert!(live_again);

    stream.disconnect().await;
}

#[tokio::test]
async fn disconnect_cancels_a_pending_reconnect() {
    let (listener, url) = start_server().await;
    let stream = StreamClient::new(url, Secret::new("k".to_string()));

    stream.connect().await.unwrap();
    let server = accept_and_auth(&listener, "k").await;
    drop(server);

    // Give the worker a moment to notice the close and enter backoff.
    tokio::time::sleep(Duration::from_millis(200)).await;
    stream.disconnect().await;
    assert_eq!(stream.status(), StreamStatus::Disconnected);

    // No further dial: the reconnect timer was cancelled.
    assert!(timeout(Duration::from_millis(2_500), listener.accept())
        .await
        .is_err());
}

#[tokio::test]
async fn exhausted_reconnect_budget_parks_the_client() {
    let (listener, url) = start_server().await;
    let stream = StreamClient::with_config(
        url,
        Secret::new("k".to_string()),
        StreamConfig {
            max_reconnect_attempts: 0,
            ..StreamConfig::default()
        },
    );
    let (_id, mut lifecycle) = stream.listen(EventKind::Lifecycle);

    stream.connect().await.unwrap();
    let server = accept_and_auth(&listener, "k").await;
    drop(server);

    // The budget is spent on the first loss: a terminal event, no redial.
    let mut saw_exhausted = false;
    while let Ok(Some(event)) = timeout(Duration::from_secs(2), lifecycle.recv()).await {
        if matches!(event, StreamEvent::ReconnectExhausted) {
            saw_exhausted = true;
            break;
        }
    }
    assert!(saw_exhausted);
    assert_eq!(stream.status(), StreamStatus::Disconnected);
    assert!(timeout(Duration::from_millis(500), listener.accept())
        .await
        .is_err());
}

#[tokio::test]
async fn mutations_while_disconnected_are_staged_not_sent() {
    let stream = StreamClient::new(
        "ws://127.0.0.1:1".to_string(),
        Secret::new("k".to_string()),
    );
    assert_eq!(stream.status(), StreamStatus::Disconnected);

    stream
        .subscribe(Channel::Ticker, Some("BTC-USD"))
        .await
        .unwrap();
    stream
        .unsubscribe(Channel::Ticker, Some("BTC-USD"))
        .await
        .unwrap();
    stream.subscribe(Channel::Markets, None).await.unwrap();

    // Disconnect while already parked is a no-op.
    stream.disconnect().await;
    assert_eq!(stream.status(), StreamStatus::Disconnected);
}
