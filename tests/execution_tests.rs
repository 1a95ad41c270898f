mod common;

use common::{
    action_success_json, open_orders_json, order_accepted_json, MockRest, TEST_PRIVATE_KEY,
};
use riptide::core::errors::ClientError;
use riptide::core::types::{ModifyTicket, OrderKind, OrderStatus, OrderTicket, Side};
use riptide::exchanges::hyperliquid::{ExecutionClient, TESTNET_CHAIN_ID};
use riptide::wallet::KeyStore;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;

fn execution_client(rest: &MockRest) -> ExecutionClient<MockRest> {
    let keystore = Arc::new(KeyStore::from_private_key(TEST_PRIVATE_KEY).unwrap());
    ExecutionClient::new(rest.clone(), keystore, TESTNET_CHAIN_ID)
}

fn market_ticket(side: Side) -> OrderTicket {
    OrderTicket {
        symbol: "BTC-USD".to_string(),
        side,
        kind: OrderKind::Market,
        size: dec!(1),
        price: None,
        leverage: Some(10),
    }
}

#[tokio::test]
async fn market_buy_routes_as_aggressive_ioc_limit() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub("/exchange:order", order_accepted_json(42));

    let client = execution_client(&rest);
    let order = client.place_order(&market_ticket(Side::Long)).await.unwrap();

    assert_eq!(order.id, "42");
    assert_eq!(order.symbol, "BTC-USD");
    assert_eq!(order.side, Side::Long);
    assert_eq!(order.price, Some(dec!(52500)));
    assert_eq!(order.leverage, 10);
    assert_eq!(order.status, OrderStatus::Open);

    let submissions = rest.requests_for("/exchange:order");
    assert_eq!(submissions.len(), 1);
    let envelope = &submissions[0];
    let wire_order = &envelope["action"]["orders"][0];
    assert_eq!(wire_order["coin"], "BTC-USD");
    assert_eq!(wire_order["is_buy"], true);
    assert_eq!(wire_order["sz"], "1");
    assert_eq!(wire_order["limit_px"], "52500");
    assert_eq!(wire_order["order_type"]["limit"]["tif"], "Ioc");
    assert_eq!(wire_order["reduce_only"], false);
    assert_eq!(envelope["action"]["grouping"], "na");

    // Signed envelope shape: nonce plus r/s/v signature, null vault.
    assert!(envelope["nonce"].as_u64().unwrap() > 0);
    let signature = &envelope["signature"];
    assert!(signature["r"].as_str().unwrap().starts_with("0x"));
    assert!(signature["s"].as_str().unwrap().starts_with("0x"));
    let v = signature["v"].as_u64().unwrap();
    assert!(v == 27 || v == 28);
    assert!(envelope["vaultAddress"].is_null());
}

#[tokio::test]
async fn market_sell_discounts_the_mid() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub("/exchange:order", order_accepted_json(43));

    let client = execution_client(&rest);
    let order = client.place_order(&market_ticket(Side::Short)).await.unwrap();

    assert_eq!(order.price, Some(dec!(47500)));
    let wire_order = &rest.requests_for("/exchange:order")[0]["action"]["orders"][0];
    assert_eq!(wire_order["is_buy"], false);
    assert_eq!(wire_order["limit_px"], "47500");
}

#[tokio::test]
async fn market_order_without_mid_fails_before_submission() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({}));

    let client = execution_client(&rest);
    let result = client.place_order(&market_ticket(Side::Long)).await;

    assert!(matches!(result, Err(ClientError::NoMarketPrice(symbol)) if symbol == "BTC-USD"));
    assert!(rest.requests_for("/exchange:order").is_empty());
}

#[tokio::test]
async fn limit_orders_rest_with_gtc() {
    let rest = MockRest::new();
    rest.stub("/exchange:order", order_accepted_json(7));

    let client = execution_client(&rest);
    let ticket = OrderTicket {
        symbol: "ETH-USD".to_string(),
        side: Side::Long,
        kind: OrderKind::Limit,
        size: dec!(2),
        price: Some(dec!(3000)),
        leverage: None,
    };
    let order = client.place_order(&ticket).await.unwrap();

    assert_eq!(order.leverage, 1);
    let wire_order = &rest.requests_for("/exchange:order")[0]["action"]["orders"][0];
    assert_eq!(wire_order["limit_px"], "3000");
    assert_eq!(wire_order["order_type"]["limit"]["tif"], "Gtc");
    // No mid lookup for limit orders.
    assert!(rest.requests_for("/info:allMids").is_empty());
}

#[tokio::test]
async fn watch_only_identities_cannot_trade() {
    let rest = MockRest::new();
    let keystore = Arc::new(
        KeyStore::watch_only("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap(),
    );
    let client = ExecutionClient::new(rest.clone(), keystore, TESTNET_CHAIN_ID);

    let result = client.place_order(&market_ticket(Side::Long)).await;
    assert!(matches!(result, Err(ClientError::NotConnected)));
    assert!(matches!(
        client.cancel_order("42", "BTC-USD").await,
        Err(ClientError::NotConnected)
    ));
    // Rejected before any network call.
    assert!(rest.requests().is_empty());
}

#[tokio::test]
async fn invalid_tickets_never_reach_the_wire() {
    let rest = MockRest::new();
    let client = execution_client(&rest);

    let zero_size = OrderTicket {
        size: dec!(0),
        ..market_ticket(Side::Long)
    };
    assert!(matches!(
        client.place_order(&zero_size).await,
        Err(ClientError::InvalidParameters(_))
    ));

    let priceless_limit = OrderTicket {
        kind: OrderKind::Limit,
        ..market_ticket(Side::Long)
    };
    assert!(matches!(
        client.place_order(&priceless_limit).await,
        Err(ClientError::InvalidParameters(_))
    ));

    assert!(rest.requests().is_empty());
}

#[tokio::test]
async fn nonces_strictly_increase_across_submissions() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub("/exchange:order", order_accepted_json(1));

    let client = execution_client(&rest);
    client.place_order(&market_ticket(Side::Long)).await.unwrap();
    client.place_order(&market_ticket(Side::Long)).await.unwrap();

    let submissions = rest.requests_for("/exchange:order");
    let first = submissions[0]["nonce"].as_u64().unwrap();
    let second = submissions[1]["nonce"].as_u64().unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn exchange_rejections_carry_the_server_reason() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub(
        "/exchange:order",
        json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [{"error": "Order must have minimum value of $10"}]}}
        }),
    );

    let client = execution_client(&rest);
    let result = client.place_order(&market_ticket(Side::Long)).await;
    assert!(
        matches!(result, Err(ClientError::ExchangeRejected(reason)) if reason.contains("minimum value"))
    );
}

#[tokio::test]
async fn stale_nonce_rejections_get_their_own_error() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub(
        "/exchange:order",
        json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [{"error": "Nonce 5 is older than the last seen nonce"}]}}
        }),
    );

    let client = execution_client(&rest);
    let result = client.place_order(&market_ticket(Side::Long)).await;
    assert!(matches!(result, Err(ClientError::StaleNonce)));
}

#[tokio::test]
async fn immediate_fills_report_filled_status() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub(
        "/exchange:order",
        json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [
                {"filled": {"avgPx": "50010", "oid": 99, "totalSz": "1"}}
            ]}}
        }),
    );

    let client = execution_client(&rest);
    let order = client.place_order(&market_ticket(Side::Long)).await.unwrap();
    assert_eq!(order.id, "99");
    assert_eq!(order.status, OrderStatus::Filled);
}

#[tokio::test]
async fn missing_resting_id_falls_back_to_the_nonce() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub(
        "/exchange:order",
        json!({"status": "ok", "response": {"type": "order", "data": {"statuses": []}}}),
    );

    let client = execution_client(&rest);
    let order = client.place_order(&market_ticket(Side::Long)).await.unwrap();

    let nonce = rest.requests_for("/exchange:order")[0]["nonce"]
        .as_u64()
        .unwrap();
    assert_eq!(order.id, nonce.to_string());
}

#[tokio::test]
async fn place_then_cancel_by_returned_id_round_trips() {
    let rest = MockRest::new();
    rest.stub("/info:allMids", json!({"BTC-USD": "50000"}));
    rest.stub("/exchange:order", order_accepted_json(42));
    rest.stub("/exchange:cancel", action_success_json("cancel"));

    let client = execution_client(&rest);
    let order = client.place_order(&market_ticket(Side::Long)).await.unwrap();
    let ack = client.cancel_order(&order.id, &order.symbol).await.unwrap();

    assert_eq!(ack.reference, "42");
    let cancels = rest.requests_for("/exchange:cancel");
    assert_eq!(cancels[0]["action"]["cancels"][0]["coin"], "BTC-USD");
    assert_eq!(cancels[0]["action"]["cancels"][0]["oid"], 42);
}

#[tokio::test]
async fn failed_cancels_surface_as_cancel_failed() {
    let rest = MockRest::new();
    rest.stub(
        "/exchange:cancel",
        json!({
            "status": "ok",
            "response": {"type": "cancel", "data": {"statuses": [{"error": "Order already canceled"}]}}
        }),
    );

    let client = execution_client(&rest);
    let result = client.cancel_order("42", "BTC-USD").await;
    assert!(
        matches!(result, Err(ClientError::CancelFailed(reason)) if reason.contains("already canceled"))
    );
}

#[tokio::test]
async fn cancel_by_client_id_targets_the_cloid() {
    let rest = MockRest::new();
    rest.stub("/exchange:cancelByCloid", action_success_json("cancelByCloid"));

    let client = execution_client(&rest);
    let ack = client
        .cancel_order_by_client_id("BTC-USD", "0xclient1")
        .await
        .unwrap();

    assert_eq!(ack.reference, "0xclient1");
    let cancels = rest.requests_for("/exchange:cancelByCloid");
    assert_eq!(cancels[0]["action"]["cancels"][0]["cloid"], "0xclient1");
}

#[tokio::test]
async fn modify_recovers_the_resting_orders_side() {
    let rest = MockRest::new();
    rest.stub("/info:openOrders", open_orders_json());
    rest.stub("/exchange:modify", action_success_json("modify"));

    let client = execution_client(&rest);
    let order = client
        .modify_order(&ModifyTicket {
            order_id: "42".to_string(),
            symbol: "BTC-USD".to_string(),
            size: None,
            price: Some(dec!(48000)),
        })
        .await
        .unwrap();

    // The resting order is a sell; the replacement must keep that side.
    assert_eq!(order.side, Side::Short);
    assert_eq!(order.size, dec!(0.5));
    assert_eq!(order.price, Some(dec!(48000)));

    let modifies = rest.requests_for("/exchange:modify");
    let replacement = &modifies[0]["action"]["modifies"][0];
    assert_eq!(replacement["oid"], 42);
    assert_eq!(replacement["order"]["is_buy"], false);
    assert_eq!(replacement["order"]["sz"], "0.5");
    assert_eq!(replacement["order"]["limit_px"], "48000");
    assert_eq!(replacement["order"]["order_type"]["limit"]["tif"], "Gtc");
}

#[tokio::test]
async fn modify_of_unknown_order_is_rejected_without_submission() {
    let rest = MockRest::new();
    rest.stub("/info:openOrders", json!([]));

    let client = execution_client(&rest);
    let result = client
        .modify_order(&ModifyTicket {
            order_id: "77".to_string(),
            symbol: "BTC-USD".to_string(),
            size: Some(dec!(1)),
            price: Some(dec!(1000)),
        })
        .await;

    assert!(matches!(result, Err(ClientError::ExchangeRejected(_))));
    assert!(rest.requests_for("/exchange:modify").is_empty());
}
