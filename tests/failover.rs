//! Endpoint failover tests against a stub JSON-RPC backend.

use alloy::primitives::U256;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use payout_engine::chain::wallet::OperatorWallet;
use payout_engine::chain::{ChainConnector, ChainError, RpcConnector};
use payout_engine::config::schema::ChainConfig;

const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Minimal JSON-RPC stub: answers every method with 0x10.
async fn start_stub_rpc() -> String {
    async fn handler(Json(req): Json<Value>) -> Json<Value> {
        let id = req.get("id").cloned().unwrap_or(json!(1));
        Json(json!({ "jsonrpc": "2.0", "id": id, "result": "0x10" }))
    }

    let app = Router::new().route("/", post(handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn connector(endpoints: Vec<String>) -> RpcConnector {
    let config = ChainConfig {
        endpoints,
        rpc_timeout_secs: 2,
        ..ChainConfig::default()
    };
    let wallet = OperatorWallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
    RpcConnector::new(config, wallet).unwrap()
}

#[tokio::test]
async fn test_connect_falls_through_to_last_live_endpoint() {
    let live = start_stub_rpc().await;
    let connector = connector(vec![
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:2".to_string(),
        live,
    ]);

    let session = connector.connect().await.unwrap();
    assert_eq!(session.current_height().await.unwrap(), 0x10);

    let wallet = OperatorWallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
    assert_eq!(session.operator_address(), wallet.address());
    assert_eq!(
        session
            .account_balance(session.operator_address())
            .await
            .unwrap(),
        U256::from(0x10)
    );
}

#[tokio::test]
async fn test_connect_fails_when_every_endpoint_is_dead() {
    let connector = connector(vec![
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:2".to_string(),
        "http://127.0.0.1:3".to_string(),
    ]);

    match connector.connect().await.unwrap_err() {
        ChainError::NoReachableEndpoint { attempted } => assert_eq!(attempted, 3),
        other => panic!("expected NoReachableEndpoint, got {other}"),
    }
}
