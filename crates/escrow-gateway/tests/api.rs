//! End-to-end tests driving the gateway router against an in-process
//! ledger, client, and relayer.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use escrow_client::{InProcessConnection, LedgerClient, Signer};
use escrow_gateway::{router, AppState, GatewayConfig, InMemoryMetadataStore, RateLimitConfig};
use escrow_ledger::{
    one_unit, Address, ConditionId, EscrowCall, GenesisAccount, GenesisConfig, Ledger,
    Transaction, U256,
};
use escrow_relayer::RelayerService;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const DAY: u64 = 86_400;
const API_KEY: &str = "test_api_key_12345";

fn payer() -> Address {
    Address::new([0x0c; 20])
}

fn payee() -> Address {
    Address::new([0x0d; 20])
}

fn signer() -> Signer {
    Signer::from_secret([0x07; 32])
}

struct TestApp {
    app: Router,
    ledger: Arc<Ledger>,
}

async fn spawn_app(rate_limit: RateLimitConfig) -> TestApp {
    let ledger = Arc::new(
        Ledger::new(&GenesisConfig {
            admin: Address::new([0x0a; 20]),
            relayer: signer().address(),
            accounts: vec![
                GenesisAccount {
                    address: payer(),
                    balance: "100.0".into(),
                },
                GenesisAccount {
                    address: signer().address(),
                    balance: "10.0".into(),
                },
            ],
            gas_price: 1_000_000_000,
        })
        .unwrap(),
    );

    let connection = Arc::new(InProcessConnection::new(Arc::clone(&ledger)));
    let client = LedgerClient::connect(connection, signer()).await.unwrap();
    let state = AppState {
        relayer: Arc::new(RelayerService::new(Arc::new(client))),
        metadata: Arc::new(InMemoryMetadataStore::new()),
        config: Arc::new(GatewayConfig {
            network: "localhost".into(),
            api_key: API_KEY.into(),
            rate_limit,
        }),
    };
    let (app, _) = router(state);
    TestApp { app, ledger }
}

async fn default_app() -> TestApp {
    spawn_app(RateLimitConfig {
        window: Duration::from_secs(60),
        max_requests: 1_000,
    })
    .await
}

impl TestApp {
    fn seed_condition(&self) -> ConditionId {
        let call = EscrowCall::CreateCondition {
            payee: payee(),
            deadline: self.ledger.now() + DAY,
            metadata_uri: "ipfs://QmTest123".into(),
        };
        let receipt = self
            .ledger
            .submit(Transaction {
                from: payer(),
                nonce: self.ledger.pending_nonce(payer()),
                gas_limit: call.required_gas(),
                value: one_unit(),
                call,
            })
            .unwrap();
        assert!(receipt.outcome.is_success());
        self.ledger.condition_count() - 1
    }

    fn refund_condition(&self, id: ConditionId) {
        self.ledger.advance_time(DAY + 1);
        let call = EscrowCall::RefundCondition { id };
        let receipt = self
            .ledger
            .submit(Transaction {
                from: payer(),
                nonce: self.ledger.pending_nonce(payer()),
                gas_limit: call.required_gas(),
                value: U256::zero(),
                call,
            })
            .unwrap();
        assert!(receipt.outcome.is_success());
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        into_json(response).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        into_json(response).await
    }
}

async fn into_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn trigger_body(proof: &str, api_key: &str) -> Value {
    json!({ "proof": proof, "apiKey": api_key })
}

// =============================================================================
// HEALTH
// =============================================================================

#[tokio::test]
async fn health_reports_relayer_status() {
    let app = default_app().await;
    app.seed_condition();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["network"], "localhost");
    assert_eq!(body["totalConditions"], 1);
    assert!(body["relayerBalance"].as_str().unwrap().starts_with("10."));
    assert!(body["timestamp"].is_string());
}

// =============================================================================
// METADATA
// =============================================================================

#[tokio::test]
async fn store_metadata_requires_condition_id() {
    let app = default_app().await;
    let (status, body) = app
        .post("/api/conditions", json!({ "metadata": { "k": "v" } }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conditionId is required");
}

#[tokio::test]
async fn store_metadata_succeeds_without_touching_ledger() {
    let app = default_app().await;
    let (status, body) = app
        .post(
            "/api/conditions",
            json!({ "conditionId": 42, "metadata": { "invoice": "INV-7" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["conditionId"], 42);
    assert_eq!(body["message"], "Condition metadata stored");
    // No ledger interaction: still zero blocks
    assert_eq!(app.ledger.block_number(), 0);
}

// =============================================================================
// STATUS
// =============================================================================

#[tokio::test]
async fn condition_status_merges_ledger_and_metadata() {
    let app = default_app().await;
    let id = app.seed_condition();
    app.post(
        "/api/conditions",
        json!({ "conditionId": id, "metadata": { "invoice": "INV-7" } }),
    )
    .await;

    let (status, body) = app.get(&format!("/api/conditions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["amount"], "1.0");
    assert_eq!(body["metadataURI"], "ipfs://QmTest123");
    assert_eq!(body["executed"], false);
    assert_eq!(body["refunded"], false);
    assert_eq!(body["canTrigger"], true);
    assert_eq!(body["canRefund"], false);
    assert_eq!(body["status"], "active");
    assert_eq!(body["metadata"]["invoice"], "INV-7");
}

#[tokio::test]
async fn condition_status_unknown_id_is_404() {
    let app = default_app().await;
    let (status, body) = app.get("/api/conditions/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Condition not found");
}

// =============================================================================
// TRIGGER
// =============================================================================

#[tokio::test]
async fn trigger_rejects_invalid_api_key_before_anything_else() {
    let app = default_app().await;
    let id = app.seed_condition();

    // Proof is also missing here; the key check must win
    let (status, body) = app
        .post(
            &format!("/api/conditions/{id}/trigger"),
            json!({ "apiKey": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid API key");
    // Nothing was submitted
    assert_eq!(app.ledger.block_number(), 1);
}

#[tokio::test]
async fn trigger_requires_proof() {
    let app = default_app().await;
    let id = app.seed_condition();

    let (status, body) = app
        .post(
            &format!("/api/conditions/{id}/trigger"),
            json!({ "apiKey": API_KEY }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Proof is required");

    let (status, _) = app
        .post(
            &format!("/api/conditions/{id}/trigger"),
            trigger_body("", API_KEY),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trigger_unknown_condition_is_404() {
    let app = default_app().await;
    let (status, body) = app
        .post("/api/conditions/999/trigger", trigger_body("p", API_KEY))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Condition not found");
}

#[tokio::test]
async fn trigger_releases_funds_and_reports_inclusion() {
    let app = default_app().await;
    let id = app.seed_condition();

    let (status, body) = app
        .post(
            &format!("/api/conditions/{id}/trigger"),
            trigger_body("proof123", API_KEY),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["conditionId"], id);
    assert!(body["txHash"].as_str().unwrap().starts_with("0x"));
    assert!(body["blockNumber"].as_u64().unwrap() > 0);
    assert!(body["gasUsed"].as_str().unwrap().parse::<u64>().unwrap() > 0);
    assert_eq!(body["message"], "Condition triggered successfully");

    // Payee received exactly one amount
    assert_eq!(app.ledger.balance_of(payee()), one_unit());

    let (_, view) = app.get(&format!("/api/conditions/{id}")).await;
    assert_eq!(view["status"], "executed");
    assert_eq!(view["canTrigger"], false);
    assert_eq!(view["canRefund"], false);
}

#[tokio::test]
async fn trigger_terminal_states_get_specific_400() {
    let app = default_app().await;
    let executed = app.seed_condition();
    app.post(
        &format!("/api/conditions/{executed}/trigger"),
        trigger_body("proof", API_KEY),
    )
    .await;

    let (status, body) = app
        .post(
            &format!("/api/conditions/{executed}/trigger"),
            trigger_body("proof", API_KEY),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Condition already executed");
    // Payee still credited exactly once
    assert_eq!(app.ledger.balance_of(payee()), one_unit());

    let refunded = app.seed_condition();
    app.refund_condition(refunded);
    let (status, body) = app
        .post(
            &format!("/api/conditions/{refunded}/trigger"),
            trigger_body("proof", API_KEY),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Condition already refunded");
}

// =============================================================================
// LISTING
// =============================================================================

#[tokio::test]
async fn listing_enumerates_all_conditions() {
    let app = default_app().await;
    app.seed_condition();
    app.seed_condition();
    app.seed_condition();

    let (status, body) = app.get("/api/conditions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["conditions"].as_array().unwrap().len(), 3);
    assert_eq!(body["conditions"][2]["id"], 2);
}

#[tokio::test]
async fn listing_is_empty_before_any_creation() {
    let app = default_app().await;
    let (status, body) = app.get("/api/conditions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["conditions"].as_array().unwrap().len(), 0);
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn api_routes_are_rate_limited_per_client() {
    let app = spawn_app(RateLimitConfig {
        window: Duration::from_secs(60),
        max_requests: 3,
    })
    .await;

    let request = |ip: &'static str| {
        let app = app.app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .uri("/api/conditions")
                    .header("x-forwarded-for", ip)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    for _ in 0..3 {
        assert_eq!(request("10.1.1.1").await.status(), StatusCode::OK);
    }
    let limited = request("10.1.1.1").await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));

    // Another client still has budget
    assert_eq!(request("10.2.2.2").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_is_not_rate_limited() {
    let app = spawn_app(RateLimitConfig {
        window: Duration::from_secs(60),
        max_requests: 1,
    })
    .await;

    for _ in 0..5 {
        let (status, _) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
    }
}
