use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use crm_desk::models::{CampaignPayload, Channel, Credentials};
use crm_desk::{ApiClient, ClientError, CrmBackend, Session};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "tok-1";

#[derive(Clone, Default)]
struct Backend {
    seen_auth: Arc<Mutex<Vec<Option<String>>>>,
    campaigns: Arc<Mutex<Vec<Value>>>,
}

impl Backend {
    fn record(&self, headers: &HeaderMap) -> bool {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let valid = auth.as_deref() == Some(&format!("Bearer {TOKEN}"));
        self.seen_auth.lock().unwrap().push(auth);
        valid
    }
}

fn expired() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Token has expired" }))).into_response()
}

async fn login(Json(body): Json<Value>) -> axum::response::Response {
    if body["password"] == "12345" {
        Json(json!({ "access_token": TOKEN, "username": body["username"], "role": "manager" }))
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid username or password" })),
        )
            .into_response()
    }
}

async fn list_clients(State(backend): State<Backend>, headers: HeaderMap) -> axum::response::Response {
    if !backend.record(&headers) {
        return expired();
    }
    Json(json!([{
        "id": 1,
        "name": "Ivan Petrov",
        "phone": "79991234567",
        "email": "ip@x.com",
        "birthDate": "1990-05-15",
        "gender": "male",
        "type": "customer",
        "lastCampaign": null
    }]))
    .into_response()
}

async fn delete_client(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> axum::response::Response {
    if !backend.record(&headers) {
        return expired();
    }
    if id == 1 {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Not found", "message": "Requested resource not found" })),
        )
            .into_response()
    }
}

async fn campaigns(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !backend.record(&headers) {
        return expired();
    }
    let sent = body["clients"].as_array().map(Vec::len).unwrap_or(0);
    backend.campaigns.lock().unwrap().push(body);
    Json(json!({ "id": 9, "message": "Campaign sent", "success_count": sent, "fail_count": 0 }))
        .into_response()
}

async fn check_auth(State(backend): State<Backend>, headers: HeaderMap) -> axum::response::Response {
    if !backend.record(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false, "message": "Token is invalid" })),
        )
            .into_response();
    }
    Json(json!({ "authenticated": true, "username": "marina", "role": "manager" })).into_response()
}

async fn statistics() -> &'static str {
    "<html>gateway timeout</html>"
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/login", post(login))
        .route("/clients", get(list_clients))
        .route("/clients/:id", delete(delete_client))
        .route("/campaigns", post(campaigns))
        .route("/statistics", get(statistics))
        .route("/check_auth", get(check_auth))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), backend)
}

fn unique_session_path() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("crm_desk_api_{}_{nanos}/session.json", std::process::id()))
}

async fn client_for(base_url: &str) -> (ApiClient, Session) {
    let session = Session::init(unique_session_path()).await;
    let api = ApiClient::new(base_url, "http://127.0.0.1:9", session.clone(), Duration::from_secs(3)).unwrap();
    (api, session)
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        username: "marina".into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn login_persists_token_and_later_calls_carry_it() {
    let (base_url, backend) = spawn_backend().await;
    let (api, session) = client_for(&base_url).await;

    let response = api.login(&credentials("12345")).await.unwrap();
    assert_eq!(response.access_token, TOKEN);
    assert_eq!(session.token().await.as_deref(), Some(TOKEN));

    let clients = api.list_clients().await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "Ivan Petrov");
    assert_eq!(
        backend.seen_auth.lock().unwrap().as_slice(),
        &[Some(format!("Bearer {TOKEN}"))]
    );
}

#[tokio::test]
async fn rejected_login_reports_server_message_and_stores_nothing() {
    let (base_url, _backend) = spawn_backend().await;
    let (api, session) = client_for(&base_url).await;

    let err = api.login(&credentials("wrong")).await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(err.to_string(), "Invalid username or password");
    assert!(!session.is_active().await);
}

#[tokio::test]
async fn expired_token_is_an_auth_error() {
    let (base_url, _backend) = spawn_backend().await;
    let (api, session) = client_for(&base_url).await;
    session.activate("stale".into()).await.unwrap();

    let err = api.list_clients().await.unwrap_err();
    assert!(matches!(&err, ClientError::Auth(message) if message == "Token has expired"));
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn delete_needs_no_body_and_maps_not_found() {
    let (base_url, _backend) = spawn_backend().await;
    let (api, _session) = client_for(&base_url).await;
    api.login(&credentials("12345")).await.unwrap();

    api.delete_client(1).await.unwrap();
    let err = api.delete_client(2).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api { status: 404, ref message } if message == "Requested resource not found"
    ));
}

#[tokio::test]
async fn campaign_payload_uses_backend_field_names() {
    let (base_url, backend) = spawn_backend().await;
    let (api, _session) = client_for(&base_url).await;
    api.login(&credentials("12345")).await.unwrap();

    let outcome = api
        .send_campaign(&CampaignPayload {
            channel: Channel::Email,
            message: "Hello".into(),
            clients: vec![1, 2],
        })
        .await
        .unwrap();

    assert_eq!(outcome.success_count, 2);
    assert_eq!(
        backend.campaigns.lock().unwrap()[0],
        json!({ "type": "email", "message": "Hello", "clients": [1, 2] })
    );
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let (base_url, _backend) = spawn_backend().await;
    let (api, _session) = client_for(&base_url).await;

    let err = api.fetch_statistics().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let (api, _session) = client_for(&format!("http://127.0.0.1:{port}")).await;

    let err = api.list_clients().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}

#[tokio::test]
async fn check_auth_reports_the_signed_in_operator() {
    let (base_url, _backend) = spawn_backend().await;
    let (api, session) = client_for(&base_url).await;
    api.login(&credentials("12345")).await.unwrap();

    let check = api.check_auth().await.unwrap();
    assert!(check.authenticated);
    assert_eq!(check.username, "marina");
    assert_eq!(check.role, "manager");

    session.activate("stale".into()).await.unwrap();
    let err = api.check_auth().await.unwrap_err();
    assert!(matches!(&err, ClientError::Auth(message) if message == "Token is invalid"));
}
