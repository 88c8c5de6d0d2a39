use crate::errors::ClientError;
use crate::models::{
    AuthCheck, CampaignOutcome, CampaignPayload, Client, ClientDraft, ClientId, Credentials,
    LoginResponse, Registration, Statistics, UserInfo, WhatsAppMessage,
};
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

/// Every backend operation the console performs.
#[async_trait]
pub trait CrmBackend: Send + Sync {
    /// Persists the returned token as the active session on success.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError>;
    async fn register(&self, registration: &Registration) -> Result<Value, ClientError>;
    async fn logout(&self) -> Result<(), ClientError>;
    async fn list_clients(&self) -> Result<Vec<Client>, ClientError>;
    async fn fetch_client(&self, id: ClientId) -> Result<Client, ClientError>;
    async fn add_client(&self, draft: &ClientDraft) -> Result<Client, ClientError>;
    async fn update_client(&self, id: ClientId, client: &Client) -> Result<Client, ClientError>;
    async fn delete_client(&self, id: ClientId) -> Result<(), ClientError>;
    async fn send_campaign(&self, payload: &CampaignPayload) -> Result<CampaignOutcome, ClientError>;
    async fn fetch_statistics(&self) -> Result<Statistics, ClientError>;
    async fn fetch_user_info(&self) -> Result<UserInfo, ClientError>;
    async fn check_auth(&self) -> Result<AuthCheck, ClientError>;
    /// Single-recipient send through the WhatsApp relay; returns the gateway's raw reply.
    async fn send_whatsapp(&self, to: &str, message: &str) -> Result<Value, ClientError>;
}

/// HTTP client for the CRM backend and the WhatsApp relay.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    relay_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        relay_url: &str,
        session: Session,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            relay_url: relay_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let request = self.authorized(builder).await.build()?;
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let err = error_from_response(status, response).await;
        error!(status = status.as_u16(), "request failed: {err}");
        Err(err)
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.execute(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[async_trait]
impl CrmBackend for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        let response: LoginResponse = self
            .json(self.http.post(self.url("/login")).json(credentials))
            .await?;
        self.session
            .activate(response.access_token.clone())
            .await
            .map_err(|err| ClientError::Storage(err.to_string()))?;
        info!(username = %credentials.username, "logged in");
        Ok(response)
    }

    async fn register(&self, registration: &Registration) -> Result<Value, ClientError> {
        self.json(self.http.post(self.url("/register")).json(registration))
            .await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.execute(self.http.post(self.url("/logout"))).await?;
        Ok(())
    }

    async fn list_clients(&self) -> Result<Vec<Client>, ClientError> {
        self.json(self.http.get(self.url("/clients"))).await
    }

    async fn fetch_client(&self, id: ClientId) -> Result<Client, ClientError> {
        self.json(self.http.get(self.url(&format!("/clients/{id}"))))
            .await
    }

    async fn add_client(&self, draft: &ClientDraft) -> Result<Client, ClientError> {
        self.json(self.http.post(self.url("/clients")).json(draft))
            .await
    }

    async fn update_client(&self, id: ClientId, client: &Client) -> Result<Client, ClientError> {
        self.json(self.http.put(self.url(&format!("/clients/{id}"))).json(client))
            .await
    }

    async fn delete_client(&self, id: ClientId) -> Result<(), ClientError> {
        self.execute(self.http.delete(self.url(&format!("/clients/{id}"))))
            .await?;
        Ok(())
    }

    async fn send_campaign(&self, payload: &CampaignPayload) -> Result<CampaignOutcome, ClientError> {
        self.json(self.http.post(self.url("/campaigns")).json(payload))
            .await
    }

    async fn fetch_statistics(&self) -> Result<Statistics, ClientError> {
        self.json(self.http.get(self.url("/statistics"))).await
    }

    async fn fetch_user_info(&self) -> Result<UserInfo, ClientError> {
        self.json(self.http.get(self.url("/protected"))).await
    }

    async fn check_auth(&self) -> Result<AuthCheck, ClientError> {
        self.json(self.http.get(self.url("/check_auth"))).await
    }

    async fn send_whatsapp(&self, to: &str, message: &str) -> Result<Value, ClientError> {
        let body = WhatsAppMessage {
            to: to.to_string(),
            message: message.to_string(),
        };
        let url = format!("{}/send-whatsapp", self.relay_url);
        self.json(self.http.post(url).json(&body)).await
    }
}

async fn error_from_response(status: StatusCode, response: Response) -> ClientError {
    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body)
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED {
        ClientError::Auth(message)
    } else {
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// First human-readable message in an error body: `message`, then `error`, then `msg`.
pub fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "msg"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}
