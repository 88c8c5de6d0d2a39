//! In-memory backend for unit tests.

use crate::api::CrmBackend;
use crate::errors::ClientError;
use crate::models::{
    AuthCheck, CampaignOutcome, CampaignPayload, Category, Client, ClientDraft, ClientId,
    Credentials, Gender, LoginResponse, MailingPreference, Operator, Registration, Statistics,
    UserInfo,
};
use crate::session::Session;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn temp_session_path(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "crm_desk_{tag}_{}_{nanos}/session.json",
        std::process::id()
    ))
}

pub fn client(id: ClientId, name: &str, email: &str, phone: &str, category: Category) -> Client {
    Client {
        id,
        name: name.to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 5, 15).unwrap(),
        gender: Gender::Male,
        category,
        last_campaign: None,
        mailing_preference: MailingPreference::Email,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unauthorized,
    Server,
    Network,
}

impl Failure {
    fn to_error(self) -> ClientError {
        match self {
            Failure::Unauthorized => ClientError::Auth("Token has expired".into()),
            Failure::Server => ClientError::Api {
                status: 500,
                message: "Internal server error".into(),
            },
            Failure::Network => ClientError::Network("connection refused".into()),
        }
    }
}

#[derive(Default)]
struct FakeState {
    clients: Vec<Client>,
    next_id: ClientId,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, Failure>,
    campaigns: Vec<CampaignPayload>,
    whatsapp: Vec<(String, String)>,
    statistics: Statistics,
    reassign_update_id: bool,
    hold_mutations: bool,
}

/// Shared-state fake: clones observe the same calls and records.
#[derive(Clone)]
pub struct FakeBackend {
    session: Session,
    state: Arc<Mutex<FakeState>>,
    release: Arc<Notify>,
}

impl FakeBackend {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: Arc::new(Mutex::new(FakeState {
                next_id: 100,
                ..FakeState::default()
            })),
            release: Arc::new(Notify::new()),
        }
    }

    pub fn with_clients(self, clients: Vec<Client>) -> Self {
        self.state.lock().unwrap().clients = clients;
        self
    }

    pub fn with_statistics(self, statistics: Statistics) -> Self {
        self.state.lock().unwrap().statistics = statistics;
        self
    }

    pub fn fail(&self, operation: &'static str, failure: Failure) {
        self.state.lock().unwrap().failures.insert(operation, failure);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state.lock().unwrap().failures.remove(operation);
    }

    pub fn fail_user_info(&self) {
        self.fail("fetch_user_info", Failure::Unauthorized);
    }

    pub fn reassign_update_ids(&self) {
        self.state.lock().unwrap().reassign_update_id = true;
    }

    /// Makes add/update/delete wait until [`FakeBackend::release`] is called.
    pub fn hold_mutations(&self) {
        self.state.lock().unwrap().hold_mutations = true;
    }

    pub fn release(&self) {
        self.state.lock().unwrap().hold_mutations = false;
        self.release.notify_waiters();
        self.release.notify_one();
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub fn campaigns(&self) -> Vec<CampaignPayload> {
        self.state.lock().unwrap().campaigns.clone()
    }

    pub fn whatsapp_sends(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().whatsapp.clone()
    }

    pub fn server_clients(&self) -> Vec<Client> {
        self.state.lock().unwrap().clients.clone()
    }

    fn enter(&self, operation: &'static str) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_default() += 1;
        match state.failures.get(operation) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    async fn wait_if_held(&self) {
        loop {
            let notified = self.release.notified();
            if !self.state.lock().unwrap().hold_mutations {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl CrmBackend for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        self.enter("login")?;
        if credentials.password != "12345" {
            return Err(ClientError::Auth("Invalid username or password".into()));
        }
        let token = format!("token-{}", credentials.username);
        self.session
            .activate(token.clone())
            .await
            .map_err(|err| ClientError::Storage(err.to_string()))?;
        Ok(LoginResponse {
            access_token: token,
            username: Some(credentials.username.clone()),
            role: Some("manager".into()),
        })
    }

    async fn register(&self, _registration: &Registration) -> Result<Value, ClientError> {
        self.enter("register")?;
        Ok(json!({ "message": "User created successfully" }))
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.enter("logout")
    }

    async fn list_clients(&self) -> Result<Vec<Client>, ClientError> {
        self.enter("list_clients")?;
        Ok(self.server_clients())
    }

    async fn fetch_client(&self, id: ClientId) -> Result<Client, ClientError> {
        self.enter("fetch_client")?;
        self.server_clients()
            .into_iter()
            .find(|client| client.id == id)
            .ok_or(ClientError::Api {
                status: 404,
                message: "Requested resource not found".into(),
            })
    }

    async fn add_client(&self, draft: &ClientDraft) -> Result<Client, ClientError> {
        self.enter("add_client")?;
        self.wait_if_held().await;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = Client {
            id: state.next_id,
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            birth_date: draft.birth_date,
            gender: draft.gender,
            category: draft.category,
            last_campaign: None,
            mailing_preference: draft.mailing_preference,
        };
        state.clients.push(created.clone());
        Ok(created)
    }

    async fn update_client(&self, id: ClientId, client: &Client) -> Result<Client, ClientError> {
        self.enter("update_client")?;
        self.wait_if_held().await;
        let mut state = self.state.lock().unwrap();
        let mut updated = client.clone();
        if state.reassign_update_id {
            updated.id = id + 1000;
        }
        if let Some(slot) = state.clients.iter_mut().find(|existing| existing.id == id) {
            *slot = client.clone();
        }
        Ok(updated)
    }

    async fn delete_client(&self, id: ClientId) -> Result<(), ClientError> {
        self.enter("delete_client")?;
        self.wait_if_held().await;
        self.state.lock().unwrap().clients.retain(|client| client.id != id);
        Ok(())
    }

    async fn send_campaign(&self, payload: &CampaignPayload) -> Result<CampaignOutcome, ClientError> {
        self.enter("send_campaign")?;
        self.state.lock().unwrap().campaigns.push(payload.clone());
        Ok(CampaignOutcome {
            success_count: payload.clients.len() as u64,
            fail_count: 0,
        })
    }

    async fn fetch_statistics(&self) -> Result<Statistics, ClientError> {
        self.enter("fetch_statistics")?;
        Ok(self.state.lock().unwrap().statistics.clone())
    }

    async fn fetch_user_info(&self) -> Result<UserInfo, ClientError> {
        self.enter("fetch_user_info")?;
        Ok(UserInfo {
            logged_in_as: Operator {
                username: "marina".into(),
                role: "manager".into(),
                name: "Marina".into(),
            },
        })
    }

    async fn check_auth(&self) -> Result<AuthCheck, ClientError> {
        self.enter("check_auth")?;
        Ok(AuthCheck {
            authenticated: true,
            username: "marina".into(),
            role: "manager".into(),
        })
    }

    async fn send_whatsapp(&self, to: &str, message: &str) -> Result<Value, ClientError> {
        self.enter("send_whatsapp")?;
        self.state
            .lock()
            .unwrap()
            .whatsapp
            .push((to.to_string(), message.to_string()));
        Ok(json!({ "sent": true }))
    }
}
