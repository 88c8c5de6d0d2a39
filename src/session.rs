use crate::api::CrmBackend;
use crate::errors::ClientError;
use crate::models::Operator;
use crate::storage::{load_values, persist_values, TOKEN_KEY};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The operator's bearer token, persisted across restarts.
///
/// Cloning shares the same underlying session. Lifecycle is
/// `init` (load persisted) → `activate` → `clear`.
#[derive(Clone, Debug)]
pub struct Session {
    path: PathBuf,
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub async fn init(path: PathBuf) -> Self {
        let token = load_values(&path)
            .await
            .remove(TOKEN_KEY)
            .filter(|token| !token.is_empty());
        if token.is_some() {
            info!("restored persisted session");
        }
        Self {
            path,
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_active(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Replaces any previous token and persists the new one.
    pub async fn activate(&self, token: String) -> std::io::Result<()> {
        let mut current = self.token.write().await;
        let mut values = load_values(&self.path).await;
        values.insert(TOKEN_KEY.to_string(), token.clone());
        persist_values(&self.path, &values).await?;
        *current = Some(token);
        Ok(())
    }

    pub async fn clear(&self) {
        let mut current = self.token.write().await;
        if current.take().is_none() {
            return;
        }
        let mut values = load_values(&self.path).await;
        values.remove(TOKEN_KEY);
        if let Err(err) = persist_values(&self.path, &values).await {
            warn!("failed to remove persisted session token: {err}");
        }
        info!("session cleared");
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GuardState {
    #[default]
    Unknown,
    Authenticated(Operator),
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    RedirectToLogin,
}

/// Gates protected views on the presence and validity of the session token.
///
/// Advisory only: the backend still checks the token on every call.
#[derive(Debug, Default)]
pub struct SessionGuard {
    state: GuardState,
}

impl SessionGuard {
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn operator(&self) -> Option<&Operator> {
        match &self.state {
            GuardState::Authenticated(operator) => Some(operator),
            _ => None,
        }
    }

    /// Without a token the guard settles immediately; with one it renders optimistically
    /// and stays `Unknown` until [`SessionGuard::validate`] completes.
    pub async fn mount(&mut self, session: &Session) -> GuardDecision {
        if session.is_active().await {
            GuardDecision::Render
        } else {
            self.state = GuardState::Unauthenticated;
            GuardDecision::RedirectToLogin
        }
    }

    pub async fn validate<B: CrmBackend + ?Sized>(
        &mut self,
        backend: &B,
        session: &Session,
    ) -> Result<GuardDecision, ClientError> {
        match backend.fetch_user_info().await {
            Ok(info) => {
                self.state = GuardState::Authenticated(info.logged_in_as);
                Ok(GuardDecision::Render)
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(err) => {
                warn!("session validation failed: {err}");
                self.invalidate(session).await;
                Err(err)
            }
        }
    }

    /// Forced sign-out: forgets the operator and clears the persisted token.
    pub async fn invalidate(&mut self, session: &Session) {
        self.state = GuardState::Unauthenticated;
        session.clear().await;
    }

    pub fn reset(&mut self) {
        self.state = GuardState::Unknown;
    }
}
