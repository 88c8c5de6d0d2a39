use crate::api::CrmBackend;
use crate::auth::Route;
use crate::campaign::{AudienceFilter, CampaignDispatcher, DispatchReport};
use crate::errors::ClientError;
use crate::forms::ClientForm;
use crate::models::{Channel, Client, ClientId, Operator, Statistics};
use crate::notify::NoticeQueue;
use crate::registry::ClientRegistry;
use crate::session::{GuardDecision, Session, SessionGuard};
use std::future::Future;
use std::sync::{Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Ready,
    /// Another request is still fetching the initial data.
    Loading,
    Redirect(Route),
}

/// Everything behind the login wall: session guard, client list, campaign form,
/// statistics snapshot and the notices produced along the way.
///
/// Calls issued through the dashboard share one cancellation token. Unmounting
/// (or logging out) cancels it, so late responses are dropped instead of applied.
pub struct Dashboard<B> {
    session: Session,
    registry: ClientRegistry<B>,
    guard: Mutex<SessionGuard>,
    campaign: Mutex<CampaignDispatcher>,
    statistics: RwLock<Option<Statistics>>,
    phase: Mutex<LoadPhase>,
    notices: NoticeQueue,
    cancel: StdMutex<CancellationToken>,
}

impl<B: CrmBackend> Dashboard<B> {
    pub fn new(backend: B, session: Session, notices: NoticeQueue) -> Self {
        Self {
            session,
            registry: ClientRegistry::new(backend),
            guard: Mutex::new(SessionGuard::default()),
            campaign: Mutex::new(CampaignDispatcher::default()),
            statistics: RwLock::new(None),
            phase: Mutex::new(LoadPhase::Idle),
            notices,
            cancel: StdMutex::new(CancellationToken::new()),
        }
    }

    pub fn backend(&self) -> &B {
        self.registry.backend()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub async fn phase(&self) -> LoadPhase {
        *self.phase.lock().await
    }

    pub async fn operator(&self) -> Option<Operator> {
        self.guard.lock().await.operator().cloned()
    }

    pub async fn statistics(&self) -> Option<Statistics> {
        self.statistics.read().await.clone()
    }

    /// Where a finished action should send the operator.
    pub async fn landing(&self) -> Route {
        if self.session.is_active().await {
            Route::Dashboard
        } else {
            Route::Login
        }
    }

    /// Runs the session guard and, on first entry (or when `reload` is set), fetches the
    /// client list and statistics concurrently with token validation.
    pub async fn mount(&self, reload: bool) -> MountOutcome {
        if !self.session.is_active().await {
            let mut guard = self.guard.lock().await;
            guard.mount(&self.session).await;
            *self.phase.lock().await = LoadPhase::Idle;
            return MountOutcome::Redirect(Route::Login);
        }

        {
            let mut phase = self.phase.lock().await;
            match *phase {
                LoadPhase::Loading => return MountOutcome::Loading,
                LoadPhase::Ready if !reload => return MountOutcome::Ready,
                _ => *phase = LoadPhase::Loading,
            }
        }

        let token = self.cancel_token();
        let mut guard = self.guard.lock().await;
        if guard.mount(&self.session).await == GuardDecision::RedirectToLogin {
            *self.phase.lock().await = LoadPhase::Idle;
            return MountOutcome::Redirect(Route::Login);
        }

        let backend = self.registry.backend();
        let (validation, loaded, statistics) = tokio::join!(
            cancellable(&token, guard.validate(backend, &self.session)),
            cancellable(&token, self.registry.load()),
            cancellable(&token, backend.fetch_statistics()),
        );
        drop(guard);

        if let Err(err) = validation {
            *self.phase.lock().await = LoadPhase::Idle;
            if !matches!(err, ClientError::Cancelled) {
                self.forget_operator_data().await;
                self.notices.error(validation_failure_text(&err));
            }
            return MountOutcome::Redirect(Route::Login);
        }

        match loaded {
            Ok(_) => {
                let clients = self.registry.clients();
                self.campaign.lock().await.retain_known(&clients);
            }
            Err(err) => self.report_failure("Failed to load clients", &err).await,
        }
        match statistics {
            Ok(snapshot) => *self.statistics.write().await = Some(snapshot),
            Err(err) => self.report_failure("Failed to load statistics", &err).await,
        }

        if !self.session.is_active().await {
            *self.phase.lock().await = LoadPhase::Idle;
            return MountOutcome::Redirect(Route::Login);
        }
        *self.phase.lock().await = LoadPhase::Ready;
        info!("dashboard mounted");
        MountOutcome::Ready
    }

    /// Cancels every outstanding dashboard call. The next mount starts fresh.
    pub async fn unmount(&self) {
        {
            let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            cancel.cancel();
            *cancel = CancellationToken::new();
        }
        let mut phase = self.phase.lock().await;
        if *phase == LoadPhase::Loading {
            *phase = LoadPhase::Idle;
        }
        debug!("dashboard unmounted");
    }

    /// Prepares for a freshly signed-in operator.
    pub async fn on_login(&self) {
        self.unmount().await;
        self.guard.lock().await.reset();
        *self.phase.lock().await = LoadPhase::Idle;
    }

    pub async fn logout(&self) -> Route {
        if self.session.is_active().await {
            if let Err(err) = self.backend().logout().await {
                warn!("server logout failed: {err}");
            }
        }
        self.unmount().await;
        self.forget_operator_data().await;
        self.notices.info("You have signed out.");
        info!("operator signed out");
        Route::Login
    }

    pub fn clients(&self) -> Vec<Client> {
        self.registry.clients()
    }

    pub fn search(&self, term: &str) -> Vec<Client> {
        self.registry.search(term)
    }

    pub async fn add_client(&self, form: &ClientForm) -> Result<Client, ClientError> {
        let result = self.run(self.registry.add(form)).await;
        if let Ok(client) = &result {
            self.notices.success(format!("Client {} added", client.name));
        }
        self.settle(result, "Failed to add the client").await
    }

    pub async fn update_client(&self, id: ClientId, form: &ClientForm) -> Result<Client, ClientError> {
        let result = self.run(self.registry.update(id, form)).await;
        if let Ok(client) = &result {
            self.notices.success(format!("Client {} updated", client.name));
        }
        self.settle(result, "Failed to update the client").await
    }

    pub async fn delete_client(&self, id: ClientId) -> Result<(), ClientError> {
        let result = self.run(self.registry.delete(id)).await;
        if result.is_ok() {
            let clients = self.registry.clients();
            self.campaign.lock().await.retain_known(&clients);
            self.notices.success("Client deleted");
        }
        self.settle(result, "Failed to delete the client").await
    }

    pub async fn fetch_client(&self, id: ClientId) -> Result<Client, ClientError> {
        let result = self.run(self.registry.fetch(id)).await;
        self.settle(result, "Failed to load the client").await
    }

    pub async fn campaign(&self) -> CampaignDispatcher {
        self.campaign.lock().await.clone()
    }

    /// Re-applying the current filter keeps the selection.
    pub async fn set_audience_filter(&self, filter: AudienceFilter) {
        let mut campaign = self.campaign.lock().await;
        if campaign.filter() != filter {
            campaign.set_filter(filter);
        }
    }

    pub async fn toggle_recipient(&self, id: ClientId) {
        self.campaign.lock().await.toggle(id);
    }

    pub async fn select_all_recipients(&self) {
        let clients = self.registry.clients();
        self.campaign.lock().await.select_all(&clients);
    }

    pub async fn edit_campaign(&self, channel: Option<Channel>, message: &str, whatsapp_number: &str) {
        let mut campaign = self.campaign.lock().await;
        campaign.set_channel(channel);
        campaign.set_message(message);
        campaign.set_whatsapp_number(whatsapp_number);
    }

    /// Sends the current campaign form. One send at a time; the form survives failures.
    pub async fn send_campaign(&self) -> Result<DispatchReport, ClientError> {
        let token = self.cancel_token();
        let mut campaign = self.campaign.lock().await;
        let result = cancellable(&token, campaign.dispatch(self.registry.backend())).await;
        drop(campaign);

        if let Ok(report) = &result {
            self.notices.success(report.summary());
        }
        self.settle(result, "Failed to send the campaign").await
    }

    async fn run<T>(&self, operation: impl Future<Output = Result<T, ClientError>>) -> Result<T, ClientError> {
        let token = self.cancel_token();
        cancellable(&token, operation).await
    }

    async fn settle<T>(&self, result: Result<T, ClientError>, context: &str) -> Result<T, ClientError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                self.report_failure(context, &err).await;
                Err(err)
            }
        }
    }

    async fn report_failure(&self, context: &str, err: &ClientError) {
        match err {
            ClientError::Cancelled => debug!("{context}: cancelled"),
            ClientError::Validation(message) => {
                self.notices.error(message.clone());
            }
            ClientError::Auth(message) => {
                warn!("{context}: authorization rejected: {message}");
                self.forget_operator_data().await;
                self.notices.error(SESSION_EXPIRED);
            }
            other => {
                warn!("{context}: {other}");
                self.notices.error(format!("{context}: {other}"));
            }
        }
    }

    async fn forget_operator_data(&self) {
        self.guard.lock().await.invalidate(&self.session).await;
        self.registry.clear();
        *self.statistics.write().await = None;
        *self.campaign.lock().await = CampaignDispatcher::default();
        *self.phase.lock().await = LoadPhase::Idle;
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

fn validation_failure_text(err: &ClientError) -> String {
    match err {
        ClientError::Auth(_) => SESSION_EXPIRED.to_string(),
        other => format!("Could not verify your session ({other}). Please sign in again."),
    }
}

async fn cancellable<T>(
    token: &CancellationToken,
    operation: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::select! {
        _ = token.cancelled() => Err(ClientError::Cancelled),
        result = operation => result,
    }
}
