use crate::api::ApiClient;
use crate::config::ConsoleConfig;
use crate::dashboard::Dashboard;
use crate::errors::ClientError;
use crate::notify::NoticeQueue;
use crate::session::Session;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard<ApiClient>>,
}

impl AppState {
    pub fn new(dashboard: Dashboard<ApiClient>) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
        }
    }

    /// Restores the persisted session and wires the API client to it.
    pub async fn from_config(config: &ConsoleConfig) -> Result<Self, ClientError> {
        let session = Session::init(config.session_path.clone()).await;
        let api = ApiClient::new(&config.api_url, &config.relay_url, session.clone(), config.timeout)?;
        Ok(Self::new(Dashboard::new(api, session, NoticeQueue::default())))
    }

    pub fn notices(&self) -> &NoticeQueue {
        self.dashboard.notices()
    }
}
