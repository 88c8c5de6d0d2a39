use crate::api::CrmBackend;
use crate::errors::ClientError;
use crate::forms::{LoginForm, RegisterForm};
use crate::notify::NoticeQueue;
use tracing::{info, warn};

/// Console pages the auth flows navigate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Signs in. The backend call stores the token; any failure stays on the login page.
pub async fn submit_login<B: CrmBackend + ?Sized>(
    backend: &B,
    form: &LoginForm,
    notices: &NoticeQueue,
) -> Route {
    let outcome = match form.validate() {
        Ok(credentials) => backend.login(&credentials).await,
        Err(err) => Err(err),
    };
    match outcome {
        Ok(response) => {
            info!(username = response.username.as_deref().unwrap_or_default(), "operator signed in");
            Route::Dashboard
        }
        Err(err) => {
            warn!("login failed: {err}");
            notices.error(login_failure_text(&err));
            Route::Login
        }
    }
}

pub async fn submit_register<B: CrmBackend + ?Sized>(
    backend: &B,
    form: &RegisterForm,
    notices: &NoticeQueue,
) -> Route {
    let outcome = match form.validate() {
        Ok(registration) => backend.register(&registration).await,
        Err(err) => Err(err),
    };
    match outcome {
        Ok(_) => {
            info!(username = %form.username.trim(), "operator registered");
            notices.success("Registration complete. You can sign in now.");
            Route::Login
        }
        Err(err) => {
            warn!("registration failed: {err}");
            notices.error(format!("Registration failed: {err}"));
            Route::Register
        }
    }
}

fn login_failure_text(err: &ClientError) -> String {
    match err {
        ClientError::Validation(message) => message.clone(),
        other => format!("Login failed: {other}"),
    }
}
