use crate::auth::{self, Route};
use crate::dashboard::MountOutcome;
use crate::forms::{CampaignForm, ClientForm, LoginForm, RegisterForm};
use crate::models::ClientId;
use crate::state::AppState;
use crate::stats::build_view;
use crate::ui::{self, FormTarget, Section};
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    pub section: Option<String>,
    pub q: Option<String>,
    pub reload: Option<String>,
}

impl DashboardQuery {
    fn reload(&self) -> bool {
        self.reload
            .as_deref()
            .is_some_and(|value| !value.is_empty() && value != "0")
    }
}

pub async fn index() -> Redirect {
    Redirect::to(Route::Dashboard.path())
}

pub async fn login_page(State(state): State<AppState>) -> Response {
    if state.dashboard.session().is_active().await {
        return Redirect::to(Route::Dashboard.path()).into_response();
    }
    Html(ui::render_login(&state.notices().drain(), "")).into_response()
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match auth::submit_login(state.dashboard.backend(), &form, state.notices()).await {
        Route::Dashboard => {
            state.dashboard.on_login().await;
            Redirect::to(Route::Dashboard.path()).into_response()
        }
        _ => Html(ui::render_login(&state.notices().drain(), &form.username)).into_response(),
    }
}

pub async fn register_page(State(state): State<AppState>) -> Html<String> {
    Html(ui::render_register(&state.notices().drain(), &RegisterForm::default()))
}

pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    match auth::submit_register(state.dashboard.backend(), &form, state.notices()).await {
        Route::Register => Html(ui::render_register(&state.notices().drain(), &form)).into_response(),
        route => Redirect::to(route.path()).into_response(),
    }
}

pub async fn logout(State(state): State<AppState>) -> Redirect {
    Redirect::to(state.dashboard.logout().await.path())
}

pub async fn dashboard(State(state): State<AppState>, Query(query): Query<DashboardQuery>) -> Response {
    let section = Section::parse(query.section.as_deref());
    if let Some(early) = mounted(&state, query.reload(), section).await {
        return early;
    }

    let dashboard = &state.dashboard;
    let content = match section {
        Section::Clients => {
            let term = query.q.as_deref().unwrap_or_default();
            ui::clients_section(&dashboard.search(term), term)
        }
        Section::Add => ui::client_form_section(&ClientForm::default(), FormTarget::Add),
        Section::Campaign => ui::campaign_section(&dashboard.campaign().await, &dashboard.clients()),
        Section::Stats => {
            let view = dashboard.statistics().await.map(|snapshot| build_view(&snapshot));
            ui::stats_section(view.as_ref())
        }
    };
    render_page(&state, section, &content).await
}

pub async fn add_client(State(state): State<AppState>, Form(form): Form<ClientForm>) -> Response {
    if let Some(redirect) = require_session(&state).await {
        return redirect;
    }
    match state.dashboard.add_client(&form).await {
        Ok(_) => Redirect::to(&Section::Clients.path()).into_response(),
        Err(_) => form_failure(&state, &form, FormTarget::Add).await,
    }
}

pub async fn edit_client(State(state): State<AppState>, Path(id): Path<ClientId>) -> Response {
    if let Some(early) = mounted(&state, false, Section::Clients).await {
        return early;
    }
    match state.dashboard.fetch_client(id).await {
        Ok(client) => {
            let form = ClientForm::from_client(&client);
            render_page(&state, Section::Clients, &ui::client_form_section(&form, FormTarget::Edit(id))).await
        }
        Err(_) => back_to(&state, Section::Clients).await,
    }
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
    Form(form): Form<ClientForm>,
) -> Response {
    if let Some(redirect) = require_session(&state).await {
        return redirect;
    }
    match state.dashboard.update_client(id, &form).await {
        Ok(_) => Redirect::to(&Section::Clients.path()).into_response(),
        Err(_) => form_failure(&state, &form, FormTarget::Edit(id)).await,
    }
}

pub async fn delete_client(State(state): State<AppState>, Path(id): Path<ClientId>) -> Response {
    if let Some(redirect) = require_session(&state).await {
        return redirect;
    }
    // Failures are already reported as notices.
    let _ = state.dashboard.delete_client(id).await;
    back_to(&state, Section::Clients).await
}

pub async fn campaign_filter(State(state): State<AppState>, Form(form): Form<CampaignForm>) -> Response {
    if let Some(redirect) = require_session(&state).await {
        return redirect;
    }
    save_campaign_form(&state, &form).await;
    back_to(&state, Section::Campaign).await
}

pub async fn campaign_toggle(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
    Form(form): Form<CampaignForm>,
) -> Response {
    if let Some(redirect) = require_session(&state).await {
        return redirect;
    }
    save_campaign_form(&state, &form).await;
    state.dashboard.toggle_recipient(id).await;
    back_to(&state, Section::Campaign).await
}

pub async fn campaign_select_all(State(state): State<AppState>, Form(form): Form<CampaignForm>) -> Response {
    if let Some(redirect) = require_session(&state).await {
        return redirect;
    }
    save_campaign_form(&state, &form).await;
    state.dashboard.select_all_recipients().await;
    back_to(&state, Section::Campaign).await
}

pub async fn campaign_send(State(state): State<AppState>, Form(form): Form<CampaignForm>) -> Response {
    if let Some(redirect) = require_session(&state).await {
        return redirect;
    }
    save_campaign_form(&state, &form).await;
    let _ = state.dashboard.send_campaign().await;
    back_to(&state, Section::Campaign).await
}

/// Runs the guarded mount. `Some` carries the page to return instead of the dashboard.
async fn mounted(state: &AppState, reload: bool, section: Section) -> Option<Response> {
    match state.dashboard.mount(reload).await {
        MountOutcome::Ready => None,
        MountOutcome::Loading => Some(
            Html(ui::render_loading(&state.notices().drain(), &section.path())).into_response(),
        ),
        MountOutcome::Redirect(route) => Some(Redirect::to(route.path()).into_response()),
    }
}

async fn require_session(state: &AppState) -> Option<Response> {
    if state.dashboard.session().is_active().await {
        None
    } else {
        Some(Redirect::to(Route::Login.path()).into_response())
    }
}

async fn save_campaign_form(state: &AppState, form: &CampaignForm) {
    let dashboard = &state.dashboard;
    match form.channel() {
        Ok(channel) => {
            dashboard
                .edit_campaign(channel, &form.message, &form.whatsapp_number)
                .await
        }
        Err(err) => {
            state.notices().error(err.to_string());
        }
    }
    match form.filter() {
        Ok(filter) => dashboard.set_audience_filter(filter).await,
        Err(err) => {
            state.notices().error(err.to_string());
        }
    }
}

async fn back_to(state: &AppState, section: Section) -> Response {
    match state.dashboard.landing().await {
        Route::Dashboard => Redirect::to(&section.path()).into_response(),
        route => Redirect::to(route.path()).into_response(),
    }
}

/// Keeps what the operator typed unless the session is gone.
async fn form_failure(state: &AppState, form: &ClientForm, target: FormTarget) -> Response {
    if state.dashboard.landing().await == Route::Login {
        return Redirect::to(Route::Login.path()).into_response();
    }
    let section = match target {
        FormTarget::Add => Section::Add,
        FormTarget::Edit(_) => Section::Clients,
    };
    render_page(state, section, &ui::client_form_section(form, target)).await
}

async fn render_page(state: &AppState, section: Section, content: &str) -> Response {
    let operator = state.dashboard.operator().await;
    Html(ui::render_dashboard(
        operator.as_ref(),
        &state.notices().drain(),
        section,
        content,
    ))
    .into_response()
}
