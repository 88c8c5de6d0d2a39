use crate::campaign::{AudienceFilter, CampaignDispatcher};
use crate::forms::{ClientForm, RegisterForm};
use crate::models::{Category, Channel, Client, ClientId, Gender, Operator};
use crate::notify::Notice;
use crate::stats::{SharePoint, StatisticsView};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Clients,
    Add,
    Campaign,
    Stats,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Clients, Section::Add, Section::Campaign, Section::Stats];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Clients => "clients",
            Section::Add => "add",
            Section::Campaign => "campaign",
            Section::Stats => "stats",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Section::Clients => "Clients",
            Section::Add => "Add client",
            Section::Campaign => "Campaign",
            Section::Stats => "Statistics",
        }
    }

    /// Unknown or missing values fall back to the client list.
    pub fn parse(raw: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|section| Some(section.as_str()) == raw.map(str::trim))
            .unwrap_or_default()
    }

    pub fn path(self) -> String {
        format!("/dashboard?section={}", self.as_str())
    }
}

/// Where the shared client form posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTarget {
    Add,
    Edit(ClientId),
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render_login(notices: &[Notice], username: &str) -> String {
    let body = format!(
        r#"<section class="card narrow">
  <h1>Sign in</h1>
  <form method="post" action="/login" class="stack">
    <label>Username <input name="username" value="{username}" autocomplete="username" /></label>
    <label>Password <input name="password" type="password" autocomplete="current-password" /></label>
    <button type="submit" class="primary">Sign in</button>
  </form>
  <p class="hint">No account yet? <a href="/register">Register</a></p>
</section>"#,
        username = escape(username),
    );
    page("Sign in", "", notices, &body)
}

pub fn render_register(notices: &[Notice], form: &RegisterForm) -> String {
    let roles = ["admin", "manager"]
        .iter()
        .map(|role| option(role, role, form.role.trim() == *role))
        .collect::<String>();
    let body = format!(
        r#"<section class="card narrow">
  <h1>Register</h1>
  <form method="post" action="/register" class="stack">
    <label>Username <input name="username" value="{username}" /></label>
    <label>Password <input name="password" type="password" /></label>
    <label>Role
      <select name="role">
        <option value="">Choose a role</option>
        {roles}
      </select>
    </label>
    <button type="submit" class="primary">Create account</button>
  </form>
  <p class="hint">Already registered? <a href="/login">Sign in</a></p>
</section>"#,
        username = escape(&form.username),
    );
    page("Register", "", notices, &body)
}

/// Refreshes to `target`, which must not ask for another reload.
pub fn render_loading(notices: &[Notice], target: &str) -> String {
    let body = r#"<section class="card narrow">
  <h1>Loading…</h1>
  <p class="hint">Fetching clients and statistics. This page refreshes on its own.</p>
</section>"#;
    let head = format!(r#"<meta http-equiv="refresh" content="1; url={}" />"#, escape(target));
    page("Loading", &head, notices, body)
}

pub fn render_dashboard(
    operator: Option<&Operator>,
    notices: &[Notice],
    section: Section,
    content: &str,
) -> String {
    let mut nav = String::new();
    for item in Section::ALL {
        let class = if item == section { "tab active" } else { "tab" };
        let _ = write!(nav, r#"<a class="{class}" href="{}">{}</a>"#, item.path(), item.label());
    }
    let greeting = match operator {
        Some(operator) => format!(
            "Signed in as <strong>{}</strong> ({})",
            escape(operator.display_name()),
            escape(&operator.role)
        ),
        None => "Checking session…".to_string(),
    };
    let body = format!(
        r#"<header class="topbar">
  <div>
    <h1>CRM Desk</h1>
    <p class="subtitle">{greeting}</p>
  </div>
  <div class="row">
    <a class="ghost" href="/dashboard?section={current}&reload=1">Reload</a>
    <form method="post" action="/logout"><button type="submit" class="ghost">Sign out</button></form>
  </div>
</header>
<nav class="tabs">{nav}</nav>
<section class="card">{content}</section>"#,
        current = section.as_str(),
    );
    page(section.label(), "", notices, &body)
}

pub fn clients_section(clients: &[Client], query: &str) -> String {
    let mut rows = String::new();
    for client in clients {
        let last_campaign = client
            .last_campaign
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "—".to_string());
        let _ = write!(
            rows,
            r#"<tr>
  <td>{name}</td><td>{phone}</td><td>{email}</td><td>{birth}</td><td>{gender}</td><td>{category}</td><td>{last_campaign}</td>
  <td class="row">
    <a class="ghost" href="/clients/{id}/edit">Edit</a>
    <form method="post" action="/clients/{id}/delete" onsubmit="return confirm('Delete this client?')">
      <button type="submit" class="danger">Delete</button>
    </form>
  </td>
</tr>"#,
            id = client.id,
            name = escape(&client.name),
            phone = escape(&client.phone),
            email = escape(&client.email),
            birth = client.birth_date.format("%Y-%m-%d"),
            gender = gender_label(client.gender),
            category = client.category.as_str(),
        );
    }
    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="8" class="hint">No clients found</td></tr>"#);
    }

    format!(
        r#"<form method="get" action="/dashboard" class="row">
  <input type="hidden" name="section" value="clients" />
  <input name="q" value="{query}" placeholder="Search by name, email or phone" />
  <button type="submit">Search</button>
</form>
<table>
  <thead><tr><th>Name</th><th>Phone</th><th>Email</th><th>Birth date</th><th>Gender</th><th>Type</th><th>Last campaign</th><th></th></tr></thead>
  <tbody>{rows}</tbody>
</table>"#,
        query = escape(query),
    )
}

pub fn client_form_section(form: &ClientForm, target: FormTarget) -> String {
    let (title, action, submit) = match target {
        FormTarget::Add => ("New client".to_string(), "/clients".to_string(), "Add client"),
        FormTarget::Edit(id) => (format!("Edit client #{id}"), format!("/clients/{id}"), "Save changes"),
    };
    let genders = Gender::ALL
        .iter()
        .map(|gender| option(gender.as_str(), gender_label(*gender), form.gender.trim() == gender.as_str()))
        .collect::<String>();
    let categories = Category::ALL
        .iter()
        .map(|category| option(category.as_str(), category.as_str(), form.category.trim() == category.as_str()))
        .collect::<String>();

    format!(
        r#"<h2>{title}</h2>
<form method="post" action="{action}" class="stack">
  <label>Name <input name="name" value="{name}" /></label>
  <label>Phone <input name="phone" value="{phone}" /></label>
  <label>Email <input name="email" type="email" value="{email}" /></label>
  <label>Birth date <input name="birth_date" type="date" value="{birth}" /></label>
  <label>Gender
    <select name="gender"><option value="">Choose</option>{genders}</select>
  </label>
  <label>Type
    <select name="category"><option value="">potential (default)</option>{categories}</select>
  </label>
  <div class="row">
    <button type="submit" class="primary">{submit}</button>
    <a class="ghost" href="/dashboard?section=clients">Cancel</a>
  </div>
</form>"#,
        name = escape(&form.name),
        phone = escape(&form.phone),
        email = escape(&form.email),
        birth = escape(&form.birth_date),
    )
}

pub fn campaign_section(campaign: &CampaignDispatcher, clients: &[Client]) -> String {
    let channels = [Channel::Email, Channel::Whatsapp]
        .iter()
        .map(|channel| option(channel.as_str(), channel_label(*channel), campaign.channel() == Some(*channel)))
        .collect::<String>();
    let filters = std::iter::once(AudienceFilter::All)
        .chain(Category::ALL.into_iter().map(AudienceFilter::Only))
        .map(|filter| {
            let value = filter.to_string();
            option(&value, &value, campaign.filter() == filter)
        })
        .collect::<String>();

    let mut rows = String::new();
    for client in clients.iter().filter(|client| campaign.filter().admits(client)) {
        let selected = campaign.is_selected(client.id);
        let _ = write!(
            rows,
            r#"<tr class="{class}">
  <td><button type="submit" formaction="/campaign/toggle/{id}" class="ghost">{mark}</button></td>
  <td>{name}</td><td>{email}</td><td>{phone}</td><td>{category}</td>
</tr>"#,
            id = client.id,
            class = if selected { "selected" } else { "" },
            mark = if selected { "✓ Selected" } else { "Select" },
            name = escape(&client.name),
            email = escape(&client.email),
            phone = escape(&client.phone),
            category = client.category.as_str(),
        );
    }
    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="5" class="hint">No clients in this category</td></tr>"#);
    }

    format!(
        r#"<h2>Campaign</h2>
<form method="post" action="/campaign/send" class="stack">
  <label>Channel
    <select name="channel"><option value="">Choose a channel</option>{channels}</select>
  </label>
  <label>Message <textarea name="message" rows="4">{message}</textarea></label>
  <label>WhatsApp number <input name="whatsapp_number" value="{number}" placeholder="7XXXXXXXXXX" /></label>
  <p class="hint">WhatsApp messages go to the single number above. The audience below is used for email only.</p>
  <div class="row">
    <label>Type <select name="category">{filters}</select></label>
    <button type="submit" formaction="/campaign/filter">Apply filter</button>
    <button type="submit" formaction="/campaign/select-all">Select all</button>
    <span class="hint">{selected} selected</span>
  </div>
  <table>
    <thead><tr><th></th><th>Name</th><th>Email</th><th>Phone</th><th>Type</th></tr></thead>
    <tbody>{rows}</tbody>
  </table>
  <button type="submit" class="primary">Send campaign</button>
</form>"#,
        message = escape(campaign.message()),
        number = escape(campaign.whatsapp_number()),
        selected = campaign.audience().len(),
    )
}

pub fn stats_section(view: Option<&StatisticsView>) -> String {
    let Some(view) = view else {
        return r#"<p class="hint">Statistics are not available yet. <a href="/dashboard?section=stats&reload=1">Try again</a></p>"#
            .to_string();
    };

    let mut campaigns = String::new();
    for row in &view.campaigns {
        let _ = write!(
            campaigns,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.0}%</td></tr>",
            escape(&row.date),
            escape(&row.channel),
            row.success_count,
            row.fail_count,
            row.success_rate * 100.0
        );
    }
    if campaigns.is_empty() {
        campaigns.push_str(r#"<tr><td colspan="5" class="hint">No campaigns yet</td></tr>"#);
    }

    format!(
        r#"<div class="panel">
  <div class="stat"><span class="label">Clients</span><span class="value">{total}</span></div>
  <div class="stat"><span class="label">Delivered</span><span class="value">{success}</span></div>
  <div class="stat"><span class="label">Failed</span><span class="value net">{fail}</span></div>
</div>
<h3>Gender</h3>
{genders}
<h3>Age</h3>
{ages}
<h3>Campaigns</h3>
<table>
  <thead><tr><th>Date</th><th>Type</th><th>Delivered</th><th>Failed</th><th>Success rate</th></tr></thead>
  <tbody>{campaigns}</tbody>
</table>"#,
        total = view.total_clients,
        success = view.total_success,
        fail = view.total_fail,
        genders = share_bars(&view.genders),
        ages = share_bars(&view.ages),
    )
}

fn share_bars(points: &[SharePoint]) -> String {
    let mut out = String::from(r#"<div class="bars">"#);
    for point in points {
        let _ = write!(
            out,
            r#"<div class="bar-row"><span class="label">{label}</span><div class="bar"><div style="width: {percent:.1}%"></div></div><span>{count} ({percent:.0}%)</span></div>"#,
            label = escape(&point.label),
            count = point.count,
            percent = point.percent,
        );
    }
    out.push_str("</div>");
    out
}

fn option(value: &str, label: &str, selected: bool) -> String {
    format!(
        r#"<option value="{}"{}>{}</option>"#,
        escape(value),
        if selected { " selected" } else { "" },
        escape(label)
    )
}

fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Unspecified => "—",
    }
}

fn channel_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Email => "Email",
        Channel::Whatsapp => "WhatsApp",
    }
}

fn render_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|notice| {
            format!(
                r#"<div class="notice {}" id="notice-{}"><span>{}</span><button type="button" class="dismiss" onclick="this.parentElement.remove()">×</button></div>"#,
                notice.level.css_class(),
                notice.id,
                escape(&notice.text)
            )
        })
        .collect()
}

fn page(title: &str, head: &str, notices: &[Notice], body: &str) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{HEAD}}", head)
        .replace("{{BODY}}", body)
        .replace("{{NOTICES}}", &render_notices(notices))
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  {{HEAD}}
  <title>{{TITLE}} · CRM Desk</title>
  <style>
    :root {
      --bg-1: #f3f1ec;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.92);
      --shadow: 0 18px 40px rgba(47, 72, 88, 0.14);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--bg-1), #e9eef1 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      padding: 24px 18px 48px;
    }

    main {
      width: min(1080px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 18px;
    }

    .card {
      background: var(--card);
      border-radius: 20px;
      box-shadow: var(--shadow);
      padding: 28px;
      overflow-x: auto;
    }

    .card.narrow {
      width: min(420px, 100%);
      margin: 40px auto 0;
    }

    .topbar,
    .row {
      display: flex;
      gap: 12px;
      align-items: center;
      justify-content: space-between;
      flex-wrap: wrap;
    }

    h1 {
      margin: 0;
      font-size: 1.8rem;
    }

    .subtitle,
    .hint {
      color: #6f6a63;
      margin: 0;
    }

    .tabs {
      display: flex;
      gap: 8px;
      flex-wrap: wrap;
    }

    .tab {
      padding: 10px 16px;
      border-radius: 999px;
      text-decoration: none;
      color: var(--accent-2);
      background: rgba(47, 72, 88, 0.08);
    }

    .tab.active {
      background: var(--accent-2);
      color: white;
    }

    .stack {
      display: grid;
      gap: 12px;
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.9rem;
    }

    input,
    select,
    textarea {
      font: inherit;
      padding: 10px 12px;
      border-radius: 10px;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    button,
    a.ghost {
      font: inherit;
      border: none;
      border-radius: 999px;
      padding: 10px 16px;
      cursor: pointer;
      text-decoration: none;
      background: rgba(47, 72, 88, 0.1);
      color: var(--accent-2);
    }

    button.primary {
      background: var(--accent);
      color: white;
    }

    button.danger {
      background: #b3261e;
      color: white;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      margin-top: 12px;
    }

    th,
    td {
      text-align: left;
      padding: 8px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
    }

    tr.selected {
      background: rgba(255, 107, 74, 0.08);
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 16px;
      padding: 16px;
      display: grid;
      gap: 6px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .stat .value.net {
      color: var(--accent);
    }

    .bars {
      display: grid;
      gap: 8px;
    }

    .bar-row {
      display: grid;
      grid-template-columns: 90px 1fr 110px;
      gap: 10px;
      align-items: center;
    }

    .bar {
      height: 12px;
      border-radius: 999px;
      background: rgba(47, 72, 88, 0.1);
      overflow: hidden;
    }

    .bar div {
      height: 100%;
      background: var(--accent-2);
    }

    .notices {
      display: grid;
      gap: 8px;
    }

    .notice {
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 10px 14px;
      border-radius: 12px;
      background: white;
      border-left: 4px solid var(--accent-2);
    }

    .notice.ok {
      border-left-color: #2e7d32;
    }

    .notice.error {
      border-left-color: #b3261e;
    }

    .notice .dismiss {
      background: none;
      padding: 0 6px;
    }
  </style>
</head>
<body>
  <main>
    <div class="notices">{{NOTICES}}</div>
    {{BODY}}
  </main>
</body>
</html>
"#;
