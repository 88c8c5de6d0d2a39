use crate::api::CrmBackend;
use crate::errors::ClientError;
use crate::models::{CampaignOutcome, CampaignPayload, Category, Channel, Client, ClientId};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Category scope for "select all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudienceFilter {
    #[default]
    All,
    Only(Category),
}

impl AudienceFilter {
    pub fn admits(self, client: &Client) -> bool {
        match self {
            AudienceFilter::All => true,
            AudienceFilter::Only(category) => client.category == category,
        }
    }
}

impl FromStr for AudienceFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "all" => Ok(AudienceFilter::All),
            other => other.parse().map(AudienceFilter::Only),
        }
    }
}

impl fmt::Display for AudienceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudienceFilter::All => f.write_str("all"),
            AudienceFilter::Only(category) => f.write_str(category.as_str()),
        }
    }
}

/// A validated campaign, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignRequest {
    Email {
        message: String,
        audience: Vec<ClientId>,
    },
    Whatsapp {
        to: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchReport {
    Email(CampaignOutcome),
    Whatsapp { to: String },
}

impl DispatchReport {
    pub fn summary(&self) -> String {
        match self {
            DispatchReport::Email(outcome) => format!(
                "Campaign sent. Delivered: {}, failed: {}",
                outcome.success_count, outcome.fail_count
            ),
            DispatchReport::Whatsapp { to } => format!("WhatsApp message sent to +{to}"),
        }
    }
}

/// Strips formatting and canonicalizes a Russian mobile number to the `7…` form.
pub fn normalize_whatsapp_number(raw: &str) -> Result<String, ClientError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.chars().next() {
        Some('7') => Ok(digits),
        Some('8') => Ok(format!("7{}", &digits[1..])),
        _ => Err(ClientError::validation("The number must start with 7 or 8")),
    }
}

/// Campaign screen state: channel, audience selection and message fields.
#[derive(Debug, Clone, Default)]
pub struct CampaignDispatcher {
    channel: Option<Channel>,
    message: String,
    whatsapp_number: String,
    filter: AudienceFilter,
    audience: BTreeSet<ClientId>,
}

impl CampaignDispatcher {
    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn whatsapp_number(&self) -> &str {
        &self.whatsapp_number
    }

    pub fn filter(&self) -> AudienceFilter {
        self.filter
    }

    pub fn audience(&self) -> &BTreeSet<ClientId> {
        &self.audience
    }

    pub fn is_selected(&self, id: ClientId) -> bool {
        self.audience.contains(&id)
    }

    pub fn set_channel(&mut self, channel: Option<Channel>) {
        self.channel = channel;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn set_whatsapp_number(&mut self, number: impl Into<String>) {
        self.whatsapp_number = number.into();
    }

    /// Changing the filter always empties the selection.
    pub fn set_filter(&mut self, filter: AudienceFilter) {
        self.filter = filter;
        self.audience.clear();
    }

    pub fn toggle(&mut self, id: ClientId) {
        if !self.audience.remove(&id) {
            self.audience.insert(id);
        }
    }

    /// Selects every client admitted by the current filter, replacing the selection.
    pub fn select_all(&mut self, clients: &[Client]) {
        self.audience = clients
            .iter()
            .filter(|client| self.filter.admits(client))
            .map(|client| client.id)
            .collect();
    }

    /// Drops selected ids that are no longer in the client list.
    pub fn retain_known(&mut self, clients: &[Client]) {
        self.audience
            .retain(|id| clients.iter().any(|client| client.id == *id));
    }

    pub fn validate(&self) -> Result<CampaignRequest, ClientError> {
        let Some(channel) = self.channel else {
            return Err(ClientError::validation("Choose a campaign channel"));
        };
        if self.audience.is_empty() {
            return Err(ClientError::validation("Select at least one client"));
        }
        if self.message.trim().is_empty() {
            return Err(ClientError::validation("Enter the message text"));
        }

        match channel {
            Channel::Email => Ok(CampaignRequest::Email {
                message: self.message.clone(),
                audience: self.audience.iter().copied().collect(),
            }),
            Channel::Whatsapp => {
                if self.whatsapp_number.trim().is_empty() {
                    return Err(ClientError::validation("Enter the WhatsApp number"));
                }
                Ok(CampaignRequest::Whatsapp {
                    to: normalize_whatsapp_number(&self.whatsapp_number)?,
                    message: self.message.clone(),
                })
            }
        }
    }

    /// Validates and sends. The form is cleared on success and kept intact on failure.
    pub async fn dispatch<B: CrmBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<DispatchReport, ClientError> {
        let report = match self.validate()? {
            CampaignRequest::Email { message, audience } => {
                let payload = CampaignPayload {
                    channel: Channel::Email,
                    message,
                    clients: audience,
                };
                let outcome = backend.send_campaign(&payload).await?;
                info!(
                    success = outcome.success_count,
                    failed = outcome.fail_count,
                    "email campaign sent"
                );
                DispatchReport::Email(outcome)
            }
            CampaignRequest::Whatsapp { to, message } => {
                // TODO: fan out to the selected audience once the relay supports bulk sends.
                warn!(
                    selected = self.audience.len(),
                    "whatsapp campaign goes to the single entered number, not the selected audience"
                );
                backend.send_whatsapp(&to, &message).await?;
                info!(%to, "whatsapp message sent");
                DispatchReport::Whatsapp { to }
            }
        };

        self.reset_after_send();
        Ok(report)
    }

    fn reset_after_send(&mut self) {
        self.channel = None;
        self.audience.clear();
        self.message.clear();
        self.whatsapp_number.clear();
    }
}
