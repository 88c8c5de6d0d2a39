use crate::campaign::AudienceFilter;
use crate::errors::ClientError;
use crate::models::{
    Category, Channel, Client, ClientDraft, Credentials, Gender, MailingPreference, Registration,
    Role,
};
use chrono::NaiveDate;
use serde::Deserialize;

const FILL_ALL_FIELDS: &str = "Please fill in all fields";

/// Raw client fields as typed by the operator. The add and edit screens share it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub birth_date: String,
    pub gender: String,
    pub category: String,
}

impl ClientForm {
    pub fn from_client(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            birth_date: client.birth_date.format("%Y-%m-%d").to_string(),
            gender: client.gender.to_string(),
            category: client.category.to_string(),
        }
    }

    /// Name, phone, email, birth date and gender are required. An empty category means
    /// `potential`.
    pub fn validate(&self) -> Result<ClientDraft, ClientError> {
        let required = [
            &self.name,
            &self.phone,
            &self.email,
            &self.birth_date,
            &self.gender,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ClientError::validation(FILL_ALL_FIELDS));
        }

        let birth_date = NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d")
            .map_err(|_| ClientError::validation("Birth date must be in YYYY-MM-DD format"))?;
        let gender: Gender = self.gender.parse().map_err(ClientError::Validation)?;
        let category = if self.category.trim().is_empty() {
            Category::default()
        } else {
            self.category.parse().map_err(ClientError::Validation)?
        };

        Ok(ClientDraft {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            birth_date,
            gender,
            category,
            last_mailing_date: None,
            mailing_preference: MailingPreference::Email,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, ClientError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ClientError::validation("Enter a username and password"));
        }
        Ok(Credentials {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, ClientError> {
        if self.username.trim().is_empty() || self.password.is_empty() || self.role.trim().is_empty() {
            return Err(ClientError::validation(FILL_ALL_FIELDS));
        }
        let role: Role = self.role.parse().map_err(ClientError::Validation)?;
        Ok(Registration {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            role,
        })
    }
}

/// The campaign screen posts every field with each button, so toggles and filter
/// changes keep what the operator has typed so far.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CampaignForm {
    pub channel: String,
    pub message: String,
    pub whatsapp_number: String,
    pub category: String,
}

impl CampaignForm {
    pub fn channel(&self) -> Result<Option<Channel>, ClientError> {
        if self.channel.trim().is_empty() {
            return Ok(None);
        }
        self.channel.parse().map(Some).map_err(ClientError::Validation)
    }

    pub fn filter(&self) -> Result<AudienceFilter, ClientError> {
        self.category.parse().map_err(ClientError::Validation)
    }
}
