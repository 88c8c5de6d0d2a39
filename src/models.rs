use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type ClientId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Unspecified];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unspecified => "unspecified",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "unspecified" => Ok(Gender::Unspecified),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse client classification used to scope campaign audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Guest,
    Customer,
    #[default]
    Potential,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Guest, Category::Customer, Category::Potential];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Guest => "guest",
            Category::Customer => "customer",
            Category::Potential => "potential",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Category::Guest),
            "customer" => Ok(Category::Customer),
            "potential" => Ok(Category::Potential),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailingPreference {
    #[default]
    Email,
    Whatsapp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gender: Gender,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub category: Category,
    #[serde(default, alias = "lastMailingDate", deserialize_with = "lenient_date")]
    pub last_campaign: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mailing_preference: MailingPreference,
}

impl Client {
    /// Full replacement payload: the draft's fields over this record's server-owned ones.
    pub fn with_draft(&self, draft: &ClientDraft) -> Client {
        Client {
            id: self.id,
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            birth_date: draft.birth_date,
            gender: draft.gender,
            category: draft.category,
            last_campaign: self.last_campaign,
            mailing_preference: self.mailing_preference,
        }
    }
}

/// Validated editable fields of a client, as sent on create.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDraft {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(rename = "type")]
    pub category: Category,
    pub last_mailing_date: Option<NaiveDate>,
    pub mailing_preference: MailingPreference,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Operator {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
}

impl Operator {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

/// Body of `GET /protected`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub logged_in_as: Operator,
}

/// Body of `GET /check_auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCheck {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
}

/// Body of `POST /campaigns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignPayload {
    #[serde(rename = "type")]
    pub channel: Channel,
    pub message: String,
    pub clients: Vec<ClientId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct CampaignOutcome {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub fail_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Whatsapp,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Whatsapp => "whatsapp",
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(format!("unknown channel '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WhatsAppMessage {
    pub to: String,
    pub message: String,
}

/// Aggregate snapshot returned by `GET /statistics`. Missing or null fields read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    #[serde(deserialize_with = "null_as_default")]
    pub total_clients: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub gender_data: GenderCounts,
    #[serde(deserialize_with = "null_as_default")]
    pub age_data: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub campaign_data: Vec<CampaignPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderCounts {
    #[serde(deserialize_with = "null_as_default")]
    pub male: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub female: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignPoint {
    pub id: Option<i64>,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub success_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub fail_count: u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Accepts "YYYY-MM-DD" as well as a full ISO datetime.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_reads_backend_shape() {
        let client: Client = serde_json::from_value(json!({
            "id": 7,
            "name": "Ivan Petrov",
            "email": "ip@x.com",
            "phone": "79991234567",
            "birthDate": "1990-05-15",
            "gender": "male",
            "lastCampaign": "2024-03-01T10:15:00.123456",
            "type": null
        }))
        .unwrap();

        assert_eq!(client.id, 7);
        assert_eq!(client.gender, Gender::Male);
        assert_eq!(client.category, Category::Potential);
        assert_eq!(client.last_campaign, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(client.mailing_preference, MailingPreference::Email);
    }

    #[test]
    fn unknown_gender_reads_as_unspecified() {
        let client: Client = serde_json::from_value(json!({
            "id": 1,
            "name": "A",
            "email": "a@x.com",
            "phone": "1",
            "birthDate": "2000-01-01",
            "gender": "other",
            "type": "guest"
        }))
        .unwrap();

        assert_eq!(client.gender, Gender::Unspecified);
        assert_eq!(client.category, Category::Guest);
        assert_eq!(client.last_campaign, None);
    }

    #[test]
    fn draft_serializes_with_backend_field_names() {
        let draft = ClientDraft {
            name: "Anna".into(),
            phone: "+79009876543".into(),
            email: "anna@example.com".into(),
            birth_date: NaiveDate::from_ymd_opt(1985, 8, 20).unwrap(),
            gender: Gender::Female,
            category: Category::Customer,
            last_mailing_date: None,
            mailing_preference: MailingPreference::Email,
        };

        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["birthDate"], "1985-08-20");
        assert_eq!(value["type"], "customer");
        assert_eq!(value["lastMailingDate"], serde_json::Value::Null);
        assert_eq!(value["mailingPreference"], "email");
    }

    #[test]
    fn statistics_tolerates_missing_fields() {
        let stats: Statistics = serde_json::from_value(json!({ "totalClients": 3 })).unwrap();
        assert_eq!(stats.total_clients, 3);
        assert_eq!(stats.gender_data, GenderCounts::default());
        assert!(stats.age_data.is_empty());
        assert!(stats.campaign_data.is_empty());
    }

    #[test]
    fn statistics_reads_null_fields_as_zero() {
        let stats: Statistics = serde_json::from_value(json!({
            "totalClients": 3,
            "genderData": null,
            "ageData": null,
            "campaignData": null
        }))
        .unwrap();
        assert_eq!(stats.total_clients, 3);
        assert_eq!(stats.gender_data, GenderCounts::default());
        assert!(stats.age_data.is_empty());
        assert!(stats.campaign_data.is_empty());

        let stats: Statistics = serde_json::from_value(json!({
            "totalClients": null,
            "genderData": { "male": null, "female": 1 },
            "campaignData": [{ "id": 4, "type": null, "date": "2024-05-03", "successCount": null, "failCount": 2 }]
        }))
        .unwrap();
        assert_eq!(stats.total_clients, 0);
        assert_eq!(stats.gender_data, GenderCounts { male: 0, female: 1 });
        assert_eq!(stats.campaign_data[0].channel, "");
        assert_eq!(stats.campaign_data[0].success_count, 0);
        assert_eq!(stats.campaign_data[0].fail_count, 2);
    }
}
