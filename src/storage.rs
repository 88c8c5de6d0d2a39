use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use tracing::error;

/// Key the session token is persisted under.
pub const TOKEN_KEY: &str = "token";

pub type StoredValues = BTreeMap<String, String>;

/// Reads the persisted key/value file. A missing or unreadable file reads as empty.
pub async fn load_values(path: &Path) -> StoredValues {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(values) => values,
            Err(err) => {
                error!("failed to parse session file: {err}");
                StoredValues::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredValues::default(),
        Err(err) => {
            error!("failed to read session file: {err}");
            StoredValues::default()
        }
    }
}

pub async fn persist_values(path: &Path, values: &StoredValues) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(values)?;
    fs::write(path, payload).await
}
