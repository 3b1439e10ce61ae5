use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    Local,
}

/// Result of scraping one student profile picture. `id` is the student number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePicture {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub filename: String,
    pub location: StorageLocation,
}
