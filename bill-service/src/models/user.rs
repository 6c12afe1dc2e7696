use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Shop account. Owns bills and one bill-number counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// `name` falls back to the username when blank.
    pub fn new(username: String, password_hash: String, name: Option<String>) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| username.clone());

        Self {
            id: None,
            user_id: uuid::Uuid::new_v4().to_string(),
            username,
            password_hash,
            name,
            created_utc: Utc::now(),
        }
    }
}
