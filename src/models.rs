use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Slot {
    pub id: String,
    pub starts_at: DateTime<Utc>,
    pub description: String,
    pub active: bool,
    pub display_order: Option<i64>,
    pub contact_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub starts_at: DateTime<Utc>,
    pub description: String,
    pub active: bool,
    pub contact_number: Option<String>,
}

/// Partial update of a slot. `contact_number: Some(None)` clears the override.
#[derive(Debug, Clone, Default)]
pub struct SlotChanges {
    pub starts_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub active: Option<bool>,
    pub display_order: Option<i64>,
    pub contact_number: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Configuration {
    pub id: String,
    pub contact_number: String,
    pub tournament_name: String,
    pub daily_mode: bool,
    pub payment_key: Option<String>,
    pub visit_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigurationChanges {
    pub contact_number: String,
    pub tournament_name: String,
    #[serde(default)]
    pub daily_mode: bool,
    #[serde(default)]
    pub payment_key: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Admin {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub admin_id: i64,
    pub expires_at: DateTime<Utc>,
}
