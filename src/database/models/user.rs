use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display name with the fallback used across all views.
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("User")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_label_falls_back_when_name_absent() {
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            display_name: None,
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(user.display_label(), "User");
    }
}
