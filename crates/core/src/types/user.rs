//! User profile payload persisted next to the auth tokens.

use serde::{Deserialize, Serialize};

use crate::types::id::UserId;

/// The logged-in customer's profile as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Loyalty points balance at login time.
    #[serde(default)]
    pub loyalty_points: i64,
}

impl UserProfile {
    /// Name to greet the customer with, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}
