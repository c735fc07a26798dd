use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;
use crate::models::shop::{InventoryItem, Rank};

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.email.trim().is_empty() {
            errors.insert("email".into(), "Email is required".into());
        }
        if self.password.is_empty() {
            errors.insert("password".into(), "Password is required".into());
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Sign-up form. `password2` is the confirmation field the register endpoint
/// expects alongside `password`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        password2: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: password.into(),
            password2: password2.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.username.is_empty() {
            errors.insert("username".into(), "Username is required".into());
        }
        if self.email.is_empty() {
            errors.insert("email".into(), "Email is required".into());
        }
        if self.password.is_empty() {
            errors.insert("password".into(), "Password is required".into());
        }
        if self.password != self.password2 {
            errors.insert("password2".into(), "Passwords do not match".into());
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// The `user` object returned next to the tokens on sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gold: u32,
}

/// The player character: balance, rank and outfit.
#[derive(Debug, Clone, Deserialize)]
pub struct Character {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub rank: Option<Rank>,
    #[serde(default)]
    pub equipped_items: Vec<InventoryItem>,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub const MIN_LENGTH: usize = 6;

    pub fn validate(&self, confirmation: &str) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.current_password.is_empty() {
            errors.insert("current_password".into(), "Current password is required".into());
        }
        if self.new_password.chars().count() < Self::MIN_LENGTH {
            errors.insert(
                "new_password".into(),
                format!("Password must be at least {} characters", Self::MIN_LENGTH),
            );
        }
        if self.new_password != confirmation {
            errors.insert("confirm_password".into(), "Passwords do not match".into());
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeItemResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub character: Option<Character>,
}
