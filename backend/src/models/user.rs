//! Models that represent user accounts, authentication payloads, and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of an account.
pub struct User {
    /// Unique identifier for the user.
    pub id: String,
    /// Human-readable full name.
    pub name: String,
    /// Email address used for login; unique.
    pub email: String,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    /// Role describing the user's privileges.
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported account roles stored in the database.
pub enum UserRole {
    /// Standard account; may submit applications and see its own.
    #[default]
    User,
    /// Principal reviewer; may decide on any application.
    Principal,
    /// Administrator; same review powers as a principal.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Principal => "principal",
            UserRole::Admin => "admin",
        }
    }

    /// The single authorization predicate gating review operations:
    /// deciding on applications and reading the aggregate stats.
    pub fn is_reviewer(&self) -> bool {
        matches!(self, UserRole::Principal | UserRole::Admin)
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            // primary canonical values (snake_case)
            "user" => Ok(UserRole::User),
            "principal" => Ok(UserRole::Principal),
            "admin" => Ok(UserRole::Admin),
            // tolerate common legacy casings
            "User" | "USER" => Ok(UserRole::User),
            "Principal" | "PRINCIPAL" => Ok(UserRole::Principal),
            "Admin" | "ADMIN" => Ok(UserRole::Admin),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["user", "principal", "admin"],
            )),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
/// Payload for creating a new account.
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize, Deserialize)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Authentication token returned after a successful login or registration.
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
/// Public-facing representation of a user returned by the API.
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.as_str().to_string(),
        }
    }
}

impl User {
    /// Constructs a new user with a freshly generated identifier.
    pub fn new(name: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_reviewer(&self) -> bool {
        self.role.is_reviewer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn user_role_serde_accepts_and_emits_snake_case() {
        let u: UserRole = serde_json::from_str("\"user\"").unwrap();
        let p: UserRole = serde_json::from_str("\"principal\"").unwrap();
        let a: UserRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(u, UserRole::User);
        assert_eq!(p, UserRole::Principal);
        assert_eq!(a, UserRole::Admin);

        // Tolerate legacy casings
        let p2: UserRole = serde_json::from_str("\"Principal\"").unwrap();
        let a2: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(p2, UserRole::Principal);
        assert_eq!(a2, UserRole::Admin);

        let sp = serde_json::to_value(UserRole::Principal).unwrap();
        assert_eq!(sp, Value::String("principal".into()));
    }

    #[test]
    fn reviewer_predicate_covers_principal_and_admin_only() {
        assert!(!UserRole::User.is_reviewer());
        assert!(UserRole::Principal.is_reviewer());
        assert!(UserRole::Admin.is_reviewer());
    }

    #[test]
    fn user_response_hides_password_hash() {
        let user = User::new(
            "Alice Example".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
            UserRole::Admin,
        );
        let resp: UserResponse = user.into();
        assert_eq!(resp.role, "admin");
        assert_eq!(resp.email, "alice@example.com");
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn register_request_validates_email_and_password() {
        let bad = RegisterRequest {
            name: "Bob".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            role: None,
        };
        assert!(bad.validate().is_err());

        let good = RegisterRequest {
            name: "Bob".into(),
            email: "bob@example.com".into(),
            password: "long-enough-password".into(),
            role: Some(UserRole::User),
        };
        assert!(good.validate().is_ok());
    }
}
