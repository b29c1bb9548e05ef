// src/models/user.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use validator::Validate;

/// Reserved for the "my profile" endpoint; never a valid account name.
pub const RESERVED_SELF: &str = "me";

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

pub fn is_reserved_username(username: &str) -> bool {
    username == RESERVED_SELF
}

/// Closed role enumeration, stored as the Postgres `user_role` enum.
///
/// Declaration order gives the total order `User < Moderator < Admin`, so
/// role comparisons never fall back to string matching.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        self == UserRole::Admin
    }

    /// Moderator capabilities are included in the admin role.
    pub fn is_moderator(self) -> bool {
        self >= UserRole::Moderator
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address.
    pub email: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,

    pub role: UserRole,

    /// Bootstrap flag carrying full admin capabilities regardless of role.
    pub is_superuser: bool,

    /// One-time code issued at signup and exchanged for an access token.
    /// Skipped during serialization to prevent leaking it.
    #[serde(skip)]
    pub confirmation_code: Option<String>,

    /// False while the account is pending its first token exchange.
    pub confirmed: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for signup (code issuance).
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        length(
            min = 3,
            max = 150,
            message = "Username length must be between 3 and 150 characters."
        ),
        regex(
            path = *USERNAME_RE,
            message = "Username may only contain letters, digits and @/./+/-/_."
        )
    )]
    pub username: String,

    #[validate(
        email(message = "Not a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters.")
    )]
    pub email: String,
}

/// DTO for exchanging a confirmation code for an access token.
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub confirmation_code: String,
}

/// DTO for admin user creation (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(
            min = 3,
            max = 150,
            message = "Username length must be between 3 and 150 characters."
        ),
        regex(
            path = *USERNAME_RE,
            message = "Username may only contain letters, digits and @/./+/-/_."
        )
    )]
    pub username: String,

    #[validate(email(message = "Not a valid email address."), length(max = 254))]
    pub email: String,

    pub role: Option<UserRole>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// DTO for updating a user. Fields are optional.
///
/// Used both by the admin endpoint and by `/users/me`; for self-service the
/// restricted fields are stripped first (see [`UpdateUserRequest::self_service`]).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 3, max = 150),
        regex(
            path = *USERNAME_RE,
            message = "Username may only contain letters, digits and @/./+/-/_."
        )
    )]
    pub username: Option<String>,

    #[validate(email(message = "Not a valid email address."), length(max = 254))]
    pub email: Option<String>,

    pub role: Option<UserRole>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl UpdateUserRequest {
    /// Restricts the patch to the fields a user may edit on their own
    /// profile. Role, username and email are silently dropped, not rejected.
    pub fn self_service(self) -> Self {
        Self {
            username: None,
            email: None,
            role: None,
            ..self
        }
    }
}

/// Write model for inserting a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: UserRole,
    pub is_superuser: bool,
    pub confirmation_code: String,
}

/// Field-wise patch applied by the user repository.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            role: req.role,
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
        }
    }
}

/// Query parameters for listing users.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    /// Search keyword for username match.
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_totally_ordered() {
        assert!(UserRole::User < UserRole::Moderator);
        assert!(UserRole::Moderator < UserRole::Admin);
    }

    #[test]
    fn moderator_capability_includes_admin() {
        assert!(UserRole::Admin.is_moderator());
        assert!(UserRole::Moderator.is_moderator());
        assert!(!UserRole::User.is_moderator());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Moderator.is_admin());
    }

    #[test]
    fn me_is_reserved() {
        assert!(is_reserved_username("me"));
        assert!(!is_reserved_username("Me2"));
    }

    #[test]
    fn self_service_drops_restricted_fields() {
        let req = UpdateUserRequest {
            username: Some("other".into()),
            email: Some("other@example.com".into()),
            role: Some(UserRole::Admin),
            first_name: Some("A".into()),
            last_name: None,
            bio: Some("hi".into()),
        };
        let scrubbed = req.self_service();
        assert!(scrubbed.username.is_none());
        assert!(scrubbed.email.is_none());
        assert!(scrubbed.role.is_none());
        assert_eq!(scrubbed.first_name.as_deref(), Some("A"));
        assert_eq!(scrubbed.bio.as_deref(), Some("hi"));
    }
}
