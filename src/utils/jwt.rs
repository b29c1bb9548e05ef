// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::UserRole, permissions::Actor};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// User's role.
    pub role: UserRole,
    /// Superuser flag, carried so permission checks need no user lookup.
    pub is_superuser: bool,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// Resolves the claims into a permission-engine actor.
    pub fn to_actor(&self) -> Result<Actor, AppError> {
        let id = self
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;
        Ok(Actor::User {
            id,
            role: self.role,
            is_superuser: self.is_superuser,
        })
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: i64,
    role: UserRole,
    is_superuser: bool,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(), // Store User ID in 'sub' claim
        role,
        is_superuser,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Actor resolution.
///
/// Establishes the request's [`Actor`] and injects it into the request
/// extensions. Requests without an 'Authorization: Bearer <token>' header
/// proceed as `Actor::Anonymous` (reads are public); a present but invalid
/// token is rejected with 401 outright.
pub async fn actor_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let actor = match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            let claims = verify_jwt(&header[7..], &config.jwt_secret)?;
            claims.to_actor()?
        }
        _ => Actor::Anonymous,
    };

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let token = sign_jwt(42, UserRole::Moderator, false, "secret", 600).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, UserRole::Moderator);
        assert!(!claims.is_superuser);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_jwt(42, UserRole::User, false, "secret", 600).unwrap();
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn claims_resolve_to_actor() {
        let claims = Claims {
            sub: "7".to_string(),
            role: UserRole::Admin,
            is_superuser: true,
            exp: 0,
        };
        let actor = claims.to_actor().unwrap();
        assert!(actor.is_admin_capable());
        assert_eq!(actor.id(), Some(7));
    }

    #[test]
    fn garbage_subject_is_rejected() {
        let claims = Claims {
            sub: "not-a-number".to_string(),
            role: UserRole::User,
            is_superuser: false,
            exp: 0,
        };
        assert!(claims.to_actor().is_err());
    }
}
