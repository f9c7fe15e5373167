//! JWT authentication and role checks.
//!
//! Tokens are HS256 and carry the user's servant roles as claim strings such
//! as `leaderBacenta` or `adminCouncil`.

use std::time::{SystemTime, UNIX_EPOCH};

use async_graphql::Context;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use fl_core::permissions::is_auth;
use fl_core::{FlError, Role};

use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};

pub const ROLES_CLAIM: &str = "https://flcadmin.netlify.app/roles";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity provider account id.
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "https://flcadmin.netlify.app/roles", alias = "roles", default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub iat: u64,
    pub exp: u64,
}

/// The caller of a request, attached to the GraphQL request data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub auth_id: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    fn from_claims(claims: Claims) -> Self {
        let roles = claims
            .roles
            .iter()
            .filter_map(|raw| match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    tracing::warn!(role = %raw, sub = %claims.sub, "Ignoring unknown role claim");
                    None
                }
            })
            .collect();
        Self {
            auth_id: claims.sub,
            email: claims.email,
            roles,
        }
    }

    pub fn has_any(&self, permitted: &[Role]) -> bool {
        is_auth(permitted, &self.roles)
    }
}

#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    issuer: Option<String>,
    ttl_secs: u64,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Result<Self, FlError> {
        if config.jwt_secret.len() < 32 {
            return Err(FlError::Config(
                "auth.jwt_secret must be at least 32 characters".into(),
            ));
        }
        Ok(Self {
            secret: config.jwt_secret.clone(),
            issuer: config.issuer.clone(),
            ttl_secs: config.token_ttl_secs,
        })
    }

    /// Decode and validate a bearer token.
    pub fn verify(&self, token: &str) -> ApiResult<AuthUser> {
        let mut validation = Validation::default();
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => Ok(AuthUser::from_claims(data.claims)),
            Err(err) => {
                let msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Your session has expired, please log in again",
                    ErrorKind::InvalidSignature => "Invalid token signature",
                    ErrorKind::InvalidIssuer => "Token was issued by an unknown issuer",
                    _ => "Invalid token",
                };
                Err(ApiError::InvalidToken(msg.into()))
            }
        }
    }

    /// Mint a token for local development and scripted access.
    pub fn issue(&self, sub: &str, email: &str, roles: &[Role]) -> ApiResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::Internal(format!("System time error: {e}")))?
            .as_secs();

        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
    }
}

/// Why a presented token was rejected. Attached to the request instead of
/// an [`AuthUser`] so resolvers can report it.
#[derive(Debug, Clone)]
pub struct AuthFailure(pub String);

/// Strip the `Bearer ` prefix from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// The logged-in caller.
pub fn current_user<'a>(ctx: &'a Context<'_>) -> ApiResult<&'a AuthUser> {
    match ctx.data_opt::<AuthUser>() {
        Some(user) => Ok(user),
        None => match ctx.data_opt::<AuthFailure>() {
            Some(AuthFailure(msg)) => Err(ApiError::InvalidToken(msg.clone())),
            None => Err(ApiError::Unauthenticated),
        },
    }
}

/// The logged-in caller, provided they hold one of `permitted`.
pub fn require_roles<'a>(ctx: &'a Context<'_>, permitted: &[Role]) -> ApiResult<&'a AuthUser> {
    let user = current_user(ctx)?;
    if user.has_any(permitted) {
        Ok(user)
    } else {
        tracing::warn!(auth_id = %user.auth_id, "Permission denied");
        Err(ApiError::Forbidden)
    }
}
