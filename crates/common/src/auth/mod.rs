//! Identity: token verification and role derivation
//!
//! Provides:
//! - JWT validation for tokens issued by the identity platform
//! - Role derivation from verified email domains
//! - The `AuthContext` extractor that turns a request into a `Principal`
//! - Access key generation for shared links

use crate::config::{AuthConfig, IdentityConfig};
use crate::errors::{AppError, Result};
use crate::policy::{Principal, Role, UserId};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Verified email address
    pub email: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiration_secs: expiration_secs as i64,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = config.jwt_secret.as_deref().ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret is not set".to_string(),
        })?;
        Ok(Self::new(secret, config.jwt_expiration_secs))
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user_id: UserId, email: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal {
                message: format!("Failed to generate token: {}", e)
            })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::ExpiredToken
                    }
                    _ => AppError::InvalidToken,
                }
            })
    }
}

/// Email-domain role derivation
pub struct IdentityPolicy {
    student: Regex,
    staff: Regex,
}

impl IdentityPolicy {
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern).map_err(|e| AppError::Configuration {
                message: format!("identity.{} is not a valid regex: {}", name, e),
            })
        };

        Ok(Self {
            student: compile("student_email_pattern", &config.student_email_pattern)?,
            staff: compile("staff_email_pattern", &config.staff_email_pattern)?,
        })
    }

    /// Student domain is checked first; no other address gets a role
    pub fn derive_role(&self, email: &str) -> Option<Role> {
        let email = email.trim().to_ascii_lowercase();
        if self.student.is_match(&email) {
            Some(Role::Student)
        } else if self.staff.is_match(&email) {
            Some(Role::Staff)
        } else {
            None
        }
    }

    /// Registration accepts only addresses that derive a role
    pub fn validate_registration_email(&self, email: &str) -> Result<Role> {
        self.derive_role(email).ok_or_else(|| AppError::InvalidEmailDomain {
            email: email.to_string(),
        })
    }

    /// Map verified claims to a principal, failing closed
    pub fn principal_for(&self, claims: &JwtClaims) -> Principal {
        match self.derive_role(&claims.email) {
            Some(role) => Principal::from_claims(&claims.sub, role.as_str()),
            None => {
                tracing::warn!(
                    subject = %claims.sub,
                    "Verified token carries an email outside accepted domains, treating as anonymous"
                );
                Principal::Anonymous
            }
        }
    }
}

/// Everything needed to turn a bearer token into a principal
pub struct SessionVerifier {
    pub jwt: JwtManager,
    pub identity: IdentityPolicy,
}

impl SessionVerifier {
    pub fn from_config(auth: &AuthConfig, identity: &IdentityConfig) -> Result<Self> {
        Ok(Self {
            jwt: JwtManager::from_config(auth)?,
            identity: IdentityPolicy::from_config(identity)?,
        })
    }

    /// No header is anonymous; a bad header is an error
    pub fn verify(&self, authorization: Option<&str>) -> Result<(Principal, Option<String>)> {
        let Some(header) = authorization else {
            return Ok((Principal::Anonymous, None));
        };

        let token = extract_bearer(header).ok_or_else(|| AppError::Unauthorized {
            message: "Authorization header must use the Bearer scheme".to_string(),
        })?;

        let claims = self.jwt.validate_token(token)?;
        let principal = self.identity.principal_for(&claims);
        Ok((principal, Some(claims.email)))
    }
}

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,

    /// Verified email, when a token was presented
    pub email: Option<String>,

    /// Request ID for tracing
    pub request_id: String,
}

impl AuthContext {
    /// Require a signed-in user, returning their id
    pub fn require_user(&self) -> Result<UserId> {
        self.principal.user_id().ok_or_else(|| AppError::Unauthorized {
            message: "Sign in required".to_string(),
        })
    }

    /// Require a staff principal
    pub fn require_staff(&self) -> Result<UserId> {
        let user_id = self.require_user()?;
        if self.principal.is_staff() {
            Ok(user_id)
        } else {
            Err(AppError::Forbidden {
                message: "Staff only".to_string(),
            })
        }
    }
}

/// Generate a random access key over `[A-Za-z0-9]`
pub fn generate_access_key(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Extract a bearer token from an Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<SessionVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let verifier = Arc::<SessionVerifier>::from_ref(state);

        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let authorization = parts
            .headers
            .get("authorization")
            .map(|v| v.to_str())
            .transpose()
            .map_err(|_| AppError::Unauthorized {
                message: "Authorization header is not valid ASCII".to_string(),
            })?;

        let (principal, email) = verifier.verify(authorization)?;

        tracing::debug!(
            request_id = %request_id,
            principal = principal.kind(),
            "Request principal resolved"
        );

        Ok(AuthContext {
            principal,
            email,
            request_id,
        })
    }
}
