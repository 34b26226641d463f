//! Bearer tokens signed with a BLAKE3 keyed hash
//!
//! Token layout: `role.subject.expires.mac`, where `expires` is a Unix
//! timestamp in seconds and `mac` is the hex keyed hash of
//! `role.subject.expires`. The subject may itself contain dots.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

const KEY_CONTEXT: &str = "marina token signing";

/// Who the bearer is allowed to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// May change catways as well as reservations
    Admin,
    /// May change reservations
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, AuthError> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(AuthError::Malformed),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified token contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub role: Role,
    pub subject: String,
    pub expires: i64,
}

/// Authentication failure; every variant is reported as 401
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Malformed,
    BadSignature,
    Expired,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Missing => write!(f, "missing bearer token"),
            AuthError::Malformed => write!(f, "malformed token"),
            AuthError::BadSignature => write!(f, "invalid token signature"),
            AuthError::Expired => write!(f, "token expired"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Issues and verifies tokens with a key derived from the configured secret
#[derive(Clone)]
pub struct TokenSigner {
    key: [u8; 32],
    ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token valid from now for the configured lifetime
    pub fn issue(&self, role: Role, subject: &str) -> String {
        self.issue_at(role, subject, Utc::now())
    }

    pub fn issue_at(&self, role: Role, subject: &str, now: DateTime<Utc>) -> String {
        let expires = now.timestamp().saturating_add(self.ttl_secs);
        let payload = format!("{}.{}.{}", role, subject, expires);
        let mac = blake3::keyed_hash(&self.key, payload.as_bytes());
        format!("{}.{}", payload, mac.to_hex())
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let (payload, mac) = token.rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (head, expires) = payload.rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (role, subject) = head.split_once('.').ok_or(AuthError::Malformed)?;

        let mac = blake3::Hash::from_hex(mac).map_err(|_| AuthError::Malformed)?;
        // blake3::Hash equality is constant time
        if blake3::keyed_hash(&self.key, payload.as_bytes()) != mac {
            return Err(AuthError::BadSignature);
        }

        let role: Role = role.parse()?;
        let expires: i64 = expires.parse().map_err(|_| AuthError::Malformed)?;
        if subject.is_empty() {
            return Err(AuthError::Malformed);
        }
        if now.timestamp() >= expires {
            return Err(AuthError::Expired);
        }

        Ok(Claims {
            role,
            subject: subject.to_string(),
            expires,
        })
    }

    /// Verify the value of an `Authorization` header
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let header = header.ok_or(AuthError::Missing)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Missing)?;
        self.verify(token)
    }
}
