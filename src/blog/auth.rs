//! Session cookies and password storage.
//!
//! Cookie value: `<uid>-<expires>-<sha1(uid-password_hash-expires-secret)>`.
//! Changing a password invalidates every cookie issued before.

use super::models::User;
use crate::orm::Database;
use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Utc;
use md5::Md5;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

pub const COOKIE_NAME: &str = "awesession";

/// Settings used to issue and check session cookies.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    pub secret: String,
    pub max_age: i64,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, max_age: i64) -> Self {
        Self {
            secret: secret.into(),
            max_age,
        }
    }
}

fn session_digest(uid: &str, password_hash: &str, expires: i64, secret: &str) -> String {
    let raw = format!("{uid}-{password_hash}-{expires}-{secret}");
    format!("{:x}", Sha1::digest(raw.as_bytes()))
}

/// Cookie value for `user`, valid for `keys.max_age` seconds from now.
pub fn user2cookie(user: &User, keys: &SessionKeys) -> String {
    let uid = user.id.as_deref().unwrap_or_default();
    let expires = Utc::now().timestamp() + keys.max_age;
    let digest = session_digest(uid, &user.password_hash, expires, &keys.secret);
    format!("{uid}-{expires}-{digest}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionToken<'a> {
    uid: &'a str,
    expires: i64,
    digest: &'a str,
}

fn parse_token(value: &str) -> Option<SessionToken<'_>> {
    let mut parts = value.split('-');
    let (uid, expires, digest) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || uid.is_empty() {
        return None;
    }
    Some(SessionToken {
        uid,
        expires: expires.parse().ok()?,
        digest,
    })
}

/// Load the user a session cookie belongs to.
///
/// Any problem (malformed or expired cookie, unknown user, digest mismatch,
/// database failure) yields `None`: the request is simply anonymous.
pub async fn cookie2user(db: &Database, cookie: &str, keys: &SessionKeys) -> Option<User> {
    let token = parse_token(cookie)?;
    if token.expires < Utc::now().timestamp() {
        debug!(uid = token.uid, "session cookie expired");
        return None;
    }

    let user = match db.find::<User>(token.uid).await {
        Ok(Some(user)) => user,
        Ok(None) => return None,
        Err(err) => {
            warn!(error = %err, "failed to load session user");
            return None;
        }
    };

    let expected = session_digest(token.uid, &user.password_hash, token.expires, &keys.secret);
    if expected != token.digest {
        info!("invalid sha1");
        return None;
    }
    Some(user.masked())
}

/// Value of the session cookie in a request's `Cookie` headers.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value)
}

/// `Set-Cookie` header for a session value.
pub fn set_cookie_header(value: &str, max_age: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{COOKIE_NAME}={value}; Max-Age={max_age}; Path=/; HttpOnly"
    ))
    .ok()
}

/// sha1 of `<uid>:<client sha1>`, short enough to stay clear of bcrypt's
/// 72-byte input limit.
fn password_digest(uid: &str, passwd: &str) -> String {
    format!("{:x}", Sha1::digest(format!("{uid}:{passwd}").as_bytes()))
}

/// Stored form of a password: bcrypt over the uid-salted sha1 digest.
pub fn hash_password(uid: &str, passwd: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password_digest(uid, passwd), cost)
}

pub fn verify_password(uid: &str, passwd: &str, password_hash: &str) -> bool {
    bcrypt::verify(password_digest(uid, passwd), password_hash).unwrap_or(false)
}

pub fn gravatar_url(email: &str) -> String {
    format!(
        "http://www.gravatar.com/avatar/{:x}?d=mm&s=120",
        Md5::digest(email.as_bytes())
    )
}
