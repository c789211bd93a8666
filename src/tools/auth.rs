//! Operator accounts and sessions
//!
//! Passwords are stored as Argon2 PHC strings. A successful login yields a
//! [`Session`] that the caller keeps and hands to report generation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::db::{Database, DbError};
use crate::models::User;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Proof of a login, owned by one connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub username: String,
    pub token: Uuid,
    pub started_at: DateTime<Utc>,
}

impl Session {
    fn start(username: &str) -> Self {
        Self {
            username: username.to_string(),
            token: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Ok(false) on a wrong password; Err only for an unreadable hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hash(e.to_string())),
    }
}

pub fn register_user(
    db: &Database,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<User, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if password != confirm_password {
        return Err(AuthError::PasswordMismatch);
    }

    let password_hash = hash_password(password)?;
    let user = db.with_conn(|conn| {
        if User::get_by_username(conn, username)?.is_some() {
            return Ok(None);
        }
        User::create(conn, username, &password_hash).map(Some)
    })?;

    let user = user.ok_or(AuthError::UsernameTaken)?;
    info!(username = %user.username, "user registered");
    Ok(user)
}

pub fn login(db: &Database, username: &str, password: &str) -> Result<Session, AuthError> {
    let username = username.trim();
    let user = db
        .with_conn(|conn| User::get_by_username(conn, username))?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }

    info!(username = %user.username, "login");
    Ok(Session::start(&user.username))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("mhm.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(verify_password("s3cret", "not a hash").is_err());
    }

    #[test]
    fn test_register_then_login() {
        let (_dir, db) = test_db();
        register_user(&db, "nurse", "s3cret", "s3cret").unwrap();

        let session = login(&db, "nurse", "s3cret").unwrap();
        assert_eq!(session.username, "nurse");

        let other = login(&db, "nurse", "s3cret").unwrap();
        assert_ne!(session.token, other.token);
    }

    #[test]
    fn test_register_validation() {
        let (_dir, db) = test_db();
        assert!(matches!(register_user(&db, " ", "pw", "pw"), Err(AuthError::MissingCredentials)));
        assert!(matches!(register_user(&db, "nurse", "", ""), Err(AuthError::MissingCredentials)));
        assert!(matches!(register_user(&db, "nurse", "pw", "pw2"), Err(AuthError::PasswordMismatch)));

        register_user(&db, "nurse", "pw", "pw").unwrap();
        let err = register_user(&db, "nurse", "pw", "pw").unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");
    }

    #[test]
    fn test_login_failures_share_one_message() {
        let (_dir, db) = test_db();
        register_user(&db, "nurse", "pw", "pw").unwrap();

        let wrong_password = login(&db, "nurse", "nope").unwrap_err();
        let unknown_user = login(&db, "doctor", "pw").unwrap_err();
        assert_eq!(wrong_password.to_string(), "Invalid username or password");
        assert_eq!(unknown_user.to_string(), wrong_password.to_string());
    }
}
