//! User model
//!
//! Operator accounts allowed to submit intake forms.

use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::db::DbResult;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

impl User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            password_hash: row.get("password_hash")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert a user with an already hashed password
    pub fn create(conn: &Connection, username: &str, password_hash: &str) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, password_hash],
        )?;

        let id = conn.last_insert_rowid();
        let user = conn.query_row("SELECT * FROM users WHERE id = ?1", [id], Self::from_row)?;
        Ok(user)
    }

    pub fn get_by_username(conn: &Connection, username: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM users WHERE username = ?1")?;

        let result = stmt.query_row([username], Self::from_row);
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    #[test]
    fn test_create_and_lookup() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let created = User::create(&conn, "nurse", "$argon2id$stub").unwrap();
        let found = User::get_by_username(&conn, "nurse").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "$argon2id$stub");
        assert!(User::get_by_username(&conn, "doctor").unwrap().is_none());
    }

    #[test]
    fn test_username_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        User::create(&conn, "nurse", "a").unwrap();
        assert!(User::create(&conn, "nurse", "b").is_err());
    }
}
