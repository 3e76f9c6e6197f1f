// User Entity - account identity that owns favorites
//
// The secret is stored as given and never leaves the data layer;
// see query::serialize_user for the public projection.

use super::required;
use crate::error::{Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub is_active: bool,
}

/// Input for user creation; absent fields fail validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl NewUser {
    pub fn new(email: &str, password: &str) -> Self {
        NewUser {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            is_active: None,
        }
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        is_active: row.get(3)?,
    })
}

pub fn create_user(conn: &Connection, new: &NewUser) -> Result<User> {
    let email = required(&new.email, "email")?;
    let password = required(&new.password, "password")?;
    let is_active = new.is_active.unwrap_or(true);

    if find_by_email(conn, email)?.is_some() {
        return Err(StoreError::DuplicateKey {
            message: format!("email {} is already registered", email),
        });
    }

    let result = conn.execute(
        "INSERT INTO users (email, password, is_active) VALUES (?1, ?2, ?3)",
        params![email, password, is_active],
    );

    match result {
        Ok(_) => Ok(User {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            password: password.to_string(),
            is_active,
        }),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::DuplicateKey {
                message: format!("email {} is already registered", email),
            })
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User> {
    conn.query_row(
        "SELECT id, email, password, is_active FROM users WHERE id = ?1",
        [id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::UserNotFound(id))
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, password, is_active FROM users WHERE email = ?1",
            [email],
            from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt =
        conn.prepare("SELECT id, email, password, is_active FROM users ORDER BY id")?;
    let users = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

/// Raw removal of the user row; favorites are the service's concern
pub fn delete_user(conn: &Connection, id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_create_user_defaults_active() {
        let conn = conn();
        let user = create_user(&conn, &NewUser::new("leia@alderaan.org", "secret")).unwrap();

        assert_eq!(user.id, 1);
        assert!(user.is_active);
        assert_eq!(get_user(&conn, 1).unwrap(), user);
    }

    #[test]
    fn test_create_user_requires_email_and_password() {
        let conn = conn();

        let no_email = NewUser {
            password: Some("pw".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            create_user(&conn, &no_email),
            Err(StoreError::Validation { .. })
        ));

        let blank_password = NewUser::new("han@falcon.com", "  ");
        assert!(matches!(
            create_user(&conn, &blank_password),
            Err(StoreError::Validation { .. })
        ));

        assert!(list_users(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_email() {
        let conn = conn();
        create_user(&conn, &NewUser::new("han@falcon.com", "pw")).unwrap();

        let err = create_user(&conn, &NewUser::new("han@falcon.com", "other")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(list_users(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_inactive_user() {
        let conn = conn();
        let new = NewUser {
            is_active: Some(false),
            ..NewUser::new("vader@empire.gov", "pw")
        };
        let user = create_user(&conn, &new).unwrap();
        assert!(!get_user(&conn, user.id).unwrap().is_active);
    }

    #[test]
    fn test_get_missing_user() {
        let conn = conn();
        assert!(matches!(get_user(&conn, 99), Err(StoreError::UserNotFound(99))));
    }
}
