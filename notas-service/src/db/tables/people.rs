//! People (agents) database operations

use rusqlite::{params, OptionalExtension, Row};

use super::super::Database;
use crate::auth;
use crate::error::{is_unique_violation, NotasError, NotasResult};
use crate::models::{Person, Role};

impl Database {
    /// Register a person. The password is stored as a salted digest.
    pub fn create_person(&self, ra: &str, nome: &str, password: &str) -> NotasResult<Person> {
        let ra = ra.trim();
        let nome = nome.trim();
        if ra.is_empty() {
            return Err(NotasError::InvalidInput("RA must not be empty".to_string()));
        }
        if nome.is_empty() {
            return Err(NotasError::InvalidInput("name must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(NotasError::InvalidInput("password must not be empty".to_string()));
        }

        let person = Person {
            ra: ra.to_string(),
            nome: nome.to_string(),
            password_hash: auth::hash_password(password),
            role: Role::Agent,
        };

        let conn = self.conn();
        conn.execute(
            "INSERT INTO people (ra, nome, senha, role) VALUES (?1, ?2, ?3, ?4)",
            params![person.ra, person.nome, person.password_hash, person.role.as_str()],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                NotasError::DuplicatePerson(person.ra.clone())
            } else {
                NotasError::Database(e)
            }
        })?;

        log::info!("[DB] Registered person {}", person.ra);
        Ok(person)
    }

    /// Look up a person by RA or display name. An RA match wins over a name match.
    pub fn find_person(&self, identifier: &str) -> NotasResult<Option<Person>> {
        let conn = self.conn();
        let person = conn
            .query_row(
                "SELECT ra, nome, senha, role FROM people
                 WHERE ra = ?1 OR nome = ?1
                 ORDER BY (ra = ?1) DESC, ra
                 LIMIT 1",
                [identifier.trim()],
                Self::row_to_person,
            )
            .optional()?;
        Ok(person)
    }

    /// Look up a person by RA only
    pub fn get_person(&self, ra: &str) -> NotasResult<Option<Person>> {
        let conn = self.conn();
        let person = conn
            .query_row(
                "SELECT ra, nome, senha, role FROM people WHERE ra = ?1",
                [ra],
                Self::row_to_person,
            )
            .optional()?;
        Ok(person)
    }

    /// Change a person's role. Returns false when the RA is unknown.
    pub fn set_role(&self, ra: &str, role: Role) -> NotasResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE people SET role = ?1 WHERE ra = ?2",
            params![role.as_str(), ra],
        )?;
        Ok(rows > 0)
    }

    fn row_to_person(row: &Row) -> rusqlite::Result<Person> {
        let role: String = row.get(3)?;
        Ok(Person {
            ra: row.get(0)?,
            nome: row.get(1)?,
            password_hash: row.get(2)?,
            role: role.parse().unwrap_or_default(),
        })
    }
}
