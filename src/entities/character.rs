// Character Entity - catalog record, referenced (never owned) by favorites

use super::{attr_or_unknown, required};
use crate::error::{Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub height: String,
    pub mass: String,
    pub hair_color: String,
    pub skin_color: String,
    pub eye_color: String,
    pub birth_year: String,
    pub gender: String,
}

/// Creation input; every descriptive attribute is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCharacter {
    pub name: Option<String>,
    pub height: Option<String>,
    pub mass: Option<String>,
    pub hair_color: Option<String>,
    pub skin_color: Option<String>,
    pub eye_color: Option<String>,
    pub birth_year: Option<String>,
    pub gender: Option<String>,
}

impl NewCharacter {
    pub fn named(name: &str) -> Self {
        NewCharacter {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

const COLUMNS: &str =
    "id, name, height, mass, hair_color, skin_color, eye_color, birth_year, gender";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Character> {
    from_row_at(row, 0)
}

/// Read a character whose columns start at `offset` (used by ledger joins)
pub(crate) fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Character> {
    Ok(Character {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        height: row.get(offset + 2)?,
        mass: row.get(offset + 3)?,
        hair_color: row.get(offset + 4)?,
        skin_color: row.get(offset + 5)?,
        eye_color: row.get(offset + 6)?,
        birth_year: row.get(offset + 7)?,
        gender: row.get(offset + 8)?,
    })
}

pub fn create_character(conn: &Connection, new: &NewCharacter) -> Result<Character> {
    let name = required(&new.name, "name")?;

    let character = Character {
        id: 0,
        name: name.to_string(),
        height: attr_or_unknown(&new.height),
        mass: attr_or_unknown(&new.mass),
        hair_color: attr_or_unknown(&new.hair_color),
        skin_color: attr_or_unknown(&new.skin_color),
        eye_color: attr_or_unknown(&new.eye_color),
        birth_year: attr_or_unknown(&new.birth_year),
        gender: attr_or_unknown(&new.gender),
    };

    conn.execute(
        "INSERT INTO characters (
            name, height, mass, hair_color, skin_color, eye_color, birth_year, gender
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            character.name,
            character.height,
            character.mass,
            character.hair_color,
            character.skin_color,
            character.eye_color,
            character.birth_year,
            character.gender,
        ],
    )?;

    Ok(Character {
        id: conn.last_insert_rowid(),
        ..character
    })
}

pub fn get_character(conn: &Connection, id: i64) -> Result<Character> {
    conn.query_row(
        &format!("SELECT {} FROM characters WHERE id = ?1", COLUMNS),
        [id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound {
        entity: "character",
        id,
    })
}

pub fn list_characters(conn: &Connection) -> Result<Vec<Character>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM characters ORDER BY id", COLUMNS))?;
    let characters = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(characters)
}

pub fn delete_character(conn: &Connection, id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM characters WHERE id = ?1", [id])?)
}
