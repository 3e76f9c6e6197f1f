// Favorite Ledger - join rows linking a User to one Character or Planet
//
// The target is a tagged variant, so a favorite can never reference both
// kinds or neither. Functions here are raw storage: no invariant checks,
// that is FavoriteService's job.

use super::character::{self, Character};
use super::planet::{self, Planet};
use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TARGET KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Character,
    Planet,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Character => "character",
            TargetKind::Planet => "planet",
        }
    }

    /// Ledger column holding ids of this kind
    fn column(&self) -> &'static str {
        match self {
            TargetKind::Character => "character_id",
            TargetKind::Planet => "planet_id",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = StoreError;

    /// Accepts "people" as well, the route name used by HTTP clients
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "character" | "characters" | "people" => Ok(TargetKind::Character),
            "planet" | "planets" => Ok(TargetKind::Planet),
            other => Err(StoreError::validation(format!(
                "unknown favorite kind: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// FAVORITE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FavoriteTarget {
    Character(i64),
    Planet(i64),
}

impl FavoriteTarget {
    pub fn new(kind: TargetKind, id: i64) -> Self {
        match kind {
            TargetKind::Character => FavoriteTarget::Character(id),
            TargetKind::Planet => FavoriteTarget::Planet(id),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            FavoriteTarget::Character(_) => TargetKind::Character,
            FavoriteTarget::Planet(_) => TargetKind::Planet,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            FavoriteTarget::Character(id) | FavoriteTarget::Planet(id) => *id,
        }
    }

    fn columns(&self) -> (Option<i64>, Option<i64>) {
        match self {
            FavoriteTarget::Character(id) => (Some(*id), None),
            FavoriteTarget::Planet(id) => (None, Some(*id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub target: FavoriteTarget,
    pub created_at: DateTime<Utc>,
}

/// Target entity embedded in place of its id
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTarget {
    Character(Character),
    Planet(Planet),
}

/// A favorite with its target loaded, ready for serialization
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFavorite {
    pub id: i64,
    pub user_id: i64,
    pub target: ResolvedTarget,
    pub created_at: DateTime<Utc>,
}

impl ResolvedFavorite {
    pub fn target_ref(&self) -> FavoriteTarget {
        match &self.target {
            ResolvedTarget::Character(c) => FavoriteTarget::Character(c.id),
            ResolvedTarget::Planet(p) => FavoriteTarget::Planet(p.id),
        }
    }
}

// ============================================================================
// ROW DECODING
// ============================================================================

const COLUMNS: &str = "id, user_id, character_id, planet_id, created_at";

fn parse_created_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Favorite> {
    let character_id: Option<i64> = row.get(2)?;
    let planet_id: Option<i64> = row.get(3)?;

    let target = match (character_id, planet_id) {
        (Some(id), None) => FavoriteTarget::Character(id),
        (None, Some(id)) => FavoriteTarget::Planet(id),
        _ => {
            return Err(rusqlite::Error::InvalidColumnType(
                2,
                "character_id".to_string(),
                Type::Null,
            ))
        }
    };

    Ok(Favorite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        target,
        created_at: parse_created_at(row, 4)?,
    })
}

// ============================================================================
// LEDGER OPERATIONS
// ============================================================================

pub fn find(conn: &Connection, user_id: i64, target: FavoriteTarget) -> Result<Option<Favorite>> {
    let sql = format!(
        "SELECT {} FROM favorites WHERE user_id = ?1 AND {} = ?2",
        COLUMNS,
        target.kind().column()
    );
    let favorite = conn
        .query_row(&sql, params![user_id, target.id()], from_row)
        .optional()?;
    Ok(favorite)
}

pub fn list_by_user(conn: &Connection, user_id: i64) -> Result<Vec<Favorite>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM favorites WHERE user_id = ?1 ORDER BY id",
        COLUMNS
    ))?;
    let favorites = stmt
        .query_map([user_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(favorites)
}

/// All favorites of a user with their targets embedded, in insertion order
pub fn list_resolved_by_user(conn: &Connection, user_id: i64) -> Result<Vec<ResolvedFavorite>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.user_id, f.created_at,
                c.id, c.name, c.height, c.mass, c.hair_color, c.skin_color,
                c.eye_color, c.birth_year, c.gender,
                p.id, p.name, p.climate, p.population, p.orbital_period,
                p.rotation_period, p.diameter
         FROM favorites f
         LEFT JOIN characters c ON c.id = f.character_id
         LEFT JOIN planets p ON p.id = f.planet_id
         WHERE f.user_id = ?1
         ORDER BY f.id",
    )?;

    let favorites = stmt
        .query_map([user_id], |row| {
            let character_id: Option<i64> = row.get(3)?;
            let target = if character_id.is_some() {
                ResolvedTarget::Character(character::from_row_at(row, 3)?)
            } else {
                ResolvedTarget::Planet(planet::from_row_at(row, 12)?)
            };

            Ok(ResolvedFavorite {
                id: row.get(0)?,
                user_id: row.get(1)?,
                target,
                created_at: parse_created_at(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(favorites)
}

pub fn count_by_target(conn: &Connection, target: FavoriteTarget) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM favorites WHERE {} = ?1",
        target.kind().column()
    );
    Ok(conn.query_row(&sql, [target.id()], |row| row.get(0))?)
}

#[cfg(test)]
pub(crate) fn count_all(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))?)
}

pub fn insert(conn: &Connection, user_id: i64, target: FavoriteTarget) -> Result<Favorite> {
    let created_at = Utc::now();
    let (character_id, planet_id) = target.columns();

    conn.execute(
        "INSERT INTO favorites (user_id, character_id, planet_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, character_id, planet_id, created_at.to_rfc3339()],
    )?;

    Ok(Favorite {
        id: conn.last_insert_rowid(),
        user_id,
        target,
        created_at,
    })
}

pub fn remove(conn: &Connection, favorite_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM favorites WHERE id = ?1", [favorite_id])?)
}

pub fn remove_by_user(conn: &Connection, user_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM favorites WHERE user_id = ?1", [user_id])?)
}
