// Planet Entity - catalog record, referenced (never owned) by favorites

use super::{attr_or_unknown, required};
use crate::error::{Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: i64,
    pub name: String,
    pub climate: String,
    pub population: String,
    pub orbital_period: String,
    pub rotation_period: String,
    pub diameter: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPlanet {
    pub name: Option<String>,
    pub climate: Option<String>,
    pub population: Option<String>,
    pub orbital_period: Option<String>,
    pub rotation_period: Option<String>,
    pub diameter: Option<String>,
}

impl NewPlanet {
    pub fn named(name: &str) -> Self {
        NewPlanet {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

const COLUMNS: &str = "id, name, climate, population, orbital_period, rotation_period, diameter";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Planet> {
    from_row_at(row, 0)
}

pub(crate) fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Planet> {
    Ok(Planet {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        climate: row.get(offset + 2)?,
        population: row.get(offset + 3)?,
        orbital_period: row.get(offset + 4)?,
        rotation_period: row.get(offset + 5)?,
        diameter: row.get(offset + 6)?,
    })
}

pub fn create_planet(conn: &Connection, new: &NewPlanet) -> Result<Planet> {
    let name = required(&new.name, "name")?;

    let planet = Planet {
        id: 0,
        name: name.to_string(),
        climate: attr_or_unknown(&new.climate),
        population: attr_or_unknown(&new.population),
        orbital_period: attr_or_unknown(&new.orbital_period),
        rotation_period: attr_or_unknown(&new.rotation_period),
        diameter: attr_or_unknown(&new.diameter),
    };

    conn.execute(
        "INSERT INTO planets (
            name, climate, population, orbital_period, rotation_period, diameter
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            planet.name,
            planet.climate,
            planet.population,
            planet.orbital_period,
            planet.rotation_period,
            planet.diameter,
        ],
    )?;

    Ok(Planet {
        id: conn.last_insert_rowid(),
        ..planet
    })
}

pub fn get_planet(conn: &Connection, id: i64) -> Result<Planet> {
    conn.query_row(
        &format!("SELECT {} FROM planets WHERE id = ?1", COLUMNS),
        [id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound { entity: "planet", id })
}

pub fn list_planets(conn: &Connection) -> Result<Vec<Planet>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM planets ORDER BY id", COLUMNS))?;
    let planets = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(planets)
}

pub fn delete_planet(conn: &Connection, id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM planets WHERE id = ?1", [id])?)
}
