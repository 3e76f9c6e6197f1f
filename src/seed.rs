// CSV seed loader for the catalog
// Header row names the columns; `name` is required, empty cells mean "unknown"

use crate::entities::{NewCharacter, NewPlanet};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        // +2: header row and 1-based numbering
        let row: T = result.with_context(|| format!("Failed to parse CSV row {}", line + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn load_characters_csv(csv_path: &Path) -> Result<Vec<NewCharacter>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_rows(file)
}

pub fn load_planets_csv(csv_path: &Path) -> Result<Vec<NewPlanet>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_rows(file)
}
