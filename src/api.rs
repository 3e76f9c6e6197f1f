// Backend - the operations the HTTP layer (or CLI) calls into
//
// Each call acquires its own store session, so callers never hold
// connection state between requests.

use crate::db::{with_transaction, Store};
use crate::entities::character::{self, Character, NewCharacter};
use crate::entities::favorite::{FavoriteTarget, TargetKind};
use crate::entities::planet::{self, NewPlanet, Planet};
use crate::entities::user::{self, NewUser};
use crate::error::Result;
use crate::favorites::FavoriteService;
use crate::query::{
    serialize_character, serialize_favorite, serialize_planet, serialize_user, FavoriteView,
    UserView,
};
use tracing::{error, info};

/// User assumed when the caller supplies no identity (there is no auth)
pub const DEFAULT_USER_ID: i64 = 1;

fn user_or_default(user_id: Option<i64>) -> i64 {
    user_id.unwrap_or(DEFAULT_USER_ID)
}

/// Log storage failures at the boundary; other kinds are expected outcomes
fn logged<T>(op: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if let Some(cause) = e.cause() {
            error!(op, cause = %cause, "storage failure");
        }
    }
    result
}

#[derive(Clone)]
pub struct Backend {
    store: Store,
    favorites: FavoriteService,
}

impl Backend {
    pub fn new(store: Store) -> Self {
        let favorites = FavoriteService::new(store.clone());
        Backend { store, favorites }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ========================================================================
    // CATALOG READS
    // ========================================================================

    pub fn list_characters(&self) -> Result<Vec<Character>> {
        let session = self.store.session()?;
        let characters = logged("list_characters", character::list_characters(&session))?;
        Ok(characters.iter().map(serialize_character).collect())
    }

    pub fn list_planets(&self) -> Result<Vec<Planet>> {
        let session = self.store.session()?;
        let planets = logged("list_planets", planet::list_planets(&session))?;
        Ok(planets.iter().map(serialize_planet).collect())
    }

    pub fn list_users(&self) -> Result<Vec<UserView>> {
        let session = self.store.session()?;
        let users = logged("list_users", user::list_users(&session))?;
        Ok(users.iter().map(serialize_user).collect())
    }

    pub fn get_character(&self, id: i64) -> Result<Character> {
        let session = self.store.session()?;
        character::get_character(&session, id).map(|c| serialize_character(&c))
    }

    pub fn get_planet(&self, id: i64) -> Result<Planet> {
        let session = self.store.session()?;
        planet::get_planet(&session, id).map(|p| serialize_planet(&p))
    }

    // ========================================================================
    // FAVORITES
    // ========================================================================

    pub fn list_user_favorites(&self, user_id: Option<i64>) -> Result<Vec<FavoriteView>> {
        let favorites = logged(
            "list_user_favorites",
            self.favorites.list_favorites(user_or_default(user_id)),
        )?;
        Ok(favorites.iter().map(serialize_favorite).collect())
    }

    pub fn add_favorite(
        &self,
        kind: TargetKind,
        target_id: i64,
        user_id: Option<i64>,
    ) -> Result<FavoriteView> {
        let target = FavoriteTarget::new(kind, target_id);
        let favorite = logged(
            "add_favorite",
            self.favorites.add_favorite(user_or_default(user_id), target),
        )?;
        Ok(serialize_favorite(&favorite))
    }

    pub fn remove_favorite(&self, kind: TargetKind, target_id: i64, user_id: Option<i64>) -> Result<()> {
        let target = FavoriteTarget::new(kind, target_id);
        logged(
            "remove_favorite",
            self.favorites.remove_favorite(user_or_default(user_id), target),
        )
    }

    // ========================================================================
    // CREATION / DELETION
    // ========================================================================

    pub fn create_user(&self, new: &NewUser) -> Result<UserView> {
        let mut session = self.store.session()?;
        let created = logged(
            "create_user",
            with_transaction(&mut session, |tx| user::create_user(tx, new)),
        )?;
        info!(user_id = created.id, "user created");
        Ok(serialize_user(&created))
    }

    pub fn create_character(&self, new: &NewCharacter) -> Result<Character> {
        let mut session = self.store.session()?;
        let created = logged(
            "create_character",
            with_transaction(&mut session, |tx| character::create_character(tx, new)),
        )?;
        info!(character_id = created.id, name = %created.name, "character created");
        Ok(serialize_character(&created))
    }

    pub fn create_planet(&self, new: &NewPlanet) -> Result<Planet> {
        let mut session = self.store.session()?;
        let created = logged(
            "create_planet",
            with_transaction(&mut session, |tx| planet::create_planet(tx, new)),
        )?;
        info!(planet_id = created.id, name = %created.name, "planet created");
        Ok(serialize_planet(&created))
    }

    /// Create every character or none
    pub fn import_characters(&self, rows: &[NewCharacter]) -> Result<usize> {
        let mut session = self.store.session()?;
        let imported = logged(
            "import_characters",
            with_transaction(&mut session, |tx| {
                for row in rows {
                    character::create_character(tx, row)?;
                }
                Ok(rows.len())
            }),
        )?;
        info!(imported, "characters imported");
        Ok(imported)
    }

    /// Create every planet or none
    pub fn import_planets(&self, rows: &[NewPlanet]) -> Result<usize> {
        let mut session = self.store.session()?;
        let imported = logged(
            "import_planets",
            with_transaction(&mut session, |tx| {
                for row in rows {
                    planet::create_planet(tx, row)?;
                }
                Ok(rows.len())
            }),
        )?;
        info!(imported, "planets imported");
        Ok(imported)
    }

    pub fn delete_user(&self, user_id: i64) -> Result<usize> {
        logged("delete_user", self.favorites.delete_user(user_id))
    }

    pub fn delete_character(&self, id: i64) -> Result<()> {
        logged("delete_character", self.favorites.delete_character(id))
    }

    pub fn delete_planet(&self, id: i64) -> Result<()> {
        logged("delete_planet", self.favorites.delete_planet(id))
    }
}
