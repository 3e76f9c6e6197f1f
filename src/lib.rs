// Holocron - Core Library
// Catalog entities, per-user favorites, and the rules that keep them consistent.
// Used by the CLI, the API server, and tests.

pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod favorites;
pub mod logging;
pub mod query;
pub mod seed;

// Re-export commonly used types
pub use api::{Backend, DEFAULT_USER_ID};
pub use config::Config;
pub use db::{setup_database, with_transaction, Session, Store};
pub use entities::{
    Character, Favorite, FavoriteTarget, NewCharacter, NewPlanet, NewUser, Planet,
    ResolvedFavorite, ResolvedTarget, TargetKind, User, UNKNOWN,
};
pub use error::{ErrorKind, Result, StoreError};
pub use favorites::FavoriteService;
pub use query::{FavoriteView, UserView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
