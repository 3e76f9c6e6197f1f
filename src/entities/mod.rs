// Entity Models
//
// Users, Characters and Planets are independent records.
// Favorites link a User to exactly one Character or Planet.

pub mod user;
pub mod character;
pub mod planet;
pub mod favorite;

pub use user::{NewUser, User};
pub use character::{Character, NewCharacter};
pub use planet::{NewPlanet, Planet};
pub use favorite::{Favorite, FavoriteTarget, ResolvedFavorite, ResolvedTarget, TargetKind};

/// Placeholder for descriptive attributes not supplied at creation
pub const UNKNOWN: &str = "unknown";

/// Use the supplied attribute unless it is absent or blank
pub(crate) fn attr_or_unknown(value: &Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Required text field: present and not blank
pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> crate::error::Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(crate::error::StoreError::validation(format!(
            "{} is required",
            field
        ))),
    }
}
