// Query Façade - read-only projections for external consumption

use crate::entities::{Character, Planet, ResolvedFavorite, ResolvedTarget, User};
use serde::Serialize;

/// Public view of a user; the secret never leaves the data layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
}

/// Favorite with exactly one of `character` / `planet` set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteView {
    pub id: i64,
    pub user_id: i64,
    pub character: Option<Character>,
    pub planet: Option<Planet>,
}

pub fn serialize_user(user: &User) -> UserView {
    UserView {
        id: user.id,
        email: user.email.clone(),
    }
}

pub fn serialize_character(character: &Character) -> Character {
    character.clone()
}

pub fn serialize_planet(planet: &Planet) -> Planet {
    planet.clone()
}

pub fn serialize_favorite(favorite: &ResolvedFavorite) -> FavoriteView {
    let (character, planet) = match &favorite.target {
        ResolvedTarget::Character(c) => (Some(serialize_character(c)), None),
        ResolvedTarget::Planet(p) => (None, Some(serialize_planet(p))),
    };

    FavoriteView {
        id: favorite.id,
        user_id: favorite.user_id,
        character,
        planet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn tatooine() -> Planet {
        Planet {
            id: 1,
            name: "Tatooine".to_string(),
            climate: "arid".to_string(),
            population: "200000".to_string(),
            orbital_period: "304".to_string(),
            rotation_period: "23".to_string(),
            diameter: "10465".to_string(),
        }
    }

    #[test]
    fn test_user_view_hides_secret() {
        let user = User {
            id: 3,
            email: "lando@bespin.com".to_string(),
            password: "cloud-city".to_string(),
            is_active: true,
        };

        let value = serde_json::to_value(serialize_user(&user)).unwrap();
        assert_eq!(value, json!({"id": 3, "email": "lando@bespin.com"}));
    }

    #[test]
    fn test_planet_view_has_all_attributes() {
        let value = serde_json::to_value(serialize_planet(&tatooine())).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["climate"], "arid");
        assert_eq!(value["diameter"], "10465");
    }

    #[test]
    fn test_favorite_view_sets_exactly_one_target() {
        let favorite = ResolvedFavorite {
            id: 10,
            user_id: 1,
            target: ResolvedTarget::Planet(tatooine()),
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(serialize_favorite(&favorite)).unwrap();
        assert_eq!(value["id"], 10);
        assert_eq!(value["user_id"], 1);
        assert!(value["character"].is_null());
        assert_eq!(value["planet"]["name"], "Tatooine");
    }
}
