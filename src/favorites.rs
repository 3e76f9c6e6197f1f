// Favorite Service - the only place ledger mutation invariants are enforced
//
// Every mutating operation runs as one IMMEDIATE transaction: the existence
// checks, the uniqueness check and the write all happen under the same
// write lock. The partial unique indexes stay as the storage-level guard.

use crate::db::{with_read_transaction, with_transaction, Store};
use crate::entities::character::{delete_character, get_character};
use crate::entities::favorite::{
    self, FavoriteTarget, ResolvedFavorite, ResolvedTarget,
};
use crate::entities::planet::{delete_planet, get_planet};
use crate::entities::user::{self, get_user};
use crate::error::{Result, StoreError};
use rusqlite::Connection;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct FavoriteService {
    store: Store,
}

/// Load the target entity, reporting absence as TargetNotFound
fn resolve_target(conn: &Connection, target: FavoriteTarget) -> Result<ResolvedTarget> {
    let resolved = match target {
        FavoriteTarget::Character(id) => get_character(conn, id).map(ResolvedTarget::Character),
        FavoriteTarget::Planet(id) => get_planet(conn, id).map(ResolvedTarget::Planet),
    };

    resolved.map_err(|e| match e {
        StoreError::NotFound { .. } => StoreError::TargetNotFound {
            kind: target.kind(),
            id: target.id(),
        },
        other => other,
    })
}

fn already_favorited(user_id: i64, target: FavoriteTarget) -> StoreError {
    StoreError::AlreadyFavorited {
        user_id,
        kind: target.kind(),
        id: target.id(),
    }
}

impl FavoriteService {
    pub fn new(store: Store) -> Self {
        FavoriteService { store }
    }

    /// Mark `target` as a favorite of `user_id`.
    ///
    /// Fails with `UserNotFound`, `TargetNotFound` or `AlreadyFavorited`;
    /// none of them leaves a ledger row behind.
    pub fn add_favorite(&self, user_id: i64, target: FavoriteTarget) -> Result<ResolvedFavorite> {
        let mut session = self.store.session()?;

        let result = with_transaction(&mut session, |tx| {
            get_user(tx, user_id)?;
            let resolved = resolve_target(tx, target)?;

            if favorite::find(tx, user_id, target)?.is_some() {
                return Err(already_favorited(user_id, target));
            }

            // The unique index is authoritative if the check above was raced
            let created = favorite::insert(tx, user_id, target).map_err(|e| {
                if e.is_constraint_violation() {
                    already_favorited(user_id, target)
                } else {
                    e
                }
            })?;

            Ok(ResolvedFavorite {
                id: created.id,
                user_id,
                target: resolved,
                created_at: created.created_at,
            })
        });

        match &result {
            Ok(fav) => info!(
                favorite_id = fav.id,
                user_id,
                kind = %target.kind(),
                target_id = target.id(),
                "favorite added"
            ),
            Err(e) => debug!(user_id, kind = %target.kind(), target_id = target.id(), error = %e, "add favorite rejected"),
        }
        result
    }

    /// Remove `target` from the favorites of `user_id`.
    ///
    /// Not idempotent at the result level: a second call reports
    /// `FavoriteNotFound`.
    pub fn remove_favorite(&self, user_id: i64, target: FavoriteTarget) -> Result<()> {
        let mut session = self.store.session()?;

        with_transaction(&mut session, |tx| {
            let existing = favorite::find(tx, user_id, target)?.ok_or(
                StoreError::FavoriteNotFound {
                    user_id,
                    kind: target.kind(),
                    id: target.id(),
                },
            )?;
            favorite::remove(tx, existing.id)?;
            info!(favorite_id = existing.id, user_id, "favorite removed");
            Ok(())
        })
    }

    /// Favorites of an existing user, targets embedded
    pub fn list_favorites(&self, user_id: i64) -> Result<Vec<ResolvedFavorite>> {
        let mut session = self.store.session()?;

        with_read_transaction(&mut session, |tx| {
            get_user(tx, user_id)?;
            favorite::list_resolved_by_user(tx, user_id)
        })
    }

    /// Delete a user and, atomically, every favorite it owns.
    ///
    /// Returns the number of favorites removed.
    pub fn delete_user(&self, user_id: i64) -> Result<usize> {
        let mut session = self.store.session()?;

        let removed = with_transaction(&mut session, |tx| {
            get_user(tx, user_id)?;
            let removed = favorite::remove_by_user(tx, user_id)?;
            user::delete_user(tx, user_id)?;
            Ok(removed)
        })?;

        info!(user_id, favorites_removed = removed, "user deleted");
        Ok(removed)
    }

    /// Delete a character, refusing while any favorite references it
    pub fn delete_character(&self, id: i64) -> Result<()> {
        self.delete_target(FavoriteTarget::Character(id))
    }

    /// Delete a planet, refusing while any favorite references it
    pub fn delete_planet(&self, id: i64) -> Result<()> {
        self.delete_target(FavoriteTarget::Planet(id))
    }

    fn delete_target(&self, target: FavoriteTarget) -> Result<()> {
        let mut session = self.store.session()?;

        with_transaction(&mut session, |tx| {
            match target {
                FavoriteTarget::Character(id) => get_character(tx, id).map(|_| ())?,
                FavoriteTarget::Planet(id) => get_planet(tx, id).map(|_| ())?,
            }

            let favorites = favorite::count_by_target(tx, target)?;
            if favorites > 0 {
                warn!(kind = %target.kind(), id = target.id(), favorites, "delete refused, target still favorited");
                return Err(StoreError::TargetInUse {
                    kind: target.kind(),
                    id: target.id(),
                    favorites,
                });
            }

            match target {
                FavoriteTarget::Character(id) => delete_character(tx, id)?,
                FavoriteTarget::Planet(id) => delete_planet(tx, id)?,
            };
            info!(kind = %target.kind(), id = target.id(), "catalog entity deleted");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::character::{create_character, NewCharacter};
    use crate::entities::favorite::{count_all, list_by_user};
    use crate::entities::planet::{create_planet, NewPlanet};
    use crate::entities::user::{create_user, NewUser};

    /// Users 1-2, characters 1-2, planets 1-5
    fn seeded() -> (Store, FavoriteService) {
        let store = Store::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            create_user(&session, &NewUser::new("luke@rebels.org", "pw")).unwrap();
            create_user(&session, &NewUser::new("leia@rebels.org", "pw")).unwrap();
            for name in ["Obi-Wan", "Chewbacca"] {
                create_character(&session, &NewCharacter::named(name)).unwrap();
            }
            for name in ["Tatooine", "Alderaan", "Yavin IV", "Hoth", "Dagobah"] {
                create_planet(&session, &NewPlanet::named(name)).unwrap();
            }
        }
        let service = FavoriteService::new(store.clone());
        (store, service)
    }

    fn ledger_size(store: &Store) -> i64 {
        count_all(&store.session().unwrap()).unwrap()
    }

    #[test]
    fn test_planet_five_scenario() {
        let (store, service) = seeded();
        let target = FavoriteTarget::Planet(5);

        let fav = service.add_favorite(1, target).unwrap();
        assert_eq!(fav.user_id, 1);
        assert!(matches!(&fav.target, ResolvedTarget::Planet(p) if p.name == "Dagobah"));

        let again = service.add_favorite(1, target).unwrap_err();
        assert!(matches!(again, StoreError::AlreadyFavorited { user_id: 1, id: 5, .. }));
        assert_eq!(ledger_size(&store), 1);

        service.remove_favorite(1, target).unwrap();
        let twice = service.remove_favorite(1, target).unwrap_err();
        assert!(matches!(twice, StoreError::FavoriteNotFound { .. }));
        assert_eq!(ledger_size(&store), 0);
    }

    #[test]
    fn test_missing_user_creates_nothing() {
        let (store, service) = seeded();

        let err = service.add_favorite(99, FavoriteTarget::Character(1)).unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound(99)));
        assert_eq!(ledger_size(&store), 0);
    }

    #[test]
    fn test_missing_target() {
        let (store, service) = seeded();

        let err = service.add_favorite(1, FavoriteTarget::Character(42)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::TargetNotFound { kind: crate::entities::TargetKind::Character, id: 42 }
        ));
        assert_eq!(ledger_size(&store), 0);
    }

    #[test]
    fn test_remove_never_added() {
        let (_store, service) = seeded();
        let err = service.remove_favorite(1, FavoriteTarget::Planet(2)).unwrap_err();
        assert!(matches!(err, StoreError::FavoriteNotFound { user_id: 1, id: 2, .. }));
    }

    #[test]
    fn test_add_remove_add_cycle() {
        let (store, service) = seeded();
        let target = FavoriteTarget::Character(2);

        let first = service.add_favorite(1, target).unwrap();
        service.remove_favorite(1, target).unwrap();
        let second = service.add_favorite(1, target).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(ledger_size(&store), 1);
    }

    #[test]
    fn test_same_id_different_kind_is_distinct() {
        let (_store, service) = seeded();
        service.add_favorite(1, FavoriteTarget::Character(1)).unwrap();
        service.add_favorite(1, FavoriteTarget::Planet(1)).unwrap();

        assert_eq!(service.list_favorites(1).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_user_cascades_only_own_favorites() {
        let (store, service) = seeded();
        for planet in 1..=3 {
            service.add_favorite(1, FavoriteTarget::Planet(planet)).unwrap();
        }
        service.add_favorite(1, FavoriteTarget::Character(1)).unwrap();
        service.add_favorite(2, FavoriteTarget::Planet(1)).unwrap();
        service.add_favorite(2, FavoriteTarget::Character(2)).unwrap();

        let removed = service.delete_user(1).unwrap();
        assert_eq!(removed, 4);
        assert_eq!(ledger_size(&store), 2);

        let session = store.session().unwrap();
        assert!(matches!(get_user(&session, 1), Err(StoreError::UserNotFound(1))));
        assert_eq!(list_by_user(&session, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_missing_user() {
        let (_store, service) = seeded();
        assert!(matches!(service.delete_user(7), Err(StoreError::UserNotFound(7))));
    }

    #[test]
    fn test_list_favorites_requires_user() {
        let (_store, service) = seeded();
        assert!(matches!(service.list_favorites(99), Err(StoreError::UserNotFound(99))));
        assert!(service.list_favorites(2).unwrap().is_empty());
    }

    #[test]
    fn test_list_favorites_on_deleted_user_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holocron.db");
        let reader = FavoriteService::new(Store::open(&path).unwrap());
        let writer_store = Store::open(&path).unwrap();
        {
            let session = writer_store.session().unwrap();
            create_user(&session, &NewUser::new("luke@rebels.org", "pw")).unwrap();
            create_planet(&session, &NewPlanet::named("Tatooine")).unwrap();
        }
        let writer = FavoriteService::new(writer_store.clone());
        writer.add_favorite(1, FavoriteTarget::Planet(1)).unwrap();

        assert_eq!(reader.list_favorites(1).unwrap().len(), 1);
        writer.delete_user(1).unwrap();
        assert!(matches!(reader.list_favorites(1), Err(StoreError::UserNotFound(1))));

        // A failed read leaves no transaction open on the session
        assert!(reader.store.session().unwrap().is_autocommit());
    }

    #[test]
    fn test_delete_favorited_target_is_refused() {
        let (store, service) = seeded();
        service.add_favorite(2, FavoriteTarget::Planet(4)).unwrap();

        let err = service.delete_planet(4).unwrap_err();
        assert!(matches!(err, StoreError::TargetInUse { favorites: 1, .. }));
        assert!(get_planet(&store.session().unwrap(), 4).is_ok());

        service.remove_favorite(2, FavoriteTarget::Planet(4)).unwrap();
        service.delete_planet(4).unwrap();
        assert!(get_planet(&store.session().unwrap(), 4).is_err());
    }

    #[test]
    fn test_delete_unreferenced_character() {
        let (_store, service) = seeded();
        service.delete_character(1).unwrap();
        assert!(matches!(
            service.delete_character(1),
            Err(StoreError::NotFound { entity: "character", id: 1 })
        ));
    }
}
