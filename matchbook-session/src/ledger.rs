use crate::models::{Dislike, Favorite, FavoriteOwner};
use std::collections::HashMap;
use uuid::Uuid;

/// Counts from a single re-parenting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassignSummary {
    pub moved: usize,
    pub deduplicated: usize,
}

/// Association ledger between liking actors and listings.
///
/// Uniqueness of a (owner, listing) pair is enforced here with an index, not
/// by client-side debouncing; concurrent duplicate likes collapse into one
/// row. Rows are never duplicated during re-parenting.
pub struct FavoriteLedger {
    favorites: HashMap<Uuid, Favorite>,
    favorite_index: HashMap<(FavoriteOwner, Uuid), Uuid>,
    dislikes: HashMap<Uuid, Dislike>,
    dislike_index: HashMap<(FavoriteOwner, Uuid), Uuid>,
}

impl FavoriteLedger {
    pub fn new() -> Self {
        Self {
            favorites: HashMap::new(),
            favorite_index: HashMap::new(),
            dislikes: HashMap::new(),
            dislike_index: HashMap::new(),
        }
    }

    /// Idempotent append: a second like of the same listing by the same
    /// owner returns the existing row.
    pub fn add_favorite(&mut self, owner: FavoriteOwner, listing_id: Uuid) -> Favorite {
        if let Some(existing_id) = self.favorite_index.get(&(owner, listing_id)) {
            return self.favorites[existing_id].clone();
        }
        let favorite = Favorite::new(listing_id, owner);
        self.favorite_index.insert((owner, listing_id), favorite.id);
        self.favorites.insert(favorite.id, favorite.clone());
        favorite
    }

    pub fn add_dislike(&mut self, owner: FavoriteOwner, listing_id: Uuid) -> Dislike {
        if let Some(existing_id) = self.dislike_index.get(&(owner, listing_id)) {
            return self.dislikes[existing_id].clone();
        }
        let dislike = Dislike::new(listing_id, owner);
        self.dislike_index.insert((owner, listing_id), dislike.id);
        self.dislikes.insert(dislike.id, dislike.clone());
        dislike
    }

    pub fn favorites_for(&self, owner: FavoriteOwner) -> Vec<Favorite> {
        let mut rows: Vec<Favorite> = self
            .favorites
            .values()
            .filter(|f| f.owner == owner)
            .cloned()
            .collect();
        rows.sort_by_key(|f| f.created_at);
        rows
    }

    pub fn dislikes_for(&self, owner: FavoriteOwner) -> Vec<Dislike> {
        let mut rows: Vec<Dislike> = self
            .dislikes
            .values()
            .filter(|d| d.owner == owner)
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.created_at);
        rows
    }

    /// Re-parent every row owned by `from` to `to`. On conflict with an
    /// existing `to`-owned row for the same listing, the `to` row wins and
    /// the `from` row is dropped rather than duplicated.
    pub fn reassign(&mut self, from: FavoriteOwner, to: FavoriteOwner) -> ReassignSummary {
        let mut summary = ReassignSummary::default();

        let favorite_ids: Vec<Uuid> = self
            .favorites
            .values()
            .filter(|f| f.owner == from)
            .map(|f| f.id)
            .collect();
        for id in favorite_ids {
            let listing_id = self.favorites[&id].listing_id;
            self.favorite_index.remove(&(from, listing_id));
            if self.favorite_index.contains_key(&(to, listing_id)) {
                self.favorites.remove(&id);
                summary.deduplicated += 1;
            } else {
                let row = self.favorites.get_mut(&id).unwrap();
                row.owner = to;
                self.favorite_index.insert((to, listing_id), id);
                summary.moved += 1;
            }
        }

        let dislike_ids: Vec<Uuid> = self
            .dislikes
            .values()
            .filter(|d| d.owner == from)
            .map(|d| d.id)
            .collect();
        for id in dislike_ids {
            let listing_id = self.dislikes[&id].listing_id;
            self.dislike_index.remove(&(from, listing_id));
            if self.dislike_index.contains_key(&(to, listing_id)) {
                self.dislikes.remove(&id);
                summary.deduplicated += 1;
            } else {
                let row = self.dislikes.get_mut(&id).unwrap();
                row.owner = to;
                self.dislike_index.insert((to, listing_id), id);
                summary.moved += 1;
            }
        }

        summary
    }

    /// Test cleanup only.
    pub fn remove_for(&mut self, owner: FavoriteOwner) {
        self.favorites.retain(|_, f| f.owner != owner);
        self.favorite_index.retain(|(o, _), _| *o != owner);
        self.dislikes.retain(|_, d| d.owner != owner);
        self.dislike_index.retain(|(o, _), _| *o != owner);
    }
}

impl Default for FavoriteLedger {
    fn default() -> Self {
        Self::new()
    }
}
