use crate::models::Listing;
use crate::BookingError;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory listing directory. The booking engine only needs host identity
/// and rent; everything else about listings lives in the surrounding app.
pub struct ListingDirectory {
    listings: HashMap<Uuid, Listing>,
}

impl ListingDirectory {
    pub fn new() -> Self {
        Self {
            listings: HashMap::new(),
        }
    }

    pub fn register(&mut self, listing: Listing) -> Listing {
        self.listings.insert(listing.id, listing.clone());
        listing
    }

    pub fn get(&self, listing_id: &Uuid) -> Result<&Listing, BookingError> {
        self.listings
            .get(listing_id)
            .ok_or_else(|| BookingError::ListingNotFound(listing_id.to_string()))
    }

    pub fn list(&self) -> Vec<Listing> {
        let mut rows: Vec<Listing> = self.listings.values().cloned().collect();
        rows.sort_by_key(|l| l.created_at);
        rows
    }
}

impl Default for ListingDirectory {
    fn default() -> Self {
        Self::new()
    }
}
