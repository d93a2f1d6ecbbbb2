use crate::models::{GuestSession, LocationContext, Trip};
use crate::SessionError;
use std::collections::HashMap;
use uuid::Uuid;

/// Owns authenticated trips. Created either directly from the search flow or
/// as a migration target from a guest session.
pub struct TripManager {
    trips: HashMap<Uuid, Trip>,
}

impl TripManager {
    pub fn new() -> Self {
        Self {
            trips: HashMap::new(),
        }
    }

    pub fn create_trip(&mut self, user_id: String, context: LocationContext) -> Trip {
        let trip = Trip::new(user_id, context);
        self.trips.insert(trip.id, trip.clone());
        trip
    }

    pub fn get(&self, trip_id: &Uuid) -> Option<&Trip> {
        self.trips.get(trip_id)
    }

    pub fn get_owned(&self, trip_id: &Uuid, user_id: &str) -> Result<&Trip, SessionError> {
        self.trips
            .get(trip_id)
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| SessionError::TripNotFound(trip_id.to_string()))
    }

    pub fn trips_for_user(&self, user_id: &str) -> Vec<Trip> {
        let mut rows: Vec<Trip> = self
            .trips
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.created_at);
        rows
    }

    /// Migration target resolution: merge into the user's existing trip for
    /// the same location if one exists, otherwise create a trip seeded from
    /// the session's location and party-size fields.
    pub fn resolve_for_session(&mut self, user_id: &str, session: &GuestSession) -> Trip {
        if let Some(existing) = self
            .trips
            .values()
            .filter(|t| t.user_id == user_id && t.location_string == session.location_string)
            .min_by_key(|t| t.created_at)
        {
            return existing.clone();
        }
        let trip = Trip::from_session(user_id.to_string(), session);
        self.trips.insert(trip.id, trip.clone());
        trip
    }

    /// Test cleanup only.
    pub fn remove(&mut self, trip_id: &Uuid) -> Option<Trip> {
        self.trips.remove(trip_id)
    }
}

impl Default for TripManager {
    fn default() -> Self {
        Self::new()
    }
}
