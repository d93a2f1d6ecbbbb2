use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Seed context captured from the anonymous visitor: where they are looking
/// and who is coming along.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationContext {
    pub location_string: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub num_adults: i32,
    #[serde(default)]
    pub num_children: i32,
    #[serde(default)]
    pub num_pets: i32,
}

/// Persistent anonymous identity keyed by an opaque token. Created on the
/// first anonymous like, converted to a Trip at most once on sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSession {
    pub id: Uuid,
    pub location_string: String,
    pub latitude: f64,
    pub longitude: f64,
    pub num_adults: i32,
    pub num_children: i32,
    pub num_pets: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub converted_at: Option<DateTime<Utc>>,
    pub trip_id: Option<Uuid>,
}

impl GuestSession {
    pub fn new(context: LocationContext, ttl_days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            location_string: context.location_string,
            latitude: context.latitude,
            longitude: context.longitude,
            num_adults: context.num_adults,
            num_children: context.num_children,
            num_pets: context.num_pets,
            created_at: now,
            expires_at: now + chrono::Duration::days(ttl_days),
            converted_at: None,
            trip_id: None,
        }
    }

    pub fn is_converted(&self) -> bool {
        self.converted_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The authenticated equivalent of a guest session; owns favorites once a
/// user signs in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub user_id: String,
    pub location_string: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub num_adults: i32,
    pub num_children: i32,
    pub num_pets: i32,
    pub min_price: Option<i32>,
    pub max_price: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(user_id: String, context: LocationContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            location_string: context.location_string,
            latitude: context.latitude,
            longitude: context.longitude,
            start_date: None,
            end_date: None,
            num_adults: context.num_adults,
            num_children: context.num_children,
            num_pets: context.num_pets,
            min_price: None,
            max_price: None,
            created_at: Utc::now(),
        }
    }

    /// Seed a migration-target trip from an unconverted guest session.
    pub fn from_session(user_id: String, session: &GuestSession) -> Self {
        Self::new(
            user_id,
            LocationContext {
                location_string: session.location_string.clone(),
                latitude: session.latitude,
                longitude: session.longitude,
                num_adults: session.num_adults,
                num_children: session.num_children,
                num_pets: session.num_pets,
            },
        )
    }
}

/// The liking actor. Exclusive ownership is enforced by construction: a row
/// belongs to a guest session or a trip, never both, never neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteOwner {
    Guest(Uuid),
    Trip(Uuid),
}

impl FavoriteOwner {
    pub fn guest_session_id(&self) -> Option<Uuid> {
        match self {
            FavoriteOwner::Guest(id) => Some(*id),
            FavoriteOwner::Trip(_) => None,
        }
    }

    pub fn trip_id(&self) -> Option<Uuid> {
        match self {
            FavoriteOwner::Guest(_) => None,
            FavoriteOwner::Trip(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub owner: FavoriteOwner,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dislike {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub owner: FavoriteOwner,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(listing_id: Uuid, owner: FavoriteOwner) -> Self {
        Self {
            id: Uuid::new_v4(),
            listing_id,
            owner,
            created_at: Utc::now(),
        }
    }

    /// Relational projection with the nullable owner columns the wire format
    /// and the Postgres schema both use.
    pub fn record(&self) -> Value {
        json!({
            "id": self.id,
            "listing_id": self.listing_id,
            "guest_session_id": self.owner.guest_session_id(),
            "trip_id": self.owner.trip_id(),
            "created_at": self.created_at.to_rfc3339(),
        })
    }
}

impl Dislike {
    pub fn new(listing_id: Uuid, owner: FavoriteOwner) -> Self {
        Self {
            id: Uuid::new_v4(),
            listing_id,
            owner,
            created_at: Utc::now(),
        }
    }

    pub fn record(&self) -> Value {
        json!({
            "id": self.id,
            "listing_id": self.listing_id,
            "guest_session_id": self.owner.guest_session_id(),
            "trip_id": self.owner.trip_id(),
            "created_at": self.created_at.to_rfc3339(),
        })
    }
}
