use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal listing record: enough to authorize host actions and price a
/// match. Search, media, and availability live outside this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub host_user_id: String,
    pub title: String,
    pub location_string: String,
    pub monthly_rent: i32,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(
        host_user_id: String,
        title: String,
        location_string: String,
        monthly_rent: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            host_user_id,
            title,
            location_string,
            monthly_rent,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HousingRequestStatus {
    Pending,
    Approved,
    Declined,
}

impl std::fmt::Display for HousingRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HousingRequestStatus::Pending => "PENDING",
            HousingRequestStatus::Approved => "APPROVED",
            HousingRequestStatus::Declined => "DECLINED",
        };
        f.write_str(s)
    }
}

/// Application submitted by a trip against a listing. Host identity is
/// denormalized at submit time so approval checks need no listing lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousingRequest {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub listing_id: Uuid,
    pub renter_user_id: String,
    pub host_user_id: String,
    pub status: HousingRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HousingRequest {
    pub fn new(trip_id: Uuid, listing: &Listing, renter_user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip_id,
            listing_id: listing.id,
            renter_user_id,
            host_user_id: listing.host_user_id.clone(),
            status: HousingRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The two signing parties on a lease. Either may sign first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignatureParty {
    Landlord,
    Tenant,
}

impl SignatureParty {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureParty::Landlord => "landlord",
            SignatureParty::Tenant => "tenant",
        }
    }
}

/// Created exactly once per approved housing request. Carries the lease
/// signature timestamps and the payment authorization marker that gate the
/// final booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingMatch {
    pub id: Uuid,
    pub housing_request_id: Uuid,
    pub trip_id: Uuid,
    pub listing_id: Uuid,
    pub monthly_rent: i32,
    pub landlord_signed_at: Option<DateTime<Utc>>,
    pub tenant_signed_at: Option<DateTime<Utc>>,
    pub payment_authorized_at: Option<DateTime<Utc>>,
    pub payment_authorization_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingMatch {
    pub fn new(request: &HousingRequest, monthly_rent: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            housing_request_id: request.id,
            trip_id: request.trip_id,
            listing_id: request.listing_id,
            monthly_rent,
            landlord_signed_at: None,
            tenant_signed_at: None,
            payment_authorized_at: None,
            payment_authorization_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fully signed is the conjunction of both party timestamps.
    pub fn fully_signed(&self) -> bool {
        self.landlord_signed_at.is_some() && self.tenant_signed_at.is_some()
    }

    pub fn payment_authorized(&self) -> bool {
        self.payment_authorized_at.is_some()
    }

    pub fn signed_at(&self, party: SignatureParty) -> Option<DateTime<Utc>> {
        match party {
            SignatureParty::Landlord => self.landlord_signed_at,
            SignatureParty::Tenant => self.tenant_signed_at,
        }
    }
}

/// 1:1 with its match; exists only after payment authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub match_id: Uuid,
    pub trip_id: Uuid,
    pub listing_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(booking_match: &BookingMatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id: booking_match.id,
            trip_id: booking_match.trip_id,
            listing_id: booking_match.listing_id,
            created_at: Utc::now(),
        }
    }
}
