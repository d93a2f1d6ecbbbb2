pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod memory;
pub mod session_repo;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use memory::{MemoryBookingRepository, MemorySessionRepository};
pub use session_repo::PgSessionRepository;
