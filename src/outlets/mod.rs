//! Outlet data model, storage contract and read-side helpers.

mod cache;
pub mod geo;
mod model;
mod sqlite;
mod store;

pub use cache::OutletCache;
pub use model::{Match, Outlet, WAZE_NOT_AVAILABLE};
pub use sqlite::SqliteOutletStore;
pub use store::OutletStore;
