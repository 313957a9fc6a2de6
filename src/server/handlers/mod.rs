pub mod health;
pub mod outlets;
pub mod query;
