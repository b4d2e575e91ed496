pub mod cache;
pub mod database;
pub mod models;

pub use database::Database;
