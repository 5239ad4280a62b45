pub mod schema;
pub mod cache;
