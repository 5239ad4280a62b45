pub mod coordinator;
pub mod index_builder;
pub mod scrub;
