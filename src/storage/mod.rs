pub mod layout;
pub mod file_lock;
pub mod record;
pub mod shard;
