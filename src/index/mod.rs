pub mod hash;
pub mod path;
