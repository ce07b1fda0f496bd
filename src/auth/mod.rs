pub mod claims;
pub mod extractors;
pub mod gate;
