pub mod profile;
pub mod punch;
