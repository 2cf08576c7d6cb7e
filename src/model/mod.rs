pub mod profile;
pub mod punch;
pub mod role;
