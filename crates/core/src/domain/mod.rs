pub mod peer;
pub mod profile;
