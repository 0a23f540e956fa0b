pub mod account;
pub mod appointments;
pub mod profile;
pub mod validation;
