pub mod auth;
pub mod health;
pub mod pubkey;
pub mod register;
