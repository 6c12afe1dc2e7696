pub mod auth;
pub mod bills;
