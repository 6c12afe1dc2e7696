//! bill-service: itemized shop bills with per-owner bill numbering and
//! partial payment tracking.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;
