// src/lib.rs

//! mihari: keyword site monitor with email notification.

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod store;
pub mod utils;
