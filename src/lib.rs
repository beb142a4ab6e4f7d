// src/lib.rs
pub mod care;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod session;
pub mod validation;
pub mod views;

pub use client::ApiClient;
pub use error::{Action, AppError};
