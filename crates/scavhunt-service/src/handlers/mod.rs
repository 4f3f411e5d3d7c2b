//! API handlers.

pub mod approve;
pub mod auth;
pub mod health;
pub mod tasks;
pub mod views;
