//! API route handlers

pub mod account;
pub mod app;
pub mod files;
pub mod health;
