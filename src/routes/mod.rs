//! Route modules for the PAJSK report server

pub mod health;
pub mod reports;
