// Library root: round synchronization engine for the housie client.

pub mod api;
pub mod app;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod protocol;
pub mod round;
