pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod factory;
pub mod fields;
pub mod response;
pub mod state;
pub mod users;
