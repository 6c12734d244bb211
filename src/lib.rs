pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod proxy;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
