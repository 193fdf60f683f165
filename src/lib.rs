pub mod auth;
pub mod cli;
pub mod config;
pub mod endpoints;
pub mod handlers;
pub mod jolokia;
pub mod session;
pub mod state;
