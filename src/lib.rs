pub mod app;
pub mod config;
pub mod logging;
pub mod members;
pub mod slack;
pub mod state_store;
