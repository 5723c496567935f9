pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod medusa;
pub mod state;
pub mod storage;
pub mod templates_structs;
