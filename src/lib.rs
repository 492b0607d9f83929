pub mod config;
pub mod handlers;
pub mod models;
pub mod query;
pub mod status;
pub mod storage;
pub mod utils;
