pub mod history;
pub mod server;
pub mod status;
