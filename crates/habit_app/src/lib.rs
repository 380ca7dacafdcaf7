pub mod app;
pub mod bridge;
pub mod cli;
pub mod store;
