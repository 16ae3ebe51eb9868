pub mod agent;
pub mod broadcast;
pub mod config;
pub mod coordinator;
pub mod lifecycle;
pub mod store;
pub mod terminal;
