pub mod config;
pub mod error;
pub mod signature;
pub mod types;
