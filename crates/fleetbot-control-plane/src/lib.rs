pub mod features;
pub mod server;
pub mod shared;
