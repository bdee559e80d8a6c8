pub mod authorization;
pub mod command_registry;
pub mod instance_directory;
pub mod interaction;
pub mod lifecycle;
pub mod observability;
