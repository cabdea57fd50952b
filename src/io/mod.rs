pub mod config_io;
pub mod file_store;
pub mod links;
pub mod lock;
pub mod memory_store;
pub mod project_io;
pub mod recovery;
pub mod store;
