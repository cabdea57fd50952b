pub mod config;
pub mod item;
pub mod menu;
pub mod project;

pub use config::*;
pub use item::*;
pub use menu::*;
pub use project::*;
