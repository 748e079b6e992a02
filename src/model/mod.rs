pub mod config;
pub mod entity;

pub use config::*;
pub use entity::*;
