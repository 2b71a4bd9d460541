// Engine module - room scene building blocks

pub mod animation;
pub mod camera;
pub mod components;
pub mod config;
pub mod debug_overlay;
pub mod doors;
pub mod input;
pub mod mesh;
pub mod picking;
pub mod room;
pub mod systems;
pub mod visibility;

// Re-export commonly used items
pub use components::*;
