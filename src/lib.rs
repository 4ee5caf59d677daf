pub mod camera;
pub mod chunk;
pub mod classify;
pub mod config;
pub mod error;
pub mod field;
pub mod generator;
pub mod interp;
pub mod job;
pub mod mesh;
pub mod plugin;
pub mod raymarch;
pub mod tables;
pub mod triangulate;
pub mod types;

pub use plugin::VoxelRaymarchPlugin;
