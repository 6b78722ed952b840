//! Quadshade engine crate.
//!
//! Manages the lifecycle of a two-stage shader program drawn over a
//! full-screen quad: asynchronous source loading, compilation, linking,
//! geometry/uniform binding and the draw, with hot reload on location changes.
//!
//! The lifecycle runs against any [`gl::GraphicsContext`]. Two backends ship
//! with the crate: a headless recorder and a wgpu window backend.

pub mod backend;
pub mod binder;
pub mod compiler;
pub mod config;
pub mod coords;
pub mod core;
pub mod device;
pub mod error;
pub mod gl;
pub mod linker;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod shader;
pub mod window;

pub use config::PipelineConfig;
pub use coords::Viewport;
pub use pipeline::{PipelineState, ShaderPipeline};
