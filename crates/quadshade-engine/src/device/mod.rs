//! Window surface and wgpu device.
//!
//! [`Gpu`] owns the instance-to-queue chain for one window and hands out
//! [`Frame`]s: an acquired surface texture plus the encoder for its single
//! color pass.

mod frame;
mod gpu;
mod settings;
mod surface;

pub use frame::{Frame, FrameError};
pub use gpu::Gpu;
pub use settings::SurfaceSettings;
