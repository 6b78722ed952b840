//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop) and
//! the host application driving a [`ShaderPipeline`](crate::pipeline::ShaderPipeline).

mod app;

pub use app::{App, AppControl};
