//! Surface geometry shared by the pipeline and the window host.

mod viewport;

pub use viewport::Viewport;
