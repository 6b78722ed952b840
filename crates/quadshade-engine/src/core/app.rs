use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

use crate::device::Gpu;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by hosts of the runtime.
pub trait App {
    /// Called once, after the window and its GPU context exist. The app takes
    /// ownership of `gpu`. An error ends the event loop.
    fn on_gpu_ready(&mut self, gpu: Gpu) -> anyhow::Result<()>;

    /// Called for every window event before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Drawable size changed (physical pixels). May be zero while minimized.
    fn on_resize(&mut self, size: PhysicalSize<u32>);

    /// The window must be repainted.
    fn on_redraw(&mut self) -> AppControl;

    /// Called each time the loop wakes, at least every poll interval.
    fn on_idle(&mut self) -> AppControl {
        AppControl::Continue
    }
}
