//! Browser implementations of the core seams.

mod events;
mod navigator;
mod notifier;
mod rasterizer;
mod surface;
mod timer;

pub use events::WindowEventSource;
pub use navigator::WebNavigator;
pub use notifier::DomNotifier;
pub use rasterizer::{Html2Canvas, Html2CanvasLoader};
pub use surface::{IframeFactory, IframeSurface};
pub use timer::GlooTimer;
