//! Chat display state: transcript, input surface, staged renders.

pub mod markup;
pub mod pacing;
pub mod surface;
pub mod transcript;

pub use pacing::{RenderQueue, Staged};
pub use surface::{Answer, InputSurface, SurfaceConfig, OPTIONS_HINT, RESTART_LABEL};
pub use transcript::{Content, Message, Role, Transcript};

/// Receives display changes as they happen.
///
/// Front ends implement this to draw the chat; state lives in
/// [`Transcript`] and [`InputSurface`], the view only renders it.
pub trait ChatView: Send + Sync {
    fn message_appended(&self, message: &Message);

    fn cleared(&self);

    fn surface_changed(&self, surface: &InputSurface);
}

/// View that draws nothing.
pub struct NullView;

impl ChatView for NullView {
    fn message_appended(&self, _message: &Message) {}

    fn cleared(&self) {}

    fn surface_changed(&self, _surface: &InputSurface) {}
}
