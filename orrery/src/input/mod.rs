//! Input events, the capture protocol and hover tracking

mod button;
mod dispatcher;
mod element;
mod event;
mod hover;

use thiserror::Error;

pub use button::ButtonElement;
pub use dispatcher::*;
pub use element::*;
pub use event::*;
pub use hover::HoverTracker;

slotmap::new_key_type! {
    /// Handle of a UI element registered with an [`InputDispatcher`].
    pub struct UIElementId;
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture contract violation: {0}")]
    ContractViolation(String),
    #[error("Invalid capture state: {0}")]
    InvalidState(String),
    #[error("No UI element {0:?}")]
    UnknownElement(UIElementId),
}
