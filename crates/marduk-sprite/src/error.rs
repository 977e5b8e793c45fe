use thiserror::Error;

/// Errors surfaced by the sprite renderer.
///
/// Every failure is returned to the caller synchronously. Nothing is retried.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A required argument is missing or malformed (empty name, missing file, bad image).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A texture name is already registered.
    #[error("texture name already registered: {0}")]
    DuplicateKey(String),

    /// A texture name or ID is not registered.
    #[error("texture not found: {0}")]
    KeyNotFound(String),

    /// The operation is not valid in the renderer's current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The operation is part of the renderer surface but has no implementation.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Failure reported by the GPU layer; propagated unchanged.
    ///
    /// The wgpu backend reports validation failures through the device's
    /// uncaptured-error handler and never builds this variant; it is the
    /// conversion target for `GraphicsDevice` implementations whose calls
    /// return `anyhow` errors.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

impl RenderError {
    pub(crate) fn disposed() -> Self {
        Self::InvalidState("renderer has been disposed")
    }
}
