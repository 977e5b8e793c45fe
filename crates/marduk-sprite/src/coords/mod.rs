//! Geometry and color types shared by the renderer and its device backends.
//!
//! Canonical CPU space:
//! - pixels of the current render target
//! - origin top-left
//! - +X right, +Y down
//!
//! The projection uniform maps this space to clip space in the vertex stage.

mod color;
mod rect;
mod scissor;

pub use color::ColorRgba;
pub use rect::Rect;
pub use scissor::ScissorRect;
