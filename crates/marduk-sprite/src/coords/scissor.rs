/// Scissor rectangle in physical target pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Scissor covering a whole `width` × `height` target.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Clamps the rectangle to a `width` × `height` target.
    ///
    /// Returns `None` when nothing of the rectangle remains; the draw should be skipped.
    pub fn clamped(self, width: u32, height: u32) -> Option<Self> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let x2 = self.x.saturating_add(self.width).min(width);
        let y2 = self.y.saturating_add(self.height).min(height);

        let (w, h) = (x2 - x, y2 - y);
        if w == 0 || h == 0 { None } else { Some(Self::new(x, y, w, h)) }
    }
}
