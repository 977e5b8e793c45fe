//! Embedded shader assets.
//!
//! Assets are named `"<set>-<stage>.<extension>"`, the extension following the
//! device's [`ShaderFormat`]. Only WGSL sources ship with the crate.

use crate::device::{ShaderFormat, ShaderStage};
use crate::error::{RenderError, Result};

pub const EMBEDDED_SHADERS: &[(&str, &[u8])] = &[
    ("sprite-vertex.wgsl", include_bytes!("sprite-vertex.wgsl")),
    ("sprite-fragment.wgsl", include_bytes!("sprite-fragment.wgsl")),
];

/// A shader blob resolved by name, with the entry point to compile.
#[derive(Debug, Copy, Clone)]
pub struct ShaderAsset {
    pub name: &'static str,
    pub stage: ShaderStage,
    pub format: ShaderFormat,
    pub source: &'static [u8],
    pub entry_point: &'static str,
}

pub fn asset_name(set: &str, stage: ShaderStage, format: ShaderFormat) -> String {
    format!("{set}-{}.{}", stage.name(), format.extension())
}

/// Looks up the embedded asset for `set`/`stage` in the device's format.
pub fn load_shader(set: &str, stage: ShaderStage, format: ShaderFormat) -> Result<ShaderAsset> {
    let wanted = asset_name(set, stage, format);
    let (name, source) = EMBEDDED_SHADERS
        .iter()
        .find(|(name, _)| *name == wanted)
        .copied()
        .ok_or_else(|| RenderError::InvalidArgument(format!("no embedded shader named {wanted}")))?;

    Ok(ShaderAsset {
        name,
        stage,
        format,
        source,
        entry_point: stage.entry_point(),
    })
}
