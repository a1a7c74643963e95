//! Core library for building texture atlases from images and fonts.
//!
//! - Packing: multi-bin MaxRects with best-area-fit placement and optional 90° rotation
//! - Compositing: blits (optionally rotated) fragments with border-replicating padding
//! - Fonts: glyph rasterization (`font` feature) and signed distance fields
//! - Pipeline: `build_atlas` turns images and fonts into textures + serde-serializable layout
//!
//! Quick example:
//! ```ignore
//! use image::ImageReader;
//! use mkatlas_core::{AtlasConfig, InputImage, build_atlas, to_json_string, texture_file_name};
//! # fn main() -> anyhow::Result<()> {
//! let inputs = vec![
//!   InputImage { key: "a.png".into(), image: ImageReader::open("a.png")?.decode()? },
//!   InputImage { key: "b.png".into(), image: ImageReader::open("b.png")?.decode()? },
//! ];
//! let cfg = AtlasConfig::builder().with_dimensions(512, 512).padding(2).build();
//! let out = build_atlas(inputs, Vec::new(), &cfg)?;
//! let names: Vec<String> = (0..out.textures.len()).map(|i| texture_file_name("texture", i)).collect();
//! println!("{}", to_json_string(&out.atlas, &names)?);
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
#[cfg(feature = "font")]
pub mod font;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod sdf;
pub mod trim;

pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use packer::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `mkatlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::compositing::Canvas;
    pub use crate::config::{AtlasConfig, AtlasConfigBuilder, FontSpec, PackerConfig};
    pub use crate::model::{Atlas, AtlasStats, CodeRange, Frame, Glyph, Rect};
    pub use crate::packer::maxrects::MaxRectsPacker;
    pub use crate::packer::{Placement, RequestId};
    pub use crate::{
        AtlasError, AtlasOutput, InputFont, InputImage, build_atlas, to_json, to_json_string,
    };
}
