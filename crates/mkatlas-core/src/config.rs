use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{AtlasError, Result};
use crate::model::{CodeRange, coalesce_ranges};

/// Bin-packer configuration.
///
/// Immutable for one packing run; handing a new one to
/// [`MaxRectsPacker::configure`](crate::packer::maxrects::MaxRectsPacker::configure)
/// discards all bins and pending requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackerConfig {
    /// Width of every bin in pixels.
    pub bin_width: u32,
    /// Height of every bin in pixels.
    pub bin_height: u32,
    /// Maximum number of bins; 0 means unlimited.
    pub max_bins: u32,
    /// Allow 90° rotations for placements.
    pub allow_rotation: bool,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            bin_width: 1024,
            bin_height: 1024,
            max_bins: 0,
            allow_rotation: true,
        }
    }
}

impl PackerConfig {
    pub fn new(bin_width: u32, bin_height: u32, max_bins: u32, allow_rotation: bool) -> Self {
        Self {
            bin_width,
            bin_height,
            max_bins,
            allow_rotation,
        }
    }

    /// Whether a `w`x`h` rectangle fits an empty bin in some allowed orientation.
    pub fn fits(&self, w: u32, h: u32) -> bool {
        let upright = w <= self.bin_width && h <= self.bin_height;
        if self.allow_rotation {
            upright || (h <= self.bin_width && w <= self.bin_height)
        } else {
            upright
        }
    }
}

/// Atlas assembly configuration (texture size, padding policy, trimming).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AtlasConfig {
    /// Width of each output texture.
    pub width: u32,
    /// Height of each output texture.
    pub height: u32,
    /// Maximum number of textures; 0 means unlimited.
    pub max_textures: u32,
    /// Pixels reserved between fragments.
    pub padding: u32,
    /// Fill the padding by replicating fragment borders instead of leaving it transparent.
    pub expand: bool,
    /// Remove transparent borders of images before packing.
    pub trim: bool,
    /// Allow 90° rotations.
    pub allow_rotation: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            max_textures: 0,
            padding: 0,
            expand: false,
            trim: false,
            allow_rotation: true,
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if a texture dimension is zero or the padding
    /// leaves no usable space.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AtlasError::InvalidConfig(format!(
                "texture dimensions must be non-zero ({}x{})",
                self.width, self.height
            )));
        }
        if self.padding >= self.width || self.padding >= self.height {
            return Err(AtlasError::InvalidConfig(format!(
                "padding ({}) leaves no usable space in {}x{} textures",
                self.padding, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Packer configuration derived from the texture settings.
    ///
    /// Without `expand`, padding trails each fragment on its high side, so the
    /// last column/row of padding may hang past the texture edge.
    pub fn packer_config(&self) -> PackerConfig {
        let extra = if self.expand { 0 } else { self.padding };
        PackerConfig {
            bin_width: self.width + extra,
            bin_height: self.height + extra,
            max_bins: self.max_textures,
            allow_rotation: self.allow_rotation,
        }
    }

    /// Border replication width handed to the compositor.
    pub fn draw_expand(&self) -> u32 {
        if self.expand { self.padding } else { 0 }
    }

    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn with_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.width = w;
        self.cfg.height = h;
        self
    }
    pub fn max_textures(mut self, v: u32) -> Self {
        self.cfg.max_textures = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn expand(mut self, v: bool) -> Self {
        self.cfg.expand = v;
        self
    }
    pub fn trim(mut self, v: bool) -> Self {
        self.cfg.trim = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

fn default_font_size() -> u32 {
    16
}
fn default_color() -> [u8; 3] {
    [0xFF, 0xFF, 0xFF]
}
fn default_sdf_downscale() -> u32 {
    1
}

/// How one font is turned into glyph fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FontSpec {
    /// Font file (TTF/OTF).
    pub file: PathBuf,
    /// Name written to the metadata; defaults to the file stem.
    #[serde(default)]
    pub name: String,
    /// Pixel size of the rendered glyphs.
    #[serde(default = "default_font_size")]
    pub size: u32,
    /// Fill color (RGB); coverage becomes alpha.
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    /// Supersampling factor used when generating a distance field.
    #[serde(default = "default_sdf_downscale")]
    pub sdf_downscale: u32,
    /// Distance field spread in rasterized pixels; 0 disables the distance field.
    #[serde(default)]
    pub sdf_spread: u32,
    /// Code points to render.
    #[serde(default)]
    pub ranges: Vec<CodeRange>,
}

impl FontSpec {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            name: String::new(),
            size: default_font_size(),
            color: default_color(),
            sdf_downscale: default_sdf_downscale(),
            sdf_spread: 0,
            ranges: Vec::new(),
        }
    }

    /// Name used in metadata: explicit name, otherwise the file stem.
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Size the font is rasterized at before distance-field downscaling.
    pub fn raster_size(&self) -> u32 {
        self.size * self.sdf_downscale.max(1)
    }

    /// Sorted ranges with overlaps merged.
    pub fn coalesced_ranges(&self) -> Vec<CodeRange> {
        coalesce_ranges(self.ranges.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(AtlasError::InvalidConfig(format!(
                "font size of {} must be non-zero",
                self.file.display()
            )));
        }
        if self.sdf_downscale == 0 {
            return Err(AtlasError::InvalidConfig(format!(
                "distance field downscale of {} must be non-zero",
                self.file.display()
            )));
        }
        if let Some(r) = self
            .ranges
            .iter()
            .find(|r| r.start > r.end || r.end > char::MAX as u32)
        {
            return Err(AtlasError::InvalidRange(format!("{}-{}", r.start, r.end)));
        }
        Ok(())
    }
}

/// Parses `rrggbb` (optionally `#`-prefixed) into RGB bytes.
pub fn parse_color(s: &str) -> Result<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    let num = u32::from_str_radix(hex, 16)
        .ok()
        .filter(|_| !hex.is_empty() && hex.len() <= 6)
        .ok_or_else(|| AtlasError::InvalidInput(format!("invalid color: {s}")))?;
    Ok([(num >> 16) as u8, (num >> 8) as u8, num as u8])
}

impl FromStr for FontSpec {
    type Err = AtlasError;
    /// `FILE[,size=N][,name=S][,color=RRGGBB][,dfsize=N][,dfspread=N][,range=R]...`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(',');
        let file = parts
            .next()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| AtlasError::InvalidInput("font spec without a file".into()))?;
        let mut spec = FontSpec::new(file.trim());
        let num = |key: &str, v: &str| {
            v.parse::<u32>()
                .map_err(|_| AtlasError::InvalidInput(format!("invalid {key}: {v}")))
        };
        for part in parts {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| AtlasError::InvalidInput(format!("expected key=value: {part}")))?;
            let value = value.trim();
            match key.trim() {
                "size" => spec.size = num("size", value)?,
                "name" => spec.name = value.to_string(),
                "color" => spec.color = parse_color(value)?,
                "dfsize" => spec.sdf_downscale = num("dfsize", value)?,
                "dfspread" => spec.sdf_spread = num("dfspread", value)?,
                "range" => spec.ranges.push(value.parse()?),
                other => {
                    return Err(AtlasError::InvalidInput(format!(
                        "unknown font option: {other}"
                    )));
                }
            }
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packer_config_pads_bins_unless_expanding() {
        let cfg = AtlasConfig::builder()
            .with_dimensions(256, 128)
            .padding(2)
            .build();
        let p = cfg.packer_config();
        assert_eq!((p.bin_width, p.bin_height), (258, 130));
        assert_eq!(cfg.draw_expand(), 0);

        let cfg = AtlasConfig::builder()
            .with_dimensions(256, 128)
            .padding(2)
            .expand(true)
            .build();
        let p = cfg.packer_config();
        assert_eq!((p.bin_width, p.bin_height), (256, 128));
        assert_eq!(cfg.draw_expand(), 2);
    }

    #[test]
    fn validate_rejects_degenerate_textures() {
        assert!(AtlasConfig::builder().with_dimensions(0, 16).build().validate().is_err());
        assert!(
            AtlasConfig::builder()
                .with_dimensions(16, 16)
                .padding(16)
                .build()
                .validate()
                .is_err()
        );
        assert!(AtlasConfig::default().validate().is_ok());
    }

    #[test]
    fn fits_respects_rotation() {
        let cfg = PackerConfig::new(10, 10, 0, false);
        assert!(!cfg.fits(20, 5));
        let cfg = PackerConfig::new(10, 20, 0, true);
        assert!(cfg.fits(20, 5));
    }

    #[test]
    fn font_spec_from_str() {
        let spec: FontSpec = "fonts/ui.ttf,size=24,name=ui,color=ff8000,dfsize=4,dfspread=8,range=32-126,range=0x410"
            .parse()
            .unwrap();
        assert_eq!(spec.file, PathBuf::from("fonts/ui.ttf"));
        assert_eq!(spec.size, 24);
        assert_eq!(spec.display_name(), "ui");
        assert_eq!(spec.color, [0xFF, 0x80, 0x00]);
        assert_eq!(spec.raster_size(), 96);
        assert_eq!(spec.sdf_spread, 8);
        assert_eq!(
            spec.ranges,
            vec![CodeRange::new(32, 126), CodeRange::single(0x410)]
        );

        let bare: FontSpec = "a/b/mono.otf".parse().unwrap();
        assert_eq!(bare.display_name(), "mono");
        assert!("x.ttf,weight=3".parse::<FontSpec>().is_err());
        assert!("x.ttf,size".parse::<FontSpec>().is_err());
    }

    #[test]
    fn validate_rejects_ranges_past_unicode() {
        let mut spec = FontSpec::new("a.ttf");
        spec.ranges.push(CodeRange::new(32, 126));
        assert!(spec.validate().is_ok());
        spec.ranges.push(CodeRange::new(0, u32::MAX));
        assert!(matches!(spec.validate(), Err(AtlasError::InvalidRange(_))));
    }

    #[test]
    fn parse_color_hex() {
        assert_eq!(parse_color("#102030").unwrap(), [0x10, 0x20, 0x30]);
        assert!(parse_color("nothex").is_err());
    }
}
