//! Image item for embedding raster images.

use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, Transform};
use kurbo::{BezPath, Point, Shape as KurboShape, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image format for stored image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Owned bytes persisted as standard base64 text.
mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}

fn default_true() -> bool {
    true
}

/// An embedded raster image. The record owns its encoded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ItemId,
    pub transform: Transform,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Intrinsic width in pixels.
    pub source_width: u32,
    /// Intrinsic height in pixels.
    pub source_height: u32,
    pub format: ImageFormat,
    /// Resizing keeps the intrinsic aspect ratio.
    #[serde(default = "default_true")]
    pub maintain_aspect: bool,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl Image {
    /// Create an image displayed at its intrinsic size.
    pub fn new(
        position: Point,
        data: Vec<u8>,
        source_width: u32,
        source_height: u32,
        format: ImageFormat,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform: Transform::new(
                position,
                Size::new(source_width as f64, source_height as f64),
            ),
            data,
            source_width,
            source_height,
            format,
            maintain_aspect: true,
            style: Self::default_style(),
            meta: ItemMeta::default(),
        }
    }

    /// Intrinsic aspect ratio (width / height), 1.0 for degenerate images.
    pub fn aspect_ratio(&self) -> f64 {
        if self.source_height == 0 {
            1.0
        } else {
            self.source_width as f64 / self.source_height as f64
        }
    }

    /// Scale the display box to fit within max dimensions, preserving aspect ratio.
    pub fn fit_within(mut self, max_width: f64, max_height: f64) -> Self {
        let aspect = self.aspect_ratio();
        if aspect > max_width / max_height {
            self.transform.size = Size::new(max_width, max_width / aspect);
        } else {
            self.transform.size = Size::new(max_height * aspect, max_height);
        }
        self
    }

    /// Size to use for a requested resize, honoring `maintain_aspect`.
    pub fn constrain_size(&self, requested: Size) -> Size {
        if !self.maintain_aspect {
            return requested;
        }
        Size::new(requested.width, requested.width / self.aspect_ratio())
    }
}

impl ItemTrait for Image {
    fn id(&self) -> ItemId {
        self.id
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn style(&self) -> &ItemStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ItemStyle {
        &mut self.style
    }

    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn local_path(&self) -> BezPath {
        self.local_bounds().to_path(0.1)
    }

    fn default_style() -> ItemStyle {
        ItemStyle::unpainted()
    }
}
