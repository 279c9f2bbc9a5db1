//! Text item.

use super::{ItemId, ItemMeta, ItemStyle, ItemTrait, SerializableColor, Transform};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Size};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

/// Horizontal alignment of text inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

fn default_font_family() -> String {
    Text::DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_size() -> f64 {
    Text::DEFAULT_FONT_SIZE
}

fn default_text_color() -> SerializableColor {
    SerializableColor::black()
}

/// A text box.
#[derive(Debug, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ItemId,
    pub transform: Transform,
    pub content: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub alignment: TextAlign,
    #[serde(default = "default_text_color")]
    pub text_color: SerializableColor,
    pub style: ItemStyle,
    #[serde(default)]
    pub meta: ItemMeta,
    /// Layout size measured by the renderer. Never persisted or compared.
    #[serde(skip)]
    cached_size: RwLock<Option<Size>>,
}

impl Clone for Text {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            transform: self.transform,
            content: self.content.clone(),
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            alignment: self.alignment,
            text_color: self.text_color,
            style: self.style.clone(),
            meta: self.meta.clone(),
            // Clone the cached value, not the lock
            cached_size: RwLock::new(self.cached_size()),
        }
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.transform == other.transform
            && self.content == other.content
            && self.font_family == other.font_family
            && self.font_size == other.font_size
            && self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.alignment == other.alignment
            && self.text_color == other.text_color
            && self.style == other.style
            && self.meta == other.meta
    }
}

impl Text {
    pub const DEFAULT_FONT_FAMILY: &'static str = "Arial";
    pub const DEFAULT_FONT_SIZE: f64 = 12.0;
    /// Box size given to text placed with a single click.
    pub const DEFAULT_BOX: Size = Size::new(150.0, 40.0);
    /// Placeholder content for text placed with the text tool.
    pub const PLACEHOLDER: &'static str = "Double-click to edit";

    /// Create a new text box.
    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform: Transform::new(position, Self::DEFAULT_BOX),
            content,
            font_family: default_font_family(),
            font_size: Self::DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            alignment: TextAlign::default(),
            text_color: default_text_color(),
            style: Self::default_style(),
            meta: ItemMeta::default(),
            cached_size: RwLock::new(None),
        }
    }

    /// Set the cached layout size (computed by the renderer).
    pub fn set_cached_size(&self, size: Size) {
        if let Ok(mut cache) = self.cached_size.write() {
            *cache = Some(size);
        }
    }

    pub fn cached_size(&self) -> Option<Size> {
        self.cached_size.read().ok().and_then(|guard| *guard)
    }

    /// Clear the cached size (call when text properties change).
    pub fn invalidate_cache(&self) {
        if let Ok(mut cache) = self.cached_size.write() {
            *cache = None;
        }
    }
}

/// A set of font changes. `None` fields leave the property as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFormat {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub alignment: Option<TextAlign>,
    pub color: Option<SerializableColor>,
}

impl TextFormat {
    /// Smallest font size a format may set.
    pub const MIN_FONT_SIZE: f64 = 1.0;

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the set fields into `text`, dropping its measured layout if anything changed.
    pub fn apply_to(&self, text: &mut Text) {
        let before = text.clone();
        if let Some(family) = &self.font_family {
            text.font_family.clone_from(family);
        }
        if let Some(size) = self.font_size {
            text.font_size = size.max(Self::MIN_FONT_SIZE);
        }
        if let Some(bold) = self.bold {
            text.bold = bold;
        }
        if let Some(italic) = self.italic {
            text.italic = italic;
        }
        if let Some(underline) = self.underline {
            text.underline = underline;
        }
        if let Some(alignment) = self.alignment {
            text.alignment = alignment;
        }
        if let Some(color) = self.color {
            text.text_color = color;
        }
        if *text != before {
            text.invalidate_cache();
        }
    }
}

impl ItemTrait for Text {
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

    fn local_bounds(&self) -> Rect {
        // Measured layout wins when it is larger than the box.
        let size = self.transform.size;
        let size = match self.cached_size() {
            Some(measured) => Size::new(size.width.max(measured.width), size.height.max(measured.height)),
            None => size,
        };
        Rect::from_origin_size(Point::ZERO, size)
    }

    fn default_style() -> ItemStyle {
        ItemStyle::unpainted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_size_ignored_by_equality() {
        let text = Text::new(Point::ZERO, "Hello".to_string());
        let copy = text.clone();
        text.set_cached_size(Size::new(400.0, 20.0));
        assert_eq!(text, copy);
        assert_eq!(text.cached_size(), Some(Size::new(400.0, 20.0)));
    }

    #[test]
    fn test_clone_carries_cache() {
        let text = Text::new(Point::ZERO, "Hi".to_string());
        text.set_cached_size(Size::new(10.0, 10.0));
        assert_eq!(text.clone().cached_size(), Some(Size::new(10.0, 10.0)));
        text.invalidate_cache();
        assert_eq!(text.cached_size(), None);
    }

    #[test]
    fn test_bounds_grow_with_measured_layout() {
        let text = Text::new(Point::ZERO, "Wide".to_string());
        text.set_cached_size(Size::new(300.0, 10.0));
        let bounds = text.local_bounds();
        assert!((bounds.width() - 300.0).abs() < f64::EPSILON);
        assert!((bounds.height() - Text::DEFAULT_BOX.height).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_sets_only_given_fields() {
        let mut text = Text::new(Point::ZERO, "Title".to_string());
        text.set_cached_size(Size::new(80.0, 20.0));
        let format = TextFormat {
            font_size: Some(0.0),
            bold: Some(true),
            alignment: Some(TextAlign::Center),
            ..TextFormat::default()
        };
        format.apply_to(&mut text);
        assert_eq!(text.font_size, TextFormat::MIN_FONT_SIZE);
        assert!(text.bold);
        assert!(!text.italic);
        assert_eq!(text.alignment, TextAlign::Center);
        assert_eq!(text.font_family, Text::DEFAULT_FONT_FAMILY);
        assert_eq!(text.cached_size(), None);

        // Nothing changes, so the measured layout survives.
        text.set_cached_size(Size::new(80.0, 20.0));
        format.apply_to(&mut text);
        assert_eq!(text.cached_size(), Some(Size::new(80.0, 20.0)));
        assert!(TextFormat::default().is_empty());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{
            "id": "6f1c1a52-3c1e-4d0b-9a59-3f5b1a3c2d10",
            "transform": {"position": {"x": 0.0, "y": 0.0}, "size": {"width": 10.0, "height": 10.0}},
            "content": "x",
            "style": {"fill_color": null, "stroke_color": null, "stroke_width": 0.0}
        }"#;
        let text: Text = serde_json::from_str(json).unwrap();
        assert_eq!(text.font_family, "Arial");
        assert_eq!(text.alignment, TextAlign::Left);
        assert!(text.meta.visible);
    }
}
