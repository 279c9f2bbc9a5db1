//! User settings: defaults for new items, snapping and history.

use crate::commands::DEFAULT_HISTORY_LIMIT;
use crate::items::{ItemKind, ItemStyle, SerializableColor};
use crate::storage::{StorageError, StorageResult};
use crate::units::Unit;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Styles applied to newly created items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDefaults {
    pub fill_color: SerializableColor,
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    pub font_family: String,
    pub font_size: f64,
}

impl Default for ItemDefaults {
    fn default() -> Self {
        Self {
            fill_color: SerializableColor::default_fill(),
            stroke_color: SerializableColor::black(),
            stroke_width: 1.0,
            font_family: "Arial".to_string(),
            font_size: 12.0,
        }
    }
}

impl ItemDefaults {
    /// Variant default style with the configured colors and width swapped in.
    ///
    /// Only channels the variant paints are replaced.
    pub fn style_for(&self, kind: ItemKind) -> ItemStyle {
        let mut style = kind.default_style();
        if style.fill_color.is_some() {
            style.fill_color = Some(self.fill_color);
        }
        if style.stroke_color.is_some() {
            style.stroke_color = Some(self.stroke_color);
            if kind != ItemKind::Freehand {
                style.stroke_width = self.stroke_width;
            }
        }
        style
    }
}

/// Grid snapping for tool input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// Grid spacing in points.
    pub grid_spacing: f64,
    pub snap_to_grid: bool,
    /// Points closer than this to a grid line snap to it.
    pub snap_distance: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            grid_spacing: 18.0,
            snap_to_grid: false,
            snap_distance: 8.0,
        }
    }
}

impl SnapSettings {
    /// Snap each coordinate to the nearest grid line within `snap_distance`.
    pub fn snap(&self, point: Point) -> Point {
        if !self.snap_to_grid || self.grid_spacing <= 0.0 {
            return point;
        }
        let snap_axis = |v: f64| {
            let nearest = (v / self.grid_spacing).round() * self.grid_spacing;
            if (nearest - v).abs() <= self.snap_distance {
                nearest
            } else {
                v
            }
        };
        Point::new(snap_axis(point.x), snap_axis(point.y))
    }
}

/// Application settings, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub defaults: ItemDefaults,
    pub snap: SnapSettings,
    /// Maximum undo entries kept.
    pub history_limit: usize,
    /// Offset applied to pasted copies, in points.
    pub paste_offset: f64,
    /// Freehand simplification tolerance, in points.
    pub freehand_tolerance: f64,
    /// Display unit for new documents.
    pub unit: Unit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            defaults: ItemDefaults::default(),
            snap: SnapSettings::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            paste_offset: 20.0,
            freehand_tolerance: 2.0,
            unit: Unit::default(),
        }
    }
}

impl Settings {
    /// `<config dir>/publisher/settings.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("publisher").join("settings.json"))
    }

    pub fn load_from(path: &Path) -> StorageResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(path, text)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Load from the default path, falling back to defaults on any problem.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_publisher() {
        let settings = Settings::default();
        assert_eq!(settings.defaults.fill_color.to_hex(), "#4a90d9");
        assert!((settings.paste_offset - 20.0).abs() < f64::EPSILON);
        assert!((settings.snap.snap_distance - 8.0).abs() < f64::EPSILON);
        assert_eq!(settings.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.unit = Unit::Centimeters;
        settings.snap.snap_to_grid = true;
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"paste_offset": 5.0, "snap": {"snap_to_grid": true}}"#).unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert!((settings.paste_offset - 5.0).abs() < f64::EPSILON);
        assert!(settings.snap.snap_to_grid);
        assert!((settings.snap.grid_spacing - 18.0).abs() < f64::EPSILON);
        assert_eq!(settings.defaults, ItemDefaults::default());
    }

    #[test]
    fn test_snap() {
        let snap = SnapSettings {
            grid_spacing: 10.0,
            snap_to_grid: true,
            snap_distance: 2.0,
        };
        assert_eq!(snap.snap(Point::new(11.0, 25.0)), Point::new(10.0, 25.0));
        let off = SnapSettings::default();
        assert_eq!(off.snap(Point::new(11.0, 25.0)), Point::new(11.0, 25.0));
    }

    #[test]
    fn test_style_for_respects_variant() {
        let mut defaults = ItemDefaults::default();
        defaults.fill_color = SerializableColor::red();
        assert_eq!(defaults.style_for(ItemKind::Rectangle).fill_color, Some(SerializableColor::red()));
        assert_eq!(defaults.style_for(ItemKind::Line).fill_color, None);
        assert_eq!(defaults.style_for(ItemKind::Image).stroke_color, None);
    }
}
