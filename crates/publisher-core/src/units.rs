//! Display units and page size presets. Storage is always in points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const POINTS_PER_INCH: f64 = 72.0;
pub const POINTS_PER_CM: f64 = 72.0 / 2.54;
/// 1:1 at 72 DPI.
pub const POINTS_PER_PIXEL: f64 = 1.0;
pub const POINTS_PER_FOOT: f64 = 100.0;

/// Unit used to display lengths. Display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    #[serde(rename = "in")]
    Inches,
    #[serde(rename = "cm")]
    Centimeters,
    #[serde(rename = "px")]
    Pixels,
    #[serde(rename = "ft")]
    Feet,
}

impl Unit {
    pub fn points_per_unit(self) -> f64 {
        match self {
            Unit::Inches => POINTS_PER_INCH,
            Unit::Centimeters => POINTS_PER_CM,
            Unit::Pixels => POINTS_PER_PIXEL,
            Unit::Feet => POINTS_PER_FOOT,
        }
    }

    pub fn points_to_unit(self, points: f64) -> f64 {
        points / self.points_per_unit()
    }

    pub fn unit_to_points(self, value: f64) -> f64 {
        value * self.points_per_unit()
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Inches => "in",
            Unit::Centimeters => "cm",
            Unit::Pixels => "px",
            Unit::Feet => "ft",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" | "inch" | "inches" => Ok(Unit::Inches),
            "cm" | "centimeters" => Ok(Unit::Centimeters),
            "px" | "pixels" => Ok(Unit::Pixels),
            "ft" | "feet" => Ok(Unit::Feet),
            other => Err(format!("unknown unit: {other}")),
        }
    }
}

/// Page dimensions in points. `(0, 0)` means an unbounded canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const INFINITE: PageSize = PageSize::new(0.0, 0.0);
    pub const LETTER: PageSize = PageSize::new(612.0, 792.0);
    pub const A4: PageSize = PageSize::new(595.28, 841.89);
    pub const LEGAL: PageSize = PageSize::new(612.0, 1008.0);
    pub const TABLOID: PageSize = PageSize::new(792.0, 1224.0);
    pub const A3: PageSize = PageSize::new(841.89, 1190.55);
    pub const A5: PageSize = PageSize::new(419.53, 595.28);

    /// Named presets in menu order.
    pub const PRESETS: [(&'static str, PageSize); 7] = [
        ("Infinite", PageSize::INFINITE),
        ("Letter", PageSize::LETTER),
        ("A4", PageSize::A4),
        ("Legal", PageSize::LEGAL),
        ("Tabloid", PageSize::TABLOID),
        ("A3", PageSize::A3),
        ("A5", PageSize::A5),
    ];

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_infinite(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    /// Look up a preset by name, case-insensitively.
    pub fn preset(name: &str) -> Option<PageSize> {
        Self::PRESETS
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(name))
            .map(|(_, size)| *size)
    }

    /// Name of the matching preset, if any.
    pub fn preset_name(&self) -> Option<&'static str> {
        Self::PRESETS
            .iter()
            .find(|(_, size)| size == self)
            .map(|(label, _)| *label)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::INFINITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert!((Unit::Inches.points_to_unit(72.0) - 1.0).abs() < f64::EPSILON);
        assert!((Unit::Centimeters.unit_to_points(2.54) - 72.0).abs() < 1e-9);
        assert!((Unit::Feet.unit_to_points(1.0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unit_serializes_as_suffix() {
        assert_eq!(serde_json::to_string(&Unit::Centimeters).unwrap(), "\"cm\"");
        assert_eq!("FT".parse::<Unit>(), Ok(Unit::Feet));
        assert!("parsec".parse::<Unit>().is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(PageSize::preset("a4"), Some(PageSize::A4));
        assert_eq!(PageSize::LETTER.preset_name(), Some("Letter"));
        assert!(PageSize::preset("infinite").is_some_and(|s| s.is_infinite()));
        assert!(!PageSize::LETTER.is_infinite());
    }
}
