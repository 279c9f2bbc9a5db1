//! Live scene nodes and the two sync directions.

use crate::items::{Item, ItemId, ItemKind, ItemStyle, Transform};
use kurbo::{Affine, BezPath, Point, Rect};
use peniko::Color;

/// Drawable state of one item, linked to its record by id.
///
/// The first group of fields mirrors the record and is what [`push`] writes
/// and [`pull`] reads. `path`, `affine` and `bounds` are derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: ItemId,
    pub kind: ItemKind,
    pub transform: Transform,
    pub style: ItemStyle,
    pub visible: bool,
    /// Line and arrow end point.
    pub end: Option<Point>,
    /// Polygon and freehand vertices, local to the transform.
    pub points: Option<Vec<Point>>,
    /// Text content.
    pub content: Option<String>,

    /// Outline in page coordinates.
    pub path: BezPath,
    pub affine: Affine,
    pub bounds: Rect,
}

impl SceneNode {
    /// Fill color with opacity applied, for renderers.
    pub fn fill(&self) -> Option<Color> {
        self.style.fill_with_opacity()
    }

    /// Stroke color with opacity applied, for renderers.
    pub fn stroke(&self) -> Option<Color> {
        self.style.stroke_with_opacity()
    }

    /// Whether the synchronized fields equal those of `item`.
    pub fn matches(&self, item: &Item) -> bool {
        *self == push(item)
    }
}

/// Record fields a committed gesture writes back.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPatch {
    pub id: ItemId,
    pub transform: Transform,
    pub end: Option<Point>,
    pub points: Option<Vec<Point>>,
}

impl RecordPatch {
    /// A copy of `item` with the patch applied. Fields the variant does not
    /// carry are ignored.
    pub fn apply_to(&self, item: &Item) -> Item {
        let mut out = item.clone();
        *out.transform_mut() = self.transform;
        match &mut out {
            Item::Line(line) => {
                if let Some(end) = self.end {
                    line.end = end;
                }
            }
            Item::Arrow(arrow) => {
                if let Some(end) = self.end {
                    arrow.end = end;
                }
            }
            Item::Polygon(polygon) => {
                if let Some(points) = &self.points {
                    polygon.points = points.clone();
                }
            }
            Item::Freehand(freehand) => {
                if let Some(points) = &self.points {
                    freehand.points = points.clone();
                }
            }
            _ => {}
        }
        out
    }
}

/// Materialize the live representation of a record.
pub fn push(item: &Item) -> SceneNode {
    let content = match item {
        Item::Text(text) => Some(text.content.clone()),
        _ => None,
    };
    SceneNode {
        id: item.id(),
        kind: item.kind(),
        transform: *item.transform(),
        style: item.style().clone(),
        visible: item.meta().visible,
        end: item.end_point(),
        points: item.points().map(<[Point]>::to_vec),
        content,
        path: item.to_path(),
        affine: item.transform().affine(),
        bounds: item.bounds(),
    }
}

/// Capture the interactive geometry of a node as a record patch.
pub fn pull(node: &SceneNode) -> RecordPatch {
    RecordPatch {
        id: node.id,
        transform: node.transform,
        end: node.end,
        points: node.points.clone(),
    }
}
