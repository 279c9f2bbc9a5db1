//! Item records: the serializable description of every placeable object.
//!
//! Records are plain values. They know nothing about the live scene; the
//! coupling runs one way through [`crate::scene`].

mod arrow;
mod ellipse;
mod freehand;
mod group;
mod image;
mod line;
mod polygon;
mod rectangle;
mod text;

pub use arrow::Arrow;
pub use ellipse::Ellipse;
pub use freehand::Freehand;
pub use group::Group;
pub use image::{Image, ImageFormat};
pub use line::Line;
pub use polygon::Polygon;
pub use rectangle::Rectangle;
pub use text::{Text, TextAlign, TextFormat};

use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for item records. Globally unique across pages.
pub type ItemId = Uuid;

/// Generate a fresh item id.
pub fn new_item_id() -> ItemId {
    Uuid::new_v4()
}

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn red() -> Self {
        Self::rgb(255, 0, 0)
    }

    /// Default fill for closed shapes.
    pub const fn default_fill() -> Self {
        Self::rgb(0x4A, 0x90, 0xD9)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Self::rgb(r, g, b))
            }
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb` (alpha appended when not opaque).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Placement of an item on its page. All lengths are in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Top-left corner of the unrotated box.
    pub position: Point,
    /// Width and height of the unrotated box.
    pub size: Size,
    /// Rotation in degrees, clockwise, around the box centre.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub flip_h: bool,
    #[serde(default)]
    pub flip_v: bool,
}

impl Transform {
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            position,
            size,
            rotation: 0.0,
            flip_h: false,
            flip_v: false,
        }
    }

    /// Box from two opposite corners, normalized to a non-negative size.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let rect = Rect::from_points(p1, p2);
        Self::new(rect.origin(), rect.size())
    }

    /// The unrotated box in page coordinates.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Matrix mapping item-local coordinates (origin at `position`) to page coordinates.
    pub fn affine(&self) -> Affine {
        let pivot = Point::new(self.size.width / 2.0, self.size.height / 2.0);
        let sx = if self.flip_h { -1.0 } else { 1.0 };
        let sy = if self.flip_v { -1.0 } else { 1.0 };
        let flip = Affine::translate(pivot.to_vec2())
            * Affine::scale_non_uniform(sx, sy)
            * Affine::translate(-pivot.to_vec2());
        let rotate = Affine::rotate_about(self.rotation.to_radians(), pivot);
        Affine::translate(self.position.to_vec2()) * rotate * flip
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Point::ZERO, Size::new(100.0, 100.0))
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// Fill and stroke. `None` colors mean "not painted".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStyle {
    pub fill_color: Option<SerializableColor>,
    pub stroke_color: Option<SerializableColor>,
    pub stroke_width: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl ItemStyle {
    /// Closed shapes: filled and outlined.
    pub fn filled() -> Self {
        Self {
            fill_color: Some(SerializableColor::default_fill()),
            stroke_color: Some(SerializableColor::black()),
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }

    /// Open strokes: outline only.
    pub fn stroked(width: f64) -> Self {
        Self {
            fill_color: None,
            stroke_color: Some(SerializableColor::black()),
            stroke_width: width,
            opacity: 1.0,
        }
    }

    /// Nothing painted (images, groups, text boxes).
    pub fn unpainted() -> Self {
        Self {
            fill_color: None,
            stroke_color: None,
            stroke_width: 0.0,
            opacity: 1.0,
        }
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill_color.map(|c| with_opacity(c, self.opacity))
    }

    /// Get the stroke color with opacity applied. `None` when the stroke is not drawn.
    pub fn stroke_with_opacity(&self) -> Option<Color> {
        if self.stroke_width <= 0.0 {
            return None;
        }
        self.stroke_color.map(|c| with_opacity(c, self.opacity))
    }
}

impl Default for ItemStyle {
    fn default() -> Self {
        Self::filled()
    }
}

fn with_opacity(color: SerializableColor, opacity: f64) -> Color {
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)) as u8;
    Color::from_rgba8(color.r, color.g, color.b, alpha)
}

fn default_visible() -> bool {
    true
}

/// Per-item metadata shown in the layers panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    #[serde(default)]
    pub name: String,
    /// Locked items cannot be moved or resized by tools.
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl Default for ItemMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            locked: false,
            visible: true,
        }
    }
}

/// Variant tag of an item record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Rectangle,
    Ellipse,
    Line,
    Arrow,
    Polygon,
    Text,
    Image,
    Freehand,
    Group,
}

impl ItemKind {
    pub const ALL: [ItemKind; 9] = [
        ItemKind::Rectangle,
        ItemKind::Ellipse,
        ItemKind::Line,
        ItemKind::Arrow,
        ItemKind::Polygon,
        ItemKind::Text,
        ItemKind::Image,
        ItemKind::Freehand,
        ItemKind::Group,
    ];

    /// The tag used in the persisted format.
    pub fn tag(self) -> &'static str {
        match self {
            ItemKind::Rectangle => "Rectangle",
            ItemKind::Ellipse => "Ellipse",
            ItemKind::Line => "Line",
            ItemKind::Arrow => "Arrow",
            ItemKind::Polygon => "Polygon",
            ItemKind::Text => "Text",
            ItemKind::Image => "Image",
            ItemKind::Freehand => "Freehand",
            ItemKind::Group => "Group",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Style given to new records of this kind.
    pub fn default_style(self) -> ItemStyle {
        match self {
            ItemKind::Rectangle => Rectangle::default_style(),
            ItemKind::Ellipse => Ellipse::default_style(),
            ItemKind::Line => Line::default_style(),
            ItemKind::Arrow => Arrow::default_style(),
            ItemKind::Polygon => Polygon::default_style(),
            ItemKind::Text => Text::default_style(),
            ItemKind::Image => Image::default_style(),
            ItemKind::Freehand => Freehand::default_style(),
            ItemKind::Group => Group::default_style(),
        }
    }
}

/// Common trait for all item records.
pub trait ItemTrait {
    /// Get the unique identifier.
    fn id(&self) -> ItemId;

    fn transform(&self) -> &Transform;

    fn transform_mut(&mut self) -> &mut Transform;

    fn style(&self) -> &ItemStyle;

    fn style_mut(&mut self) -> &mut ItemStyle;

    fn meta(&self) -> &ItemMeta;

    fn meta_mut(&mut self) -> &mut ItemMeta;

    /// Outline in item-local coordinates (origin at the transform position).
    fn local_path(&self) -> BezPath;

    /// Local-space box used for bounds. Defaults to the transform size.
    fn local_bounds(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.transform().size)
    }

    /// Style given to freshly created records of this variant.
    fn default_style() -> ItemStyle
    where
        Self: Sized;
}

/// Enum wrapper for all item records (for storage and dispatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Line(Line),
    Arrow(Arrow),
    Polygon(Polygon),
    Text(Text),
    Image(Image),
    Freehand(Freehand),
    Group(Group),
}

macro_rules! each_variant {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Item::Rectangle($inner) => $body,
            Item::Ellipse($inner) => $body,
            Item::Line($inner) => $body,
            Item::Arrow($inner) => $body,
            Item::Polygon($inner) => $body,
            Item::Text($inner) => $body,
            Item::Image($inner) => $body,
            Item::Freehand($inner) => $body,
            Item::Group($inner) => $body,
        }
    };
}

impl Item {
    pub fn id(&self) -> ItemId {
        each_variant!(self, s => s.id())
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Rectangle(_) => ItemKind::Rectangle,
            Item::Ellipse(_) => ItemKind::Ellipse,
            Item::Line(_) => ItemKind::Line,
            Item::Arrow(_) => ItemKind::Arrow,
            Item::Polygon(_) => ItemKind::Polygon,
            Item::Text(_) => ItemKind::Text,
            Item::Image(_) => ItemKind::Image,
            Item::Freehand(_) => ItemKind::Freehand,
            Item::Group(_) => ItemKind::Group,
        }
    }

    pub fn transform(&self) -> &Transform {
        each_variant!(self, s => s.transform())
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        each_variant!(self, s => s.transform_mut())
    }

    pub fn style(&self) -> &ItemStyle {
        each_variant!(self, s => s.style())
    }

    pub fn style_mut(&mut self) -> &mut ItemStyle {
        each_variant!(self, s => s.style_mut())
    }

    pub fn meta(&self) -> &ItemMeta {
        each_variant!(self, s => s.meta())
    }

    pub fn meta_mut(&mut self) -> &mut ItemMeta {
        each_variant!(self, s => s.meta_mut())
    }

    /// Outline in page coordinates.
    pub fn to_path(&self) -> BezPath {
        let mut path = each_variant!(self, s => s.local_path());
        path.apply_affine(self.transform().affine());
        path
    }

    /// Axis-aligned bounding box in page coordinates.
    pub fn bounds(&self) -> Rect {
        let local = each_variant!(self, s => s.local_bounds());
        self.transform().affine().transform_rect_bbox(local)
    }

    /// Check if a point (in page coordinates) falls inside the bounds.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    /// Move the item by an offset in page coordinates.
    pub fn translate(&mut self, delta: Vec2) {
        self.transform_mut().position += delta;
        match self {
            Item::Line(line) => line.end += delta,
            Item::Arrow(arrow) => arrow.end += delta,
            _ => {}
        }
    }

    /// Resize the unrotated box, scaling point payloads along with it.
    pub fn resize(&mut self, size: Size) {
        let size = Size::new(size.width.max(0.0), size.height.max(0.0));
        match self {
            Item::Line(line) => line.set_extent(size),
            Item::Arrow(arrow) => arrow.set_extent(size),
            Item::Polygon(polygon) => {
                polygon.points = scale_points(&polygon.points, polygon.transform.size, size);
                polygon.transform.size = size;
            }
            Item::Freehand(freehand) => {
                freehand.points = scale_points(&freehand.points, freehand.transform.size, size);
                freehand.transform.size = size;
            }
            other => other.transform_mut().size = size,
        }
    }

    /// Scale position and extent about `origin` (page coordinates). Factors
    /// are clamped to stay positive.
    pub fn scale_about(&mut self, origin: Point, sx: f64, sy: f64) {
        let sx = sx.max(f64::EPSILON);
        let sy = sy.max(f64::EPSILON);
        let scale = |p: Point| Point::new(origin.x + (p.x - origin.x) * sx, origin.y + (p.y - origin.y) * sy);
        let position = scale(self.transform().position);
        match &mut *self {
            Item::Line(line) => line.end = scale(line.end),
            Item::Arrow(arrow) => arrow.end = scale(arrow.end),
            other => {
                let size = other.transform().size;
                other.resize(Size::new(size.width * sx, size.height * sy));
            }
        }
        self.transform_mut().position = position;
    }

    /// Mirror across the vertical (`horizontal`) or horizontal axis through `center`.
    pub fn flip_about(&mut self, center: Point, horizontal: bool) {
        let mirror = |p: Point| {
            if horizontal {
                Point::new(2.0 * center.x - p.x, p.y)
            } else {
                Point::new(p.x, 2.0 * center.y - p.y)
            }
        };
        match self {
            Item::Line(line) => {
                line.transform.position = mirror(line.transform.position);
                line.end = mirror(line.end);
            }
            Item::Arrow(arrow) => {
                arrow.transform.position = mirror(arrow.transform.position);
                arrow.end = mirror(arrow.end);
            }
            other => {
                let own = other.transform().center();
                other.translate(mirror(own) - own);
                let t = other.transform_mut();
                if horizontal {
                    t.flip_h = !t.flip_h;
                } else {
                    t.flip_v = !t.flip_v;
                }
                t.rotation = normalize_degrees(-t.rotation);
            }
        }
    }

    /// Rotate clockwise by `degrees` around `pivot` (page coordinates).
    pub fn rotate_about(&mut self, pivot: Point, degrees: f64) {
        let rotation = Affine::rotate_about(degrees.to_radians(), pivot);
        match self {
            Item::Line(line) => {
                line.transform.position = rotation * line.transform.position;
                line.end = rotation * line.end;
            }
            Item::Arrow(arrow) => {
                arrow.transform.position = rotation * arrow.transform.position;
                arrow.end = rotation * arrow.end;
            }
            other => {
                let own = other.transform().center();
                other.translate(rotation * own - own);
                let t = other.transform_mut();
                t.rotation = normalize_degrees(t.rotation + degrees);
            }
        }
    }

    /// Ids of other records this one refers to. Groups are the only kind today.
    pub fn referenced_ids(&self) -> &[ItemId] {
        match self {
            Item::Group(group) => &group.child_ids,
            _ => &[],
        }
    }

    /// Rewrite references through `map`; references `map` rejects are dropped.
    pub fn remap_references(&mut self, mut map: impl FnMut(ItemId) -> Option<ItemId>) {
        if let Item::Group(group) = self {
            group.child_ids = group.child_ids.iter().filter_map(|&id| map(id)).collect();
        }
    }

    /// Assign a new id. Used by copy/paste and page duplication.
    pub(crate) fn set_id(&mut self, id: ItemId) {
        each_variant!(self, s => s.id = id)
    }

    /// Check if this item is a group.
    pub fn is_group(&self) -> bool {
        matches!(self, Item::Group(_))
    }

    /// Get the group if this item is a group.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Item::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Item::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Item::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Item::Image(img) => Some(img),
            _ => None,
        }
    }

    /// Vertex list for point-based variants.
    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Item::Polygon(p) => Some(&p.points),
            Item::Freehand(f) => Some(&f.points),
            _ => None,
        }
    }

    /// Vertices in page coordinates for point-based variants, following
    /// rotation and flips.
    pub fn vertices(&self) -> Option<Vec<Point>> {
        let affine = self.transform().affine();
        self.points()
            .map(|points| points.iter().map(|p| affine * *p).collect())
    }

    /// Move vertex `index` of a polygon or freehand stroke to `to` (page
    /// coordinates) and re-anchor the box on the new extent. Returns `false`
    /// for other variants or an out-of-range index.
    pub fn move_vertex(&mut self, index: usize, to: Point) -> bool {
        let local = self.transform().affine().inverse() * to;
        let (transform, points) = match self {
            Item::Polygon(polygon) => (&mut polygon.transform, &mut polygon.points),
            Item::Freehand(freehand) => (&mut freehand.transform, &mut freehand.points),
            _ => return false,
        };
        let Some(vertex) = points.get_mut(index) else {
            return false;
        };
        *vertex = local;
        if let Some(extent) = points_bounds(points.as_slice()) {
            let shift = extent.origin().to_vec2();
            for point in points.iter_mut() {
                *point -= shift;
            }
            transform.position += shift;
            transform.size = extent.size();
        }
        true
    }

    /// End point for line-based variants.
    pub fn end_point(&self) -> Option<Point> {
        match self {
            Item::Line(l) => Some(l.end),
            Item::Arrow(a) => Some(a.end),
            _ => None,
        }
    }
}

/// Wrap an angle into `[0, 360)`.
pub(crate) fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 || wrapped == 0.0 { 0.0 } else { wrapped }
}

/// Scale local points from one box size to another. Degenerate axes stay put.
fn scale_points(points: &[Point], from: Size, to: Size) -> Vec<Point> {
    let sx = if from.width.abs() < f64::EPSILON { 1.0 } else { to.width / from.width };
    let sy = if from.height.abs() < f64::EPSILON { 1.0 } else { to.height / from.height };
    points.iter().map(|p| Point::new(p.x * sx, p.y * sy)).collect()
}

/// Bounding box of a point list, or `None` when empty.
pub(crate) fn points_bounds(points: &[Point]) -> Option<Rect> {
    let first = *points.first()?;
    Some(
        points
            .iter()
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(*p)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ItemKind::from_tag("Star"), None);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(SerializableColor::from_hex("#4A90D9"), Some(SerializableColor::default_fill()));
        assert_eq!(SerializableColor::from_hex("#f00"), Some(SerializableColor::red()));
        assert_eq!(SerializableColor::from_hex("nope"), None);
        assert_eq!(SerializableColor::red().to_hex(), "#ff0000");
    }

    #[test]
    fn test_transform_affine_identity() {
        let t = Transform::new(Point::new(10.0, 20.0), Size::new(100.0, 50.0));
        let p = t.affine() * Point::ZERO;
        assert!((p.x - 10.0).abs() < f64::EPSILON);
        assert!((p.y - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rotated_bounds_grow() {
        let mut rect = Item::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0));
        rect.transform_mut().rotation = 90.0;
        let bounds = rect.bounds();
        assert!((bounds.width() - 50.0).abs() < 1e-9);
        assert!((bounds.height() - 100.0).abs() < 1e-9);
        assert!((bounds.center().x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_translate_moves_line_end() {
        let mut line = Item::Line(Line::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
        line.translate(Vec2::new(5.0, 5.0));
        assert_eq!(line.transform().position, Point::new(5.0, 5.0));
        assert_eq!(line.end_point(), Some(Point::new(15.0, 15.0)));
    }

    #[test]
    fn test_resize_scales_polygon_points() {
        let mut poly = Item::Polygon(Polygon::from_page_points(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]).expect("three points"));
        poly.resize(Size::new(20.0, 40.0));
        assert_eq!(poly.points().map(|p| p[2]), Some(Point::new(20.0, 40.0)));
    }

    #[test]
    fn test_scale_about_origin() {
        let mut rect = Item::Rectangle(Rectangle::new(Point::new(10.0, 10.0), 10.0, 10.0));
        rect.scale_about(Point::ZERO, 2.0, 3.0);
        assert_eq!(rect.transform().position, Point::new(20.0, 30.0));
        assert_eq!(rect.transform().size, Size::new(20.0, 30.0));

        let mut line = Item::Line(Line::new(Point::new(10.0, 10.0), Point::new(20.0, 0.0)));
        line.scale_about(Point::new(10.0, 0.0), 2.0, 1.0);
        assert_eq!(line.transform().position, Point::new(10.0, 10.0));
        assert_eq!(line.end_point(), Some(Point::new(30.0, 0.0)));
    }

    #[test]
    fn test_flip_about_own_center_keeps_box() {
        let mut rect = Item::Rectangle(Rectangle::new(Point::new(10.0, 10.0), 40.0, 20.0));
        let center = rect.transform().center();
        rect.flip_about(center, true);
        assert_eq!(rect.transform().position, Point::new(10.0, 10.0));
        assert!(rect.transform().flip_h);
        rect.flip_about(center, true);
        assert!(!rect.transform().flip_h);
    }

    #[test]
    fn test_rotate_about_pivot() {
        let mut rect = Item::Rectangle(Rectangle::new(Point::new(10.0, -5.0), 10.0, 10.0));
        rect.rotate_about(Point::ZERO, 90.0);
        let center = rect.transform().center();
        assert!(center.x.abs() < 1e-9);
        assert!((center.y - 15.0).abs() < 1e-9);
        assert!((rect.transform().rotation - 90.0).abs() < 1e-9);

        rect.rotate_about(center, 300.0);
        assert!((rect.transform().rotation - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_vertex_reanchors_box() {
        let mut polygon = Item::Polygon(
            Polygon::from_page_points(&[
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(50.0, 80.0),
            ])
            .unwrap(),
        );
        assert!(polygon.move_vertex(0, Point::new(-20.0, 10.0)));
        assert_eq!(polygon.transform().position, Point::new(-20.0, 0.0));
        assert_eq!(polygon.transform().size, Size::new(120.0, 80.0));
        assert_eq!(polygon.points().unwrap()[0], Point::new(0.0, 10.0));
        assert_eq!(
            polygon.vertices().unwrap(),
            vec![Point::new(-20.0, 10.0), Point::new(100.0, 0.0), Point::new(50.0, 80.0)]
        );

        let before = polygon.clone();
        assert!(!polygon.move_vertex(3, Point::ZERO));
        assert_eq!(polygon, before);
        let mut rect = Item::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0));
        assert!(!rect.move_vertex(0, Point::ZERO));
        assert!(rect.vertices().is_none());
    }

    #[test]
    fn test_remap_drops_rejected_references() {
        let a = new_item_id();
        let b = new_item_id();
        let mut group = Item::Group(Group::new(vec![a, b]));
        let replacement = new_item_id();
        group.remap_references(|id| (id == a).then_some(replacement));
        assert_eq!(group.referenced_ids(), &[replacement]);
    }

    #[test]
    fn test_style_opacity() {
        let mut style = ItemStyle::filled();
        style.opacity = 0.5;
        let fill = style.fill_with_opacity().expect("filled");
        assert_eq!(fill.to_rgba8().a, 127);
        assert!(ItemStyle::unpainted().stroke_with_opacity().is_none());
    }
}
