//! Box and segment drawing: rectangle, ellipse, line, arrow and text.
//!
//! The record is inserted on press inside a macro and reshaped through scene
//! previews while the pointer moves. Release commits the final geometry, or
//! cancels the macro when the drag was too small to mean anything.

use super::{ShapeKind, ToolContext, ToolResponse, ToolState};
use crate::commands::Command;
use crate::error::EditorResult;
use crate::input::InputEvent;
use crate::items::{Arrow, Ellipse, Item, ItemKind, Line, Rectangle, Text, Transform};
use crate::settings::Settings;
use kurbo::{Point, Size, Vec2};

/// Drags smaller than this (both axes for boxes, length for segments) are dropped.
const MIN_DRAG: f64 = 5.0;

/// Text boxes narrower or shorter than this fall back to the default box on that axis.
const MIN_TEXT_EXTENT: f64 = 20.0;

/// Angle step for shift-constrained segments, in degrees.
const ANGLE_STEP: f64 = 15.0;

/// What the drag produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Target {
    Shape(ShapeKind),
    Text,
}

impl Target {
    fn kind(self) -> ItemKind {
        match self {
            Target::Shape(ShapeKind::Rectangle) => ItemKind::Rectangle,
            Target::Shape(ShapeKind::Ellipse) => ItemKind::Ellipse,
            Target::Shape(ShapeKind::Line) => ItemKind::Line,
            Target::Shape(ShapeKind::Arrow) => ItemKind::Arrow,
            Target::Text => ItemKind::Text,
        }
    }

    /// A zero-extent record at `at` styled from the settings.
    fn seed(self, at: Point, settings: &Settings) -> Item {
        let mut item = match self {
            Target::Shape(ShapeKind::Rectangle) => Item::Rectangle(Rectangle::new(at, 0.0, 0.0)),
            Target::Shape(ShapeKind::Ellipse) => Item::Ellipse(Ellipse::new(at, 0.0, 0.0)),
            Target::Shape(ShapeKind::Line) => Item::Line(Line::new(at, at)),
            Target::Shape(ShapeKind::Arrow) => Item::Arrow(Arrow::new(at, at)),
            Target::Text => {
                let mut text = Text::new(at, Text::PLACEHOLDER.to_string());
                text.font_family = settings.defaults.font_family.clone();
                text.font_size = settings.defaults.font_size;
                text.transform.size = Size::ZERO;
                Item::Text(text)
            }
        };
        *item.style_mut() = settings.defaults.style_for(self.kind());
        item
    }
}

pub(super) fn handle(
    state: &mut ToolState,
    event: InputEvent,
    ctx: &mut ToolContext<'_>,
    target: Target,
) -> EditorResult<ToolResponse> {
    match event {
        InputEvent::Press { position, .. } => {
            if *state != ToolState::Idle {
                return Ok(ToolResponse::Ignored);
            }
            let start = ctx.snap(position);
            let item = target.seed(start, ctx.settings());
            let command = Command::add_item(ctx.document(), ctx.current_page(), item.clone())?;
            let mut stack = ctx.command_stack();
            stack.begin_macro(format!("Add {}", target.kind().tag()))?;
            if let Err(err) = stack.execute(command) {
                stack.cancel_macro()?;
                return Err(err);
            }
            *state = ToolState::Drawing {
                original: item,
                start,
                current: start,
            };
            Ok(ToolResponse::Updated)
        }
        InputEvent::Move { position, modifiers } => {
            let ToolState::Drawing {
                original,
                start,
                current,
            } = state
            else {
                return Ok(ToolResponse::Ignored);
            };
            *current = ctx.snap(position);
            let preview = reshape(original, *start, *current, modifiers.shift);
            let page = ctx.current_page();
            ctx.scene_for(page).push_preview(&preview)?;
            Ok(ToolResponse::Updated)
        }
        InputEvent::Release { position, modifiers } => {
            let ToolState::Drawing { original, start, .. } = std::mem::take(state) else {
                return Ok(ToolResponse::Ignored);
            };
            let end = ctx.snap(position);
            let page = ctx.current_page();
            let shaped = reshape(&original, start, end, modifiers.shift);

            if target != Target::Text && too_small(&shaped) {
                ctx.command_stack().cancel_macro()?;
                return Ok(ToolResponse::Cancelled);
            }
            let finished = match target {
                Target::Text => with_text_box(shaped),
                Target::Shape(_) => {
                    ctx.scene_for(page).push_preview(&shaped)?;
                    ctx.scene_for(page).pull(original.id())?.apply_to(&original)
                }
            };
            let id = original.id();
            let command = Command::replace_item(ctx.document(), original, finished)?;
            let mut stack = ctx.command_stack();
            if let Err(err) = stack.execute(command) {
                stack.cancel_macro()?;
                return Err(err);
            }
            stack.end_macro()?;
            Ok(ToolResponse::Created(id))
        }
        InputEvent::Key { .. } | InputEvent::DoubleActivate { .. } => Ok(ToolResponse::Ignored),
    }
}

/// The seeded record stretched from `start` to `current`.
fn reshape(original: &Item, start: Point, current: Point, constrain: bool) -> Item {
    let mut item = original.clone();
    match &mut item {
        Item::Line(line) => {
            line.transform.position = start;
            line.end = segment_end(start, current, constrain);
        }
        Item::Arrow(arrow) => {
            arrow.transform.position = start;
            arrow.end = segment_end(start, current, constrain);
        }
        other => {
            let rotation = other.transform().rotation;
            *other.transform_mut() = Transform {
                rotation,
                ..Transform::from_corners(start, current)
            };
        }
    }
    item
}

/// Segment end point, snapped to the nearest angle step when constrained.
fn segment_end(start: Point, current: Point, constrain: bool) -> Point {
    if !constrain {
        return current;
    }
    let delta = current - start;
    let length = delta.hypot();
    let step = ANGLE_STEP.to_radians();
    let angle = (delta.atan2() / step).round() * step;
    start + Vec2::from_angle(angle) * length
}

fn too_small(item: &Item) -> bool {
    match item {
        Item::Line(line) => line.length() < MIN_DRAG,
        Item::Arrow(arrow) => (arrow.end - arrow.start()).hypot() < MIN_DRAG,
        other => {
            let size = other.transform().size;
            size.width < MIN_DRAG && size.height < MIN_DRAG
        }
    }
}

/// Replace degenerate text box axes with the default box.
fn with_text_box(mut item: Item) -> Item {
    let size = item.transform().size;
    let width = if size.width < MIN_TEXT_EXTENT { Text::DEFAULT_BOX.width } else { size.width };
    let height = if size.height < MIN_TEXT_EXTENT { Text::DEFAULT_BOX.height } else { size.height };
    item.transform_mut().size = Size::new(width, height);
    item
}
