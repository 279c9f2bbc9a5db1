//! Polygon tool: click vertices, close with double-activate or Enter.

use super::{ToolContext, ToolResponse, ToolState};
use crate::commands::Command;
use crate::error::EditorResult;
use crate::input::{InputEvent, Key};
use crate::items::{Item, ItemKind, Polygon};
use crate::settings::Settings;
use kurbo::Point;

/// Consecutive vertices closer than this are merged when closing.
const MERGE_DISTANCE: f64 = 1.0;

pub(super) fn handle(
    state: &mut ToolState,
    event: InputEvent,
    ctx: &mut ToolContext<'_>,
) -> EditorResult<ToolResponse> {
    match event {
        InputEvent::Press { position, .. } => {
            let point = ctx.snap(position);
            match state {
                ToolState::CollectingVertices { points, hover } => {
                    points.push(point);
                    *hover = None;
                }
                _ => {
                    *state = ToolState::CollectingVertices {
                        points: vec![point],
                        hover: None,
                    }
                }
            }
            Ok(ToolResponse::Updated)
        }
        InputEvent::Move { position, .. } => match state {
            ToolState::CollectingVertices { hover, .. } => {
                *hover = Some(ctx.snap(position));
                Ok(ToolResponse::Updated)
            }
            _ => Ok(ToolResponse::Ignored),
        },
        InputEvent::DoubleActivate { .. } | InputEvent::Key { key: Key::Enter, .. } => finish(state, ctx),
        InputEvent::Release { .. } | InputEvent::Key { .. } => Ok(ToolResponse::Ignored),
    }
}

/// Close the outline. Fewer than three distinct vertices discards it.
pub(super) fn finish(state: &mut ToolState, ctx: &mut ToolContext<'_>) -> EditorResult<ToolResponse> {
    let ToolState::CollectingVertices { points, .. } = std::mem::take(state) else {
        return Ok(ToolResponse::Ignored);
    };
    let Some(item) = preview(&merged(points), None, ctx.settings()) else {
        log::debug!("polygon discarded: too few vertices");
        return Ok(ToolResponse::Cancelled);
    };
    let id = item.id();
    let command = Command::add_item(ctx.document(), ctx.current_page(), item)?;
    ctx.command_stack().execute(command)?;
    Ok(ToolResponse::Created(id))
}

/// The outline through the placed vertices and the hover position.
pub(super) fn preview(points: &[Point], hover: Option<Point>, settings: &Settings) -> Option<Item> {
    let mut vertices = points.to_vec();
    vertices.extend(hover);
    let mut polygon = Polygon::from_page_points(&vertices)?;
    polygon.style = settings.defaults.style_for(ItemKind::Polygon);
    Some(Item::Polygon(polygon))
}

/// Drop vertices that repeat their predecessor, as a double click places two.
fn merged(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if out
            .last()
            .is_none_or(|last| (point - *last).hypot() >= MERGE_DISTANCE)
        {
            out.push(point);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::ToolKind;
    use super::*;

    fn click(h: &mut Harness, x: f64, y: f64) {
        h.send(InputEvent::press(Point::new(x, y)));
        h.send(InputEvent::release(Point::new(x, y)));
    }

    #[test]
    fn test_double_activate_closes_polygon() {
        let mut h = Harness::new();
        h.set_tool(ToolKind::Polygon);
        click(&mut h, 0.0, 0.0);
        click(&mut h, 100.0, 0.0);
        click(&mut h, 100.0, 100.0);
        // The second press of a double click lands on the last vertex.
        h.send(InputEvent::press(Point::new(100.0, 100.0)));
        let response = h.send(InputEvent::DoubleActivate {
            position: Point::new(100.0, 100.0),
        });
        let ToolResponse::Created(id) = response else {
            panic!("expected a polygon, got {response:?}");
        };
        assert_eq!(h.document.item(id).unwrap().points().map(<[Point]>::len), Some(3));
        assert_eq!(h.machine.tool(), ToolKind::Select);
        assert_eq!(h.stack.undo_count(), 1);
        h.assert_consistent();
    }

    #[test]
    fn test_enter_with_two_vertices_discards() {
        let mut h = Harness::new();
        h.set_tool(ToolKind::Polygon);
        click(&mut h, 0.0, 0.0);
        click(&mut h, 100.0, 0.0);
        assert_eq!(h.send(InputEvent::key(Key::Enter)), ToolResponse::Cancelled);
        assert_eq!(h.document.item_count(), 0);
        assert_eq!(h.machine.tool(), ToolKind::Polygon);
    }

    #[test]
    fn test_escape_discards_vertices() {
        let mut h = Harness::new();
        h.set_tool(ToolKind::Polygon);
        click(&mut h, 0.0, 0.0);
        click(&mut h, 100.0, 0.0);
        click(&mut h, 100.0, 100.0);
        assert_eq!(h.send(InputEvent::key(Key::Escape)), ToolResponse::Cancelled);
        assert_eq!(h.document.item_count(), 0);
        assert!(!h.machine.is_busy());
    }

    #[test]
    fn test_tool_switch_commits_open_polygon() {
        let mut h = Harness::new();
        h.set_tool(ToolKind::Polygon);
        click(&mut h, 0.0, 0.0);
        click(&mut h, 100.0, 0.0);
        click(&mut h, 50.0, 80.0);
        h.send(InputEvent::moved(Point::new(10.0, 90.0)));
        assert!(h.machine.preview(&h.settings).is_some());
        let response = h.set_tool(ToolKind::Select);
        assert!(matches!(response, ToolResponse::Created(_)));
        assert_eq!(h.document.item_count(), 1);
        h.assert_consistent();
    }
}
