//! Freehand tool: sample the pointer while pressed, simplify on release.

use super::{ToolContext, ToolResponse, ToolState};
use crate::commands::Command;
use crate::error::EditorResult;
use crate::input::InputEvent;
use crate::items::{Freehand, Item, ItemKind};
use crate::settings::Settings;
use kurbo::Point;

/// Samples closer than this to the previous one are skipped.
const MIN_SAMPLE_DISTANCE: f64 = 0.5;

pub(super) fn handle(
    state: &mut ToolState,
    event: InputEvent,
    ctx: &mut ToolContext<'_>,
) -> EditorResult<ToolResponse> {
    match event {
        InputEvent::Press { position, .. } => {
            *state = ToolState::Sketching {
                points: vec![ctx.snap(position)],
            };
            Ok(ToolResponse::Updated)
        }
        InputEvent::Move { position, .. } => {
            let ToolState::Sketching { points } = state else {
                return Ok(ToolResponse::Ignored);
            };
            sample(points, ctx.snap(position));
            Ok(ToolResponse::Updated)
        }
        InputEvent::Release { position, .. } => {
            let ToolState::Sketching { mut points } = std::mem::take(state) else {
                return Ok(ToolResponse::Ignored);
            };
            sample(&mut points, ctx.snap(position));
            let Some(Item::Freehand(mut stroke)) = preview(&points, ctx.settings()) else {
                return Ok(ToolResponse::Cancelled);
            };
            stroke.simplify(ctx.settings().freehand_tolerance);
            let item = Item::Freehand(stroke);
            let id = item.id();
            let command = Command::add_item(ctx.document(), ctx.current_page(), item)?;
            ctx.command_stack().execute(command)?;
            Ok(ToolResponse::Created(id))
        }
        InputEvent::Key { .. } | InputEvent::DoubleActivate { .. } => Ok(ToolResponse::Ignored),
    }
}

fn sample(points: &mut Vec<Point>, point: Point) {
    if points
        .last()
        .is_none_or(|last| (point - *last).hypot() >= MIN_SAMPLE_DISTANCE)
    {
        points.push(point);
    }
}

/// The stroke as it would be committed, before simplification.
pub(super) fn preview(points: &[Point], settings: &Settings) -> Option<Item> {
    let mut stroke = Freehand::from_page_points(points)?;
    stroke.style = settings.defaults.style_for(ItemKind::Freehand);
    Some(Item::Freehand(stroke))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::ToolKind;
    use super::*;
    use crate::input::Key;

    #[test]
    fn test_stroke_is_simplified_and_committed() {
        let mut h = Harness::new();
        h.set_tool(ToolKind::Freehand);
        h.send(InputEvent::press(Point::new(0.0, 0.0)));
        for x in 1..=100 {
            h.send(InputEvent::moved(Point::new(x as f64, 0.0)));
        }
        assert!(h.machine.preview(&h.settings).is_some());
        let response = h.send(InputEvent::release(Point::new(100.0, 0.0)));
        let ToolResponse::Created(id) = response else {
            panic!("expected a stroke, got {response:?}");
        };
        let points = h.document.item(id).unwrap().points().unwrap().to_vec();
        assert_eq!(points.len(), 2);
        assert_eq!(h.machine.tool(), ToolKind::Select);
        assert_eq!(h.stack.undo_count(), 1);
        h.assert_consistent();
    }

    #[test]
    fn test_single_point_is_discarded() {
        let mut h = Harness::new();
        h.set_tool(ToolKind::Freehand);
        assert_eq!(h.drag(Point::new(5.0, 5.0), Point::new(5.0, 5.0)), ToolResponse::Cancelled);
        assert_eq!(h.document.item_count(), 0);
        assert_eq!(h.machine.tool(), ToolKind::Freehand);
    }

    #[test]
    fn test_escape_discards_stroke() {
        let mut h = Harness::new();
        h.set_tool(ToolKind::Freehand);
        h.send(InputEvent::press(Point::ZERO));
        h.send(InputEvent::moved(Point::new(50.0, 50.0)));
        assert_eq!(h.send(InputEvent::key(Key::Escape)), ToolResponse::Cancelled);
        assert_eq!(h.send(InputEvent::release(Point::new(50.0, 50.0))), ToolResponse::Ignored);
        assert_eq!(h.document.item_count(), 0);
    }
}
