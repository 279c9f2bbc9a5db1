//! Select tool: click, shift-click, rubber band, move, resize and rotate,
//! plus vertex editing of polygons and freehand strokes.

use super::{ToolContext, ToolRequest, ToolResponse, ToolState, commit_previews, revert_all};
use crate::error::EditorResult;
use crate::input::{InputEvent, Key, Modifiers};
use crate::items::{Item, ItemId, ItemKind};
use crate::selection::{hits_resize_handle, hits_rotate_handle, top_level_ancestor, vertex_handle_at};
use kurbo::{Point, Rect, Vec2};

/// Hit tolerance for clicking items, in points.
const HIT_TOLERANCE: f64 = 2.0;

/// Smallest box a resize may produce, in points.
const MIN_RESIZE: f64 = 1.0;

pub(super) fn handle(
    state: &mut ToolState,
    event: InputEvent,
    ctx: &mut ToolContext<'_>,
) -> EditorResult<ToolResponse> {
    match event {
        InputEvent::Press { position, modifiers } => press(state, position, modifiers, ctx),
        InputEvent::Move { position, .. } => drag_to(state, position, ctx),
        InputEvent::Release { position, modifiers } => release(state, position, modifiers, ctx),
        InputEvent::Key { key, .. } => Ok(key_press(key, ctx)),
        InputEvent::DoubleActivate { position } => Ok(double_activate(state, position, ctx)),
    }
}

fn press(
    state: &mut ToolState,
    position: Point,
    modifiers: Modifiers,
    ctx: &mut ToolContext<'_>,
) -> EditorResult<ToolResponse> {
    if let ToolState::EditingVertices { target } = *state {
        if let Some(next) = vertex_press(target, position, ctx)? {
            *state = next;
            return Ok(ToolResponse::Updated);
        }
        *state = ToolState::Idle;
    }

    let page_index = ctx.current_page();
    let page = ctx.document().page(page_index)?;

    if !modifiers.shift {
        if let Some(item) = ctx.selection().single().and_then(|id| page.item(id)) {
            if !item.meta().locked && hits_rotate_handle(item.bounds(), position) {
                let pivot = item.bounds().center();
                let label = format!("Rotate {}", item.kind().tag());
                let originals = records(ctx, &[item.id()])?;
                ctx.command_stack().begin_macro(label)?;
                *state = ToolState::Rotating {
                    originals,
                    pivot,
                    start_angle: angle_from(pivot, position),
                };
                return Ok(ToolResponse::Updated);
            }
            if !item.meta().locked && hits_resize_handle(item.bounds(), position) {
                let anchor = item.bounds();
                let keep_aspect = item.as_image().is_some_and(|image| image.maintain_aspect);
                let label = format!("Resize {}", item.kind().tag());
                let originals = records(ctx, &[item.id()])?;
                ctx.command_stack().begin_macro(label)?;
                *state = ToolState::Resizing {
                    originals,
                    anchor,
                    keep_aspect,
                };
                return Ok(ToolResponse::Updated);
            }
        }
    }

    let hit = page
        .item_at(position, HIT_TOLERANCE)
        .map(|item| top_level_ancestor(page, item.id()));

    let Some(hit) = hit else {
        if !modifiers.shift {
            ctx.selection_mut().clear();
        }
        *state = ToolState::RubberBand {
            start: position,
            current: position,
        };
        return Ok(ToolResponse::Updated);
    };

    if modifiers.shift {
        ctx.selection_mut().toggle(hit);
        return Ok(ToolResponse::Updated);
    }
    if !ctx.selection().contains(hit) {
        ctx.selection_mut().set([hit]);
    }

    let selected = ctx.selection().ids().to_vec();
    let originals = records(ctx, &selected)?;
    if originals.iter().any(|item| item.meta().locked) {
        return Ok(ToolResponse::Updated);
    }
    ctx.command_stack().begin_macro("Move")?;
    *state = ToolState::Moving {
        originals,
        start: ctx.snap(position),
    };
    Ok(ToolResponse::Updated)
}

fn drag_to(state: &mut ToolState, position: Point, ctx: &mut ToolContext<'_>) -> EditorResult<ToolResponse> {
    let page = ctx.current_page();
    match state {
        ToolState::Moving { originals, start } => {
            let delta = ctx.snap(position) - *start;
            let mut scene = ctx.scene_for(page);
            for original in originals.iter() {
                scene.push_preview(&moved(original, delta))?;
            }
            Ok(ToolResponse::Updated)
        }
        ToolState::Resizing {
            originals,
            anchor,
            keep_aspect,
        } => {
            let (sx, sy) = scale_factors(*anchor, ctx.snap(position), *keep_aspect);
            let origin = anchor.origin();
            let mut scene = ctx.scene_for(page);
            for original in originals.iter() {
                let mut preview = original.clone();
                preview.scale_about(origin, sx, sy);
                scene.push_preview(&preview)?;
            }
            Ok(ToolResponse::Updated)
        }
        ToolState::Rotating {
            originals,
            pivot,
            start_angle,
        } => {
            let degrees = (angle_from(*pivot, position) - *start_angle).to_degrees();
            let mut scene = ctx.scene_for(page);
            for original in originals.iter() {
                let mut preview = original.clone();
                preview.rotate_about(*pivot, degrees);
                scene.push_preview(&preview)?;
            }
            Ok(ToolResponse::Updated)
        }
        ToolState::DraggingVertex { original, index } => {
            let to = ctx.snap(position);
            let mut preview = original.clone();
            preview.move_vertex(*index, to);
            ctx.scene_for(page).push_preview(&preview)?;
            Ok(ToolResponse::Updated)
        }
        ToolState::RubberBand { current, .. } => {
            *current = position;
            Ok(ToolResponse::Updated)
        }
        _ => Ok(ToolResponse::Ignored),
    }
}

fn release(
    state: &mut ToolState,
    position: Point,
    modifiers: Modifiers,
    ctx: &mut ToolContext<'_>,
) -> EditorResult<ToolResponse> {
    match state {
        ToolState::Moving { .. }
        | ToolState::Resizing { .. }
        | ToolState::Rotating { .. }
        | ToolState::DraggingVertex { .. } => {
            drag_to(state, position, ctx)?;
            let page = ctx.current_page();
            let (originals, next) = match std::mem::take(state) {
                ToolState::Moving { originals, .. }
                | ToolState::Resizing { originals, .. }
                | ToolState::Rotating { originals, .. } => (originals, ToolState::Idle),
                // Vertex handles stay up for the next drag.
                ToolState::DraggingVertex { original, .. } => {
                    let target = original.id();
                    (vec![original], ToolState::EditingVertices { target })
                }
                _ => (Vec::new(), ToolState::Idle),
            };
            if let Err(err) = commit_previews(ctx, page, &originals) {
                ctx.command_stack().cancel_macro()?;
                revert_all(ctx, page, &originals)?;
                return Err(err);
            }
            *state = next;
            if ctx.command_stack().end_macro()? {
                Ok(ToolResponse::Committed)
            } else {
                Ok(ToolResponse::Updated)
            }
        }
        ToolState::RubberBand { start, .. } => {
            let rect = Rect::from_points(*start, position);
            *state = ToolState::Idle;
            let page = ctx.document().page(ctx.current_page())?;
            let inside: Vec<_> = page
                .items_in_rect(rect)
                .into_iter()
                .filter(|id| page.groups_referencing(*id).is_empty())
                .collect();
            if modifiers.shift {
                for id in inside {
                    ctx.selection_mut().add(id);
                }
            } else {
                ctx.selection_mut().set(inside);
            }
            Ok(ToolResponse::Updated)
        }
        _ => Ok(ToolResponse::Ignored),
    }
}

fn key_press(key: Key, ctx: &mut ToolContext<'_>) -> ToolResponse {
    match key {
        Key::Escape if !ctx.selection().is_empty() => {
            ctx.selection_mut().clear();
            ToolResponse::Updated
        }
        Key::Delete | Key::Backspace if !ctx.selection().is_empty() => {
            ToolResponse::Request(ToolRequest::DeleteSelection)
        }
        _ => ToolResponse::Ignored,
    }
}

fn double_activate(state: &mut ToolState, position: Point, ctx: &mut ToolContext<'_>) -> ToolResponse {
    let leaving = matches!(state, ToolState::EditingVertices { .. });
    if leaving {
        *state = ToolState::Idle;
    }
    let unhandled = if leaving { ToolResponse::Updated } else { ToolResponse::Ignored };
    let Ok(page) = ctx.document().page(ctx.current_page()) else {
        return unhandled;
    };
    let Some(item) = page
        .item_at(position, HIT_TOLERANCE)
        .filter(|item| !item.meta().locked)
    else {
        return unhandled;
    };
    let id = item.id();
    match item.kind() {
        ItemKind::Text => ToolResponse::Request(ToolRequest::EditText(id)),
        // Grouped strokes move with their group and are not edited vertex by vertex.
        ItemKind::Polygon | ItemKind::Freehand if page.groups_referencing(id).is_empty() => {
            ctx.selection_mut().set([id]);
            *state = ToolState::EditingVertices { target: id };
            ToolResponse::Updated
        }
        _ => unhandled,
    }
}

/// Press while vertex handles are shown. `None` leaves vertex editing.
fn vertex_press(
    target: ItemId,
    position: Point,
    ctx: &mut ToolContext<'_>,
) -> EditorResult<Option<ToolState>> {
    let page = ctx.document().page(ctx.current_page())?;
    let Some(item) = page.item(target) else {
        return Ok(None);
    };
    let Some(vertices) = item.vertices() else {
        return Ok(None);
    };
    if let Some(index) = vertex_handle_at(&vertices, position) {
        let original = item.clone();
        ctx.command_stack().begin_macro("Edit Vertex")?;
        return Ok(Some(ToolState::DraggingVertex { original, index }));
    }
    if item.hit_test(position, HIT_TOLERANCE) {
        return Ok(Some(ToolState::EditingVertices { target }));
    }
    Ok(None)
}

/// Angle of `point` seen from `pivot`, in radians.
fn angle_from(pivot: Point, point: Point) -> f64 {
    (point - pivot).atan2()
}

/// Committed records for `ids` and all their group descendants.
fn records(ctx: &ToolContext<'_>, ids: &[ItemId]) -> EditorResult<Vec<Item>> {
    let page = ctx.document().page(ctx.current_page())?;
    Ok(page
        .with_descendants(ids)
        .into_iter()
        .filter_map(|id| page.item(id).cloned())
        .collect())
}

fn moved(item: &Item, delta: Vec2) -> Item {
    let mut preview = item.clone();
    preview.translate(delta);
    preview
}

/// Scale factors taking the bottom-right corner of `anchor` to `corner`.
fn scale_factors(anchor: Rect, corner: Point, keep_aspect: bool) -> (f64, f64) {
    let factor = |extent: f64, target: f64| {
        if extent < f64::EPSILON {
            1.0
        } else {
            target.max(MIN_RESIZE) / extent
        }
    };
    let sx = factor(anchor.width(), corner.x - anchor.x0);
    let sy = factor(anchor.height(), corner.y - anchor.y0);
    if keep_aspect { (sx, sx) } else { (sx, sy) }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::ToolKind;
    use super::*;
    use crate::commands::Command;
    use crate::items::{Group, Polygon, Rectangle, Text};
    use kurbo::Size;

    fn rect_at(x: f64, y: f64) -> Item {
        Item::Rectangle(Rectangle::new(Point::new(x, y), 100.0, 50.0))
    }

    #[test]
    fn test_click_selects_topmost() {
        let mut h = Harness::with_item(rect_at(0.0, 0.0));
        let top = rect_at(50.0, 0.0);
        let top_id = top.id();
        let cmd = Command::add_item(&h.document, 0, top).unwrap();
        h.stack.execute(cmd, &mut h.document, &mut h.scene).unwrap();

        h.drag(Point::new(75.0, 25.0), Point::new(75.0, 25.0));
        assert_eq!(h.selection.single(), Some(top_id));
        h.assert_consistent();
    }

    #[test]
    fn test_drag_moves_in_one_undo_step() {
        let item = rect_at(10.0, 10.0);
        let id = item.id();
        let mut h = Harness::with_item(item);
        h.send(InputEvent::press(Point::new(20.0, 20.0)));
        for step in 1..=50 {
            h.send(InputEvent::moved(Point::new(20.0 + step as f64, 20.0)));
        }
        assert_eq!(h.send(InputEvent::release(Point::new(70.0, 20.0))), ToolResponse::Committed);
        assert_eq!(h.document.item(id).unwrap().transform().position, Point::new(60.0, 10.0));
        assert_eq!(h.stack.undo_count(), 1);
        assert_eq!(h.stack.undo_label(), Some("Move"));
        h.assert_consistent();

        h.stack.undo(&mut h.document, &mut h.scene).unwrap();
        assert_eq!(h.document.item(id).unwrap().transform().position, Point::new(10.0, 10.0));
        h.assert_consistent();
    }

    #[test]
    fn test_preview_does_not_touch_document() {
        let item = rect_at(10.0, 10.0);
        let id = item.id();
        let mut h = Harness::with_item(item);
        let before = h.document.clone();
        h.send(InputEvent::press(Point::new(20.0, 20.0)));
        h.send(InputEvent::moved(Point::new(40.0, 20.0)));
        assert_eq!(h.document, before);
        let node = h.scene.scene(0).unwrap().node(id).unwrap();
        assert_eq!(node.transform.position, Point::new(30.0, 10.0));
    }

    #[test]
    fn test_escape_reverts_drag() {
        let mut h = Harness::with_item(rect_at(10.0, 10.0));
        let before = h.document.clone();
        h.send(InputEvent::press(Point::new(20.0, 20.0)));
        h.send(InputEvent::moved(Point::new(90.0, 90.0)));
        assert_eq!(h.send(InputEvent::key(Key::Escape)), ToolResponse::Cancelled);
        assert_eq!(h.document, before);
        assert_eq!(h.stack.undo_count(), 0);
        h.assert_consistent();
    }

    #[test]
    fn test_click_without_motion_records_nothing() {
        let mut h = Harness::with_item(rect_at(10.0, 10.0));
        assert_eq!(h.drag(Point::new(20.0, 20.0), Point::new(20.0, 20.0)), ToolResponse::Updated);
        assert_eq!(h.stack.undo_count(), 0);
        h.assert_consistent();
    }

    #[test]
    fn test_resize_from_handle() {
        let item = rect_at(0.0, 0.0);
        let id = item.id();
        let mut h = Harness::with_item(item);
        h.selection.set([id]);
        h.drag(Point::new(100.0, 50.0), Point::new(200.0, 150.0));
        assert_eq!(h.document.item(id).unwrap().transform().size, Size::new(200.0, 150.0));
        assert_eq!(h.stack.undo_label(), Some("Resize Rectangle"));
        h.assert_consistent();
    }

    #[test]
    fn test_group_moves_with_children() {
        let a = rect_at(0.0, 0.0);
        let b = rect_at(200.0, 0.0);
        let (a_id, b_id) = (a.id(), b.id());
        let mut h = Harness::with_item(a);
        for item in [b, Item::Group(Group::new(vec![a_id, b_id]))] {
            let cmd = Command::add_item(&h.document, 0, item).unwrap();
            h.stack.execute(cmd, &mut h.document, &mut h.scene).unwrap();
        }
        h.stack.clear();

        h.drag(Point::new(10.0, 10.0), Point::new(20.0, 30.0));
        let group_id = h.selection.single().unwrap();
        assert!(h.document.item(group_id).unwrap().is_group());
        assert_eq!(h.document.item(b_id).unwrap().transform().position, Point::new(210.0, 20.0));
        assert_eq!(
            h.document.item(group_id).unwrap().transform().position,
            Point::new(10.0, 20.0)
        );
        assert_eq!(h.stack.undo_count(), 1);
        h.assert_consistent();
    }

    #[test]
    fn test_rubber_band_and_shift_toggle() {
        let a = rect_at(0.0, 0.0);
        let b = rect_at(300.0, 0.0);
        let (a_id, b_id) = (a.id(), b.id());
        let mut h = Harness::with_item(a);
        let cmd = Command::add_item(&h.document, 0, b).unwrap();
        h.stack.execute(cmd, &mut h.document, &mut h.scene).unwrap();

        h.drag(Point::new(-10.0, -10.0), Point::new(150.0, 100.0));
        assert_eq!(h.selection.ids(), &[a_id]);
        assert!(h.machine.rubber_band().is_none());

        h.send(InputEvent::Press {
            position: Point::new(350.0, 25.0),
            modifiers: Modifiers::SHIFT,
        });
        assert_eq!(h.selection.ids(), &[a_id, b_id]);
    }

    #[test]
    fn test_delete_key_requests_deletion() {
        let item = rect_at(0.0, 0.0);
        let id = item.id();
        let mut h = Harness::with_item(item);
        assert_eq!(h.send(InputEvent::key(Key::Delete)), ToolResponse::Ignored);
        h.selection.set([id]);
        assert_eq!(
            h.send(InputEvent::key(Key::Backspace)),
            ToolResponse::Request(ToolRequest::DeleteSelection)
        );
    }

    #[test]
    fn test_double_activate_text_requests_edit() {
        let text = Item::Text(Text::new(Point::ZERO, "Hi".to_string()));
        let id = text.id();
        let mut h = Harness::with_item(text);
        assert_eq!(
            h.send(InputEvent::DoubleActivate { position: Point::new(5.0, 5.0) }),
            ToolResponse::Request(ToolRequest::EditText(id))
        );
        assert_eq!(h.machine.tool(), ToolKind::Select);
    }

    #[test]
    fn test_rotate_handle_turns_item_in_one_step() {
        let item = rect_at(0.0, 0.0);
        let id = item.id();
        let mut h = Harness::with_item(item);
        h.selection.set([id]);

        // Handle sits above the top edge; sweep a quarter turn clockwise.
        h.send(InputEvent::press(Point::new(50.0, -20.0)));
        h.send(InputEvent::moved(Point::new(80.0, -10.0)));
        assert_eq!(h.document.item(id).unwrap().transform().rotation, 0.0);
        assert_eq!(h.send(InputEvent::release(Point::new(95.0, 25.0))), ToolResponse::Committed);

        let transform = *h.document.item(id).unwrap().transform();
        assert!((transform.rotation - 90.0).abs() < 1e-9);
        assert!((transform.center() - Point::new(50.0, 25.0)).hypot() < 1e-9);
        assert_eq!(h.stack.undo_count(), 1);
        assert_eq!(h.stack.undo_label(), Some("Rotate Rectangle"));
        h.assert_consistent();

        h.stack.undo(&mut h.document, &mut h.scene).unwrap();
        assert_eq!(h.document.item(id).unwrap().transform().rotation, 0.0);
        h.assert_consistent();
    }

    #[test]
    fn test_escape_reverts_rotation() {
        let item = rect_at(0.0, 0.0);
        let id = item.id();
        let mut h = Harness::with_item(item);
        h.selection.set([id]);
        let before = h.document.clone();
        h.send(InputEvent::press(Point::new(50.0, -20.0)));
        h.send(InputEvent::moved(Point::new(95.0, 25.0)));
        assert_eq!(h.send(InputEvent::key(Key::Escape)), ToolResponse::Cancelled);
        assert_eq!(h.document, before);
        assert_eq!(h.stack.undo_count(), 0);
        h.assert_consistent();
    }

    fn triangle() -> Item {
        Item::Polygon(
            Polygon::from_page_points(&[
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(50.0, 80.0),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_vertex_drag_edits_polygon() {
        let polygon = triangle();
        let id = polygon.id();
        let mut h = Harness::with_item(polygon);
        assert_eq!(
            h.send(InputEvent::DoubleActivate { position: Point::new(50.0, 30.0) }),
            ToolResponse::Updated
        );
        assert_eq!(h.machine.vertex_target(), Some(id));
        assert_eq!(h.selection.single(), Some(id));

        // Pull the apex down in several motions.
        h.send(InputEvent::press(Point::new(50.0, 80.0)));
        for step in 1..=5 {
            h.send(InputEvent::moved(Point::new(50.0, 80.0 + step as f64 * 4.0)));
        }
        assert_eq!(h.document.item(id).unwrap().vertices().unwrap()[2], Point::new(50.0, 80.0));
        assert_eq!(h.send(InputEvent::release(Point::new(50.0, 100.0))), ToolResponse::Committed);

        let edited = h.document.item(id).unwrap();
        assert_eq!(edited.vertices().unwrap()[2], Point::new(50.0, 100.0));
        assert_eq!(edited.transform().size, Size::new(100.0, 100.0));
        assert_eq!(h.stack.undo_label(), Some("Edit Vertex"));
        assert_eq!(h.machine.vertex_target(), Some(id));
        h.assert_consistent();

        // Clicking empty space leaves vertex editing.
        h.drag(Point::new(300.0, 300.0), Point::new(300.0, 300.0));
        assert_eq!(h.machine.vertex_target(), None);

        h.stack.undo(&mut h.document, &mut h.scene).unwrap();
        assert_eq!(h.document.item(id).unwrap().vertices().unwrap()[2], Point::new(50.0, 80.0));
        h.assert_consistent();
    }

    #[test]
    fn test_escape_reverts_vertex_drag() {
        let polygon = triangle();
        let mut h = Harness::with_item(polygon);
        let before = h.document.clone();
        h.send(InputEvent::DoubleActivate { position: Point::new(50.0, 30.0) });
        h.send(InputEvent::press(Point::new(100.0, 0.0)));
        h.send(InputEvent::moved(Point::new(140.0, -30.0)));
        assert!(h.stack.is_macro_open());
        assert_eq!(h.send(InputEvent::key(Key::Escape)), ToolResponse::Cancelled);
        assert_eq!(h.document, before);
        assert_eq!(h.stack.undo_count(), 0);
        assert_eq!(h.machine.vertex_target(), None);
        h.assert_consistent();
    }

    #[test]
    fn test_grouped_polygon_has_no_vertex_handles() {
        let polygon = triangle();
        let id = polygon.id();
        let mut h = Harness::with_item(polygon);
        let cmd = Command::add_item(&h.document, 0, Item::Group(Group::new(vec![id]))).unwrap();
        h.stack.execute(cmd, &mut h.document, &mut h.scene).unwrap();
        assert_eq!(
            h.send(InputEvent::DoubleActivate { position: Point::new(50.0, 30.0) }),
            ToolResponse::Ignored
        );
        assert_eq!(h.machine.vertex_target(), None);
    }

    #[test]
    fn test_locked_item_does_not_move() {
        let mut item = rect_at(0.0, 0.0);
        item.meta_mut().locked = true;
        let mut h = Harness::with_item(item);
        h.drag(Point::new(10.0, 10.0), Point::new(60.0, 60.0));
        assert_eq!(h.selection.len(), 1);
        assert_eq!(h.stack.undo_count(), 0);
        h.assert_consistent();
    }
}
