//! Image tool: place the staged image at the press point.

use super::{ToolContext, ToolResponse};
use crate::commands::Command;
use crate::error::EditorResult;
use crate::input::InputEvent;
use crate::items::{Image, Item, new_item_id};

/// Placed images are scaled down to fit within this many points per side.
pub const MAX_PLACED_EXTENT: f64 = 400.0;

pub(super) fn handle(
    staged: &mut Option<Image>,
    event: InputEvent,
    ctx: &mut ToolContext<'_>,
) -> EditorResult<ToolResponse> {
    let InputEvent::Press { position, .. } = event else {
        return Ok(ToolResponse::Ignored);
    };
    let Some(source) = staged.as_ref() else {
        log::debug!("image tool pressed with nothing staged");
        return Ok(ToolResponse::Ignored);
    };
    let mut image = source.clone();
    image.id = new_item_id();
    let size = image.transform.size;
    if size.width > MAX_PLACED_EXTENT || size.height > MAX_PLACED_EXTENT {
        image = image.fit_within(MAX_PLACED_EXTENT, MAX_PLACED_EXTENT);
    }
    image.transform.position = ctx.snap(position);

    let item = Item::Image(image);
    let id = item.id();
    let command = Command::add_item(ctx.document(), ctx.current_page(), item)?;
    ctx.command_stack().execute(command)?;
    *staged = None;
    Ok(ToolResponse::Created(id))
}
