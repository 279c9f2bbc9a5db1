//! Identity remapping for copy, paste and page duplication.

use crate::items::{new_item_id, Item, ItemId};
use std::collections::HashMap;

/// Old id to new id, over one copied set.
pub type IdMap = HashMap<ItemId, ItemId>;

/// Copy `items` with fresh ids.
///
/// References between copied items follow the copy; references that point
/// outside the copied set are dropped.
pub fn copy_with_fresh_ids(items: &[Item]) -> Vec<Item> {
    copy_with_id_map(items).0
}

/// Like [`copy_with_fresh_ids`], also returning the id map used.
pub fn copy_with_id_map(items: &[Item]) -> (Vec<Item>, IdMap) {
    let map: IdMap = items
        .iter()
        .map(|item| (item.id(), new_item_id()))
        .collect();
    let copies = items
        .iter()
        .map(|item| {
            let mut copy = item.clone();
            if let Some(new_id) = map.get(&item.id()) {
                copy.set_id(*new_id);
            }
            copy.remap_references(|old| map.get(&old).copied());
            copy
        })
        .collect();
    (copies, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{Group, Rectangle};
    use kurbo::Point;

    #[test]
    fn test_group_follows_copied_children() {
        let a = Item::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0));
        let b = Item::Rectangle(Rectangle::new(Point::new(20.0, 0.0), 10.0, 10.0));
        let group = Item::Group(Group::new(vec![a.id(), b.id()]));
        let originals = [a.id(), b.id(), group.id()];

        let (copies, map) = copy_with_id_map(&[a, b, group]);
        assert_eq!(copies.len(), 3);
        for (copy, old) in copies.iter().zip(originals) {
            assert_ne!(copy.id(), old);
            assert_eq!(map.get(&old), Some(&copy.id()));
        }
        assert_eq!(copies[2].referenced_ids(), &[copies[0].id(), copies[1].id()]);
    }

    #[test]
    fn test_split_group_drops_outside_refs() {
        let a = Item::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0));
        let outside = crate::items::new_item_id();
        let group = Item::Group(Group::new(vec![a.id(), outside]));

        let copies = copy_with_fresh_ids(&[a, group]);
        assert_eq!(copies[1].referenced_ids(), &[copies[0].id()]);
    }

    #[test]
    fn test_copy_preserves_content() {
        let mut a = Item::Rectangle(Rectangle::new(Point::new(5.0, 5.0), 10.0, 10.0));
        a.meta_mut().name = "logo".to_string();
        let copies = copy_with_fresh_ids(std::slice::from_ref(&a));
        let mut copy = copies[0].clone();
        copy.set_id(a.id());
        assert_eq!(copy, a);
    }
}
