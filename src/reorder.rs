//! Drag-to-reorder bookkeeping for the admin list.
//!
//! The list is moved in memory first and returned to the caller right away;
//! positions are then written back one row at a time (see
//! [`crate::db::update_slot_order`]).

use crate::models::Slot;
use std::collections::HashSet;

/// Removes the item at `from` and reinserts it at `to`. Out-of-range indices leave the list as is.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() || to >= items.len() || from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Drop of `active_id` onto `over_id`. `None` when nothing moves.
pub fn reorder_by_ids(slots: &[Slot], active_id: &str, over_id: &str) -> Option<Vec<Slot>> {
    if active_id == over_id {
        return None;
    }
    let from = slots.iter().position(|s| s.id == active_id)?;
    let to = slots.iter().position(|s| s.id == over_id)?;

    let mut reordered = slots.to_vec();
    move_item(&mut reordered, from, to);
    Some(reordered)
}

/// Rearranges `slots` to follow `ids`, which must name every slot exactly once.
pub fn apply_explicit_order(slots: &[Slot], ids: &[String]) -> Option<Vec<Slot>> {
    if ids.len() != slots.len() {
        return None;
    }
    let unique: HashSet<&str> = ids.iter().map(String::as_str).collect();
    if unique.len() != ids.len() {
        return None;
    }
    ids.iter()
        .map(|id| slots.iter().find(|s| &s.id == id).cloned())
        .collect()
}

pub fn positions(slots: &[Slot]) -> Vec<(String, i64)> {
    slots
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i as i64))
        .collect()
}

/// Stamps each slot with its index, mirroring what gets persisted.
pub fn renumber(slots: &mut [Slot]) {
    for (i, slot) in slots.iter_mut().enumerate() {
        slot.display_order = Some(i as i64);
    }
}
