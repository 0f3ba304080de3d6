//! Drag-and-drop reordering of grouped search criteria.
//!
//! A drop first moves the dragged criterion to the midpoint between the target
//! and its neighbour in the target's group, then renumbers the whole list to
//! dense integers so repeated drops never pile up fractional precision.

use std::cmp::Ordering;

use crate::SearchCriterion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertSide {
    Before,
    After,
}

/// The order `source` gets when dropped on `target`, before renumbering.
///
/// Returns `None` for out-of-range indices or a drop onto itself.
pub fn drop_order(
    list: &[SearchCriterion],
    source: usize,
    target: usize,
    side: InsertSide,
) -> Option<f64> {
    if source == target || source >= list.len() {
        return None;
    }
    let target_item = list.get(target)?;

    let mut candidates: Vec<f64> = list
        .iter()
        .enumerate()
        .filter(|(index, item)| *index != source && item.group == target_item.group)
        .map(|(_, item)| item.order)
        .collect();
    candidates.sort_by(f64::total_cmp);

    // The target itself is a candidate, so neither end is ever missing.
    let lowest = *candidates.first()?;
    let highest = *candidates.last()?;

    let above = candidates
        .iter()
        .rev()
        .find(|order| **order < target_item.order)
        .copied()
        .unwrap_or(lowest - 1.0);
    let below = candidates
        .iter()
        .find(|order| **order > target_item.order)
        .copied()
        .unwrap_or(highest + 1.0);

    let neighbour = match side {
        InsertSide::Before => above,
        InsertSide::After => below,
    };
    Some((target_item.order + neighbour) / 2.0)
}

/// Moves `source` next to `target` and renumbers the list.
///
/// Returns `false` when nothing changed.
pub fn apply_drop(
    list: &mut [SearchCriterion],
    source: usize,
    target: usize,
    side: InsertSide,
) -> bool {
    let Some(order) = drop_order(list, source, target, side) else {
        return false;
    };

    let group = list[target].group.clone();
    let item = &mut list[source];
    item.group = group;
    item.order = order;

    renumber(list);
    true
}

pub fn display_order(list: &[SearchCriterion]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..list.len()).collect();
    indices.sort_by(|&a, &b| compare(&list[a], &list[b]));
    indices
}

pub fn renumber(list: &mut [SearchCriterion]) {
    for (rank, index) in display_order(list).into_iter().enumerate() {
        list[index].order = rank as f64;
    }
}

fn compare(a: &SearchCriterion, b: &SearchCriterion) -> Ordering {
    a.group
        .cmp(&b.group)
        .then_with(|| a.order.total_cmp(&b.order))
}
