//! Paint-order changes for selected subpaths.
//!
//! Subpaths reorder inside their path. A request escalates to moving the
//! whole path in the document's path order when every subpath of the path is
//! selected (front/back), or when reordering inside the path would change
//! nothing (forward/backward).

use crate::document::Document;
use crate::model::{EntityId, EntityKind};
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Direction of a paint-order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZOrder {
    Front,
    Back,
    Forward,
    Backward,
}

pub fn bring_to_front(doc: &mut Document, selection: &Selection) -> bool {
    reorder_selection(doc, selection, ZOrder::Front)
}

pub fn send_to_back(doc: &mut Document, selection: &Selection) -> bool {
    reorder_selection(doc, selection, ZOrder::Back)
}

pub fn bring_forward(doc: &mut Document, selection: &Selection) -> bool {
    reorder_selection(doc, selection, ZOrder::Forward)
}

pub fn send_backward(doc: &mut Document, selection: &Selection) -> bool {
    reorder_selection(doc, selection, ZOrder::Backward)
}

/// Apply `op` to every selected subpath. Pushes one history checkpoint if
/// anything changes.
pub fn reorder_selection(doc: &mut Document, selection: &Selection, op: ZOrder) -> bool {
    let mut by_path: BTreeMap<EntityId, BTreeSet<EntityId>> = BTreeMap::new();
    for sub in selection.ids(EntityKind::SubPath) {
        if let Some(path) = doc.path_of_subpath(sub) {
            by_path.entry(path).or_default().insert(sub);
        }
    }
    if by_path.is_empty() {
        return false;
    }

    let mut subpath_orders = Vec::new();
    let mut escalated = BTreeSet::new();
    for (path_id, selected) in &by_path {
        let Some(path) = doc.path(*path_id) else {
            continue;
        };
        let current = path.subpath_ids();
        let whole = selected.len() == current.len();
        let reordered = reorder_ids(&current, selected, op);
        let escalate = match op {
            ZOrder::Front | ZOrder::Back => whole,
            ZOrder::Forward | ZOrder::Backward => reordered == current,
        };
        if escalate {
            escalated.insert(*path_id);
        } else if reordered != current {
            subpath_orders.push((*path_id, reordered));
        }
    }

    let current_paths: Vec<EntityId> = doc.paths().iter().map(|p| p.id()).collect();
    let path_order = reorder_ids(&current_paths, &escalated, op);
    let paths_changed = path_order != current_paths;

    if subpath_orders.is_empty() && !paths_changed {
        log::debug!("Z-order {op:?} changed nothing");
        return false;
    }

    doc.push_to_history();
    for (path_id, order) in &subpath_orders {
        doc.set_subpath_order(*path_id, order);
    }
    if paths_changed {
        for (index, id) in path_order.iter().enumerate() {
            doc.move_path(*id, index);
        }
    }
    log::debug!(
        "Z-order {op:?}: {} path(s) reordered inside, {} moved",
        subpath_orders.len(),
        escalated.len()
    );
    true
}

/// Reorder `ids` so the `selected` ones move as a block (front/back) or one
/// step (forward/backward). Relative order within each class is kept.
fn reorder_ids(ids: &[EntityId], selected: &BTreeSet<EntityId>, op: ZOrder) -> Vec<EntityId> {
    let is_selected = |id: &EntityId| selected.contains(id);
    let mut out = ids.to_vec();
    match op {
        ZOrder::Front => out.sort_by_key(is_selected),
        ZOrder::Back => out.sort_by_key(|id| !is_selected(id)),
        ZOrder::Forward => {
            for i in (0..out.len().saturating_sub(1)).rev() {
                if is_selected(&out[i]) && !is_selected(&out[i + 1]) {
                    out.swap(i, i + 1);
                }
            }
        }
        ZOrder::Backward => {
            for i in 1..out.len() {
                if is_selected(&out[i]) && !is_selected(&out[i - 1]) {
                    out.swap(i, i - 1);
                }
            }
        }
    }
    out
}
