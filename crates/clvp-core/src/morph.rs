//! Reconciling DOM update: mutate a live subtree until it matches a desired
//! one, keeping every node whose position and tag are unchanged.

use crate::dom::{Element, Node};

/// Counts of the mutations a morph performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MorphStats {
    pub attributes_changed: usize,
    pub text_changed: usize,
    pub nodes_inserted: usize,
    pub nodes_removed: usize,
    pub nodes_replaced: usize,
}

impl MorphStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.attributes_changed
            + self.text_changed
            + self.nodes_inserted
            + self.nodes_removed
            + self.nodes_replaced
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }
}

/// The morph seam. Given `(live, desired)`, update `live` in place to match
/// `desired`'s structure, attributes and text.
pub trait Morph: Send + Sync {
    fn morph(&self, live: &mut Element, desired: &Element) -> MorphStats;
}

/// Position-and-tag reconciliation. Elements with differing `id`s are never
/// reused for one another.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilingMorph;

impl Morph for ReconcilingMorph {
    fn morph(&self, live: &mut Element, desired: &Element) -> MorphStats {
        let mut stats = MorphStats::default();
        morph_element(live, desired, &mut stats);
        stats
    }
}

fn same_identity(live: &Element, desired: &Element) -> bool {
    live.tag == desired.tag && live.id() == desired.id()
}

fn morph_element(live: &mut Element, desired: &Element, stats: &mut MorphStats) {
    if !same_identity(live, desired) {
        *live = desired.clone();
        stats.nodes_replaced += 1;
        return;
    }
    sync_attributes(live, desired, stats);

    let shared = live.children.len().min(desired.children.len());
    for (live_child, desired_child) in live.children[..shared]
        .iter_mut()
        .zip(&desired.children[..shared])
    {
        match (live_child, desired_child) {
            (Node::Element(l), Node::Element(d)) if same_identity(l, d) => {
                morph_element(l, d, stats);
            }
            (Node::Text(l), Node::Text(d)) => {
                if l != d {
                    l.clone_from(d);
                    stats.text_changed += 1;
                }
            }
            (slot, d) => {
                *slot = d.clone();
                stats.nodes_replaced += 1;
            }
        }
    }

    if live.children.len() > shared {
        stats.nodes_removed += live.children.len() - shared;
        live.children.truncate(shared);
    }
    if desired.children.len() > shared {
        stats.nodes_inserted += desired.children.len() - shared;
        live.children.extend(desired.children[shared..].iter().cloned());
    }
}

fn sync_attributes(live: &mut Element, desired: &Element, stats: &mut MorphStats) {
    let stale: Vec<String> = live
        .attrs()
        .iter()
        .filter(|(name, _)| !desired.has_attr(name))
        .map(|(name, _)| name.clone())
        .collect();
    for name in stale {
        live.remove_attr(&name);
        stats.attributes_changed += 1;
    }
    for (name, value) in desired.attrs() {
        if live.set_attr(name, value) {
            stats.attributes_changed += 1;
        }
    }
}
