//! Placement groups and their capacity check
//!
//! The provider caps the number of servers in a spread placement group but
//! does not stop a configuration from being able to exceed it. Before the
//! registry is published, the declared max sizes of all node groups sharing a
//! placement group are summed and checked against the cap.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node_group::NodeGroup;

/// A provider-side placement group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroup {
    pub id: i64,

    #[serde(default)]
    pub name: String,
}

impl PlacementGroup {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Id 0 is the provider's "no placement group"
    pub fn is_constrained(&self) -> bool {
        self.id != 0
    }
}

/// Sum of declared max sizes per constrained placement group id.
///
/// Sums saturate at `usize::MAX`, so huge declarations still count as oversized.
pub fn placement_group_totals<'a, I>(groups: I) -> BTreeMap<i64, usize>
where
    I: IntoIterator<Item = &'a NodeGroup>,
{
    let mut totals = BTreeMap::new();
    for group in groups {
        let Some(placement) = group.placement_group().filter(|p| p.is_constrained()) else {
            continue;
        };
        let total = totals.entry(placement.id).or_insert(0usize);
        *total = total.saturating_add(group.max_size());
    }
    totals
}

/// Placement group ids whose combined max size exceeds `threshold`, ascending
pub fn oversized_placement_groups<'a, I>(groups: I, threshold: usize) -> Vec<i64>
where
    I: IntoIterator<Item = &'a NodeGroup>,
{
    placement_group_totals(groups)
        .into_iter()
        .filter(|(_, total)| *total > threshold)
        .map(|(id, _)| id)
        .collect()
}
