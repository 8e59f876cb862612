//! Visual ↔ logical column mapping for the results grid.
//!
//! The grid draws columns in user-chosen order while selection, edits, and
//! result data all stay keyed by the logical (original) column index. The
//! permutation is always a bijection over `0..len`; the inverse table is
//! kept in sync so both lookups stay O(1).

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct ColumnOrder {
    /// visual position → logical index
    visual_to_logical: Vec<usize>,
    /// logical index → visual position
    logical_to_visual: Vec<usize>,
}

impl ColumnOrder {
    pub fn identity(len: usize) -> Self {
        Self {
            visual_to_logical: (0..len).collect(),
            logical_to_visual: (0..len).collect(),
        }
    }

    /// Build from a stored permutation; rejects anything that is not a
    /// bijection over `0..len` (e.g. a stale persisted order).
    pub fn from_permutation(perm: Vec<usize>) -> Option<Self> {
        let len = perm.len();
        let mut inverse = vec![usize::MAX; len];
        for (visual, &logical) in perm.iter().enumerate() {
            if logical >= len || inverse[logical] != usize::MAX {
                return None;
            }
            inverse[logical] = visual;
        }
        Some(Self { visual_to_logical: perm, logical_to_visual: inverse })
    }

    pub fn len(&self) -> usize {
        self.visual_to_logical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visual_to_logical.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.visual_to_logical.iter().enumerate().all(|(v, &l)| v == l)
    }

    pub fn to_logical(&self, visual: usize) -> usize {
        self.visual_to_logical[visual]
    }

    pub fn to_visual(&self, logical: usize) -> usize {
        self.logical_to_visual[logical]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.visual_to_logical
    }

    /// Move the column at `from` (visual) so it lands at `to` (visual):
    /// remove + reinsert, then rebuild the inverse.
    pub fn reorder(&mut self, from: usize, to: usize) {
        let len = self.len();
        if from >= len || to >= len || from == to {
            return;
        }
        let logical = self.visual_to_logical.remove(from);
        self.visual_to_logical.insert(to, logical);
        for (visual, &l) in self.visual_to_logical.iter().enumerate() {
            self.logical_to_visual[l] = visual;
        }
    }

    /// Reset to identity when the result's column count no longer matches
    /// (a structurally different result re-used this order's slot).
    pub fn sync_with_count(&mut self, count: usize) {
        if self.len() != count {
            *self = Self::identity(count);
        }
    }
}

impl TryFrom<Vec<usize>> for ColumnOrder {
    type Error = String;

    fn try_from(perm: Vec<usize>) -> Result<Self, Self::Error> {
        ColumnOrder::from_permutation(perm).ok_or_else(|| "not a permutation".to_string())
    }
}

impl From<ColumnOrder> for Vec<usize> {
    fn from(order: ColumnOrder) -> Self {
        order.visual_to_logical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijection(order: &ColumnOrder) {
        for logical in 0..order.len() {
            assert_eq!(order.to_logical(order.to_visual(logical)), logical);
        }
        for visual in 0..order.len() {
            assert_eq!(order.to_visual(order.to_logical(visual)), visual);
        }
    }

    #[test]
    fn identity_maps_straight_through() {
        let order = ColumnOrder::identity(4);
        assert!(order.is_identity());
        assert_bijection(&order);
    }

    #[test]
    fn reorder_removes_and_reinserts() {
        let mut order = ColumnOrder::identity(4);
        order.reorder(0, 2);
        assert_eq!(order.as_slice(), &[1, 2, 0, 3]);
        assert_bijection(&order);

        order.reorder(3, 0);
        assert_eq!(order.as_slice(), &[3, 1, 2, 0]);
        assert_bijection(&order);
    }

    #[test]
    fn bijection_survives_arbitrary_reorder_sequences() {
        let mut order = ColumnOrder::identity(7);
        let moves = [(0, 6), (3, 1), (5, 5), (6, 0), (2, 4), (1, 3), (4, 2)];
        for (from, to) in moves {
            order.reorder(from, to);
            assert_bijection(&order);
        }
    }

    #[test]
    fn out_of_range_reorder_is_ignored() {
        let mut order = ColumnOrder::identity(3);
        order.reorder(0, 9);
        order.reorder(9, 0);
        assert!(order.is_identity());
    }

    #[test]
    fn from_permutation_rejects_non_bijections() {
        assert!(ColumnOrder::from_permutation(vec![0, 0, 1]).is_none());
        assert!(ColumnOrder::from_permutation(vec![0, 3, 1]).is_none());
        assert!(ColumnOrder::from_permutation(vec![2, 0, 1]).is_some());
    }

    #[test]
    fn count_change_resets_to_identity() {
        let mut order = ColumnOrder::from_permutation(vec![2, 0, 1]).unwrap();
        order.sync_with_count(3);
        assert_eq!(order.as_slice(), &[2, 0, 1]); // same count: preserved
        order.sync_with_count(5);
        assert!(order.is_identity());
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn serde_round_trips_through_permutation_vec() {
        let order = ColumnOrder::from_permutation(vec![1, 0, 2]).unwrap();
        let json = serde_json::to_string(&order).unwrap();
        assert_eq!(json, "[1,0,2]");
        let back: ColumnOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
        assert!(serde_json::from_str::<ColumnOrder>("[1,1,2]").is_err());
    }
}
