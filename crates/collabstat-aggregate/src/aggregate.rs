//! Entity pair aggregation
//!
//! Every unordered pair of assignments on a work item earns the weight of
//! its two roles, accumulated per entity pair.

use crate::pair::EntityPairWeightMap;
use crate::scan::WorkAssignment;
use crate::weights::RolePairWeightTable;

/// Aggregate all work items of one category into a fresh map
pub fn aggregate<I>(items: I, weights: &RolePairWeightTable) -> EntityPairWeightMap
where
    I: IntoIterator,
    I::Item: AsRef<[WorkAssignment]>,
{
    let mut map = EntityPairWeightMap::new();
    for item in items {
        aggregate_into(&mut map, item.as_ref(), weights);
    }
    map
}

/// Add the contributions of a single work item. O(n²) in the item's size.
pub fn aggregate_into(
    map: &mut EntityPairWeightMap,
    item: &[WorkAssignment],
    weights: &RolePairWeightTable,
) {
    for (i, left) in item.iter().enumerate() {
        for right in &item[i + 1..] {
            let weight = weights.weight_of(&left.role, &right.role);
            map.add(&left.entity, &right.entity, weight);
        }
    }
}
