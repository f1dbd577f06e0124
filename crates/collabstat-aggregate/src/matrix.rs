//! Dense matrix view of an entity pair weight map
//!
//! Row and column order is the registry order: entity names in the order
//! they first appear while walking the map's keys (first name, then second).

use crate::pair::EntityPairWeightMap;
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

/// Ordered set of distinct entity names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRegistry {
    names: IndexSet<String, FxBuildHasher>,
}

impl EntityRegistry {
    pub fn from_map(map: &EntityPairWeightMap) -> Self {
        let mut names = IndexSet::default();
        for pair in map.keys() {
            for name in [pair.first(), pair.second()] {
                if !names.contains(name) {
                    names.insert(name.to_string());
                }
            }
        }
        EntityRegistry { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get_index(idx).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}

/// Square, symmetric weight matrix in registry order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMatrix {
    registry: EntityRegistry,
    /// Row-major, `size * size` cells
    cells: Vec<i64>,
}

impl OutputMatrix {
    pub fn from_map(map: &EntityPairWeightMap) -> Self {
        let registry = EntityRegistry::from_map(map);
        let size = registry.len();
        let mut cells = vec![0; size * size];

        for i in 0..size {
            for j in (i + 1)..size {
                let (Some(a), Some(b)) = (registry.name(i), registry.name(j)) else {
                    continue;
                };
                let weight = map.weight(a, b);
                cells[i * size + j] = weight;
                cells[j * size + i] = weight;
            }
        }

        OutputMatrix { registry, cells }
    }

    /// Number of entities (rows and columns, headers excluded)
    pub fn size(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> + '_ {
        self.registry.names()
    }

    /// Weight between entities `i` and `j`; the diagonal is always 0
    pub fn cell(&self, i: usize, j: usize) -> i64 {
        let size = self.size();
        if i >= size || j >= size {
            return 0;
        }
        self.cells[i * size + j]
    }

    pub fn row(&self, i: usize) -> &[i64] {
        let size = self.size();
        if i >= size {
            return &[];
        }
        &self.cells[i * size..(i + 1) * size]
    }

    /// Weight between two entities by name
    pub fn weight_between(&self, a: &str, b: &str) -> Option<i64> {
        let i = self.registry.index_of(a)?;
        let j = self.registry.index_of(b)?;
        Some(self.cell(i, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_by_three_matrix() {
        let mut map = EntityPairWeightMap::new();
        map.add("A", "B", 5);
        map.add("B", "C", 2);

        let matrix = OutputMatrix::from_map(&map);

        assert_eq!(matrix.entities().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(matrix.row(0), &[0, 5, 0]);
        assert_eq!(matrix.row(1), &[5, 0, 2]);
        assert_eq!(matrix.row(2), &[0, 2, 0]);
        assert_eq!(matrix.weight_between("C", "A"), Some(0));
    }

    #[test]
    fn test_registry_follows_key_orientation() {
        let mut map = EntityPairWeightMap::new();
        map.add("B", "A", 1);
        map.add("C", "A", 1);

        let registry = EntityRegistry::from_map(&map);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["B", "A", "C"]);
        assert_eq!(registry.index_of("C"), Some(2));
    }

    #[test]
    fn test_self_pair_stays_off_the_diagonal() {
        let mut map = EntityPairWeightMap::new();
        map.add("A", "A", 9);
        map.add("A", "B", 1);

        let matrix = OutputMatrix::from_map(&map);
        assert_eq!(matrix.size(), 2);
        assert_eq!(matrix.cell(0, 0), 0);
        assert_eq!(matrix.cell(1, 0), 1);
    }

    #[test]
    fn test_rendering_twice_is_identical() {
        let mut map = EntityPairWeightMap::new();
        for (a, b, w) in [("X", "Y", 1), ("Z", "X", 4), ("Y", "W", 2), ("Y", "X", 3)] {
            map.add(a, b, w);
        }
        assert_eq!(OutputMatrix::from_map(&map), OutputMatrix::from_map(&map));
    }

    #[test]
    fn test_empty_map() {
        let matrix = OutputMatrix::from_map(&EntityPairWeightMap::new());
        assert_eq!(matrix.size(), 0);
        assert!(matrix.row(0).is_empty());
    }
}
