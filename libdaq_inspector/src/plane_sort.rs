use serde::{Deserialize, Serialize};

use super::hardware_id::Plane;

/// Anything which carries an (optional) wire plane
pub trait PlaneTagged {
    fn plane(&self) -> Option<Plane>;
}

/// What to do with rows whose plane could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    #[default]
    Drop,
    Retain,
}

/// Rows split by wire plane. Each group keeps the relative order of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanePartition<R> {
    pub u: Vec<R>,
    pub v: Vec<R>,
    pub z: Vec<R>,
    /// Only filled with UnresolvedPolicy::Retain
    pub unresolved: Vec<R>,
}

impl<R> Default for PlanePartition<R> {
    fn default() -> Self {
        Self {
            u: Vec::new(),
            v: Vec::new(),
            z: Vec::new(),
            unresolved: Vec::new(),
        }
    }
}

impl<R: Clone> PlanePartition<R> {
    pub fn get(&self, plane: Plane) -> &[R] {
        match plane {
            Plane::U => &self.u,
            Plane::V => &self.v,
            Plane::Z => &self.z,
        }
    }

    /// Iterate over the planes and their rows in u, v, z order
    pub fn planes(&self) -> impl Iterator<Item = (Plane, &[R])> + '_ {
        Plane::ALL.into_iter().map(move |plane| (plane, self.get(plane)))
    }

    /// Total number of rows assigned to a plane
    pub fn n_resolved(&self) -> usize {
        self.u.len() + self.v.len() + self.z.len()
    }
}

/// Split rows into u, v and z groups
pub fn sort_by_plane<R: PlaneTagged + Clone>(
    rows: &[R],
    policy: UnresolvedPolicy,
) -> PlanePartition<R> {
    let mut partition = PlanePartition::default();
    for row in rows {
        match (row.plane(), policy) {
            (Some(Plane::U), _) => partition.u.push(row.clone()),
            (Some(Plane::V), _) => partition.v.push(row.clone()),
            (Some(Plane::Z), _) => partition.z.push(row.clone()),
            (None, UnresolvedPolicy::Retain) => partition.unresolved.push(row.clone()),
            (None, UnresolvedPolicy::Drop) => (),
        }
    }
    partition
}
