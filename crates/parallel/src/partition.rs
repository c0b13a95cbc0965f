//! Partitioning records into independently resolvable groups
//!
//! Overlap resolution only ever compares records of the same realm whose
//! envelopes intersect. Any grouping that keeps such records together can
//! be resolved group by group, in parallel, with the same result as one
//! sequential pass.

use paclean_algorithms::geometry::envelope;
use paclean_core::ProtectedArea;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, RTreeObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How records are split into partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionScheme {
    /// Connected components of envelope-intersecting records within a
    /// realm. Same result as the sequential resolver.
    #[default]
    OverlapGroups,
    /// One partition per realm
    Realm,
    /// One partition per realm and region. Overlaps between records of
    /// different regions are not erased.
    RealmAndRegion,
}

impl PartitionScheme {
    pub const ALL: [PartitionScheme; 3] = [
        PartitionScheme::OverlapGroups,
        PartitionScheme::Realm,
        PartitionScheme::RealmAndRegion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionScheme::OverlapGroups => "overlap-groups",
            PartitionScheme::Realm => "realm",
            PartitionScheme::RealmAndRegion => "realm-and-region",
        }
    }
}

impl fmt::Display for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        PartitionScheme::ALL
            .into_iter()
            .find(|p| p.as_str() == key)
            .ok_or_else(|| format!("unknown partition scheme `{s}`"))
    }
}

/// Split records into groups of positions.
///
/// Every group is sorted, and groups are ordered by their first position,
/// so the result depends only on the input.
pub fn partition(records: &[ProtectedArea], scheme: PartitionScheme) -> Vec<Vec<usize>> {
    let groups = match scheme {
        PartitionScheme::OverlapGroups => overlap_groups(records),
        PartitionScheme::Realm => group_by(records, |r| r.realm()),
        PartitionScheme::RealmAndRegion => group_by(records, |r| (r.realm(), r.attributes.region.clone())),
    };
    tracing::debug!("{} records in {} {} partitions", records.len(), groups.len(), scheme);
    groups
}

fn group_by<K: Ord>(records: &[ProtectedArea], key: impl Fn(&ProtectedArea) -> K) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        groups.entry(key(record)).or_default().push(i);
    }
    let mut groups: Vec<_> = groups.into_values().collect();
    groups.sort_by_key(|g| g[0]);
    groups
}

type Envelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

fn overlap_groups(records: &[ProtectedArea]) -> Vec<Vec<usize>> {
    let entries: Vec<Envelope> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            envelope(&r.geometry).map(|env| GeomWithData::new(Rectangle::from_corners(env.lower(), env.upper()), i))
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut sets = UnionFind::new(records.len());
    for entry in tree.iter() {
        let i = entry.data;
        let realm = records[i].realm();
        for other in tree.locate_in_envelope_intersecting(&entry.envelope()) {
            if other.data != i && records[other.data].realm() == realm {
                sets.union(i, other.data);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..records.len() {
        groups.entry(sets.find(i)).or_default().push(i);
    }
    let mut groups: Vec<_> = groups.into_values().collect();
    groups.sort_by_key(|g| g[0]);
    groups
}

/// Union-Find data structure
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]]; // path halving
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (root, child) = if self.rank[ra] >= self.rank[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[child] = root;
        if self.rank[root] == self.rank[child] {
            self.rank[root] += 1;
        }
    }
}
