//! Area already claimed by earlier records of one realm partition

use geo::{BoundingRect, MultiPolygon, Polygon};
use rstar::{RTree, RTreeObject, AABB};

struct ClaimedPolygon {
    /// Claim order, used to make candidate order independent of tree layout
    seq: usize,
    polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ClaimedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Accumulator of claimed polygons indexed by envelope.
///
/// Owned by one resolver invocation for one realm; dropped with it.
#[derive(Default)]
pub struct ClaimedArea {
    tree: RTree<ClaimedPolygon>,
    next_seq: usize,
}

impl ClaimedArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every polygon of `mp` into the claim
    pub fn claim(&mut self, mp: &MultiPolygon<f64>) {
        for polygon in mp {
            let Some(rect) = polygon.bounding_rect() else {
                continue;
            };
            self.tree.insert(ClaimedPolygon {
                seq: self.next_seq,
                polygon: polygon.clone(),
                envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            });
            self.next_seq += 1;
        }
    }

    /// Claimed polygons whose envelope intersects `envelope`, in claim order
    pub fn candidates(&self, envelope: &AABB<[f64; 2]>) -> Vec<&Polygon<f64>> {
        let mut hits: Vec<&ClaimedPolygon> = self.tree.locate_in_envelope_intersecting(envelope).collect();
        hits.sort_by_key(|c| c.seq);
        hits.into_iter().map(|c| &c.polygon).collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_candidates_by_envelope() {
        let mut claimed = ClaimedArea::new();
        assert!(claimed.is_empty());

        claimed.claim(&MultiPolygon::new(vec![
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
            polygon![(x: 10.0, y: 10.0), (x: 11.0, y: 10.0), (x: 11.0, y: 11.0)],
        ]));
        claimed.claim(&MultiPolygon::new(vec![polygon![
            (x: 0.5, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
        ]]));
        assert_eq!(claimed.len(), 3);

        let near_origin = claimed.candidates(&AABB::from_corners([0.0, 0.0], [1.5, 1.5]));
        assert_eq!(near_origin.len(), 2);
        // claim order
        assert_eq!(near_origin[0].exterior().0[0].x, 0.0);
        assert_eq!(near_origin[1].exterior().0[0].x, 0.5);

        assert!(claimed.candidates(&AABB::from_corners([5.0, 5.0], [6.0, 6.0])).is_empty());
    }
}
