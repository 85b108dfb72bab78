use std::collections::HashMap;
use std::hash::Hash;

use geo::{Coord, Geometry};
use log::debug;

use crate::backend::geometry_kind;
use crate::error::{Error, Result};

/// A directed fragment of a path, labelled by the ids of its two endpoints.
///
/// `start_id` labels `coords[0]` and `end_id` labels the last coordinate.
/// Ids only need equality and hashing; several segments may share one.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<Id> {
    pub start_id: Id,
    pub end_id: Id,
    pub coords: Vec<Coord<f64>>,
}

impl<Id: PartialEq> Segment<Id> {
    pub fn new(start_id: Id, end_id: Id, coords: Vec<Coord<f64>>) -> Self {
        Segment {
            start_id,
            end_id,
            coords,
        }
    }

    /// Builds a segment from a parsed geometry record.
    ///
    /// Accepts line strings, lines, single-member multi line strings and
    /// polygons without holes (the exterior ring is used).
    pub fn from_geometry(start_id: Id, end_id: Id, geometry: Geometry<f64>) -> Result<Self> {
        let coords = match geometry {
            Geometry::LineString(line) => line.0,
            Geometry::Line(line) => vec![line.start, line.end],
            Geometry::MultiLineString(mut lines) if lines.0.len() == 1 => lines.0.swap_remove(0).0,
            Geometry::Polygon(polygon) if polygon.interiors().is_empty() => {
                let (exterior, _) = polygon.into_inner();
                exterior.0
            }
            other => {
                return Err(Error::UnsupportedGeometry {
                    expected: "LineString or Polygon without holes",
                    found: geometry_kind(&other),
                })
            }
        };
        Ok(Segment::new(start_id, end_id, coords))
    }

    /// A segment whose two endpoints carry the same id is already closed.
    pub fn is_self_loop(&self) -> bool {
        self.start_id == self.end_id
    }
}

/// Maps every endpoint id to the positions of the segments touching it.
///
/// Positions refer to the slice the index was built from. A segment is listed
/// under both of its ids, so a self-loop is listed twice under the same id.
/// Lists keep insertion order, which is what makes assembly deterministic.
#[derive(Debug, Clone)]
pub struct EndpointIndex<Id> {
    touching: HashMap<Id, Vec<usize>>,
}

impl<Id> Default for EndpointIndex<Id> {
    fn default() -> Self {
        EndpointIndex {
            touching: HashMap::new(),
        }
    }
}

impl<Id: Eq + Hash + Clone> EndpointIndex<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(segments: &[Segment<Id>]) -> Self {
        let mut index = Self::new();
        for (position, segment) in segments.iter().enumerate() {
            index.insert(position, segment);
        }
        debug!(
            "Indexed {} segments under {} endpoint ids",
            segments.len(),
            index.num_endpoints()
        );
        index
    }

    /// Registers the segment stored at `position` under both endpoint ids.
    pub fn insert(&mut self, position: usize, segment: &Segment<Id>) {
        self.touching
            .entry(segment.start_id.clone())
            .or_default()
            .push(position);
        self.touching
            .entry(segment.end_id.clone())
            .or_default()
            .push(position);
    }

    pub fn touching(&self, id: &Id) -> &[usize] {
        self.touching.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn num_endpoints(&self) -> usize {
        self.touching.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touching.is_empty()
    }

    pub fn clear(&mut self) {
        self.touching.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, line_string, polygon, point};
    use test_log::test;

    fn triangle() -> Vec<Segment<u32>> {
        vec![
            Segment::new(1, 2, vec![coord! { x: 0., y: 0. }, coord! { x: 2., y: 0. }]),
            Segment::new(2, 3, vec![coord! { x: 2., y: 0. }, coord! { x: 1., y: 2. }]),
            Segment::new(3, 1, vec![coord! { x: 1., y: 2. }, coord! { x: 0., y: 0. }]),
        ]
    }

    #[test]
    fn every_segment_is_listed_under_both_ids() {
        let segments = triangle();
        let index = EndpointIndex::build(&segments);

        assert_eq!(index.num_endpoints(), 3);
        assert_eq!(index.touching(&1), &[0, 2]);
        assert_eq!(index.touching(&2), &[0, 1]);
        assert_eq!(index.touching(&3), &[1, 2]);
        assert!(index.touching(&4).is_empty());
    }

    #[test]
    fn self_loop_is_listed_twice() {
        let segments = vec![Segment::new(
            5,
            5,
            vec![
                coord! { x: 0., y: 0. },
                coord! { x: 1., y: 0. },
                coord! { x: 0., y: 1. },
                coord! { x: 0., y: 0. },
            ],
        )];
        let index = EndpointIndex::build(&segments);

        assert!(segments[0].is_self_loop());
        assert_eq!(index.touching(&5), &[0, 0]);
    }

    #[test]
    fn empty_input_builds_empty_index() {
        let index = EndpointIndex::<u32>::build(&[]);
        assert!(index.is_empty());
    }

    #[test]
    fn polygon_record_uses_exterior_ring() {
        let ring = polygon![(x: 0., y: 0.), (x: 2., y: 0.), (x: 3., y: 1.), (x: 0., y: 0.)];
        let segment = Segment::from_geometry(1, 1, Geometry::Polygon(ring.clone())).unwrap();

        assert_eq!(segment.coords, ring.exterior().0);
        assert!(segment.is_self_loop());
    }

    #[test]
    fn line_string_record_keeps_its_orientation() {
        let line = line_string![(x: 2., y: 2.), (x: 3., y: 1.)];
        let segment = Segment::from_geometry(3, 2, Geometry::LineString(line.clone())).unwrap();
        assert_eq!(segment.coords, line.0);
    }

    #[test]
    fn point_record_is_rejected() {
        let result = Segment::from_geometry(1, 2, Geometry::Point(point!(x: 1., y: 1.)));
        assert!(matches!(
            result,
            Err(Error::UnsupportedGeometry { found: "Point", .. })
        ));
    }
}
