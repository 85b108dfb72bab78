use std::hash::Hash;
use std::marker::PhantomData;

use geo::Geometry;
use log::debug;

use crate::backend::GeometryBackend;
use crate::chain::{assemble, assemble_from, Assembly};
use crate::error::Result;
use crate::segment::{EndpointIndex, Segment};
use crate::shape::shape;
use crate::udf::{Accumulator, Algebraic};

/// Reconnects a batch of segments into polygons and line strings.
///
/// Returns `None` for an empty batch, the geometry itself when the segments
/// form one connected group, and a geometry collection in chain order
/// otherwise.
pub fn connect<Id: Eq + Hash + Clone>(segments: &[Segment<Id>]) -> Option<Geometry<f64>> {
    let assemblies = assemble(segments);
    shape(assemblies.iter().map(|assembly| &assembly.chain))
}

/// [`connect`] over encoded `(start_id, end_id, geometry)` records.
///
/// Decoding errors from the backend abort the call unchanged.
pub fn connect_encoded<Id, B, G>(
    backend: &B,
    records: impl IntoIterator<Item = (Id, Id, G)>,
) -> Result<Option<Vec<u8>>>
where
    Id: Eq + Hash + Clone,
    B: GeometryBackend,
    G: AsRef<[u8]>,
{
    let segments = records
        .into_iter()
        .map(|(start_id, end_id, encoded)| {
            Segment::from_geometry(start_id, end_id, backend.parse(encoded.as_ref())?)
        })
        .collect::<Result<Vec<_>>>()?;
    connect(&segments)
        .map(|geometry| backend.serialize(&geometry))
        .transpose()
}

/// Connects the segments of one group as they arrive batch by batch.
///
/// After any sequence of batches the value equals [`connect`] over all
/// segments received so far, in receipt order. Chains whose open ends no new
/// segment touches are kept as they are; the walk resumes at the first chain
/// a batch can extend.
#[derive(Debug, Clone)]
pub struct ConnectAccumulator<Id> {
    segments: Vec<Segment<Id>>,
    index: EndpointIndex<Id>,
    visited: Vec<bool>,
    assemblies: Vec<Assembly<Id>>,
}

impl<Id> Default for ConnectAccumulator<Id> {
    fn default() -> Self {
        ConnectAccumulator {
            segments: Vec::new(),
            index: EndpointIndex::default(),
            visited: Vec::new(),
            assemblies: Vec::new(),
        }
    }
}

impl<Id: Eq + Hash + Clone> ConnectAccumulator<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chains assembled over everything received so far.
    pub fn assemblies(&self) -> &[Assembly<Id>] {
        &self.assemblies
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Position of the first chain that a segment at or after `first_new`
    /// would extend at its head or tail.
    fn first_extended(&self, first_new: usize) -> Option<usize> {
        let extends = |id: &Id| {
            self.index
                .touching(id)
                .iter()
                .any(|&position| position >= first_new && !self.segments[position].is_self_loop())
        };
        self.assemblies.iter().position(|assembly| {
            let lone_loop = assembly.members.len() == 1
                && self.segments[assembly.members[0]].is_self_loop();
            !lone_loop && (extends(&assembly.head_id) || extends(&assembly.tail_id))
        })
    }
}

impl<Id: Eq + Hash + Clone> Accumulator for ConnectAccumulator<Id> {
    type Batch = Vec<Segment<Id>>;
    type Output = Geometry<f64>;

    fn accumulate(&mut self, batch: Vec<Segment<Id>>) {
        if batch.is_empty() {
            return;
        }
        debug!("Accumulating {} more segments", batch.len());
        let first_new = self.segments.len();
        for segment in batch {
            self.index.insert(self.segments.len(), &segment);
            self.segments.push(segment);
        }

        // Chains before the first extended one come out of a single pass
        // unchanged. That chain and every later one are walked again from
        // its seed, which is its lowest member.
        let first_seed = match self.first_extended(first_new) {
            Some(position) => {
                let reopened = self.assemblies.split_off(position);
                debug!("Reopening {} chains", reopened.len());
                let mut first_seed = first_new;
                for assembly in reopened {
                    for member in assembly.members {
                        self.visited[member] = false;
                        first_seed = first_seed.min(member);
                    }
                }
                first_seed
            }
            None => first_new,
        };
        assemble_from(
            &self.segments,
            &self.index,
            &mut self.visited,
            first_seed,
            &mut self.assemblies,
        );
    }

    fn current_value(&self) -> Option<Geometry<f64>> {
        shape(self.assemblies.iter().map(|assembly| &assembly.chain))
    }

    fn reset(&mut self) {
        self.segments.clear();
        self.index.clear();
        self.visited.clear();
        self.assemblies.clear();
    }
}

/// Connect as a tree of partial reductions.
///
/// Partials are segment lists: an intermediate step connects what it
/// receives and hands each assembled chain on as one segment labelled by its
/// open ends, so later steps can keep joining across partials.
#[derive(Debug, Clone, Copy)]
pub struct ConnectAggregate<Id> {
    _id: PhantomData<fn() -> Id>,
}

impl<Id> Default for ConnectAggregate<Id> {
    fn default() -> Self {
        ConnectAggregate { _id: PhantomData }
    }
}

impl<Id: Eq + Hash + Clone> Algebraic for ConnectAggregate<Id> {
    type Record = Segment<Id>;
    type Partial = Vec<Segment<Id>>;
    type Output = Geometry<f64>;

    /// Leaves receive single-record bags; the first record stands for the bag.
    fn initial(&self, bag: &[Segment<Id>]) -> Option<Vec<Segment<Id>>> {
        bag.first().map(|segment| vec![segment.clone()])
    }

    fn intermediate(&self, partials: Vec<Vec<Segment<Id>>>) -> Option<Vec<Segment<Id>>> {
        let segments: Vec<Segment<Id>> = partials.into_iter().flatten().collect();
        if segments.is_empty() {
            return None;
        }
        Some(
            assemble(&segments)
                .into_iter()
                .map(Assembly::into_segment)
                .collect(),
        )
    }

    fn finalize(&self, partials: Vec<Vec<Segment<Id>>>) -> Option<Geometry<f64>> {
        let segments: Vec<Segment<Id>> = partials.into_iter().flatten().collect();
        connect(&segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GeoBackend;
    use geo::{line_string, polygon, LineString};
    use test_log::test;

    fn segment(start: i64, end: i64, line: LineString<f64>) -> Segment<i64> {
        Segment::new(start, end, line.0)
    }

    fn triangle() -> Vec<Segment<i64>> {
        vec![
            segment(1, 2, line_string![(x: 0., y: 0.), (x: 2., y: 0.), (x: 3., y: 1.)]),
            segment(2, 3, line_string![(x: 3., y: 1.), (x: 2., y: 2.)]),
            segment(3, 1, line_string![(x: 2., y: 2.), (x: 1., y: 2.), (x: 0., y: 0.)]),
        ]
    }

    fn expected_polygon() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 0., y: 0.),
            (x: 2., y: 0.),
            (x: 3., y: 1.),
            (x: 2., y: 2.),
            (x: 1., y: 2.),
            (x: 0., y: 0.)
        ])
    }

    fn open_line() -> Segment<i64> {
        segment(7, 8, line_string![(x: 10., y: 8.), (x: 8., y: 5.)])
    }

    #[test]
    fn triangle_becomes_polygon() {
        assert_eq!(connect(&triangle()), Some(expected_polygon()));
    }

    #[test]
    fn reversed_segment_gives_same_polygon() {
        let mut segments = triangle();
        segments[1] = segment(3, 2, line_string![(x: 2., y: 2.), (x: 3., y: 1.)]);
        assert_eq!(connect(&segments), Some(expected_polygon()));
    }

    #[test]
    fn disconnected_shapes_make_a_collection() {
        let mut segments = triangle();
        segments.push(open_line());

        let Some(Geometry::GeometryCollection(collection)) = connect(&segments) else {
            panic!("expected a geometry collection");
        };
        assert_eq!(
            collection.0,
            vec![
                expected_polygon(),
                Geometry::LineString(line_string![(x: 10., y: 8.), (x: 8., y: 5.)]),
            ]
        );
    }

    #[test]
    fn polygon_records_pass_through_as_polygons() {
        let first = polygon![(x: 0., y: 0.), (x: 2., y: 0.), (x: 3., y: 1.), (x: 0., y: 0.)];
        let second = polygon![(x: 5., y: 5.), (x: 5., y: 6.), (x: 6., y: 5.), (x: 5., y: 5.)];
        let segments = vec![
            Segment::from_geometry(1, 1, Geometry::Polygon(first.clone())).unwrap(),
            Segment::from_geometry(2, 2, Geometry::Polygon(second.clone())).unwrap(),
            open_line(),
        ];

        let Some(Geometry::GeometryCollection(collection)) = connect(&segments) else {
            panic!("expected a geometry collection");
        };
        assert_eq!(collection.0.len(), 3);
        assert_eq!(collection.0[0], Geometry::Polygon(first));
        assert_eq!(collection.0[1], Geometry::Polygon(second));
        assert!(matches!(collection.0[2], Geometry::LineString(_)));
    }

    #[test]
    fn empty_batch_has_no_result() {
        assert_eq!(connect::<i64>(&[]), None);
    }

    #[test]
    fn two_batches_match_one() {
        let mut segments = triangle();
        let last = segments.split_off(2);

        let mut accumulator = ConnectAccumulator::new();
        accumulator.accumulate(segments);
        assert!(matches!(accumulator.current_value(), Some(Geometry::LineString(_))));

        accumulator.accumulate(last);
        assert_eq!(accumulator.current_value(), connect(&triangle()));
        assert_eq!(accumulator.current_value(), Some(expected_polygon()));
        assert_eq!(accumulator.num_segments(), 3);
    }

    #[test]
    fn late_segment_bridges_two_open_chains() {
        let first = segment(1, 2, line_string![(x: 0., y: 0.), (x: 1., y: 0.)]);
        let third = segment(3, 4, line_string![(x: 2., y: 0.), (x: 3., y: 0.)]);
        let bridge = segment(2, 3, line_string![(x: 1., y: 0.), (x: 2., y: 0.)]);

        let mut accumulator = ConnectAccumulator::new();
        accumulator.accumulate(vec![first.clone(), third.clone()]);
        assert_eq!(accumulator.assemblies().len(), 2);

        accumulator.accumulate(vec![bridge.clone()]);
        assert_eq!(accumulator.assemblies().len(), 1);
        assert_eq!(accumulator.current_value(), connect(&[first, third, bridge]));
    }

    #[test]
    fn late_segment_extends_a_closed_ring() {
        // In one pass the ring's tail at id 1 keeps going into the new segment.
        let spur = segment(1, 5, line_string![(x: 0., y: 0.), (x: -1., y: 0.)]);
        let mut all = triangle();
        all.push(open_line());
        all.push(spur.clone());

        let mut accumulator = ConnectAccumulator::new();
        accumulator.accumulate(triangle());
        accumulator.accumulate(vec![open_line()]);
        assert_eq!(accumulator.assemblies().len(), 2);
        assert!(accumulator.assemblies()[0].chain.is_closed());

        accumulator.accumulate(vec![spur]);
        assert_eq!(accumulator.assemblies(), &assemble(&all)[..]);
        assert!(!accumulator.assemblies()[0].chain.is_closed());
        assert_eq!(accumulator.current_value(), connect(&all));
    }

    #[test]
    fn single_segment_batches_match_one_batch() {
        let mut segments = triangle();
        segments.extend([
            segment(7, 8, line_string![(x: 10., y: 8.), (x: 8., y: 5.)]),
            segment(9, 9, line_string![(x: 5., y: 5.), (x: 5., y: 6.), (x: 6., y: 5.), (x: 5., y: 5.)]),
            segment(9, 7, line_string![(x: 5., y: 5.), (x: 10., y: 8.)]),
            segment(2, 6, line_string![(x: 3., y: 1.), (x: 4., y: 1.)]),
            segment(8, 10, line_string![(x: 8., y: 5.), (x: 7., y: 4.)]),
            segment(11, 12, line_string![(x: 20., y: 20.), (x: 21., y: 20.)]),
        ]);

        let mut accumulator = ConnectAccumulator::new();
        for (received, segment) in segments.iter().enumerate() {
            accumulator.accumulate(vec![segment.clone()]);
            assert_eq!(
                accumulator.assemblies(),
                &assemble(&segments[..=received])[..]
            );
        }
        assert_eq!(accumulator.current_value(), connect(&segments));
    }

    #[test]
    fn reset_forgets_the_group() {
        let mut accumulator = ConnectAccumulator::new();
        accumulator.accumulate(triangle());
        accumulator.reset();

        assert_eq!(accumulator.current_value(), None);
        accumulator.accumulate(vec![open_line()]);
        assert!(matches!(accumulator.current_value(), Some(Geometry::LineString(_))));
    }

    #[test]
    fn partial_reductions_match_direct_call() {
        let aggregate = ConnectAggregate::default();
        let mut segments = triangle();
        segments.push(open_line());

        let leaves: Vec<Vec<Segment<i64>>> = segments
            .chunks(1)
            .filter_map(|bag| aggregate.initial(bag))
            .collect();
        let mut leaves = leaves.into_iter();
        let left: Vec<_> = leaves.by_ref().take(2).collect();
        let right: Vec<_> = leaves.collect();

        let partials: Vec<_> = [left, right]
            .into_iter()
            .filter_map(|group| aggregate.intermediate(group))
            .collect();
        assert_eq!(aggregate.finalize(partials), connect(&segments));
    }

    #[test]
    fn intermediate_of_nothing_is_nothing() {
        let aggregate = ConnectAggregate::<i64>::default();
        assert_eq!(aggregate.intermediate(vec![]), None);
        assert_eq!(aggregate.finalize(vec![]), None);
        assert_eq!(aggregate.initial(&[]), None);
    }

    #[test]
    fn encoded_records_round_trip_through_the_backend() {
        let records = vec![
            (1, 2, r#"{"type": "LineString", "coordinates": [[0, 0], [2, 0], [3, 1]]}"#),
            (3, 2, r#"{"type": "LineString", "coordinates": [[2, 2], [3, 1]]}"#),
            (3, 1, r#"{"type": "LineString", "coordinates": [[2, 2], [1, 2], [0, 0]]}"#),
        ];

        let encoded = connect_encoded(&GeoBackend, records).unwrap().unwrap();
        assert_eq!(GeoBackend.parse(&encoded).unwrap(), expected_polygon());
    }

    #[test]
    fn malformed_record_aborts_the_call() {
        let records = vec![(1, 2, "LINESTRING(0 0, 1 1)")];
        assert!(connect_encoded(&GeoBackend, records).is_err());
    }

    #[test]
    fn empty_records_encode_to_nothing() {
        let records: Vec<(i64, i64, &str)> = vec![];
        assert_eq!(connect_encoded(&GeoBackend, records).unwrap(), None);
    }
}
