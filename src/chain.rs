use std::collections::VecDeque;
use std::hash::Hash;

use geo::Coord;
use log::{debug, trace};

use crate::segment::{EndpointIndex, Segment};

/// An assembled path, tagged by whether it returned to its starting endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Chain {
    Open(Vec<Coord<f64>>),
    Closed(Vec<Coord<f64>>),
}

impl Chain {
    pub fn into_coords(self) -> Vec<Coord<f64>> {
        match self {
            Chain::Open(coords) | Chain::Closed(coords) => coords,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Chain::Closed(_))
    }
}

/// One connected group of segments together with the path they form.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly<Id> {
    pub chain: Chain,
    pub head_id: Id,
    pub tail_id: Id,
    /// Positions of the consumed segments, in path order from head to tail.
    pub members: Vec<usize>,
}

impl<Id> Assembly<Id> {
    /// The assembled path as a segment of its own, labelled by its open ends.
    pub fn into_segment(self) -> Segment<Id> {
        Segment {
            start_id: self.head_id,
            end_id: self.tail_id,
            coords: self.chain.into_coords(),
        }
    }
}

/// Chains segments together through shared endpoint ids.
///
/// Seeds are taken in input order. From each seed the path is extended at its
/// tail and then at its head, each time consuming the first unvisited segment
/// listed under the open endpoint, in whichever orientation matches. Where more
/// than two segments meet, the ones not picked start chains of their own.
/// Self-loops always form a chain on their own.
///
/// Every segment ends up in exactly one assembly.
pub fn assemble<Id: Eq + Hash + Clone>(segments: &[Segment<Id>]) -> Vec<Assembly<Id>> {
    let index = EndpointIndex::build(segments);
    let mut visited = Vec::new();
    let mut assemblies = Vec::new();
    assemble_from(segments, &index, &mut visited, 0, &mut assemblies);
    assemblies
}

/// Runs the seed loop of [`assemble`] from position `first_seed` on, adding
/// to `assemblies`.
///
/// `index` must list exactly `segments`, and `visited` marks the segments
/// already consumed by `assemblies`; it grows to cover new segments.
pub(crate) fn assemble_from<Id: Eq + Hash + Clone>(
    segments: &[Segment<Id>],
    index: &EndpointIndex<Id>,
    visited: &mut Vec<bool>,
    first_seed: usize,
    assemblies: &mut Vec<Assembly<Id>>,
) {
    visited.resize(segments.len(), false);

    for seed in first_seed..segments.len() {
        if visited[seed] {
            continue;
        }
        assemblies.push(walk(segments, index, visited, seed));
    }

    debug!(
        "Assembled {} segments into {} chains ({} closed)",
        segments.len(),
        assemblies.len(),
        assemblies.iter().filter(|a| a.chain.is_closed()).count()
    );
}

/// Grows one chain from `seed`, marking what it consumes.
fn walk<Id: Eq + Hash + Clone>(
    segments: &[Segment<Id>],
    index: &EndpointIndex<Id>,
    visited: &mut [bool],
    seed: usize,
) -> Assembly<Id> {
    visited[seed] = true;

    let segment = &segments[seed];
    let mut path: VecDeque<Coord<f64>> = segment.coords.iter().copied().collect();
    let mut members = VecDeque::from([seed]);
    let mut head_id = segment.start_id.clone();
    let mut tail_id = segment.end_id.clone();

    if !segment.is_self_loop() {
        while let Some((next, at_start)) = next_unvisited(segments, index, visited, &tail_id) {
            visited[next] = true;
            let piece = &segments[next];
            trace!("Appending segment {} to chain seeded by {}", next, seed);
            if at_start {
                append(&mut path, piece.coords.iter().copied());
                tail_id = piece.end_id.clone();
            } else {
                append(&mut path, piece.coords.iter().rev().copied());
                tail_id = piece.start_id.clone();
            }
            members.push_back(next);
        }

        while let Some((next, at_start)) = next_unvisited(segments, index, visited, &head_id) {
            visited[next] = true;
            let piece = &segments[next];
            trace!("Prepending segment {} to chain seeded by {}", next, seed);
            if at_start {
                // The piece must end at the head, so walk it backwards.
                prepend(&mut path, piece.coords.iter().rev().copied());
                head_id = piece.end_id.clone();
            } else {
                prepend(&mut path, piece.coords.iter().copied());
                head_id = piece.start_id.clone();
            }
            members.push_front(next);
        }
    }

    let coords: Vec<Coord<f64>> = path.into_iter().collect();
    let chain = if head_id == tail_id {
        Chain::Closed(coords)
    } else {
        Chain::Open(coords)
    };
    Assembly {
        chain,
        head_id,
        tail_id,
        members: members.into_iter().collect(),
    }
}

/// First unvisited, non-self-loop segment touching `id`, and whether it
/// touches with its start.
fn next_unvisited<Id: Eq + Hash + Clone>(
    segments: &[Segment<Id>],
    index: &EndpointIndex<Id>,
    visited: &[bool],
    id: &Id,
) -> Option<(usize, bool)> {
    index
        .touching(id)
        .iter()
        .copied()
        .find(|&position| !visited[position] && !segments[position].is_self_loop())
        .map(|position| (position, segments[position].start_id == *id))
}

/// Appends `piece` to the back of the path, writing a shared joint once.
fn append(path: &mut VecDeque<Coord<f64>>, piece: impl Iterator<Item = Coord<f64>>) {
    let mut piece = piece.peekable();
    if path.back().is_some() && path.back() == piece.peek() {
        piece.next();
    }
    path.extend(piece);
}

/// Prepends `piece` so that it ends where the path starts. `piece` yields
/// coordinates from its far end towards the joint; the joint is written once.
fn prepend(path: &mut VecDeque<Coord<f64>>, piece: impl DoubleEndedIterator<Item = Coord<f64>>) {
    let mut piece = piece.rev().peekable();
    if path.front().is_some() && path.front() == piece.peek() {
        piece.next();
    }
    for coord in piece {
        path.push_front(coord);
    }
}
