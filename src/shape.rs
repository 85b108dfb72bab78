use geo::{Coord, Geometry, GeometryCollection, LineString, Polygon};
use log::warn;

use crate::chain::Chain;

/// Distinct vertices a closed chain needs before it is treated as a ring.
pub const MIN_RING_VERTICES: usize = 3;

/// Closed chains with enough distinct vertices become polygons, everything
/// else becomes a line string.
pub fn shape_chain(chain: &Chain) -> Geometry<f64> {
    match chain {
        Chain::Closed(coords) if has_distinct(coords, MIN_RING_VERTICES) => {
            Geometry::Polygon(Polygon::new(LineString::new(coords.clone()), vec![]))
        }
        Chain::Closed(coords) => {
            warn!(
                "Closed chain of {} coordinates is too short for a ring, keeping it as a line",
                coords.len()
            );
            Geometry::LineString(LineString::new(coords.clone()))
        }
        Chain::Open(coords) => Geometry::LineString(LineString::new(coords.clone())),
    }
}

/// Turns the chains of one invocation into its result value.
///
/// No chains gives `None`, a single chain is returned unwrapped and several
/// are collected in chain order.
pub fn shape<'a>(chains: impl IntoIterator<Item = &'a Chain>) -> Option<Geometry<f64>> {
    let mut geometries: Vec<Geometry<f64>> = chains.into_iter().map(shape_chain).collect();
    match geometries.len() {
        0 => None,
        1 => geometries.pop(),
        _ => Some(Geometry::GeometryCollection(GeometryCollection(geometries))),
    }
}

fn has_distinct(coords: &[Coord<f64>], wanted: usize) -> bool {
    let mut seen: Vec<Coord<f64>> = Vec::with_capacity(wanted);
    for coord in coords {
        if !seen.contains(coord) {
            seen.push(*coord);
            if seen.len() >= wanted {
                return true;
            }
        }
    }
    false
}
