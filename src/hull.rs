use geo::Geometry;

use crate::backend::{GeoBackend, GeometryBackend};
use crate::error::Result;
use crate::udf::{Accumulator, Algebraic};

/// Convex hull of one geometry or of a whole bag of them.
///
/// The hull of partial hulls is the hull of their union, which is what lets
/// the computation run as a tree of partial reductions.
#[derive(Debug, Clone, Default)]
pub struct ConvexHull<B = GeoBackend> {
    backend: B,
}

impl<B: GeometryBackend> ConvexHull<B> {
    pub fn new(backend: B) -> Self {
        ConvexHull { backend }
    }

    pub fn exec_one(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        self.backend.convex_hull(std::slice::from_ref(geometry))
    }

    /// Hull over the bag; an empty bag has no hull.
    pub fn exec(&self, bag: &[Geometry<f64>]) -> Option<Geometry<f64>> {
        if bag.is_empty() {
            return None;
        }
        Some(self.backend.convex_hull(bag))
    }

    /// [`ConvexHull::exec`] over encoded geometries.
    pub fn exec_encoded<G: AsRef<[u8]>>(&self, bag: &[G]) -> Result<Option<Vec<u8>>> {
        let geometries = bag
            .iter()
            .map(|encoded| self.backend.parse(encoded.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.exec(&geometries)
            .map(|hull| self.backend.serialize(&hull))
            .transpose()
    }
}

impl<B: GeometryBackend> Algebraic for ConvexHull<B> {
    type Record = Geometry<f64>;
    type Partial = Geometry<f64>;
    type Output = Geometry<f64>;

    fn initial(&self, bag: &[Geometry<f64>]) -> Option<Geometry<f64>> {
        bag.first().cloned()
    }

    fn intermediate(&self, partials: Vec<Geometry<f64>>) -> Option<Geometry<f64>> {
        self.exec(&partials)
    }

    fn finalize(&self, partials: Vec<Geometry<f64>>) -> Option<Geometry<f64>> {
        self.exec(&partials)
    }
}

/// Running hull of a group, folded one bag at a time.
#[derive(Debug, Clone, Default)]
pub struct HullAccumulator<B = GeoBackend> {
    hull: ConvexHull<B>,
    partial: Option<Geometry<f64>>,
}

impl<B: GeometryBackend> HullAccumulator<B> {
    pub fn new(backend: B) -> Self {
        HullAccumulator {
            hull: ConvexHull::new(backend),
            partial: None,
        }
    }
}

impl<B: GeometryBackend> Accumulator for HullAccumulator<B> {
    type Batch = Vec<Geometry<f64>>;
    type Output = Geometry<f64>;

    fn accumulate(&mut self, mut batch: Vec<Geometry<f64>>) {
        if let Some(partial) = self.partial.take() {
            batch.push(partial);
        }
        self.partial = self.hull.exec(&batch);
    }

    fn current_value(&self) -> Option<Geometry<f64>> {
        self.partial.clone()
    }

    fn reset(&mut self) {
        self.partial = None;
    }
}
