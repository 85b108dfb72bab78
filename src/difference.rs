use geo::Geometry;

use crate::backend::{GeoBackend, GeometryBackend};
use crate::error::Result;

/// Spatial difference of two shapes, `a - b`.
#[derive(Debug, Clone, Default)]
pub struct Difference<B = GeoBackend> {
    backend: B,
}

impl<B: GeometryBackend> Difference<B> {
    pub fn new(backend: B) -> Self {
        Difference { backend }
    }

    pub fn exec(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Result<Geometry<f64>> {
        self.backend.difference(a, b)
    }

    pub fn exec_encoded(&self, a: &[u8], b: &[u8]) -> Result<Vec<u8>> {
        let a = self.backend.parse(a)?;
        let b = self.backend.parse(b)?;
        self.backend.serialize(&self.exec(&a, &b)?)
    }
}
