use std::path::{Path, PathBuf};

use geo::Geometry;
use log::info;

pub mod backend;
pub mod chain;
pub mod connect;
pub mod difference;
pub mod error;
pub mod hull;
pub mod io;
pub mod segment;
pub mod shape;
pub mod udf;

pub use backend::{GeoBackend, GeometryBackend};
pub use chain::{assemble, Assembly, Chain};
pub use connect::{connect, connect_encoded, ConnectAccumulator, ConnectAggregate};
pub use difference::Difference;
pub use error::{Error, Result};
pub use hull::{ConvexHull, HullAccumulator};
pub use io::{EndpointId, SegmentFields};
pub use segment::{EndpointIndex, Segment};
pub use shape::shape;
pub use udf::{Accumulator, Algebraic};

/// Connects the segments stored in `files`, treating them as one group.
///
/// Segments are fed to a [`ConnectAccumulator`] one file at a time, or in
/// chunks of `batch_size` when given.
pub fn connect_files(
    files: &[PathBuf],
    fields: &SegmentFields,
    batch_size: Option<usize>,
) -> Result<Option<Geometry<f64>>> {
    let mut accumulator = ConnectAccumulator::new();
    for (file_index, file) in files.iter().enumerate() {
        info!("Processing file {}/{}: {}", file_index + 1, files.len(), file.display());
        let segments = io::load_segments(file, fields)?;
        match batch_size {
            Some(size) if size > 0 => {
                for batch in segments.chunks(size) {
                    accumulator.accumulate(batch.to_vec());
                }
            }
            _ => accumulator.accumulate(segments),
        }
    }
    info!(
        "Connected {} segments into {} chains",
        accumulator.num_segments(),
        accumulator.assemblies().len()
    );
    Ok(accumulator.current_value())
}

/// Convex hull over every geometry in `files`, as one running hull.
pub fn convex_hull_files(files: &[PathBuf]) -> Result<Option<Geometry<f64>>> {
    let mut accumulator: HullAccumulator = HullAccumulator::default();
    for file in files {
        accumulator.accumulate(io::load_geometries(file)?);
    }
    Ok(accumulator.current_value())
}

/// First geometry of `minuend` minus the first geometry of `subtrahend`.
pub fn difference_files(minuend: &Path, subtrahend: &Path) -> Result<Geometry<f64>> {
    let first = |path: &Path| -> Result<Geometry<f64>> {
        io::load_geometries(path)?
            .into_iter()
            .next()
            .ok_or(Error::NotAGeometry)
    };
    let difference: Difference = Difference::default();
    difference.exec(&first(minuend)?, &first(subtrahend)?)
}
