use geo::kernels::{Kernel, Orientation, RobustKernel};
use geo::{
    BooleanOps, ConvexHull, Coord, CoordNum, CoordsIter, Geometry, GeometryCollection, Intersects,
    LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use geojson::GeoJson;
use log::debug;

use crate::error::{Error, Result};

/// The geometry capabilities the functions in this crate delegate to.
pub trait GeometryBackend {
    /// Decodes one geometry from its wire encoding.
    fn parse(&self, encoded: &[u8]) -> Result<Geometry<f64>>;

    fn serialize(&self, geometry: &Geometry<f64>) -> Result<Vec<u8>>;

    /// Convex hull of every coordinate of every geometry: a point or a line
    /// string when the coordinates do not span an area, a polygon otherwise.
    fn convex_hull(&self, geometries: &[Geometry<f64>]) -> Geometry<f64>;

    /// Point-set difference `a - b`.
    fn difference(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Result<Geometry<f64>>;
}

/// Backend built on the `geo` algorithms, with GeoJSON as wire encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoBackend;

impl GeometryBackend for GeoBackend {
    fn parse(&self, encoded: &[u8]) -> Result<Geometry<f64>> {
        let geometry = match GeoJson::from_reader(encoded)? {
            GeoJson::Geometry(geometry) => geometry,
            GeoJson::Feature(feature) => feature.geometry.ok_or(Error::NotAGeometry)?,
            GeoJson::FeatureCollection(_) => return Err(Error::NotAGeometry),
        };
        Ok(Geometry::<f64>::try_from(geometry)?)
    }

    fn serialize(&self, geometry: &Geometry<f64>) -> Result<Vec<u8>> {
        let geometry = geojson::Geometry::new(geojson::Value::from(geometry));
        Ok(serde_json::to_vec(&geometry)?)
    }

    fn convex_hull(&self, geometries: &[Geometry<f64>]) -> Geometry<f64> {
        let points: MultiPoint<f64> = geometries
            .iter()
            .flat_map(|geometry| geometry.coords_iter())
            .map(Point::from)
            .collect();
        debug!(
            "Convex hull of {} geometries ({} coordinates)",
            geometries.len(),
            points.0.len()
        );
        let Some((low, high)) = extremes(&points) else {
            return Geometry::GeometryCollection(GeometryCollection::default());
        };
        if low == high {
            return Geometry::Point(Point::from(low));
        }
        let collinear = points
            .iter()
            .all(|point| RobustKernel::orient2d(low, high, point.0) == Orientation::Collinear);
        if collinear {
            return Geometry::LineString(LineString::new(vec![low, high]));
        }
        Geometry::Polygon(points.convex_hull())
    }

    fn difference(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Result<Geometry<f64>> {
        let (Some(minuend), Some(subtrahend)) = (Parts::of(a), Parts::of(b)) else {
            let found = if Parts::of(a).is_none() { a } else { b };
            return Err(Error::UnsupportedGeometry {
                expected: "point, line or polygon geometry",
                found: geometry_kind(found),
            });
        };

        match (minuend, subtrahend) {
            (Parts::Puntal(points), _) => {
                let kept: Vec<Point<f64>> = points
                    .into_iter()
                    .filter(|point| !b.intersects(point))
                    .collect();
                Ok(collapse_points(kept))
            }
            (Parts::Linear(lines), Parts::Areal(area)) => {
                Ok(collapse_lines(area.clip(&lines, true)))
            }
            (Parts::Linear(_), Parts::Linear(_)) => Err(Error::UnsupportedGeometry {
                expected: "polygon or point to subtract from a line",
                found: geometry_kind(b),
            }),
            (Parts::Areal(area), Parts::Areal(hole)) => {
                Ok(collapse_polygons(area.difference(&hole)))
            }
            // Removing a set of lower dimension leaves the point set as is.
            (Parts::Linear(_), Parts::Puntal(_)) | (Parts::Areal(_), _) => Ok(a.clone()),
        }
    }
}

/// Lexicographically smallest and largest coordinates, which are the two
/// ends of a collinear set.
fn extremes(points: &MultiPoint<f64>) -> Option<(Coord<f64>, Coord<f64>)> {
    let by_position =
        |a: &&Point<f64>, b: &&Point<f64>| a.x().total_cmp(&b.x()).then(a.y().total_cmp(&b.y()));
    let low = points.iter().min_by(by_position)?;
    let high = points.iter().max_by(by_position)?;
    Some((low.0, high.0))
}

/// A geometry normalised to the multi-variant of its dimension.
enum Parts {
    Puntal(MultiPoint<f64>),
    Linear(MultiLineString<f64>),
    Areal(MultiPolygon<f64>),
}

impl Parts {
    fn of(geometry: &Geometry<f64>) -> Option<Parts> {
        let parts = match geometry {
            Geometry::Point(point) => Parts::Puntal(MultiPoint(vec![*point])),
            Geometry::MultiPoint(points) => Parts::Puntal(points.clone()),
            Geometry::Line(line) => {
                Parts::Linear(MultiLineString(vec![LineString::new(vec![line.start, line.end])]))
            }
            Geometry::LineString(line) => Parts::Linear(MultiLineString(vec![line.clone()])),
            Geometry::MultiLineString(lines) => Parts::Linear(lines.clone()),
            Geometry::Polygon(polygon) => Parts::Areal(MultiPolygon(vec![polygon.clone()])),
            Geometry::MultiPolygon(polygons) => Parts::Areal(polygons.clone()),
            Geometry::Rect(rect) => Parts::Areal(MultiPolygon(vec![rect.to_polygon()])),
            Geometry::Triangle(triangle) => Parts::Areal(MultiPolygon(vec![triangle.to_polygon()])),
            Geometry::GeometryCollection(_) => return None,
        };
        Some(parts)
    }
}

fn collapse_points(points: Vec<Point<f64>>) -> Geometry<f64> {
    match <[Point<f64>; 1]>::try_from(points) {
        Ok([point]) => Geometry::Point(point),
        Err(points) => Geometry::MultiPoint(MultiPoint(points)),
    }
}

fn collapse_lines(lines: MultiLineString<f64>) -> Geometry<f64> {
    match <[LineString<f64>; 1]>::try_from(lines.0) {
        Ok([line]) => Geometry::LineString(line),
        Err(lines) => Geometry::MultiLineString(MultiLineString(lines)),
    }
}

fn collapse_polygons(polygons: MultiPolygon<f64>) -> Geometry<f64> {
    match <[Polygon<f64>; 1]>::try_from(polygons.0) {
        Ok([polygon]) => Geometry::Polygon(polygon),
        Err(polygons) => Geometry::MultiPolygon(MultiPolygon(polygons)),
    }
}

pub fn geometry_kind<T: CoordNum>(geometry: &Geometry<T>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
