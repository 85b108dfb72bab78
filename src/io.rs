use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use geo::Geometry;
use geojson::{Feature, FeatureCollection, GeoJson, Value as GeoJsonValue};
use log::{debug, info};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::segment::Segment;

/// Endpoint label as found in a feature property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointId::Number(n) => write!(f, "{}", n),
            EndpointId::Text(s) => f.write_str(s),
        }
    }
}

/// Names of the feature properties carrying the endpoint ids.
#[derive(Debug, Clone)]
pub struct SegmentFields {
    pub start: String,
    pub end: String,
}

impl Default for SegmentFields {
    fn default() -> Self {
        SegmentFields {
            start: "start_id".to_string(),
            end: "end_id".to_string(),
        }
    }
}

fn read_features(path: &Path) -> Result<Vec<Feature>> {
    info!("Loading file: {}", path.display());
    let file = File::open(path)?;
    let features = match GeoJson::from_reader(BufReader::new(file))? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };
    info!("Found {} features in file", features.len());
    Ok(features)
}

/// Loads every geometry of a GeoJSON document, skipping features without one.
pub fn load_geometries(path: &Path) -> Result<Vec<Geometry<f64>>> {
    read_features(path)?
        .into_iter()
        .filter_map(|feature| feature.geometry)
        .map(|geometry| -> Result<Geometry<f64>> { Ok(Geometry::try_from(geometry)?) })
        .collect()
}

/// Loads segment records: one per feature, ids taken from `fields`.
pub fn load_segments(path: &Path, fields: &SegmentFields) -> Result<Vec<Segment<EndpointId>>> {
    let features = read_features(path)?;
    let total_features = features.len();
    let mut segments = Vec::with_capacity(total_features);

    for (index, feature) in features.into_iter().enumerate() {
        if (index + 1) % 1000 == 0 {
            debug!("Processing feature {}/{}", index + 1, total_features);
        }
        let start_id = endpoint_id(&feature, index, &fields.start)?;
        let end_id = endpoint_id(&feature, index, &fields.end)?;
        let Some(geometry) = feature.geometry else {
            debug!("Skipping feature {} ({} to {}) without geometry", index, start_id, end_id);
            continue;
        };
        let geometry = Geometry::<f64>::try_from(geometry)?;
        segments.push(Segment::from_geometry(start_id, end_id, geometry)?);
    }

    info!("Loaded {} segments from file", segments.len());
    Ok(segments)
}

fn endpoint_id(feature: &Feature, index: usize, name: &str) -> Result<EndpointId> {
    let invalid = || Error::InvalidProperty {
        index,
        name: name.to_string(),
    };
    match feature.property(name) {
        None => Err(Error::MissingProperty {
            index,
            name: name.to_string(),
        }),
        Some(JsonValue::Number(number)) => number.as_i64().map(EndpointId::Number).ok_or_else(invalid),
        Some(JsonValue::String(text)) => Ok(EndpointId::Text(text.clone())),
        Some(_) => Err(invalid()),
    }
}

/// Writes the result as a FeatureCollection holding one feature, or none
/// when there is no result.
pub fn write_geometry<W: Write>(writer: W, geometry: Option<&Geometry<f64>>) -> Result<()> {
    let features: Vec<Feature> = geometry
        .map(|geometry| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(GeoJsonValue::from(geometry))),
            id: None,
            properties: Some(serde_json::Map::new()),
            foreign_members: None,
        })
        .into_iter()
        .collect();

    let feature_collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    serde_json::to_writer_pretty(writer, &feature_collection)?;
    Ok(())
}
