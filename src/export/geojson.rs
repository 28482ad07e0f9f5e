use log::{info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::data::loader::GeoCsv;
use crate::data::projection::project_columns;
use crate::error::GeoCsvError;

pub const LONGITUDE: &str = "ship_longitude";
pub const LATITUDE: &str = "ship_latitude";

// ---------------------------------------------------------------------------
// GeoJSON document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Geometry,
    pub properties: TrackProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[lon, lat]` pairs in row order.
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackProperties {
    pub title: String,
    pub description: String,
    pub cruise_id: String,
    pub source_dataset: String,
    pub attribution: String,
}

/// Build the LineString feature collection for one ship track.
///
/// With a `missing_token`, rows whose longitude or latitude is missing are
/// dropped (and logged); without one they are an error.
pub fn track_feature_collection(
    csv: &GeoCsv,
    config: &Config,
    missing_token: Option<&str>,
) -> Result<FeatureCollection, GeoCsvError> {
    let name = csv.table.source.as_str();
    let cruise_id = csv.metadata.require("cruise_id", name)?;
    let source_dataset = csv
        .metadata
        .get("source_dataset")
        .or_else(|| csv.metadata.get("source_event"))
        .ok_or_else(|| GeoCsvError::MissingMetadataKey {
            name: name.to_string(),
            key: "source_dataset".to_string(),
        })?;

    let projected = project_columns(&csv.table, &[LONGITUDE, LATITUDE], missing_token)?;
    let mut coordinates = Vec::with_capacity(projected.len());
    for (r, pair) in projected.iter().enumerate() {
        if pair.iter().any(|v| v.is_nan()) {
            warn!("{name}: data row {}: missing coordinate, skipped", r + 1);
            continue;
        }
        coordinates.push([pair[0], pair[1]]);
    }
    info!("{name}: {} track points for {cruise_id}", coordinates.len());

    Ok(FeatureCollection {
        kind: "FeatureCollection",
        features: vec![Feature {
            kind: "Feature",
            geometry: Geometry {
                kind: "LineString",
                coordinates,
            },
            properties: TrackProperties {
                title: cruise_id.to_string(),
                description: config.description.clone(),
                cruise_id: cruise_id.to_string(),
                source_dataset: source_dataset.to_string(),
                attribution: config.attribution.clone(),
            },
        }],
    })
}
