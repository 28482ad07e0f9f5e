//! Rolling Deck to Repository (R2R) API helpers.
//!
//! Nothing here performs network I/O: URLs are built for an external fetcher
//! and responses are parsed from text that has already been saved locally.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::data::model::parse_number;
use crate::data::resample::parse_timestamp;
use crate::error::R2rError;

pub const CRUISE_API: &str = "https://service.rvdata.us/api/cruise/";
pub const FILESET_API: &str = "https://service.rvdata.us/api/fileset/cruise_id/";

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// Lookup key for the cruise endpoint. Exactly one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CruiseQuery {
    pub cruise_id: Option<String>,
    pub doi: Option<String>,
    pub vessel: Option<String>,
}

pub fn cruise_url(query: &CruiseQuery) -> Result<String, R2rError> {
    match (&query.cruise_id, &query.doi, &query.vessel) {
        (Some(id), None, None) => Ok(format!("{CRUISE_API}cruise_id/{id}")),
        (None, None, Some(vessel)) => Ok(format!("{CRUISE_API}vessel/{vessel}")),
        (None, Some(doi), None) => {
            // "10.7284/910464" → "910464"
            match doi.rsplit_once('/') {
                Some((_, suffix)) if !suffix.is_empty() => Ok(format!("{CRUISE_API}doi/{suffix}")),
                _ => Err(R2rError::InvalidQuery(format!(
                    "invalid DOI '{doi}', expected '10.xxxx/YYYYY'"
                ))),
            }
        }
        (None, None, None) => Err(R2rError::InvalidQuery(
            "one of cruise_id, doi or vessel must be given".to_string(),
        )),
        _ => Err(R2rError::InvalidQuery(
            "cruise_id, doi and vessel are mutually exclusive".to_string(),
        )),
    }
}

pub fn fileset_url(cruise_id: &str) -> String {
    format!("{FILESET_API}{cruise_id}?device_type=gnss")
}

// ---------------------------------------------------------------------------
// Cruise metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: Option<i64>,
    status_message: Option<String>,
    data: Option<Vec<T>>,
}

/// One record of the cruise endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CruiseRecord {
    pub cruise_id: Option<String>,
    pub cruise_name: Option<String>,
    pub cruise_doi: Option<String>,
    pub vessel_shortname: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub depart_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_date")]
    pub arrive_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_date")]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_number")]
    pub longitude_min: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub longitude_max: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub latitude_min: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub latitude_max: Option<f64>,
    /// The comma-separated `keyword` field, split and trimmed.
    #[serde(rename = "keyword", deserialize_with = "keyword_list")]
    pub keyword_list: Vec<String>,
}

/// Parse a saved cruise endpoint response.
pub fn parse_cruise_response(json: &str) -> Result<Vec<CruiseRecord>, R2rError> {
    let envelope: Envelope<CruiseRecord> = serde_json::from_str(json)?;
    match (envelope.status, envelope.data) {
        (Some(200), Some(data)) if !data.is_empty() => {
            debug!("cruise response holds {} record(s)", data.len());
            Ok(data)
        }
        (status, _) => Err(R2rError::ApiStatus {
            status: status.unwrap_or_default(),
            message: envelope
                .status_message
                .unwrap_or_else(|| "No message".to_string()),
        }),
    }
}

fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<JsonValue>::deserialize(d)?;
    Ok(value.as_ref().and_then(JsonValue::as_str).and_then(parse_timestamp))
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<JsonValue>::deserialize(d)? {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => parse_number(&s),
        _ => None,
    })
}

fn keyword_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Filesets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FilesetItem {
    fileset_id: Option<JsonValue>,
    product_info: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ProductDetail {
    product_type_name: Option<String>,
    product_actual_url: Option<String>,
}

/// Find the download URL of the first `Navigation` product in a saved
/// fileset response.
pub fn navigation_product_url(json: &str) -> Result<String, R2rError> {
    let envelope: Envelope<FilesetItem> = serde_json::from_str(json)?;
    let mut seen = BTreeSet::new();

    for (i, item) in envelope.data.unwrap_or_default().into_iter().enumerate() {
        // product_info is itself JSON, embedded as a string
        let Some(JsonValue::String(info)) = item.product_info else {
            debug!("fileset item {}: no product_info string", i + 1);
            continue;
        };
        let details: Vec<ProductDetail> = match serde_json::from_str(&info) {
            Ok(details) => details,
            Err(e) => {
                warn!(
                    "could not decode product_info for fileset_id {}: {e}",
                    item.fileset_id.unwrap_or(JsonValue::Null)
                );
                continue;
            }
        };
        for detail in details {
            let Some(name) = detail.product_type_name else {
                continue;
            };
            if name == "Navigation" {
                return detail.product_actual_url.ok_or(R2rError::MissingProductUrl);
            }
            seen.insert(name);
        }
    }

    Err(R2rError::NavigationNotFound {
        seen: seen.into_iter().collect(),
    })
}

/// Pick the navigation file to read out of an extracted archive listing.
///
/// Only `.geoCSV` names (any case) qualify; `<cruise_id>_1min.geoCSV` wins,
/// otherwise the first candidate does.
pub fn select_geocsv<'a>(paths: &'a [PathBuf], cruise_id: &str) -> Result<&'a Path, R2rError> {
    let candidates: Vec<&Path> = paths
        .iter()
        .map(PathBuf::as_path)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("geocsv"))
        })
        .collect();

    let preferred = format!("{cruise_id}_1min.geoCSV").to_lowercase();
    candidates
        .iter()
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_lowercase().contains(&preferred))
        })
        .or_else(|| candidates.first())
        .copied()
        .ok_or(R2rError::NoGeoCsv(paths.len()))
}
