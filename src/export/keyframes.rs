use log::{info, warn};

use super::{lua_long_text, lua_number, lua_string};
use crate::config::Config;
use crate::data::model::{MetadataRecord, TabularDataset, Value};
use crate::data::projection::project_columns;
use crate::error::GeoCsvError;
use crate::export::geojson::{LATITUDE, LONGITUDE};

pub const TIME: &str = "iso_time";
pub const SPEED: &str = "speed_made_good";
pub const COURSE: &str = "course_made_good";

pub fn file_name(cruise_id: &str) -> String {
    format!("{cruise_id}_keyframes.asset")
}

/// `2024-02-17T00:01:00.00Z` → `2024-02-17T00:01:00`
pub fn keyframe_key(iso_time: &str) -> &str {
    let whole_seconds = iso_time.split('.').next().unwrap_or(iso_time);
    whole_seconds.trim_end_matches('Z')
}

/// Render the keyframe timeline for one cruise.
///
/// `table` is usually already resampled. Rows without a timestamp or without
/// coordinates are skipped; missing speed or course is written as `nil`.
pub fn render_keyframes(
    metadata: &MetadataRecord,
    table: &TabularDataset,
    config: &Config,
    missing_token: Option<&str>,
) -> Result<String, GeoCsvError> {
    let name = table.source.as_str();
    let cruise_id = metadata.require("cruise_id", name)?;
    let title = metadata.require("title", name)?;
    let source_dataset = metadata.require("source_dataset", name)?;
    let doi = source_dataset
        .strip_prefix("doi:")
        .unwrap_or(source_dataset)
        .trim();

    if table.column(TIME).is_none() {
        return Err(GeoCsvError::ColumnNotFound {
            name: name.to_string(),
            column: TIME.to_string(),
        });
    }
    if table.is_empty() {
        warn!("{name}: no data rows, writing an empty timeline");
    }
    let positions = project_columns(table, &[LONGITUDE, LATITUDE], missing_token)?;

    let mut out = String::from("local keyframes = {\n");
    let mut written = 0usize;
    for (row, position) in table.iter_rows().zip(&positions) {
        let Some(Value::Text(stamp)) = row.get(TIME) else {
            warn!("{name}: data row {}: no timestamp, skipped", row.position());
            continue;
        };
        if position.iter().any(|v| v.is_nan()) {
            warn!("{name}: data row {}: missing coordinate, skipped", row.position());
            continue;
        }
        let optional = |column: &str| {
            row.get(column)
                .and_then(Value::as_f64)
                .map_or_else(|| "nil".to_string(), lua_number)
        };

        out.push_str(&format!(
            "  [{key}] = {{\n    \
             Type = \"GlobeTranslation\",\n    \
             Globe = \"Earth\",\n    \
             Longitude = {lon},\n    \
             Latitude = {lat},\n    \
             Altitude = 0,\n    \
             SpeedMadeGood = {speed},\n    \
             CourseMadeGood = {course},\n    \
             UseHeightmap = false\n  \
             }},\n",
            key = lua_string(keyframe_key(stamp)),
            lon = lua_number(position[0]),
            lat = lua_number(position[1]),
            speed = optional(SPEED),
            course = optional(COURSE),
        ));
        written += 1;
    }

    out.push_str(&format!(
        "}}\n\n\
         asset.export(\"keyframes\", keyframes)\n\n\
         asset.meta = {{\n  \
         Name = {name_literal},\n  \
         Description = [[This asset provides position information for the ship track for the cruise {id}: {title}]],\n  \
         Author = {author},\n  \
         URL = {url},\n  \
         License = {license}\n\
         }}\n",
        name_literal = lua_string(&format!("Ship Track Position: {cruise_id}")),
        id = lua_long_text(cruise_id),
        title = lua_long_text(title),
        author = lua_string(&config.author),
        url = lua_string(&format!("http://doi.org/{doi}")),
        license = lua_string(&config.license),
    ));

    info!("{name}: {written} keyframes for {cruise_id}");
    Ok(out)
}
