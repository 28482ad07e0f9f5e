use chrono::{DateTime, Utc};
use log::debug;

use super::{lua_long_text, lua_number, lua_string};
use crate::config::Config;
use crate::error::R2rError;
use crate::export::keyframes;
use crate::r2r::CruiseRecord;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.00Z";

/// A rendered `<cruise_id>.asset` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CruiseAsset {
    pub cruise_id: String,
    pub text: String,
}

impl CruiseAsset {
    pub fn file_name(&self) -> String {
        format!("{}.asset", self.cruise_id)
    }
}

/// Vessel name reduced to identifier-safe characters.
pub fn safe_vessel_id(vessel: &str) -> String {
    vessel.replace([' ', '/', '\\', '.', '-'], "_")
}

/// Render the scene asset (ship model, position, trail) for one cruise.
pub fn render_cruise_asset(record: &CruiseRecord, config: &Config) -> Result<CruiseAsset, R2rError> {
    let id = record.cruise_id.as_deref().ok_or_else(|| R2rError::MissingField {
        cruise: "<unknown>".to_string(),
        field: "cruise_id",
    })?;
    let missing = |field: &'static str| R2rError::MissingField {
        cruise: id.to_string(),
        field,
    };
    let name = record.cruise_name.as_deref().ok_or_else(|| missing("cruise_name"))?;
    let doi = record.cruise_doi.as_deref().ok_or_else(|| missing("cruise_doi"))?;
    let vessel = record
        .vessel_shortname
        .as_deref()
        .ok_or_else(|| missing("vessel_shortname"))?;
    let depart = record.depart_date.ok_or_else(|| missing("depart_date"))?;
    let arrive = record.arrive_date.ok_or_else(|| missing("arrive_date"))?;

    debug!("rendering cruise asset for {id} ({vessel})");

    let text = format!(
        r#"local sun = asset.require("scene/solarsystem/sun/transforms")
local earthTransforms = asset.require("scene/solarsystem/planets/earth/earth")

local shipModel = asset.resource({{
    Name = {model_name},
    Type = "UrlSynchronization",
    Identifier = {model_identifier},
    Url = {model_url},
    Version = 1
}})

local shipKeyframes = asset.require({keyframes_path})

local shipPosition = {{
    Identifier = {position_id},
    Parent = earthTransforms.Earth.Identifier,
    TimeFrame = {{
        Type = "TimeFrameInterval",
        Start = {start},
        End = {end}
    }},
    Transform = {{
        Translation = {{
            Type = "TimelineTranslation",
            Keyframes = shipKeyframes.keyframes
        }}
    }},
    GUI = {{
        Name = {position_name},
        Path = "/Ship Tracks"
    }}
}}

local shipRenderable = {{
    Identifier = {model_id},
    Parent = shipPosition.Identifier,
    TimeFrame = {{
        Type = "TimeFrameInterval",
        Start = {start},
        End = {end}
    }},
    Transform = {{
        Scale = {{
            Type = "StaticScale",
            Scale = {scale}
        }}
    }},
    Renderable = {{
        Type = "RenderableModel",
        GeometryFile = shipModel .. {model_file},
        LightSources = {{
            sun.LightSource,
            {{
                Identifier = "Camera",
                Type = "CameraLightSource",
                Intensity = 0.5
            }}
        }}
    }},
    GUI = {{
        Name = {vessel_model_name},
        Path = "/Ship Tracks"
    }}
}}

local shipTrail = {{
    Identifier = {trail_id},
    Parent = earthTransforms.Earth.Identifier,
    Renderable = {{
        Type = "RenderableTrailTrajectory",
        Enabled = true,
        Translation = {{
            Type = "TimelineTranslation",
            Keyframes = shipKeyframes.keyframes
        }},
        Color = {{ 1.0, 0.5, 0.0 }},
        StartTime = {start},
        EndTime = {end},
        SampleInterval = {sample_interval},
        EnableFade = true
    }},
    GUI = {{
        Name = {trail_name},
        Path = "/Ship Tracks",
        Focusable = false
    }}
}}

asset.onInitialize(function()
    openspace.addSceneGraphNode(shipPosition)
    openspace.addSceneGraphNode(shipRenderable)
    openspace.addSceneGraphNode(shipTrail)
end)

asset.onDeinitialize(function()
    openspace.removeSceneGraphNode(shipTrail)
    openspace.removeSceneGraphNode(shipRenderable)
    openspace.removeSceneGraphNode(shipPosition)
end)

asset.export(shipPosition)
asset.export(shipRenderable)
asset.export(shipTrail)

asset.meta = {{
    Name = {meta_name},
    Description = [[This asset provides position information for the ship track for the cruise {long_id} ({long_vessel}): {long_name}.]],
    Author = {author},
    URL = {url},
    License = {license}
}}
"#,
        model_name = lua_string(&format!("{id} Model")),
        model_identifier = lua_string(&format!("{}_3d_model", safe_vessel_id(vessel))),
        model_url = lua_string(&config.model_url),
        keyframes_path = lua_string(&format!("./{}", keyframes::file_name(id))),
        position_id = lua_string(&format!("ShipPosition_{id}")),
        start = lua_string(&format_time(depart)),
        end = lua_string(&format_time(arrive)),
        position_name = lua_string(&format!("{id} Position")),
        model_id = lua_string(&format!("ShipModel_{id}")),
        scale = lua_number(config.model_scale),
        model_file = lua_string(model_file_name(&config.model_url)),
        vessel_model_name = lua_string(&format!("{vessel} Model")),
        trail_id = lua_string(&format!("ShipTrail_{id}")),
        sample_interval = config.trail_sample_interval,
        trail_name = lua_string(&format!("{id} Trail")),
        meta_name = lua_string(&format!("Ship Track Position: {id}")),
        long_id = lua_long_text(id),
        long_vessel = lua_long_text(vessel),
        long_name = lua_long_text(name),
        author = lua_string(&config.author),
        url = lua_string(&format!("http://doi.org/{doi}")),
        license = lua_string(&config.license),
    );

    Ok(CruiseAsset {
        cruise_id: id.to_string(),
        text,
    })
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Last path segment of the model URL, i.e. the synchronized file name.
fn model_file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
