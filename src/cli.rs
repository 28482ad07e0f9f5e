//! Command line definitions using the clap derive API

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::resample::Aggregation;

/// Convert R2R cruise metadata and GeoCSV navigation tracks into GeoJSON
/// and OpenSpace assets.
#[derive(Parser, Debug)]
#[command(
    name = "rvdata-openspace",
    version,
    after_help = "EXAMPLES:\n  \
                  rvdata-openspace geojson tmp/RR2402_1min.geoCSV\n  \
                  rvdata-openspace keyframes tmp/RR2402_1min.geoCSV --rate 30min\n  \
                  rvdata-openspace cruise-asset RR2402_cruise.json\n  \
                  rvdata-openspace url --cruise-id RR2402 --fileset"
)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Directory for generated files (overrides the configuration)
    #[arg(long, short = 'o', global = true)]
    pub output_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the `#key: value` header of a GeoCSV file as JSON
    Metadata(InputArgs),

    /// Print header, column types and malformed rows of a GeoCSV file as JSON
    Inspect(InputArgs),

    /// Convert a GeoCSV track into a GeoJSON LineString
    Geojson(GeojsonArgs),

    /// Write a resampled keyframe asset for a GeoCSV track
    Keyframes(KeyframesArgs),

    /// Write one scene asset per cruise of a saved R2R cruise response
    CruiseAsset(ResponseArgs),

    /// List the cruises of a saved R2R cruise response
    Cruises(ResponseArgs),

    /// Print an R2R API URL
    Url(UrlArgs),

    /// Print the Navigation product URL from a saved R2R fileset response
    NavProduct(ResponseArgs),

    /// Pick the navigation GeoCSV among extracted archive files
    SelectGeocsv(SelectArgs),
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// GeoCSV file (`-` reads standard input)
    pub input: PathBuf,
}

#[derive(Args, Debug)]
pub struct GeojsonArgs {
    /// GeoCSV file (`-` reads standard input)
    pub input: PathBuf,

    /// Output file (default: <output-dir>/<cruise_id>.geojson)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Placeholder treated as a missing value
    #[arg(long)]
    pub missing_token: Option<String>,
}

#[derive(Args, Debug)]
pub struct KeyframesArgs {
    /// GeoCSV file (`-` reads standard input)
    pub input: PathBuf,

    /// Resample rate, e.g. 60min, 1H, 30s
    #[arg(long)]
    pub rate: Option<String>,

    /// How rows within one time bin are combined
    #[arg(long, value_enum)]
    pub aggregation: Option<Aggregation>,

    /// Placeholder treated as a missing value
    #[arg(long)]
    pub missing_token: Option<String>,
}

#[derive(Args, Debug)]
pub struct ResponseArgs {
    /// Saved JSON response
    pub response: PathBuf,
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    #[arg(long)]
    pub cruise_id: String,

    /// Candidate files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UrlArgs {
    #[arg(long, conflicts_with_all = ["doi", "vessel"])]
    pub cruise_id: Option<String>,

    #[arg(long, conflicts_with = "vessel")]
    pub doi: Option<String>,

    #[arg(long)]
    pub vessel: Option<String>,

    /// Print the GNSS fileset URL instead (requires --cruise-id)
    #[arg(long, requires = "cruise_id")]
    pub fileset: bool,
}
