mod cli;
mod config;
mod data;
mod error;
mod export;
mod r2r;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde_json::{json, Value as JsonValue};

use cli::{Cli, Commands, GeojsonArgs, KeyframesArgs, SelectArgs, UrlArgs};
use config::Config;
use data::loader::{extract_metadata, extract_table, load_geocsv, GeoCsv, TableOptions};
use data::resample::{parse_rate, resample};
use data::source::Source;
use export::{cruise_asset, geojson, keyframes};
use r2r::CruiseQuery;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    match cli.command {
        Commands::Metadata(args) => {
            let metadata = extract_metadata(&source_for(&args.input)?)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Commands::Inspect(args) => run_inspect(&args.input)?,
        Commands::Geojson(args) => run_geojson(args, &config)?,
        Commands::Keyframes(args) => run_keyframes(args, &config)?,
        Commands::CruiseAsset(args) => run_cruise_asset(&args.response, &config)?,
        Commands::Cruises(args) => run_cruises(&args.response)?,
        Commands::Url(args) => println!("{}", url_for(args)?),
        Commands::NavProduct(args) => {
            let json = read_text(&args.response)?;
            println!("{}", r2r::navigation_product_url(&json)?);
        }
        Commands::SelectGeocsv(SelectArgs { cruise_id, paths }) => {
            println!("{}", r2r::select_geocsv(&paths, &cruise_id)?.display());
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_inspect(input: &Path) -> Result<()> {
    let GeoCsv { metadata, table } = load_geocsv(&source_for(input)?, None)?;

    let columns: Vec<_> = table
        .columns
        .iter()
        .map(|c| json!({ "name": c.name, "type": format!("{:?}", c.kind).to_lowercase() }))
        .collect();
    let first_row = table.row(0).map(|row| {
        table
            .column_names()
            .map(|name| {
                let value = row.get(name).map_or(String::new(), ToString::to_string);
                (name.to_string(), JsonValue::String(value))
            })
            .collect::<serde_json::Map<_, _>>()
    });
    let malformed: Vec<String> = table.diagnostics.iter().map(ToString::to_string).collect();

    let report = json!({
        "source": table.source,
        "metadata": metadata,
        "columns": columns,
        "rows": table.len(),
        "first_row": first_row,
        "malformed_rows": malformed,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_geojson(args: GeojsonArgs, config: &Config) -> Result<()> {
    let token = args.missing_token.or_else(|| config.missing_token.clone());
    let (track, options) = load_track(&args.input, token)?;
    let collection =
        geojson::track_feature_collection(&track, config, options.missing_token.as_deref())?;

    let output = match args.output {
        Some(path) => path,
        None => {
            let cruise_id = track.metadata.require("cruise_id", &track.table.source)?;
            config.output_dir.join(format!("{cruise_id}.geojson"))
        }
    };
    write_output(&output, &serde_json::to_string_pretty(&collection)?)?;
    info!("GeoJSON file saved to {}", output.display());
    Ok(())
}

fn run_keyframes(args: KeyframesArgs, config: &Config) -> Result<()> {
    let rate = match &args.rate {
        Some(rate) => parse_rate(rate)?,
        None => config.rate()?,
    };
    let aggregation = args.aggregation.unwrap_or(config.aggregation);
    let token = args.missing_token.or_else(|| config.missing_token.clone());

    let (track, options) = load_track(&args.input, token)?;
    let resampled = resample(&track.table, rate, aggregation)?;
    let text = keyframes::render_keyframes(
        &track.metadata,
        &resampled,
        config,
        options.missing_token.as_deref(),
    )?;

    let cruise_id = track.metadata.require("cruise_id", &track.table.source)?;
    let output = config.output_dir.join(keyframes::file_name(cruise_id));
    write_output(&output, &text)?;
    info!("Keyframes saved to {}", output.display());
    Ok(())
}

fn run_cruise_asset(response: &Path, config: &Config) -> Result<()> {
    let json = read_text(response)?;
    let records = r2r::parse_cruise_response(&json)
        .with_context(|| format!("parsing {}", response.display()))?;

    let mut written = 0usize;
    for record in &records {
        match cruise_asset::render_cruise_asset(record, config) {
            Ok(asset) => {
                let output = config.output_dir.join(asset.file_name());
                write_output(&output, &asset.text)?;
                info!("Generated asset file: {}", output.display());
                written += 1;
            }
            Err(e) => warn!("skipping cruise record: {e}"),
        }
    }
    info!("{written} of {} cruise assets written", records.len());
    Ok(())
}

fn run_cruises(response: &Path) -> Result<()> {
    let json = read_text(response)?;
    let records = r2r::parse_cruise_response(&json)
        .with_context(|| format!("parsing {}", response.display()))?;

    let date = |d: Option<chrono::DateTime<chrono::Utc>>| {
        d.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
    };
    let coord = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));

    for rec in &records {
        println!(
            "{}\t{}\t{} .. {}\tlon [{}, {}] lat [{}, {}]\trelease {}\t{}",
            rec.cruise_id.as_deref().unwrap_or("-"),
            rec.vessel_shortname.as_deref().unwrap_or("-"),
            date(rec.depart_date),
            date(rec.arrive_date),
            coord(rec.longitude_min),
            coord(rec.longitude_max),
            coord(rec.latitude_min),
            coord(rec.latitude_max),
            date(rec.release_date),
            rec.keyword_list.join(";"),
        );
    }
    Ok(())
}

fn url_for(args: UrlArgs) -> Result<String> {
    if args.fileset {
        let cruise_id = args
            .cruise_id
            .context("--fileset requires --cruise-id")?;
        return Ok(r2r::fileset_url(&cruise_id));
    }
    let query = CruiseQuery {
        cruise_id: args.cruise_id,
        doi: args.doi,
        vessel: args.vessel,
    };
    Ok(r2r::cruise_url(&query)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a track in two passes: the header first, then the table typed with
/// the header's declared delimiter and missing token (`missing_token`
/// overrides the latter).
fn load_track(path: &Path, missing_token: Option<String>) -> Result<(GeoCsv, TableOptions)> {
    let source = source_for(path)?;
    let metadata = extract_metadata(&source)?;
    if metadata.is_empty() {
        warn!("{}: no metadata lines", source.name());
    }

    let mut options = TableOptions::from_metadata(&metadata);
    if missing_token.is_some() {
        options.missing_token = missing_token;
    }
    let table = extract_table(&source, &options)?;
    if !table.diagnostics.is_empty() {
        warn!(
            "{}: {} malformed row(s)",
            source.name(),
            table.diagnostics.len()
        );
    }

    Ok((GeoCsv { metadata, table }, options))
}

/// `-` reads the whole of standard input up front.
fn source_for(path: &Path) -> Result<Source> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading standard input")?;
        Ok(Source::text("<stdin>", text))
    } else {
        Ok(Source::file(path))
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
