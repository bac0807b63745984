#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the floodmap passes.
//!
//! Each subcommand is one read-transform-write pass. Default paths follow
//! the file naming used by the flood-risk and camera exports, so
//! `floodmap buffer` followed by `floodmap tag-cameras` chains the two
//! stages without arguments.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use floodmap_buffer::DEFAULT_BUFFER_METERS;
use floodmap_cli_utils::{IndicatifProgress, MultiProgress};
use floodmap_spatial::RiskZoneIndex;

const FLOOD_RISK: &str = "flood_risk_20191012060000.geojson";
const BUFFERED_FLOOD_RISK: &str = "buffered_flood_risk_20191012060000.geojson";
const CAMERA_SCAM: &str = "camera_scam_portal.geojson";
const CAMERA_CCTV: &str = "camera_cctv_portal.geojson";
const CAMERA_ALL: &str = "camera_all_20191012060000.geojson";
const BULLETIN: &str = "./xml/20241110012447_0_VPTW63_010000.xml";
const BULLETIN_OUTPUT_DIR: &str = "./json";

#[derive(Parser)]
#[command(name = "floodmap", about = "Flood-risk and weather bulletin GeoJSON passes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grow flood-risk polygons outward by a fixed radius
    Buffer {
        /// Flood-risk polygon collection (WGS84)
        #[arg(long, default_value = FLOOD_RISK)]
        input: PathBuf,
        /// Where to write the buffered collection
        #[arg(long, default_value = BUFFERED_FLOOD_RISK)]
        output: PathBuf,
        /// Buffer radius in metres
        #[arg(long, default_value_t = DEFAULT_BUFFER_METERS)]
        radius: f64,
    },
    /// Stamp camera points with the highest flood risk of the zones they fall in
    TagCameras {
        /// Buffered flood-risk polygon collection
        #[arg(long, default_value = BUFFERED_FLOOD_RISK)]
        zones: PathBuf,
        /// Camera point collections, merged in the order given
        #[arg(long = "cameras", default_values = [CAMERA_SCAM, CAMERA_CCTV])]
        cameras: Vec<PathBuf>,
        /// Where to write the merged camera collection
        #[arg(long, default_value = CAMERA_ALL)]
        output: PathBuf,
    },
    /// Convert a JMA XML bulletin into point features
    Bulletin {
        /// Bulletin XML file
        #[arg(long, default_value = BULLETIN)]
        input: PathBuf,
        /// Directory for the `.geojson` output
        #[arg(long, default_value = BULLETIN_OUTPUT_DIR)]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = floodmap_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Buffer {
            input,
            output,
            radius,
        } => buffer(&input, &output, radius)?,
        Commands::TagCameras {
            zones,
            cameras,
            output,
        } => tag_cameras(&multi, &zones, &cameras, &output)?,
        Commands::Bulletin { input, output_dir } => {
            let written = floodmap_bulletin::convert_file(&input, &output_dir)?;
            log::info!("GeoJSON file created successfully at {}", written.display());
        }
    }

    Ok(())
}

/// Buffers every flood-risk polygon and writes the result.
fn buffer(input: &Path, output: &Path, radius: f64) -> Result<(), Box<dyn std::error::Error>> {
    let zones = floodmap_collection::read(input)?;
    let buffered = floodmap_buffer::buffer_collection(zones, radius)?;
    floodmap_collection::write(output, &buffered)?;
    Ok(())
}

/// Tags every camera collection against the flood-risk zones and writes
/// the merged result.
fn tag_cameras(
    multi: &MultiProgress,
    zones: &Path,
    cameras: &[PathBuf],
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = RiskZoneIndex::build(&floodmap_collection::read(zones)?);
    if index.is_empty() {
        log::warn!("No flood-risk zones loaded from {}", zones.display());
    }

    let collections = cameras
        .iter()
        .map(|path| floodmap_collection::read(path))
        .collect::<Result<Vec<_>, _>>()?;

    let progress = IndicatifProgress::cameras_bar(multi, "Tagging cameras");
    let merged = floodmap_spatial::tag_all(&index, collections, &progress)?;

    floodmap_collection::write(output, &merged)?;
    Ok(())
}
