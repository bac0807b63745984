#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! JMA meteorological XML bulletin to `GeoJSON` conversion.
//!
//! Each `MeteorologicalInfo` block in a bulletin (typhoon positions,
//! forecast circles, ...) is flattened into one property map. Every
//! `BasePoint` inside the block becomes a `Point` feature carrying a copy
//! of those properties plus its own `point_type`. Centre-position points
//! expressed in degrees duplicate another base point and are skipped.

pub mod coordinates;
pub mod flatten;
pub mod xml;

use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};

use crate::xml::Element;

/// Namespace of `MeteorologicalInfo` blocks.
pub const METEOROLOGY_NS: &str = "http://xml.kishou.go.jp/jmaxml1/body/meteorology1/";

/// Namespace of `BasePoint` elements.
pub const ELEMENT_BASIS_NS: &str = "http://xml.kishou.go.jp/jmaxml1/elementBasis1/";

/// `type` of base points that never produce a feature.
pub const CENTER_POSITION_TYPE: &str = "中心位置（度）";

/// Property holding the base point's `type` on every feature.
pub const POINT_TYPE_PROPERTY: &str = "point_type";

/// Errors that can occur while converting a bulletin.
#[derive(Debug, thiserror::Error)]
pub enum BulletinError {
    /// The document is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document is well-formed but structurally unusable.
    #[error("Malformed bulletin: {0}")]
    Malformed(&'static str),

    /// Reading the bulletin failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Writing the output collection failed.
    #[error(transparent)]
    Collection(#[from] floodmap_collection::CollectionError),
}

/// Builds a point feature for one `BasePoint` element.
///
/// Returns `None` for centre-position points and for points whose
/// coordinates cannot be parsed; the latter are logged.
#[must_use]
pub fn point_feature(base_point: &Element, properties: &JsonObject) -> Option<Feature> {
    let point_type = base_point.attribute("type");
    if point_type == Some(CENTER_POSITION_TYPE) {
        return None;
    }

    let text = base_point.text.as_deref().unwrap_or_default();
    let position = match coordinates::parse_base_point(text) {
        Ok(position) => position,
        Err(coordinates::CoordinateError::TooFewTokens(_)) => {
            log::debug!("Skipping base point without coordinates: {text:?}");
            return None;
        }
        Err(e) => {
            log::warn!("Invalid coordinates found: {text:?}: {e}");
            return None;
        }
    };

    let mut properties = properties.clone();
    properties.insert(
        POINT_TYPE_PROPERTY.to_string(),
        JsonValue::String(point_type.unwrap_or_default().to_string()),
    );

    Some(Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
            position.lon,
            position.lat,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Extracts point features from every `MeteorologicalInfo` block of a
/// parsed bulletin, in document order.
#[must_use]
pub fn extract_features(root: &Element) -> Vec<Feature> {
    let mut features = Vec::new();

    for info in root.find_all(METEOROLOGY_NS, "MeteorologicalInfo") {
        let properties = flatten::flatten(info);
        let before = features.len();

        features.extend(
            info.find_all(ELEMENT_BASIS_NS, "BasePoint")
                .into_iter()
                .filter_map(|base_point| point_feature(base_point, &properties)),
        );

        log::debug!(
            "MeteorologicalInfo with {} properties yielded {} points",
            properties.len(),
            features.len() - before
        );
    }

    features
}

/// Converts a bulletin document into a point feature collection.
///
/// # Errors
///
/// Returns a [`BulletinError`] if the document is not well-formed XML.
pub fn convert(xml: &str) -> Result<FeatureCollection, BulletinError> {
    let root = xml::parse_document(xml)?;
    let features = extract_features(&root);
    log::info!("Extracted {} points from bulletin", features.len());
    Ok(floodmap_collection::from_features(features))
}

/// Output path for a bulletin: the input's file stem with a `.geojson`
/// extension, inside `output_dir`.
#[must_use]
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    output_dir.join(format!("{}.geojson", stem.to_string_lossy()))
}

/// Reads a bulletin file, converts it, and writes the collection next to
/// its siblings in `output_dir`. Returns the path written.
///
/// # Errors
///
/// Returns a [`BulletinError`] if reading, parsing or writing fails.
pub fn convert_file(input: &Path, output_dir: &Path) -> Result<PathBuf, BulletinError> {
    let xml = std::fs::read_to_string(input).map_err(|source| BulletinError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    let collection = convert(&xml)?;
    let output = output_path(input, output_dir);
    floodmap_collection::write(&output, &collection)?;

    Ok(output)
}
