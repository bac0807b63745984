#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fixed-radius buffering of flood-risk polygons.
//!
//! Polygons arrive in WGS84 degrees, where a metric radius is meaningless.
//! Each geometry is projected to Web Mercator, grown outward with
//! [`geo::Buffer`], and projected back. Attribute values pass through
//! untouched; the output is renumbered and its property keys unified like
//! every other written collection.

pub mod projection;

use geo::{Buffer as _, MultiPolygon};
use geojson::{Feature, FeatureCollection};

/// Buffer radius applied to flood-risk zones, in metres.
pub const DEFAULT_BUFFER_METERS: f64 = 1000.0;

/// Errors that can occur while buffering a feature collection.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// A feature has no geometry to buffer.
    #[error("Feature {index} has no geometry")]
    MissingGeometry {
        /// Position of the feature in the collection.
        index: usize,
    },

    /// A feature's geometry is not a polygon or multipolygon.
    #[error("Feature {index} has unsupported geometry type {kind}")]
    UnsupportedGeometry {
        /// Position of the feature in the collection.
        index: usize,
        /// `GeoJSON` geometry type name.
        kind: &'static str,
    },

    /// A feature's geometry could not be converted to a `geo` geometry.
    #[error("Feature {index} has invalid geometry: {source}")]
    Geometry {
        /// Position of the feature in the collection.
        index: usize,
        /// Underlying conversion error.
        source: Box<geojson::Error>,
    },
}

/// Buffers a geographic multipolygon by `radius_m` metres.
///
/// The radius is applied in the Web Mercator plane, so zones far from the
/// equator grow by slightly less than `radius_m` on the ground.
#[must_use]
pub fn buffer_geometry(geometry: &MultiPolygon<f64>, radius_m: f64) -> MultiPolygon<f64> {
    let projected = projection::project(geometry);
    let buffered = projected.buffer(radius_m);
    projection::unproject(&buffered)
}

/// Buffers every feature of a polygon collection by `radius_m` metres.
///
/// Feature order and property values are preserved. The result is
/// [`floodmap_collection::normalize`]d, so features get sequential string
/// ids and share one property key set. Single-part results are written as
/// `Polygon`, multi-part results as `MultiPolygon`.
///
/// # Errors
///
/// Returns a [`BufferError`] on the first feature that is missing a
/// geometry or has a non-areal one.
pub fn buffer_collection(
    collection: FeatureCollection,
    radius_m: f64,
) -> Result<FeatureCollection, BufferError> {
    log::info!(
        "Buffering {} features by {radius_m} m",
        collection.features.len()
    );

    let features = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| buffer_feature(index, feature, radius_m))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(floodmap_collection::normalize(FeatureCollection {
        bbox: None,
        features,
        foreign_members: collection.foreign_members,
    }))
}

fn buffer_feature(index: usize, mut feature: Feature, radius_m: f64) -> Result<Feature, BufferError> {
    let geometry = feature
        .geometry
        .take()
        .ok_or(BufferError::MissingGeometry { index })?;

    let areal = to_multipolygon(index, geometry)?;
    let buffered = buffer_geometry(&areal, radius_m);
    log::trace!(
        "Feature {index}: {} part(s) buffered into {} part(s)",
        areal.0.len(),
        buffered.0.len()
    );

    let value = match buffered.0.as_slice() {
        [single] => geojson::Value::from(single),
        _ => geojson::Value::from(&buffered),
    };

    feature.geometry = Some(geojson::Geometry::new(value));
    feature.bbox = None;
    Ok(feature)
}

fn to_multipolygon(index: usize, geometry: geojson::Geometry) -> Result<MultiPolygon<f64>, BufferError> {
    let kind = geometry_kind(&geometry.value);
    let geo_geom: geo::Geometry<f64> = geometry
        .try_into()
        .map_err(|source| BufferError::Geometry {
            index,
            source: Box::new(source),
        })?;

    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err(BufferError::UnsupportedGeometry { index, kind }),
    }
}

const fn geometry_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}
