#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for camera flood-risk tagging.
//!
//! Loads (buffered) flood-risk polygons into an R-tree keyed by bounding
//! box, then stamps every camera point with the highest risk level of the
//! zones it falls inside. The R-tree is only a pre-filter; membership is
//! decided by exact point-in-polygon containment.

pub mod progress;

use std::sync::Arc;

use floodmap_flood_models::{
    FLOODRISK_PROPERTY, InvalidRiskValueError, NO_RISK, parse_risk_value, zone_risk,
};
use geo::{Contains, MultiPolygon};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use rstar::{AABB, RTree, RTreeObject};

use crate::progress::ProgressCallback;

/// Errors that can occur while tagging cameras.
#[derive(Debug, thiserror::Error)]
pub enum TaggingError {
    /// A zone containing a camera has a non-numeric risk attribute.
    #[error("Flood-risk zone {zone} has an invalid risk value: {source}")]
    ZoneRisk {
        /// Position of the zone in its collection.
        zone: usize,
        /// Underlying parse error.
        source: InvalidRiskValueError,
    },

    /// A camera already carries a non-numeric `FLOODRISK` attribute.
    #[error("Camera {camera} has an invalid FLOODRISK value: {source}")]
    CameraRisk {
        /// Position of the camera in its collection.
        camera: usize,
        /// Underlying parse error.
        source: InvalidRiskValueError,
    },
}

/// A flood-risk polygon stored in the R-tree with its attributes.
struct ZoneEntry {
    index: usize,
    properties: JsonObject,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over flood-risk zones.
///
/// Constructed once per run and queried for every camera.
pub struct RiskZoneIndex {
    zones: RTree<ZoneEntry>,
}

impl RiskZoneIndex {
    /// Builds the R-tree from a collection of flood-risk polygons.
    ///
    /// Features without an areal geometry are skipped with a warning.
    #[must_use]
    pub fn build(collection: &FeatureCollection) -> Self {
        let mut entries = Vec::with_capacity(collection.features.len());

        for (index, feature) in collection.features.iter().enumerate() {
            let Some(polygon) = feature_to_multipolygon(feature) else {
                log::warn!("Skipping flood-risk zone {index}: no polygon geometry");
                continue;
            };

            let Some(envelope) = compute_envelope(&polygon) else {
                log::warn!("Skipping flood-risk zone {index}: empty geometry");
                continue;
            };

            entries.push(ZoneEntry {
                index,
                properties: feature.properties.clone().unwrap_or_default(),
                envelope,
                polygon,
            });
        }

        let zones = RTree::bulk_load(entries);
        log::info!("Loaded {} flood-risk zones into spatial index", zones.size());

        Self { zones }
    }

    /// Number of zones in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.size()
    }

    /// Whether the index holds no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.size() == 0
    }

    /// Highest risk level among the zones strictly containing a point.
    ///
    /// Zones of unrecognized `TYPE`, or whose selected attribute is `null`,
    /// do not contribute. Returns `Ok(None)` when no zone contributes.
    ///
    /// # Errors
    ///
    /// Returns [`TaggingError::ZoneRisk`] if a containing zone's selected
    /// risk attribute is not numeric.
    pub fn risk_at(&self, lng: f64, lat: f64) -> Result<Option<i64>, TaggingError> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        let mut best: Option<i64> = None;

        for entry in self.zones.locate_in_envelope_intersecting(&query_env) {
            if !entry.polygon.contains(&point) {
                continue;
            }

            let risk = zone_risk(&entry.properties).map_err(|source| TaggingError::ZoneRisk {
                zone: entry.index,
                source,
            })?;

            if let Some(risk) = risk {
                log::trace!("({lng}, {lat}) is inside zone {} with risk {risk}", entry.index);
                best = Some(best.map_or(risk, |b| b.max(risk)));
            }
        }

        Ok(best)
    }

    /// Stamps a single camera feature with its `FLOODRISK` level.
    ///
    /// When a containing zone contributes a risk, the camera's existing
    /// `FLOODRISK` (or [`NO_RISK`] when absent or `null`) is raised to the
    /// highest such risk. Otherwise an existing value is left as it is and
    /// an absent one is set to [`NO_RISK`]. Cameras without a point geometry
    /// are treated as inside no zone.
    ///
    /// Returns the camera's numeric level afterwards, or `None` when an
    /// untouched existing value is not numeric.
    ///
    /// # Errors
    ///
    /// Returns a [`TaggingError`] if a containing zone's risk value is not
    /// numeric, or if the camera's existing level is not numeric and a
    /// containing zone has to be compared against it.
    pub fn tag_camera(
        &self,
        camera: usize,
        feature: &mut Feature,
    ) -> Result<Option<i64>, TaggingError> {
        let zone_risk = match point_coordinates(feature.geometry.as_ref()) {
            Some((lng, lat)) => self.risk_at(lng, lat)?,
            None => {
                log::warn!("Camera {camera} has no point geometry; leaving FLOODRISK as is");
                None
            }
        };

        let properties = feature.properties.get_or_insert_with(JsonObject::new);
        let existing = properties.get(FLOODRISK_PROPERTY);

        let Some(risk) = zone_risk else {
            return Ok(match existing {
                Some(value) => parse_risk_value(value).ok().flatten(),
                None => {
                    properties.insert(FLOODRISK_PROPERTY.to_string(), JsonValue::from(NO_RISK));
                    Some(NO_RISK)
                }
            });
        };

        let current = existing
            .map_or(Ok(None), parse_risk_value)
            .map_err(|source| TaggingError::CameraRisk { camera, source })?
            .unwrap_or(NO_RISK);

        let level = current.max(risk);
        properties.insert(FLOODRISK_PROPERTY.to_string(), JsonValue::from(level));

        Ok(Some(level))
    }

    /// Stamps every camera in a collection with its `FLOODRISK` level,
    /// advancing `progress` by one per camera. Returns the collection and
    /// the number of cameras left above [`NO_RISK`].
    ///
    /// # Errors
    ///
    /// Returns the first [`TaggingError`] encountered.
    pub fn tag_cameras(
        &self,
        mut collection: FeatureCollection,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<(FeatureCollection, usize), TaggingError> {
        let mut at_risk = 0_usize;
        for (camera, feature) in collection.features.iter_mut().enumerate() {
            if self.tag_camera(camera, feature)?.is_some_and(|level| level > NO_RISK) {
                at_risk += 1;
            }
            progress.inc(1);
        }

        log::info!(
            "Tagged {} cameras, {at_risk} at risk",
            collection.features.len()
        );

        Ok((collection, at_risk))
    }
}

/// Tags every camera collection against the index and concatenates the
/// results in order.
///
/// # Errors
///
/// Returns the first [`TaggingError`] encountered.
pub fn tag_all(
    index: &RiskZoneIndex,
    collections: Vec<FeatureCollection>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<FeatureCollection, TaggingError> {
    let total: usize = collections.iter().map(|c| c.features.len()).sum();
    progress.set_total(total as u64);

    let mut at_risk = 0_usize;
    let mut tagged = Vec::with_capacity(collections.len());
    for collection in collections {
        let (collection, count) = index.tag_cameras(collection, progress)?;
        at_risk += count;
        tagged.push(collection);
    }

    progress.finish(format!("{at_risk} of {total} cameras at risk"));

    Ok(floodmap_collection::concat(tagged))
}

/// Extracts a [`MultiPolygon`] from a feature.
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_to_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.clone()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Reads (longitude, latitude) from a `Point` geometry.
fn point_coordinates(geometry: Option<&geojson::Geometry>) -> Option<(f64, f64)> {
    match &geometry?.value {
        geojson::Value::Point(position) if position.len() >= 2 => Some((position[0], position[1])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    use geo::BoundingRect;

    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
