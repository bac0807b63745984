#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` feature collection I/O shared by every floodmap stage.
//!
//! Each stage reads whole feature collections into memory, transforms them,
//! and writes a single collection back out. Written collections are
//! [`normalize`]d the way a tabular export would be: features are
//! renumbered and every feature carries the union of all property keys.
//! [`concat`] merges several collections into one before normalizing.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use geojson::feature::Id;
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};

/// Errors that can occur while loading or saving feature collections.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The document is not valid `GeoJSON`.
    #[error("Invalid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    /// The document is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("Expected a FeatureCollection, found a {0}")]
    NotFeatureCollection(&'static str),

    /// Serializing the output failed.
    #[error("Failed to serialize feature collection: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parses a `GeoJSON` document that must be a `FeatureCollection`.
///
/// # Errors
///
/// Returns [`CollectionError::Parse`] for malformed `GeoJSON` and
/// [`CollectionError::NotFeatureCollection`] for bare geometries or
/// features.
pub fn parse(contents: &str) -> Result<FeatureCollection, CollectionError> {
    match contents.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(CollectionError::NotFeatureCollection("Feature")),
        GeoJson::Geometry(_) => Err(CollectionError::NotFeatureCollection("Geometry")),
    }
}

/// Reads a feature collection from a `GeoJSON` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not contain a
/// `FeatureCollection`.
pub fn read(path: &Path) -> Result<FeatureCollection, CollectionError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CollectionError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let collection = parse(&contents)?;
    log::info!(
        "Loaded {} features from {}",
        collection.features.len(),
        path.display()
    );

    Ok(collection)
}

/// Writes a feature collection as compact `GeoJSON`, creating the parent
/// directory if needed.
///
/// Non-ASCII text is written as UTF-8, not escaped.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write(path: &Path, collection: &FeatureCollection) -> Result<(), CollectionError> {
    let io_err = |source| CollectionError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush().map_err(io_err)?;

    log::info!(
        "Wrote {} features to {}",
        collection.features.len(),
        path.display()
    );

    Ok(())
}

/// Builds a feature collection with no bounding box or foreign members.
#[must_use]
pub const fn from_features(features: Vec<geojson::Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Renumbers features with sequential string ids starting at `"0"` and
/// fills properties missing from a feature but present on any other
/// feature with `null`, so every feature carries the same key set.
#[must_use]
pub fn normalize(mut collection: FeatureCollection) -> FeatureCollection {
    let keys: BTreeSet<String> = collection
        .features
        .iter()
        .filter_map(|f| f.properties.as_ref())
        .flat_map(JsonObject::keys)
        .cloned()
        .collect();

    for (i, feature) in collection.features.iter_mut().enumerate() {
        let properties = feature.properties.get_or_insert_with(JsonObject::new);
        for key in &keys {
            if !properties.contains_key(key) {
                properties.insert(key.clone(), JsonValue::Null);
            }
        }
        feature.id = Some(Id::String(i.to_string()));
    }

    collection
}

/// Concatenates collections into one, in order, then [`normalize`]s the
/// result.
#[must_use]
pub fn concat(collections: Vec<FeatureCollection>) -> FeatureCollection {
    let features = collections.into_iter().flat_map(|c| c.features).collect();
    normalize(from_features(features))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TWO_POINTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "name": "a" },
              "geometry": { "type": "Point", "coordinates": [139.7, 35.6] } },
            { "type": "Feature", "properties": { "name": "b", "kind": "cctv" },
              "geometry": { "type": "Point", "coordinates": [139.8, 35.7] } }
        ]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let collection = parse(TWO_POINTS).unwrap();
        assert_eq!(collection.features.len(), 2);
    }

    #[test]
    fn rejects_bare_geometry() {
        let err = parse(r#"{ "type": "Point", "coordinates": [0.0, 0.0] }"#).unwrap_err();
        assert!(matches!(err, CollectionError::NotFeatureCollection("Geometry")));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse("{ not geojson"),
            Err(CollectionError::Parse(_))
        ));
    }

    #[test]
    fn concat_renumbers_and_fills_missing_keys() {
        let first = parse(TWO_POINTS).unwrap();
        let second = parse(TWO_POINTS).unwrap();

        let merged = concat(vec![first, second]);
        assert_eq!(merged.features.len(), 4);

        let ids: Vec<_> = merged
            .features
            .iter()
            .map(|f| f.id.clone().unwrap())
            .collect();
        assert_eq!(ids[0], Id::String("0".to_string()));
        assert_eq!(ids[3], Id::String("3".to_string()));

        let props = merged.features[0].properties.as_ref().unwrap();
        assert_eq!(props.get("name"), Some(&json!("a")));
        assert_eq!(props.get("kind"), Some(&JsonValue::Null));

        let props = merged.features[3].properties.as_ref().unwrap();
        assert_eq!(props.get("kind"), Some(&json!("cctv")));
    }

    #[test]
    fn normalize_overwrites_ids_and_fills_missing_keys() {
        let mut collection = parse(TWO_POINTS).unwrap();
        collection.features[1].id = Some(Id::String("cam-b".to_string()));

        let normalized = normalize(collection);
        assert_eq!(normalized.features[0].id, Some(Id::String("0".to_string())));
        assert_eq!(normalized.features[1].id, Some(Id::String("1".to_string())));

        let first = normalized.features[0].properties.as_ref().unwrap();
        assert_eq!(first.get("kind"), Some(&JsonValue::Null));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn write_then_read_preserves_non_ascii_text() {
        let dir = std::env::temp_dir().join(format!("floodmap_collection_{}", std::process::id()));
        let path = dir.join("out.geojson");

        let mut collection = parse(TWO_POINTS).unwrap();
        collection.features[0]
            .properties
            .as_mut()
            .unwrap()
            .insert("name".to_string(), json!("台風"));

        write(&path, &collection).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("台風"));

        let reread = read(&path).unwrap();
        assert_eq!(reread.features.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
