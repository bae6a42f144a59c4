//! Comment markers that tune how a model's schema is merged.
//!
//! Markers are doc comment lines of the form `+key=value`. For example,
//! marking a struct-typed field as atomic means the whole value is
//! replaced on update instead of being merged field by field:
//!
//! ```
//! use route_openapi::idl::{apply_markers, parse_markers, Marker, StructType};
//! use route_openapi::models::Schema;
//!
//! // struct SomeApi {
//! //     /// +structType=atomic
//! //     elements: SomeStruct,
//! // }
//! let markers = parse_markers(&["+structType=atomic"]).unwrap();
//! assert_eq!(markers, vec![Marker::StructType(StructType::Atomic)]);
//!
//! let mut schema = Schema::default();
//! apply_markers(&mut schema, &markers).unwrap();
//! assert_eq!(schema.extensions["x-struct-type"], "atomic");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::common::{
    EXTENSION_LIST_MAP_KEYS, EXTENSION_LIST_TYPE, EXTENSION_MAP_TYPE, EXTENSION_STRUCT_TYPE,
};
use crate::models::Schema;

static MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?://+)?\s*\+(\w+)=(\S*)\s*$").expect("valid marker regex"));

#[derive(Error, Debug, PartialEq)]
pub enum IdlError {
    #[error("invalid value {value:?} for marker +{marker}")]
    InvalidValue { marker: String, value: String },

    #[error("+listMapKey requires +listType=map")]
    MapKeysWithoutMapList,
}

/// How a struct is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructType {
    /// Replaced as a whole
    Atomic,
    /// Merged field by field
    Granular,
}

/// How a list is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Atomic,
    /// Scalar items, merged as a set
    Set,
    /// Object items, merged by the `+listMapKey` fields
    Map,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapType {
    Atomic,
    Granular,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    StructType(StructType),
    ListType(ListType),
    ListMapKey(String),
    MapType(MapType),
}

impl StructType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Granular => "granular",
        }
    }
}

impl ListType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Set => "set",
            Self::Map => "map",
        }
    }
}

impl MapType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Granular => "granular",
        }
    }
}

fn invalid(marker: &str, value: &str) -> IdlError {
    IdlError::InvalidValue {
        marker: marker.to_string(),
        value: value.to_string(),
    }
}

impl FromStr for StructType {
    type Err = IdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(Self::Atomic),
            "granular" => Ok(Self::Granular),
            _ => Err(invalid("structType", s)),
        }
    }
}

impl FromStr for ListType {
    type Err = IdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(Self::Atomic),
            "set" => Ok(Self::Set),
            "map" => Ok(Self::Map),
            _ => Err(invalid("listType", s)),
        }
    }
}

impl FromStr for MapType {
    type Err = IdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(Self::Atomic),
            "granular" => Ok(Self::Granular),
            _ => Err(invalid("mapType", s)),
        }
    }
}

/// Extracts markers from comment lines, ignoring everything else
pub fn parse_markers<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Marker>, IdlError> {
    let mut markers = Vec::new();
    for line in lines {
        let Some(caps) = MARKER_REGEX.captures(line.as_ref()) else {
            continue;
        };
        let value = &caps[2];
        let marker = match &caps[1] {
            "structType" => Marker::StructType(value.parse()?),
            "listType" => Marker::ListType(value.parse()?),
            "mapType" => Marker::MapType(value.parse()?),
            "listMapKey" if !value.is_empty() => Marker::ListMapKey(value.to_string()),
            "listMapKey" => return Err(invalid("listMapKey", value)),
            _ => continue,
        };
        markers.push(marker);
    }
    Ok(markers)
}

/// Records markers on a schema as vendor extensions
pub fn apply_markers(schema: &mut Schema, markers: &[Marker]) -> Result<(), IdlError> {
    let mut map_keys = Vec::new();
    let mut list_type = None;
    for marker in markers {
        match marker {
            Marker::StructType(t) => {
                schema
                    .extensions
                    .insert(EXTENSION_STRUCT_TYPE.to_string(), Value::from(t.as_str()));
            }
            Marker::ListType(t) => {
                list_type = Some(*t);
                schema
                    .extensions
                    .insert(EXTENSION_LIST_TYPE.to_string(), Value::from(t.as_str()));
            }
            Marker::MapType(t) => {
                schema
                    .extensions
                    .insert(EXTENSION_MAP_TYPE.to_string(), Value::from(t.as_str()));
            }
            Marker::ListMapKey(key) => map_keys.push(Value::from(key.as_str())),
        }
    }
    if !map_keys.is_empty() {
        if list_type != Some(ListType::Map) {
            return Err(IdlError::MapKeysWithoutMapList);
        }
        schema
            .extensions
            .insert(EXTENSION_LIST_MAP_KEYS.to_string(), Value::Array(map_keys));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ignores_plain_comments() {
        let lines = [
            "// Elements of the API",
            "// +structType=atomic",
            "+optional",
            "+k8s:openapi-gen=true",
        ];
        assert_eq!(
            parse_markers(&lines).unwrap(),
            vec![Marker::StructType(StructType::Atomic)]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            parse_markers(&["+listType=bag"]),
            Err(IdlError::InvalidValue {
                marker: "listType".into(),
                value: "bag".into()
            })
        );
        assert!(parse_markers(&["+listMapKey="]).is_err());
    }

    #[test]
    fn test_list_map_keys() {
        let markers = parse_markers(&[
            "+listType=map",
            "+listMapKey=port",
            "+listMapKey=protocol",
        ])
        .unwrap();
        let mut schema = Schema::default();
        apply_markers(&mut schema, &markers).unwrap();

        assert_eq!(schema.extensions["x-list-type"], json!("map"));
        assert_eq!(schema.extensions["x-list-map-keys"], json!(["port", "protocol"]));
    }

    #[test]
    fn test_map_keys_require_map_list() {
        let markers = vec![
            Marker::ListType(ListType::Set),
            Marker::ListMapKey("name".into()),
        ];
        assert_eq!(
            apply_markers(&mut Schema::default(), &markers),
            Err(IdlError::MapKeysWithoutMapList)
        );
    }

    #[test]
    fn test_map_type() {
        let markers = parse_markers(&["  /// +mapType=granular  "]).unwrap();
        let mut schema = Schema::default();
        apply_markers(&mut schema, &markers).unwrap();
        assert_eq!(schema.extensions["x-map-type"], json!("granular"));
    }
}
