//! Lenient serde helpers for snapshot JSON written by other tools

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Number(u64),
    Text(String),
}

/// Shared-risk group: `"NA"`, null or absent means none
pub mod shared_group {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(group) => serializer.serialize_u32(*group),
            None => serializer.serialize_str("NA"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        let raw = Option::<Loose>::deserialize(deserializer)?;
        match raw {
            None | Some(Loose::Bool(_)) => Ok(None),
            Some(Loose::Number(n)) => u32::try_from(n)
                .map(Some)
                .map_err(serde::de::Error::custom),
            Some(Loose::Text(s)) if s.eq_ignore_ascii_case("na") || s.is_empty() => Ok(None),
            Some(Loose::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Boolean written either natively or as `"TRUE"`/`"FALSE"`
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Loose::deserialize(deserializer)? {
        Loose::Bool(b) => Ok(b),
        Loose::Number(n) => Ok(n != 0),
        Loose::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Row {
        #[serde(default, with = "super::shared_group")]
        shared: Option<u32>,
        #[serde(default, deserialize_with = "super::flag")]
        multicast: bool,
    }

    #[test]
    fn test_shared_group_forms() {
        let row: Row = serde_json::from_str(r#"{"shared": 7}"#).unwrap();
        assert_eq!(row.shared, Some(7));
        let row: Row = serde_json::from_str(r#"{"shared": null}"#).unwrap();
        assert_eq!(row.shared, None);
        let row: Row = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(row.shared, None);
        assert!(serde_json::from_str::<Row>(r#"{"shared": "x1"}"#).is_err());
    }

    #[test]
    fn test_flag_forms() {
        let row: Row = serde_json::from_str(r#"{"multicast": "FALSE"}"#).unwrap();
        assert!(!row.multicast);
        let row: Row = serde_json::from_str(r#"{"multicast": true}"#).unwrap();
        assert!(row.multicast);
        assert!(serde_json::from_str::<Row>(r#"{"multicast": "maybe"}"#).is_err());
    }

    #[test]
    fn test_serializes_missing_group_as_na() {
        let row = Row {
            shared: None,
            multicast: false,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains(r#""shared":"NA""#));
    }
}
