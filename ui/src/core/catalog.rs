//! Read-only division catalog built from the `data.json` payload.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::core::color::{self, ColorPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Conference {
    #[serde(rename = "AFC")]
    Afc,
    #[serde(rename = "NFC")]
    Nfc,
}

impl Conference {
    pub const ALL: [Conference; 2] = [Conference::Afc, Conference::Nfc];

    pub fn as_str(self) -> &'static str {
        match self {
            Conference::Afc => "AFC",
            Conference::Nfc => "NFC",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AFC" => Some(Conference::Afc),
            "NFC" => Some(Conference::Nfc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Division {
    #[serde(rename = "EAST")]
    East,
    #[serde(rename = "NORTH")]
    North,
    #[serde(rename = "SOUTH")]
    South,
    #[serde(rename = "WEST")]
    West,
}

impl Division {
    pub const ALL: [Division; 4] = [
        Division::East,
        Division::North,
        Division::South,
        Division::West,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Division::East => "EAST",
            Division::North => "NORTH",
            Division::South => "SOUTH",
            Division::West => "WEST",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "EAST" => Some(Division::East),
            "NORTH" => Some(Division::North),
            "SOUTH" => Some(Division::South),
            "WEST" => Some(Division::West),
            _ => None,
        }
    }
}

/// Conference + division. Serialized as `afc_east`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DivisionKey {
    pub conference: Conference,
    pub division: Division,
}

impl DivisionKey {
    pub const fn new(conference: Conference, division: Division) -> Self {
        Self {
            conference,
            division,
        }
    }

    pub fn all() -> impl Iterator<Item = DivisionKey> {
        Conference::ALL.into_iter().flat_map(|conference| {
            Division::ALL
                .into_iter()
                .map(move |division| DivisionKey::new(conference, division))
        })
    }

    /// Human label, e.g. `AFC EAST`.
    pub fn label(self) -> String {
        format!("{} {}", self.conference.as_str(), self.division.as_str())
    }

    pub fn storage_key(self) -> String {
        format!(
            "{}_{}",
            self.conference.as_str().to_ascii_lowercase(),
            self.division.as_str().to_ascii_lowercase()
        )
    }
}

impl fmt::Display for DivisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown division key `{0}`")]
pub struct UnknownDivisionKey(pub String);

impl FromStr for DivisionKey {
    type Err = UnknownDivisionKey;

    /// Separator- and case-insensitive: `afc_east`, `AFC East`, `afceast`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let compact: String = raw
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        if compact.len() < 4 {
            return Err(UnknownDivisionKey(raw.to_string()));
        }
        let (conf, div) = compact.split_at(3);
        match (Conference::parse(conf), Division::parse(div)) {
            (Some(conference), Some(division)) => Ok(DivisionKey::new(conference, division)),
            _ => Err(UnknownDivisionKey(raw.to_string())),
        }
    }
}

impl Serialize for DivisionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.storage_key())
    }
}

impl<'de> Deserialize<'de> for DivisionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "team", alias = "name")]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(rename = "logo", alias = "logoUrl", default)]
    pub logo_url: String,
}

/// Forced logo recoloring as declared by the station listing.
///
/// `Unset` (attribute absent) is distinct from `Disabled` (explicit `null`):
/// only `Unset` falls back to the label heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StationTint {
    #[default]
    Unset,
    Disabled,
    White,
    Black,
}

/// Effective recoloring once the label heuristic has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoTint {
    White,
    Black,
}

impl StationTint {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "white" => StationTint::White,
                "black" => StationTint::Black,
                _ => StationTint::Disabled,
            },
            _ => StationTint::Disabled,
        }
    }
}

fn deserialize_tint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StationTint, D::Error> {
    // Only called when the attribute is present; absence is handled by `default`.
    let value = Value::deserialize(deserializer)?;
    Ok(StationTint::from_value(&value))
}

fn serialize_tint<S: Serializer>(tint: &StationTint, serializer: S) -> Result<S::Ok, S::Error> {
    match tint {
        StationTint::White => serializer.serialize_str("white"),
        StationTint::Black => serializer.serialize_str("black"),
        StationTint::Disabled | StationTint::Unset => serializer.serialize_none(),
    }
}

fn deserialize_colors<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ColorPair, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(csv) => color::parse_color_csv(&csv),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(",");
            color::parse_color_csv(&joined)
        }
        _ => color::default_header_colors(),
    })
}

fn serialize_colors<S: Serializer>(colors: &ColorPair, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&colors.join(","))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(default)]
    pub label: String,
    pub url: String,
    #[serde(
        rename = "color",
        default = "color::default_header_colors",
        deserialize_with = "deserialize_colors",
        serialize_with = "serialize_colors"
    )]
    pub colors: ColorPair,
    #[serde(
        default,
        deserialize_with = "deserialize_tint",
        serialize_with = "serialize_tint",
        skip_serializing_if = "is_unset"
    )]
    pub tint: StationTint,
}

fn is_unset(tint: &StationTint) -> bool {
    *tint == StationTint::Unset
}

impl Station {
    pub fn has_explicit_tint(&self) -> bool {
        self.tint != StationTint::Unset
    }

    /// Explicit tints win; unset tints turn Fox affiliates (other than Fox 29) white.
    pub fn resolved_tint(&self) -> Option<LogoTint> {
        match self.tint {
            StationTint::White => Some(LogoTint::White),
            StationTint::Black => Some(LogoTint::Black),
            StationTint::Disabled => None,
            StationTint::Unset => {
                color::is_fox_except_29(&self.label).then_some(LogoTint::White)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("dashboard data unavailable: {0}")]
    Unavailable(String),
    #[error("dashboard data is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    generated_at: Option<String>,
    #[serde(default)]
    teams_by_division: BTreeMap<String, Value>,
    #[serde(default)]
    stations_by_division: BTreeMap<String, Value>,
}

/// Decodes a division's list one entry at a time; malformed entries (and
/// lists that are not arrays) are skipped with a warning.
fn decode_entries<T: serde::de::DeserializeOwned>(
    kind: &str,
    key: DivisionKey,
    list: Value,
) -> Vec<T> {
    let Value::Array(items) = list else {
        tracing::warn!("[catalog] {kind} for {key} is not a list, skipping");
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("[catalog] skipping {kind} #{idx} in {key}: {err}");
                None
            }
        })
        .collect()
}

/// Teams and stations per division, loaded once per process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub generated_at: Option<String>,
    teams: BTreeMap<DivisionKey, Vec<Team>>,
    stations: BTreeMap<DivisionKey, Vec<Station>>,
}

impl Catalog {
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let payload: Payload = serde_json::from_str(raw)?;
        let mut catalog = Catalog {
            generated_at: payload.generated_at,
            ..Catalog::default()
        };
        for (key, teams) in payload.teams_by_division {
            match key.parse::<DivisionKey>() {
                Ok(division) => {
                    let teams = decode_entries("team", division, teams);
                    catalog.teams.insert(division, teams);
                }
                Err(err) => tracing::warn!("[catalog] skipping teams: {err}"),
            }
        }
        for (key, stations) in payload.stations_by_division {
            match key.parse::<DivisionKey>() {
                Ok(division) => {
                    let stations = decode_entries("station", division, stations);
                    catalog.stations.insert(division, stations);
                }
                Err(err) => tracing::warn!("[catalog] skipping stations: {err}"),
            }
        }
        tracing::info!(
            "[catalog] loaded {} team lists, {} station lists",
            catalog.teams.len(),
            catalog.stations.len()
        );
        Ok(catalog)
    }

    pub fn with_division(
        mut self,
        key: DivisionKey,
        teams: Vec<Team>,
        stations: Vec<Station>,
    ) -> Self {
        self.teams.insert(key, teams);
        self.stations.insert(key, stations);
        self
    }

    /// Teams in catalog order; `None` when the payload has no entry for `key`.
    pub fn teams(&self, key: DivisionKey) -> Option<&[Team]> {
        self.teams.get(&key).map(Vec::as_slice)
    }

    pub fn stations(&self, key: DivisionKey) -> Option<&[Station]> {
        self.stations.get(&key).map(Vec::as_slice)
    }

    pub fn team(&self, key: DivisionKey, name: &str) -> Option<&Team> {
        self.teams(key)?.iter().find(|team| team.name == name)
    }

    pub fn station_by_url(&self, key: DivisionKey, url: &str) -> Option<&Station> {
        self.stations(key)?.iter().find(|station| station.url == url)
    }

    pub fn default_station(&self, key: DivisionKey) -> Option<&Station> {
        self.stations(key)?.first()
    }

    pub fn team_names(&self, key: DivisionKey) -> Vec<String> {
        self.teams(key)
            .map(|teams| teams.iter().map(|team| team.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn division_keys_parse_loosely() {
        let expected = DivisionKey::new(Conference::Afc, Division::East);
        for raw in ["afc_east", "AFC EAST", "afceast", "Afc-East"] {
            assert_eq!(raw.parse::<DivisionKey>().unwrap(), expected, "{raw}");
        }
        assert!("xfc_east".parse::<DivisionKey>().is_err());
        assert!("afc".parse::<DivisionKey>().is_err());
        assert_eq!(DivisionKey::all().count(), 8);
    }

    #[test]
    fn station_tint_distinguishes_absent_from_null() {
        let stations: Vec<Station> = serde_json::from_value(json!([
            { "label": "Fox 7", "url": "a.svg", "color": "#111,#222" },
            { "label": "Fox 29", "url": "b.svg", "color": "#111,#222" },
            { "label": "Fox 5", "url": "c.svg", "color": "#111", "tint": null },
            { "label": "CBS", "url": "d.svg", "tint": " Black " },
            { "label": "NBC", "url": "e.svg", "tint": "none" }
        ]))
        .unwrap();

        assert_eq!(stations[0].tint, StationTint::Unset);
        assert_eq!(stations[0].resolved_tint(), Some(LogoTint::White));
        assert_eq!(stations[1].resolved_tint(), None);
        assert_eq!(stations[2].tint, StationTint::Disabled);
        assert_eq!(stations[2].resolved_tint(), None);
        assert_eq!(stations[2].colors, ["#111".to_string(), "#3b82f6".to_string()]);
        assert_eq!(stations[3].tint, StationTint::Black);
        assert_eq!(stations[4].tint, StationTint::Disabled);
        assert_eq!(stations[3].colors, color::default_header_colors());
    }

    #[test]
    fn catalog_lookups_return_none_for_missing_divisions() {
        let raw = json!({
            "generatedAt": "2025-09-01T00:00:00Z",
            "teamsByDivision": {
                "afc_east": [{ "team": "Bills", "color": "#00338d", "logo": "/logos/bills.svg" }],
                "bogus": []
            },
            "stationsByDivision": {
                "afc_east": [{ "label": "CBS 4", "url": "/logos/cbs.svg", "color": "#000,#333" }]
            }
        })
        .to_string();
        let catalog = Catalog::from_json(&raw).unwrap();
        let afc_east = DivisionKey::new(Conference::Afc, Division::East);
        let nfc_west = DivisionKey::new(Conference::Nfc, Division::West);

        assert_eq!(catalog.team_names(afc_east), vec!["Bills".to_string()]);
        assert!(catalog.teams(nfc_west).is_none());
        assert!(catalog.default_station(nfc_west).is_none());
        assert_eq!(
            catalog.station_by_url(afc_east, "/logos/cbs.svg").map(|s| s.label.as_str()),
            Some("CBS 4")
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[test]
    fn malformed_entries_are_skipped_individually() {
        let raw = json!({
            "teamsByDivision": {
                "afc_east": [
                    { "team": "Bills", "color": "#00338d" },
                    { "color": "#ffffff" },
                    42,
                    { "team": "Jets" }
                ],
                "afc_west": "not a list"
            },
            "stationsByDivision": {
                "afc_east": [
                    { "label": "No URL" },
                    { "label": "CBS 4", "url": "/logos/cbs.svg" }
                ]
            }
        })
        .to_string();
        let catalog = Catalog::from_json(&raw).unwrap();
        let afc_east = DivisionKey::new(Conference::Afc, Division::East);
        let afc_west = DivisionKey::new(Conference::Afc, Division::West);

        assert_eq!(catalog.team_names(afc_east), vec!["Bills", "Jets"]);
        assert_eq!(catalog.teams(afc_west).map(<[Team]>::len), Some(0));
        assert_eq!(catalog.stations(afc_east).map(<[Station]>::len), Some(1));
        assert_eq!(
            catalog.default_station(afc_east).map(|s| s.label.as_str()),
            Some("CBS 4")
        );
    }
}
