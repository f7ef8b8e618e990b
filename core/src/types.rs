//! Domain DTOs for the twin records API.
//!
//! # Design
//! Field names follow the backend's JSON (`thingId`, `policyId`, camelCase
//! attributes). The mock server keeps records as raw JSON and never links to
//! these types, so the integration tests catch schema drift between the two.
//!
//! Optional sub-structures are permissive: every inner field is optional so a
//! record written by another client still decodes, and a sub-structure of the
//! wrong JSON shape (say, `location` stored as a plain string) reads as absent.
//! Only `thingId` and the `name`/`type`/`status` attributes are required.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Open mapping from feature name to an opaque payload.
pub type Features = Map<String, Value>;

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Vec::<T>::deserialize(value).unwrap_or_default())
}

/// The fixed set of twin categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwinType {
    Sensor,
    Actuator,
    Gateway,
    Controller,
    Vehicle,
    Machine,
    Building,
    Asset,
}

impl TwinType {
    pub const ALL: [TwinType; 8] = [
        TwinType::Sensor,
        TwinType::Actuator,
        TwinType::Gateway,
        TwinType::Controller,
        TwinType::Vehicle,
        TwinType::Machine,
        TwinType::Building,
        TwinType::Asset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TwinType::Sensor => "Sensor",
            TwinType::Actuator => "Actuator",
            TwinType::Gateway => "Gateway",
            TwinType::Controller => "Controller",
            TwinType::Vehicle => "Vehicle",
            TwinType::Machine => "Machine",
            TwinType::Building => "Building",
            TwinType::Asset => "Asset",
        }
    }
}

impl fmt::Display for TwinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TwinType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TwinType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown twin type: {s}"))
    }
}

/// Operational status of a twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwinStatus {
    Active,
    Inactive,
    Maintenance,
    Error,
}

impl TwinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TwinStatus::Active => "active",
            TwinStatus::Inactive => "inactive",
            TwinStatus::Maintenance => "maintenance",
            TwinStatus::Error => "error",
        }
    }
}

impl fmt::Display for TwinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TwinStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(TwinStatus::Active),
            "inactive" => Ok(TwinStatus::Inactive),
            "maintenance" => Ok(TwinStatus::Maintenance),
            "error" => Ok(TwinStatus::Error),
            other => Err(format!("unknown twin status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// Manufacturer metadata for the physical asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty_expiry: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_maintenance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryOverview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_frequency_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_points: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_rate_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Map<String, Value>>,
}

/// Parent/child references to other twins by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationships {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProperty {
    pub key: String,
    pub value: Value,
}

/// A command the twin's device can be asked to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinCommand {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
}

/// The structured attribute bag of a twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwinAttributes {
    pub name: String,
    #[serde(rename = "type")]
    pub twin_type: TwinType,
    pub status: TwinStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetInfo>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceSchedule>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryOverview>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub settings: Option<OperationalSettings>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Relationships>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub custom_properties: Vec<CustomProperty>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub commands: Vec<TwinCommand>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tags: Vec<String>,
}

/// A single twin record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinRecord {
    #[serde(rename = "thingId")]
    pub id: String,
    /// Empty when the stored record carries no policy.
    #[serde(rename = "policyId", default)]
    pub policy_ref: String,
    pub attributes: TwinAttributes,
    #[serde(default)]
    pub features: Features,
}

/// Caller input for creating a twin. The id and policy reference are derived
/// by the client, not supplied here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTwin {
    pub name: String,
    #[serde(rename = "type")]
    pub twin_type: TwinType,
    pub status: TwinStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub asset: Option<AssetInfo>,
    #[serde(default)]
    pub maintenance: Option<MaintenanceSchedule>,
    #[serde(default)]
    pub telemetry: Option<TelemetryOverview>,
    #[serde(default)]
    pub settings: Option<OperationalSettings>,
    #[serde(default)]
    pub relationships: Option<Relationships>,
    #[serde(default)]
    pub custom_properties: Option<Vec<CustomProperty>>,
    #[serde(default)]
    pub commands: Option<Vec<TwinCommand>>,
    #[serde(default)]
    pub performance: Option<PerformanceMetrics>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub features: Option<Features>,
}

impl CreateTwin {
    pub fn new(name: impl Into<String>, twin_type: TwinType, status: TwinStatus) -> Self {
        Self {
            name: name.into(),
            twin_type,
            status,
            description: None,
            location: None,
            asset: None,
            maintenance: None,
            telemetry: None,
            settings: None,
            relationships: None,
            custom_properties: None,
            commands: None,
            performance: None,
            tags: None,
            features: None,
        }
    }

    /// Assemble the full record submitted to the backend.
    pub fn into_record(self, id: String) -> TwinRecord {
        let policy_ref = crate::id::policy_ref_for(&id);
        TwinRecord {
            id,
            policy_ref,
            attributes: TwinAttributes {
                name: self.name,
                twin_type: self.twin_type,
                status: self.status,
                description: self.description.unwrap_or_default(),
                location: self.location,
                asset: self.asset,
                maintenance: self.maintenance,
                telemetry: self.telemetry,
                settings: self.settings,
                relationships: self.relationships,
                custom_properties: self.custom_properties.unwrap_or_default(),
                commands: self.commands.unwrap_or_default(),
                performance: self.performance,
                tags: self.tags.unwrap_or_default(),
            },
            features: self.features.unwrap_or_default(),
        }
    }
}

/// Attribute fields to change. Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub twin_type: Option<TwinType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TwinStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryOverview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<OperationalSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Relationships>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<Vec<CustomProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<TwinCommand>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl AttributesPatch {
    pub fn is_empty(&self) -> bool {
        *self == AttributesPatch::default()
    }
}

/// Request payload for a partial update. Omitted fields are left for the
/// backend to interpret; no diff against a prior fetch is made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTwin {
    #[serde(default, skip_serializing_if = "AttributesPatch::is_empty")]
    pub attributes: AttributesPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
}

/// Twin counts by status, derived from a full list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub maintenance: usize,
    pub error: usize,
}

impl DashboardStats {
    pub fn from_twins(twins: &[TwinRecord]) -> Self {
        twins.iter().fold(Self::default(), |mut stats, twin| {
            stats.total += 1;
            match twin.attributes.status {
                TwinStatus::Active => stats.active += 1,
                TwinStatus::Inactive => stats.inactive += 1,
                TwinStatus::Maintenance => stats.maintenance += 1,
                TwinStatus::Error => stats.error += 1,
            }
            stats
        })
    }
}
