use super::Delta;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Turn and brake indicator bitset, kept verbatim as sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Signals(pub u32);

impl Signals {
    pub const LEFT: u32 = 1 << 0;
    pub const RIGHT: u32 = 1 << 1;
    // bit 2 is unused by the backend
    pub const BRAKE: u32 = 1 << 3;

    pub fn left_turn(&self) -> bool {
        self.0 & Self::LEFT != 0
    }

    pub fn right_turn(&self) -> bool {
        self.0 & Self::RIGHT != 0
    }

    pub fn brake(&self) -> bool {
        self.0 & Self::BRAKE != 0
    }
}

/// Full vehicle (or person) record, as sent on creation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VehicleInfo {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub speed: f64,
    /// Heading in degrees, clockwise from north.
    pub angle: f64,
    pub width: f64,
    pub length: f64,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    #[serde(rename = "vClass")]
    pub v_class: String,
    #[serde(default)]
    pub signals: Signals,
    /// For a person: the vehicle they are riding in.
    #[serde(default)]
    pub vehicle: Option<String>,
}

/// Changed fields of a vehicle. Absent fields are left untouched by `merge`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VehicleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(rename = "vClass", default, skip_serializing_if = "Option::is_none")]
    pub v_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<Signals>,
    /// `Some(None)` is an explicit null: the person left their vehicle.
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<Option<String>>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl VehicleInfo {
    pub fn merge(&mut self, update: VehicleUpdate) {
        if let Some(x) = update.x { self.x = x; }
        if let Some(y) = update.y { self.y = y; }
        if let Some(z) = update.z { self.z = z; }
        if let Some(speed) = update.speed { self.speed = speed; }
        if let Some(angle) = update.angle { self.angle = angle; }
        if let Some(width) = update.width { self.width = width; }
        if let Some(length) = update.length { self.length = length; }
        if let Some(vehicle_type) = update.vehicle_type { self.vehicle_type = vehicle_type; }
        if let Some(v_class) = update.v_class { self.v_class = v_class; }
        if let Some(signals) = update.signals { self.signals = signals; }
        if let Some(vehicle) = update.vehicle { self.vehicle = vehicle; }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LightInfo {
    pub phase: usize,
    #[serde(rename = "programID")]
    pub program_id: String,
}

/// Program and phase change independently, so either may be missing from an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LightUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<usize>,
    #[serde(rename = "programID", default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
}

impl From<LightInfo> for LightUpdate {
    fn from(info: LightInfo) -> Self {
        Self {
            phase: Some(info.phase),
            program_id: Some(info.program_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    /// Simulation time in milliseconds.
    pub time: f64,
    pub vehicles: Delta<VehicleInfo, VehicleUpdate>,
    pub lights: Delta<LightInfo, LightUpdate>,
    #[serde(default)]
    pub vehicle_counts: BTreeMap<String, u32>,
    /// Time to run one simulation step.
    #[serde(default)]
    pub simulate_secs: f64,
    /// Time to build this snapshot.
    #[serde(default)]
    pub snapshot_secs: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    #[default]
    Off,
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationState {
    pub scenario: String,
    #[serde(rename = "simulationStatus")]
    pub simulation_status: SimulationStatus,
    #[serde(rename = "delayMs")]
    pub delay_ms: u64,
}

/// Messages streamed from the backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Snapshot(Snapshot),
    State(SimulationState),
    #[serde(other)]
    Unknown,
}

/// Control messages sent to the backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Action(Action),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    Start,
    Pause,
    Resume,
    Cancel,
    ChangeDelay {
        #[serde(rename = "delayLengthMs")]
        delay_length_ms: u64,
    },
}
