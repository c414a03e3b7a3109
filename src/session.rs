//! One connected viewing session: the live mirror of a running simulation.

use crate::config::{GeoBoundary, ViewerConfig};
use crate::coords::Transform;
use crate::protocol::{
    apply_delta, decode, Action, ClientMessage, DeltaSummary, ProtocolError, ServerMessage,
    SimulationState, SimulationStatus, Snapshot, VehicleInfo,
};
use crate::registry::{
    EntityRegistry, RegistryObserver, SignalRegistry, SignalState, VehicleRegistry, VehicleState,
};
use anyhow::Result;
use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    /// Simulation time in milliseconds.
    pub time: f64,
    /// Size of the last snapshot message in bytes.
    pub payload_size: usize,
    pub vehicle_counts: BTreeMap<String, u32>,
    pub simulate_secs: f64,
    pub snapshot_secs: f64,
    /// Slowest simulation step seen so far.
    pub max_simulate_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub vehicle_id: Option<String>,
    pub vehicle_info: Option<VehicleInfo>,
    pub following: bool,
}

impl Selection {
    fn clear(&mut self) {
        self.vehicle_id = None;
        self.vehicle_info = None;
        self.following = false;
    }
}

/// Drops the selection when the selected vehicle leaves the simulation.
struct SelectionWatcher(Rc<RefCell<Selection>>);

impl RegistryObserver<VehicleState> for SelectionWatcher {
    fn on_removed(&mut self, id: &str, _state: &VehicleState) {
        let mut selection = self.0.borrow_mut();
        if selection.vehicle_id.as_deref() == Some(id) {
            log::debug!("Selected vehicle {} left the simulation", id);
            selection.clear();
        }
    }
}

/// What handling one stream message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Snapshot {
        vehicles: DeltaSummary,
        lights: DeltaSummary,
    },
    State(SimulationStatus),
    Ignored,
}

pub struct Session {
    transform: Arc<Transform>,
    geo_boundary: Option<GeoBoundary>,
    vehicles: VehicleRegistry,
    signals: SignalRegistry,
    stats: SimulationStats,
    status: SimulationStatus,
    delay_ms: u64,
    scenario: String,
    selection: Rc<RefCell<Selection>>,
}

impl Session {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let location = &config.network.location;
        let transform = Arc::new(Transform::from_location(location)?);
        let geo_boundary = location.geo_boundary()?;

        let selection = Rc::new(RefCell::new(Selection::default()));
        let mut vehicles = VehicleRegistry::new(transform.clone(), config.vehicles.clone());
        vehicles.subscribe(Box::new(SelectionWatcher(selection.clone())));

        let mut signals = SignalRegistry::new();
        signals.add_program_definitions(config.network.tl_logic.iter().cloned());

        log::info!(
            "Session ready: {:.0}m x {:.0}m network, projection {}",
            transform.width(),
            transform.height(),
            if transform.has_projection() { "available" } else { "unavailable" }
        );

        Ok(Self {
            transform,
            geo_boundary,
            vehicles,
            signals,
            stats: SimulationStats::default(),
            status: SimulationStatus::default(),
            delay_ms: 0,
            scenario: String::new(),
            selection,
        })
    }

    /// Decode and apply one stream message.
    ///
    /// A message that does not decode is returned as an error and changes nothing; the
    /// session keeps accepting later messages.
    pub fn handle_message(&mut self, text: &str) -> std::result::Result<MessageOutcome, ProtocolError> {
        let outcome = match decode(text)? {
            ServerMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot, text.len()),
            ServerMessage::State(state) => {
                self.apply_state(&state);
                MessageOutcome::State(state.simulation_status)
            }
            ServerMessage::Unknown => {
                log::warn!("Unrecognized message: {}", text);
                MessageOutcome::Ignored
            }
        };
        Ok(outcome)
    }

    pub fn apply_snapshot(&mut self, snapshot: Snapshot, payload_size: usize) -> MessageOutcome {
        let simulate_ms = snapshot.simulate_secs * 1000.0;
        self.stats = SimulationStats {
            time: snapshot.time,
            payload_size,
            vehicle_counts: snapshot.vehicle_counts,
            simulate_secs: snapshot.simulate_secs,
            snapshot_secs: snapshot.snapshot_secs,
            max_simulate_ms: self.stats.max_simulate_ms.max(simulate_ms),
        };

        let vehicles = apply_delta(snapshot.vehicles, &mut self.vehicles);
        let lights = apply_delta(snapshot.lights, &mut self.signals);

        let mut selection = self.selection.borrow_mut();
        if let Some(id) = selection.vehicle_id.clone() {
            selection.vehicle_info = self.vehicles.get(&id).map(|state| state.info.clone());
        }

        MessageOutcome::Snapshot { vehicles, lights }
    }

    pub fn apply_state(&mut self, state: &SimulationState) {
        self.status = state.simulation_status;
        self.delay_ms = state.delay_ms;
        self.scenario = state.scenario.clone();
    }

    /// Select a live vehicle for the details panel. Returns false for unknown ids.
    pub fn select_vehicle(&mut self, id: &str) -> bool {
        let mut selection = self.selection.borrow_mut();
        selection.clear();
        match self.vehicles.get(id) {
            Some(state) => {
                selection.vehicle_id = Some(id.to_string());
                selection.vehicle_info = Some(state.info.clone());
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.borrow_mut().clear();
    }

    /// Follow the selected vehicle with the camera. Returns false without a selection.
    pub fn follow_selected(&mut self) -> bool {
        let mut selection = self.selection.borrow_mut();
        selection.following = selection.vehicle_id.is_some();
        selection.following
    }

    pub fn unfollow(&mut self) {
        self.selection.borrow_mut().following = false;
    }

    /// Forget everything about the current run and produce the cancel request.
    pub fn cancel(&mut self) -> ClientMessage {
        self.clear_selection();
        self.stats = SimulationStats::default();
        self.vehicles.purge();
        ClientMessage::Action(Action::Cancel)
    }

    pub fn subscribe_vehicles(&mut self, observer: Box<dyn RegistryObserver<VehicleState>>) {
        self.vehicles.subscribe(observer);
    }

    pub fn subscribe_signals(&mut self, observer: Box<dyn RegistryObserver<SignalState>>) {
        self.signals.subscribe(observer);
    }

    pub fn transform(&self) -> &Arc<Transform> {
        &self.transform
    }

    pub fn geo_boundary(&self) -> Option<&GeoBoundary> {
        self.geo_boundary.as_ref()
    }

    pub fn vehicles(&self) -> &VehicleRegistry {
        &self.vehicles
    }

    pub fn signals(&self) -> &SignalRegistry {
        &self.signals
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn selection(&self) -> Ref<'_, Selection> {
        self.selection.borrow()
    }
}
