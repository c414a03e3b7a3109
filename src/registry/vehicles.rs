use super::{EntityRegistry, RegistryObserver};
use crate::config::{ModelTemplate, VehiclesConfig};
use crate::coords::Transform;
use crate::protocol::{DeltaTarget, Signals, VehicleInfo, VehicleUpdate};
use indexmap::IndexMap;
use nalgebra::Point3;
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Turn and brake lamps shown on passenger cars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indicators {
    pub left: bool,
    pub right: bool,
    pub brake: bool,
}

impl From<Signals> for Indicators {
    fn from(signals: Signals) -> Self {
        Self {
            left: signals.left_turn(),
            right: signals.right_turn(),
            brake: signals.brake(),
        }
    }
}

/// The renderable stand-in for one vehicle: its template and where to draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleProxy {
    pub template: ModelTemplate,
    pub template_index: usize,
    /// Body-center position in the render frame.
    pub position: Point3<f64>,
    /// Rotation around the render frame's vertical axis, in radians.
    pub rotation_y: f64,
    /// False while the entity rides inside another vehicle.
    pub visible: bool,
    pub indicators: Option<Indicators>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub info: VehicleInfo,
    pub proxy: VehicleProxy,
}

/// Stable string hash (djb2 with xor, over UTF-16 code units from the end).
///
/// Chooses a vehicle's template, so the same id always gets the same look.
pub fn string_hash(s: &str) -> u32 {
    let units: Vec<u16> = s.encode_utf16().collect();
    units
        .iter()
        .rev()
        .fold(5381u32, |hash, &unit| hash.wrapping_mul(33) ^ unit as u32)
}

pub struct VehicleRegistry {
    transform: Arc<Transform>,
    catalogue: VehiclesConfig,
    vehicles: IndexMap<String, VehicleState>,
    observers: Vec<Box<dyn RegistryObserver<VehicleState>>>,
}

impl VehicleRegistry {
    pub fn new(transform: Arc<Transform>, catalogue: VehiclesConfig) -> Self {
        Self {
            transform,
            catalogue,
            vehicles: IndexMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn RegistryObserver<VehicleState>>) {
        self.observers.push(observer);
    }

    /// Start tracking a vehicle. Returns false when its class has no template.
    pub fn create(&mut self, id: &str, info: VehicleInfo) -> bool {
        let templates = match self.catalogue.templates(&info.v_class) {
            Some(templates) if !templates.is_empty() => templates,
            _ => {
                log::warn!("Unsupported vehicle type: {} (vehicle {})", info.v_class, id);
                return false;
            }
        };

        let template_index = string_hash(id) as usize % templates.len();
        let template = templates[template_index].clone();
        let proxy = place(&self.transform, &info, template, template_index);

        // A repeated creation replaces the live record, so observers see it as an update.
        let replaced = self
            .vehicles
            .insert(id.to_string(), VehicleState { info, proxy })
            .is_some();
        if replaced {
            log::debug!("Vehicle {} created twice, replacing previous state", id);
        }

        if let Some(state) = self.vehicles.get(id) {
            for observer in self.observers.iter_mut() {
                if replaced {
                    observer.on_updated(id, state);
                } else {
                    observer.on_created(id, state);
                }
            }
        }
        true
    }

    /// Merge the present fields of `update` and recompute placement. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, update: VehicleUpdate) -> bool {
        let Some(state) = self.vehicles.get_mut(id) else {
            log::debug!("Ignoring update for unknown vehicle {}", id);
            return false;
        };

        state.info.merge(update);
        let template = state.proxy.template.clone();
        state.proxy = place(&self.transform, &state.info, template, state.proxy.template_index);

        for observer in self.observers.iter_mut() {
            observer.on_updated(id, state);
        }
        true
    }

    /// Forget a vehicle, telling observers first. Absent ids are ignored.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(state) = self.vehicles.get(id) else {
            log::debug!("Ignoring removal of unknown vehicle {}", id);
            return false;
        };

        for observer in self.observers.iter_mut() {
            observer.on_removed(id, state);
        }
        self.vehicles.shift_remove(id);
        true
    }

    /// Remove every vehicle, e.g. when the simulation is cancelled.
    pub fn purge(&mut self) {
        let ids: Vec<String> = self.vehicles.keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
    }

    pub fn vehicles_of_class<'a>(
        &'a self,
        vehicle_class: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a VehicleState)> + 'a {
        self.vehicles
            .iter()
            .filter(move |(_, state)| state.info.v_class == vehicle_class)
            .map(|(id, state)| (id.as_str(), state))
    }

    pub fn random_vehicle_of_class<R: Rng + ?Sized>(
        &self,
        vehicle_class: &str,
        rng: &mut R,
    ) -> Option<(&str, &VehicleState)> {
        let choice = self
            .vehicles
            .iter()
            .filter(|(_, state)| state.info.v_class == vehicle_class)
            .map(|(id, state)| (id.as_str(), state))
            .choose(rng);
        if choice.is_none() {
            log::warn!("Cannot find a random {}", vehicle_class);
        }
        choice
    }

    pub fn vehicle_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for state in self.vehicles.values() {
            *counts.entry(state.info.v_class.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// SUMO reports the front-center of a vehicle, but models pivot around their center.
/// Back the position off by half the length along the heading, then rotate.
fn place(
    transform: &Transform,
    info: &VehicleInfo,
    template: ModelTemplate,
    template_index: usize,
) -> VehicleProxy {
    let front = transform.planar_xyz_to_render_xyz(&Point3::new(info.x, info.y, info.z));
    let angle = (180.0 - info.angle).to_radians();
    let half_length = info.length / 2.0;
    let position = Point3::new(
        front.x - half_length * angle.sin(),
        front.y,
        front.z - half_length * angle.cos(),
    );

    let indicators = (info.vehicle_type == "passenger").then(|| Indicators::from(info.signals));

    VehicleProxy {
        template,
        template_index,
        position,
        rotation_y: angle,
        visible: info.vehicle.is_none(),
        indicators,
    }
}

impl EntityRegistry for VehicleRegistry {
    type State = VehicleState;

    fn get(&self, id: &str) -> Option<&VehicleState> {
        self.vehicles.get(id)
    }

    fn for_each_live(&self, f: &mut dyn FnMut(&str, &VehicleState)) {
        for (id, state) in &self.vehicles {
            f(id, state);
        }
    }

    fn len(&self) -> usize {
        self.vehicles.len()
    }
}

impl DeltaTarget<VehicleInfo, VehicleUpdate> for VehicleRegistry {
    fn on_create(&mut self, id: &str, value: VehicleInfo) {
        self.create(id, value);
    }

    fn on_update(&mut self, id: &str, value: VehicleUpdate) {
        self.update(id, value);
    }

    fn on_remove(&mut self, id: &str) {
        self.remove(id);
    }
}
