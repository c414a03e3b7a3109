use super::{EntityRegistry, RegistryObserver};
use crate::config::TlLogic;
use crate::protocol::{DeltaTarget, LightInfo, LightUpdate};
use indexmap::IndexMap;
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::HashMap;

/// What one controlled link of a traffic light currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightColor {
    Green,
    Yellow,
    Red,
    Off,
}

impl From<char> for LightColor {
    fn from(c: char) -> Self {
        match c.to_ascii_lowercase() {
            'g' => LightColor::Green,
            'y' => LightColor::Yellow,
            'r' => LightColor::Red,
            _ => LightColor::Off,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalState {
    pub program_id: Option<String>,
    pub phase: Option<usize>,
    /// One entry per controlled link, decoded from the active phase.
    pub colors: Vec<LightColor>,
}

pub struct SignalRegistry {
    /// program id -> light id -> definition
    programs: HashMap<String, HashMap<String, TlLogic>>,
    signals: IndexMap<String, SignalState>,
    observers: Vec<Box<dyn RegistryObserver<SignalState>>>,
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
            signals: IndexMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn RegistryObserver<SignalState>>) {
        self.observers.push(observer);
    }

    pub fn add_program_definitions<I>(&mut self, logics: I)
    where
        I: IntoIterator<Item = TlLogic>,
    {
        for logic in logics {
            self.programs
                .entry(logic.program_id.clone())
                .or_default()
                .insert(logic.id.clone(), logic);
        }
    }

    pub fn program(&self, program_id: &str, light_id: &str) -> Option<&TlLogic> {
        self.programs.get(program_id)?.get(light_id)
    }

    /// Record the active program. Takes effect on the next `set_phase`.
    ///
    /// Switching to a different program drops the current phase and colors, which belonged
    /// to the old program.
    pub fn set_program(&mut self, light_id: &str, program_id: &str) -> bool {
        let Some(state) = self.signals.get_mut(light_id) else {
            log::warn!("Cannot set program for unknown light {}", light_id);
            return false;
        };
        if !self.programs.contains_key(program_id) {
            log::warn!("Light {} switched to unregistered program {}", light_id, program_id);
        }
        if state.program_id.as_deref() != Some(program_id) {
            state.program_id = Some(program_id.to_string());
            state.phase = None;
            state.colors.clear();
        }
        true
    }

    /// Switch a light to a phase of its active program.
    ///
    /// An unknown light, program or phase index is reported and leaves the state unchanged.
    pub fn set_phase(&mut self, light_id: &str, phase_index: usize) -> bool {
        let Some(state) = self.signals.get_mut(light_id) else {
            log::warn!("Cannot set phase for unknown light {}", light_id);
            return false;
        };

        let logic = state
            .program_id
            .as_deref()
            .and_then(|program_id| self.programs.get(program_id))
            .and_then(|lights| lights.get(light_id));
        let Some(logic) = logic else {
            log::warn!("Cannot set phase for light {} (program {:?})", light_id, state.program_id);
            return false;
        };

        let Some(phase) = logic.phases.get(phase_index) else {
            log::warn!(
                "Light {} has no phase {} in program {}",
                light_id, phase_index, logic.program_id
            );
            return false;
        };

        state.phase = Some(phase_index);
        state.colors = phase.state.chars().map(LightColor::from).collect();
        true
    }

    pub fn light_colors(&self, light_id: &str) -> Option<&[LightColor]> {
        self.signals.get(light_id).map(|state| state.colors.as_slice())
    }

    pub fn random_light<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.signals.keys().choose(rng).map(|id| id.as_str())
    }

    fn apply(&mut self, light_id: &str, update: LightUpdate) {
        if let Some(program_id) = update.program_id {
            self.set_program(light_id, &program_id);
        }
        if let Some(phase) = update.phase {
            self.set_phase(light_id, phase);
        }
    }

    fn notify_created(&mut self, light_id: &str) {
        if let Some(state) = self.signals.get(light_id) {
            for observer in self.observers.iter_mut() {
                observer.on_created(light_id, state);
            }
        }
    }

    fn notify_updated(&mut self, light_id: &str) {
        if let Some(state) = self.signals.get(light_id) {
            for observer in self.observers.iter_mut() {
                observer.on_updated(light_id, state);
            }
        }
    }
}

impl EntityRegistry for SignalRegistry {
    type State = SignalState;

    fn get(&self, id: &str) -> Option<&SignalState> {
        self.signals.get(id)
    }

    fn for_each_live(&self, f: &mut dyn FnMut(&str, &SignalState)) {
        for (id, state) in &self.signals {
            f(id, state);
        }
    }

    fn len(&self) -> usize {
        self.signals.len()
    }
}

impl DeltaTarget<LightInfo, LightUpdate> for SignalRegistry {
    fn on_create(&mut self, id: &str, value: LightInfo) {
        self.signals.insert(id.to_string(), SignalState::default());
        self.apply(id, value.into());
        self.notify_created(id);
    }

    fn on_update(&mut self, id: &str, value: LightUpdate) {
        if !self.signals.contains_key(id) {
            log::debug!("Ignoring update for unknown light {}", id);
            return;
        }
        self.apply(id, value);
        self.notify_updated(id);
    }

    fn on_remove(&mut self, id: &str) {
        log::warn!("Disappearing traffic light {}", id);
        if let Some(state) = self.signals.get(id) {
            for observer in self.observers.iter_mut() {
                observer.on_removed(id, state);
            }
            self.signals.shift_remove(id);
        }
    }
}
