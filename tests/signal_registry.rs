use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;
use sumo_viewer::{
    config::ViewerConfig,
    protocol::{apply_delta, Delta, LightInfo, LightUpdate},
    registry::{EntityRegistry, LightColor, RegistryObserver, SignalRegistry, SignalState},
};

fn registry() -> Result<SignalRegistry> {
    let config = ViewerConfig::load_from_files("network.toml", "vehicles.toml")?;
    let mut signals = SignalRegistry::new();
    signals.add_program_definitions(config.network.tl_logic);
    Ok(signals)
}

fn light_delta(json: &str) -> Delta<LightInfo, LightUpdate> {
    serde_json::from_str(json).expect("test delta must decode")
}

#[derive(Clone, Default)]
struct EventLog(Rc<RefCell<Vec<String>>>);

impl RegistryObserver<SignalState> for EventLog {
    fn on_created(&mut self, id: &str, state: &SignalState) {
        self.0.borrow_mut().push(format!("created {} {:?}", id, state.phase));
    }

    fn on_updated(&mut self, id: &str, state: &SignalState) {
        self.0.borrow_mut().push(format!("updated {} {:?}", id, state.phase));
    }

    fn on_removed(&mut self, id: &str, _state: &SignalState) {
        self.0.borrow_mut().push(format!("removed {}", id));
    }
}

#[test]
fn test_program_lookup_is_two_level() -> Result<()> {
    let signals = registry()?;
    assert_eq!(signals.program("0", "center").unwrap().phases.len(), 4);
    assert_eq!(signals.program("night", "center").unwrap().phases.len(), 1);
    assert_eq!(signals.program("0", "east").unwrap().phases.len(), 3);
    assert!(signals.program("night", "east").is_none());
    assert!(signals.program("weekend", "center").is_none());
    Ok(())
}

#[test]
fn test_creation_decodes_phase_colors() -> Result<()> {
    let mut signals = registry()?;
    apply_delta(
        light_delta(r#"{"creations": {"center": {"phase": 1, "programID": "0"}}}"#),
        &mut signals,
    );

    let state = signals.get("center").unwrap();
    assert_eq!(state.program_id.as_deref(), Some("0"));
    assert_eq!(state.phase, Some(1));
    use LightColor::*;
    assert_eq!(
        signals.light_colors("center").unwrap(),
        &[Yellow, Yellow, Red, Red, Yellow, Yellow, Red, Red]
    );
    Ok(())
}

#[test]
fn test_phase_and_program_update_independently() -> Result<()> {
    let mut signals = registry()?;
    apply_delta(
        light_delta(r#"{"creations": {"center": {"phase": 0, "programID": "0"}}}"#),
        &mut signals,
    );

    apply_delta(light_delta(r#"{"updates": {"center": {"phase": 2}}}"#), &mut signals);
    assert_eq!(signals.get("center").unwrap().phase, Some(2));
    assert_eq!(signals.light_colors("center").unwrap()[2], LightColor::Green);

    apply_delta(
        light_delta(r#"{"updates": {"center": {"phase": 0, "programID": "night"}}}"#),
        &mut signals,
    );
    let state = signals.get("center").unwrap();
    assert_eq!(state.program_id.as_deref(), Some("night"));
    assert!(state.colors.iter().all(|c| *c == LightColor::Yellow));
    Ok(())
}

#[test]
fn test_unknown_program_leaves_state_unchanged() -> Result<()> {
    let mut signals = registry()?;
    apply_delta(
        light_delta(r#"{"creations": {"center": {"phase": 2, "programID": "0"}}}"#),
        &mut signals,
    );
    let before = signals.get("center").cloned();

    assert!(!signals.set_phase("nowhere", 0));
    assert!(!signals.set_phase("center", 9));
    assert_eq!(signals.get("center").cloned(), before);

    // Re-selecting the active program keeps the current phase.
    assert!(signals.set_program("center", "0"));
    assert_eq!(signals.get("center").cloned(), before);
    Ok(())
}

#[test]
fn test_switch_to_unregistered_program_keeps_record_consistent() -> Result<()> {
    let mut signals = registry()?;
    apply_delta(
        light_delta(r#"{"creations": {"center": {"phase": 2, "programID": "0"}}}"#),
        &mut signals,
    );

    apply_delta(
        light_delta(r#"{"updates": {"center": {"phase": 0, "programID": "weekend"}}}"#),
        &mut signals,
    );

    // The switch is recorded, but no phase of program "0" may linger under it.
    let state = signals.get("center").unwrap();
    assert_eq!(state.program_id.as_deref(), Some("weekend"));
    assert_eq!(state.phase, None);
    assert!(state.colors.is_empty());
    assert!(!signals.set_phase("center", 0));

    // Switching back to a registered program makes phases resolvable again.
    apply_delta(
        light_delta(r#"{"updates": {"center": {"phase": 3, "programID": "0"}}}"#),
        &mut signals,
    );
    let state = signals.get("center").unwrap();
    assert_eq!(state.phase, Some(3));
    assert_eq!(state.colors.len(), 8);
    Ok(())
}

#[test]
fn test_update_for_unknown_light_is_ignored() -> Result<()> {
    let mut signals = registry()?;
    apply_delta(light_delta(r#"{"updates": {"east": {"phase": 1}}}"#), &mut signals);
    assert!(signals.is_empty());
    assert!(!signals.set_program("east", "0"));
    Ok(())
}

#[test]
fn test_observers_see_lifecycle() -> Result<()> {
    let mut signals = registry()?;
    let log = EventLog::default();
    signals.subscribe(Box::new(log.clone()));

    apply_delta(
        light_delta(
            r#"{"creations": {"east": {"phase": 0, "programID": "0"}},
                "updates": {"east": {"phase": 1}},
                "removals": ["east", "east"]}"#,
        ),
        &mut signals,
    );

    // "east" is created in the same delta, so its removals are stale.
    assert_eq!(*log.0.borrow(), vec!["created east Some(0)", "updated east Some(1)"]);

    apply_delta(light_delta(r#"{"removals": ["east"]}"#), &mut signals);
    assert_eq!(log.0.borrow().last().map(String::as_str), Some("removed east"));
    assert!(!signals.contains("east"));
    Ok(())
}

#[test]
fn test_random_light_and_iteration() -> Result<()> {
    let mut signals = registry()?;
    let mut rng = rand::thread_rng();
    assert!(signals.random_light(&mut rng).is_none());

    apply_delta(
        light_delta(
            r#"{"creations": {"center": {"phase": 0, "programID": "0"},
                              "east": {"phase": 0, "programID": "0"}}}"#,
        ),
        &mut signals,
    );

    let light = signals.random_light(&mut rng).unwrap();
    assert!(light == "center" || light == "east");

    let mut seen = Vec::new();
    signals.for_each_live(&mut |id, _| seen.push(id.to_string()));
    assert_eq!(seen, vec!["center", "east"]);
    Ok(())
}

#[test]
fn test_color_characters() {
    assert_eq!(LightColor::from('G'), LightColor::Green);
    assert_eq!(LightColor::from('g'), LightColor::Green);
    assert_eq!(LightColor::from('y'), LightColor::Yellow);
    assert_eq!(LightColor::from('r'), LightColor::Red);
    assert_eq!(LightColor::from('O'), LightColor::Off);
}
