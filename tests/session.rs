use anyhow::Result;
use sumo_viewer::{
    config::ViewerConfig,
    geometry::Point,
    protocol::{Action, ClientMessage, ProtocolError, SimulationStatus},
    registry::EntityRegistry,
    search::{resolve_search, SearchError, SearchTarget},
    session::{MessageOutcome, Session},
};

const FIRST_SNAPSHOT: &str = r#"{
    "type": "snapshot",
    "time": 1000,
    "vehicles": {
        "creations": {
            "veh0": {"x": 100, "y": 200, "z": 0, "speed": 12.5, "angle": 90, "width": 1.8,
                     "length": 4.5, "type": "passenger", "vClass": "passenger", "signals": 0,
                     "vehicle": null},
            "ped0": {"x": 120, "y": 210, "z": 0, "speed": 1.2, "angle": 180, "width": 0.5,
                     "length": 0.3, "type": "DEFAULT_PEDTYPE", "vClass": "pedestrian",
                     "signals": 0, "vehicle": null}
        },
        "updates": {},
        "removals": []
    },
    "lights": {
        "creations": {"center": {"phase": 0, "programID": "0"}},
        "updates": {},
        "removals": []
    },
    "vehicle_counts": {"passenger": 1, "pedestrian": 1},
    "simulate_secs": 0.004,
    "snapshot_secs": 0.001
}"#;

const MOVE_VEH0: &str = r#"{
    "type": "snapshot",
    "time": 2000,
    "vehicles": {"creations": {}, "updates": {"veh0": {"x": 110, "speed": 13.0}}, "removals": []},
    "lights": {"creations": {}, "updates": {"center": {"phase": 1}}, "removals": []},
    "vehicle_counts": {"passenger": 1, "pedestrian": 1},
    "simulate_secs": 0.002,
    "snapshot_secs": 0.001
}"#;

const REMOVE_VEH0: &str = r#"{
    "type": "snapshot",
    "time": 3000,
    "vehicles": {"creations": {}, "updates": {}, "removals": ["veh0"]},
    "lights": {"creations": {}, "updates": {}, "removals": []},
    "vehicle_counts": {"pedestrian": 1},
    "simulate_secs": 0.003,
    "snapshot_secs": 0.001
}"#;

fn session() -> Result<Session> {
    let config = ViewerConfig::load_from_files("network.toml", "vehicles.toml")?;
    Session::new(&config)
}

#[test]
fn test_snapshot_populates_registries_and_stats() -> Result<()> {
    let mut session = session()?;
    let outcome = session.handle_message(FIRST_SNAPSHOT)?;

    match outcome {
        MessageOutcome::Snapshot { vehicles, lights } => {
            assert_eq!(vehicles.created, 2);
            assert_eq!(lights.created, 1);
        }
        other => panic!("expected a snapshot outcome, got {:?}", other),
    }

    assert_eq!(session.vehicles().len(), 2);
    assert_eq!(session.signals().get("center").unwrap().phase, Some(0));

    let stats = session.stats();
    assert_eq!(stats.time, 1000.0);
    assert_eq!(stats.payload_size, FIRST_SNAPSHOT.len());
    assert_eq!(stats.vehicle_counts.get("pedestrian"), Some(&1));
    assert!((stats.max_simulate_ms - 4.0).abs() < 1e-9);

    session.handle_message(MOVE_VEH0)?;
    assert_eq!(session.vehicles().get("veh0").unwrap().info.x, 110.0);
    assert_eq!(session.signals().get("center").unwrap().phase, Some(1));
    assert!((session.stats().max_simulate_ms - 4.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_state_message() -> Result<()> {
    let mut session = session()?;
    assert_eq!(session.status(), SimulationStatus::Off);

    let outcome = session.handle_message(
        r#"{"type": "state", "scenario": "tampa", "simulationStatus": "running", "delayMs": 100}"#,
    )?;
    assert_eq!(outcome, MessageOutcome::State(SimulationStatus::Running));
    assert_eq!(session.status(), SimulationStatus::Running);
    assert_eq!(session.delay_ms(), 100);
    assert_eq!(session.scenario(), "tampa");
    Ok(())
}

#[test]
fn test_unknown_message_type_is_ignored() -> Result<()> {
    let mut session = session()?;
    let outcome = session.handle_message(r#"{"type": "weather", "rain": true}"#)?;
    assert_eq!(outcome, MessageOutcome::Ignored);
    assert!(session.vehicles().is_empty());
    Ok(())
}

#[test]
fn test_bad_message_does_not_halt_the_stream() -> Result<()> {
    let mut session = session()?;
    session.handle_message(FIRST_SNAPSHOT)?;

    let broken = session.handle_message(r#"{"type": "snapshot", "time": "#);
    assert!(matches!(broken, Err(ProtocolError::Decode(_))));

    let missing_lights = session.handle_message(
        r#"{"type": "snapshot", "time": 5, "vehicles": {"removals": ["veh0"]}}"#,
    );
    assert!(missing_lights.is_err());
    assert!(session.vehicles().contains("veh0"));
    assert_eq!(session.stats().time, 1000.0);

    session.handle_message(MOVE_VEH0)?;
    assert_eq!(session.stats().time, 2000.0);
    Ok(())
}

#[test]
fn test_selection_follows_vehicle_lifecycle() -> Result<()> {
    let mut session = session()?;
    assert!(!session.select_vehicle("veh0"));
    assert!(!session.follow_selected());

    session.handle_message(FIRST_SNAPSHOT)?;
    assert!(session.select_vehicle("veh0"));
    assert!(session.follow_selected());

    session.handle_message(MOVE_VEH0)?;
    {
        let selection = session.selection();
        assert_eq!(selection.vehicle_info.as_ref().map(|info| info.x), Some(110.0));
        assert!(selection.following);
    }

    session.handle_message(REMOVE_VEH0)?;
    let selection = session.selection();
    assert_eq!(selection.vehicle_id, None);
    assert_eq!(selection.vehicle_info, None);
    assert!(!selection.following);
    Ok(())
}

#[test]
fn test_removing_another_vehicle_keeps_selection() -> Result<()> {
    let mut session = session()?;
    session.handle_message(FIRST_SNAPSHOT)?;
    session.select_vehicle("ped0");
    session.handle_message(REMOVE_VEH0)?;
    assert_eq!(session.selection().vehicle_id.as_deref(), Some("ped0"));
    Ok(())
}

#[test]
fn test_cancel_clears_the_run() -> Result<()> {
    let mut session = session()?;
    session.handle_message(FIRST_SNAPSHOT)?;
    session.select_vehicle("veh0");

    let request = session.cancel();
    assert_eq!(request, ClientMessage::Action(Action::Cancel));
    assert_eq!(request.to_json()?, r#"{"type":"action","action":"cancel"}"#);
    assert!(session.vehicles().is_empty());
    assert_eq!(session.selection().vehicle_id, None);
    assert_eq!(session.stats().time, 0.0);
    Ok(())
}

#[test]
fn test_client_actions_encode() -> Result<()> {
    let start = ClientMessage::Action(Action::Start).to_json()?;
    assert_eq!(start, r#"{"type":"action","action":"start"}"#);

    let delay = ClientMessage::Action(Action::ChangeDelay { delay_length_ms: 250 }).to_json()?;
    assert_eq!(delay, r#"{"type":"action","action":"changeDelay","delayLengthMs":250}"#);
    Ok(())
}

#[test]
fn test_search_planar_coordinates() -> Result<()> {
    let session = session()?;
    assert_eq!(
        resolve_search("100, 200", &session),
        Ok(SearchTarget::Planar {
            planar: Point::new(100.0, 200.0),
            render: Point::new(100.0, 1300.0),
        })
    );

    let error = resolve_search("5000,10", &session).unwrap_err();
    assert!(matches!(error, SearchError::OutOfBounds { .. }));
    assert_eq!(
        error.to_string(),
        "Invalid x, y coordinates, 0 < x < 2000, 0 < y < 1500."
    );

    assert_eq!(resolve_search("100 , 200", &session), Err(SearchError::NotFound));
    Ok(())
}

#[test]
fn test_search_geographic_coordinates() -> Result<()> {
    let session = session()?;
    match resolve_search("27.9506, -82.4572", &session) {
        Ok(SearchTarget::Geographic { lat_lng, render }) => {
            assert_eq!(lat_lng.lat, 27.9506);
            assert!((render.x - 650.4).abs() < 1.0);
            assert!((render.y - (1500.0 - 584.6)).abs() < 1.0);
        }
        other => panic!("expected a geographic target, got {:?}", other),
    }

    assert!(matches!(
        resolve_search("40.0, -75.0", &session),
        Err(SearchError::OutOfGeoBounds { .. })
    ));
    Ok(())
}

#[test]
fn test_search_vehicle_id() -> Result<()> {
    let mut session = session()?;
    assert_eq!(resolve_search("veh0", &session), Err(SearchError::NotFound));

    session.handle_message(FIRST_SNAPSHOT)?;
    assert_eq!(
        resolve_search("veh0", &session),
        Ok(SearchTarget::Vehicle("veh0".to_string()))
    );
    Ok(())
}
