//! Integration tests for the dataset loader and the demo store

use evtrip_adapters::{demo_store, load_csv, read_csv};
use evtrip_core::model::{Selection, TripId, VehicleId};
use evtrip_core::{Advance, EngineConfig, PlaybackEngine, TelemetryStore};
use std::sync::Arc;

const HEADER: &str = "DayNum,VehId,Trip,Timestamp(ms),Latitude[deg],Longitude[deg],Vehicle_Speed[km/h],HV_Battery_SOC[%],HV_Battery_Voltage[V],Power[W],Accum_Energy[kWh]";

fn dataset(rows: &[&str]) -> String {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

// ==================== CSV loader ====================

#[test]
fn test_read_csv_groups_and_sorts_trips() {
    let csv = dataset(&[
        "1.0,10,2,2000,42.2810,-83.7430,40.0,79.0,351.0,9000,0.02",
        "1.0,10,2,0,42.2800,-83.7430,0.0,80.0,352.0,1500,0.00",
        "1.0,10,2,1000,42.2805,-83.7430,20.0,79.5,351.5,6000,0.01",
        "1.0,8,706,0,42.3000,-83.7000,10.0,60.0,340.0,3000,0.00",
        "1.0,10,1,0,42.2700,-83.7400,0.0,90.0,360.0,1000,0.00",
    ]);

    let store = read_csv(csv.as_bytes()).expect("dataset should parse");

    assert_eq!(store.vehicles(), vec![VehicleId(8), VehicleId(10)]);
    assert_eq!(store.trips(VehicleId(10)), vec![TripId(1), TripId(2)]);

    let trip = store.trip(&Selection::new(10, 2)).expect("trip 10/2 exists");
    assert_eq!(trip.duration(), 3);
    let socs: Vec<f64> = trip
        .samples()
        .iter()
        .filter_map(|s| s.state_of_charge)
        .map(|soc| soc.0)
        .collect();
    assert_eq!(socs, vec![80.0, 79.5, 79.0]);
    assert_eq!(trip.samples()[2].power.0, 9000.0);
    assert_eq!(trip.samples()[1].speed.0, 20.0);
}

#[test]
fn test_read_csv_derives_distance_from_positions() {
    let csv = dataset(&[
        "1,10,2,0,42.2800,-83.7430,0,80,352,1500,0",
        "1,10,2,1000,42.2810,-83.7430,0,80,352,1500,0",
        "1,10,2,2000,42.2820,-83.7430,0,80,352,1500,0",
    ]);

    let store = read_csv(csv.as_bytes()).unwrap();
    let trip = store.trip(&Selection::new(10, 2)).unwrap();

    let d: Vec<f64> = trip.samples().iter().map(|s| s.cumulative_distance.0).collect();
    assert_eq!(d[0], 0.0);
    // 0.001 degree of latitude is ~111 m
    assert!((d[1] - 111.2).abs() < 0.5, "got {}", d[1]);
    assert!((d[2] - 222.4).abs() < 1.0, "got {}", d[2]);
}

#[test]
fn test_read_csv_uses_distance_column_when_present() {
    let csv = "VehId,Trip,Timestamp(ms),Latitude[deg],Longitude[deg],HV_Battery_SOC[%],Distance[m]\n\
               3,4,0,42.28,-83.74,70,0\n\
               3,4,1000,42.28,-83.74,69,250\n";

    let store = read_csv(csv.as_bytes()).unwrap();
    let trip = store.trip(&Selection::new(3, 4)).unwrap();
    assert_eq!(trip.total_distance().0, 250.0);
    // Missing measurement columns read as zero
    assert_eq!(trip.samples()[1].voltage.0, 0.0);
}

#[test]
fn test_read_csv_skips_rows_with_bad_timestamps() {
    let csv = dataset(&[
        "1,10,2,,42.2800,-83.7430,0,80,352,1500,0",
        "1,10,2,garbage,42.2800,-83.7430,0,80,352,1500,0",
        "1,10,2,500,42.2800,-83.7430,0,80,352,1500,0",
    ]);

    let store = read_csv(csv.as_bytes()).unwrap();
    assert_eq!(store.trip(&Selection::new(10, 2)).unwrap().duration(), 1);
}

#[test]
fn test_read_csv_accepts_float_ids_and_blank_cells() {
    let csv = dataset(&["1,10.0,706.0,0,42.28,-83.74,,NaN,,,"]);
    let store = read_csv(csv.as_bytes()).unwrap();
    let trip = store.trip(&Selection::new(10, 706)).unwrap();
    let sample = &trip.samples()[0];
    assert_eq!(sample.state_of_charge, None);
    assert_eq!(sample.speed.0, 0.0);
    assert_eq!(sample.voltage.0, 0.0);
}

#[test]
fn test_blank_soc_trip_plays_without_halting() {
    let csv = dataset(&[
        "1,8,706,0,42.2800,-83.7430,10.0,,340.0,3000,0.00",
        "1,8,706,1000,42.2805,-83.7430,20.0,,340.0,3000,0.01",
        "1,8,706,2000,42.2810,-83.7430,30.0,,340.0,3000,0.02",
    ]);
    let store = Arc::new(read_csv(csv.as_bytes()).unwrap());
    let engine = PlaybackEngine::new(EngineConfig::default(), store);
    let selection = Selection::new(8, 706);

    let (mut state, first) = engine.reset(0, &selection).unwrap();
    assert_eq!(first.labels.soc, "-- %");

    for tick in 1..=6 {
        match engine.advance(tick, Some(&selection), &state) {
            Advance::Updated { state: next, snapshot } => {
                assert!(!next.halted, "halted at tick {}", tick);
                assert!(snapshot.timer_enabled);
                assert_eq!(snapshot.metrics.unwrap().soc, None);
                state = next;
            }
            Advance::Unchanged => panic!("trip froze at tick {}", tick),
        }
    }
}

#[test]
fn test_read_csv_skips_rows_without_position() {
    let csv = dataset(&[
        "1,10,2,0,42.2800,-83.7430,0,80,352,1500,0",
        "1,10,2,1000,,,0,80,352,1500,0",
        "1,10,2,2000,NaN,-83.7430,0,80,352,1500,0",
        "1,10,2,3000,42.2810,-83.7430,0,80,352,1500,0",
    ]);

    let store = read_csv(csv.as_bytes()).unwrap();
    let trip = store.trip(&Selection::new(10, 2)).unwrap();
    assert_eq!(trip.duration(), 2);
    // Only the real 0.001 degree hop counts, not a detour through (0, 0)
    assert!((trip.total_distance().0 - 111.2).abs() < 0.5, "got {}", trip.total_distance().0);
}

#[test]
fn test_read_csv_rejects_missing_columns() {
    let csv = "VehId,Trip,Latitude[deg],Longitude[deg]\n1,1,42.0,-83.0\n";
    let err = read_csv(csv.as_bytes()).unwrap_err();
    assert!(
        err.to_string().contains("Timestamp(ms)"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_read_csv_rejects_bad_ids() {
    let csv = dataset(&["1,ten,2,0,42.28,-83.74,0,80,352,1500,0"]);
    assert!(read_csv(csv.as_bytes()).is_err());
}

#[test]
fn test_load_csv_from_file() {
    let dir = std::env::temp_dir().join("evtrip-loader-tests");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("ved-{}.csv", std::process::id()));
    std::fs::write(&path, dataset(&["1,5,9,0,42.28,-83.74,12,55,350,2000,0.1"])).unwrap();

    let store = load_csv(&path).expect("file should load");
    assert_eq!(store.trips(VehicleId(5)), vec![TripId(9)]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_load_csv_missing_file_errors() {
    let result = load_csv(std::path::Path::new("/definitely/not/here.csv"));
    assert!(result.is_err());
}

// ==================== Demo store ====================

#[test]
fn test_demo_store_lists_vehicles_and_trips() {
    let store = demo_store();
    assert_eq!(store.vehicles(), vec![VehicleId(10), VehicleId(11), VehicleId(12)]);
    for vehicle in store.vehicles() {
        assert_eq!(store.trips(vehicle), vec![TripId(1), TripId(2), TripId(3)]);
    }
}

#[test]
fn test_demo_trips_are_well_formed() {
    let store = demo_store();
    for vehicle in store.vehicles() {
        for trip_id in store.trips(vehicle) {
            let trip = store
                .trip(&Selection {
                    vehicle_id: vehicle,
                    trip_id,
                })
                .unwrap();
            assert!(trip.duration() > 100, "trip too short: {}", trip.duration());

            for pair in trip.samples().windows(2) {
                assert!(pair[1].timestamp > pair[0].timestamp);
                assert!(pair[1].cumulative_distance.0 >= pair[0].cumulative_distance.0);
                assert!(pair[1].state_of_charge <= pair[0].state_of_charge);
                assert!(pair[1].state_of_charge.is_some());
                assert!(pair[1].accumulated_energy.0 >= pair[0].accumulated_energy.0);
            }
            assert!(trip.total_distance().0 > 1000.0);
            assert!(trip.soc_consumed().0 > 0.0);
        }
    }
}

#[test]
fn test_demo_store_is_deterministic() {
    let a = demo_store();
    let b = demo_store();
    let sel = Selection::new(11, 2);
    let ta = a.trip(&sel).unwrap();
    let tb = b.trip(&sel).unwrap();
    assert_eq!(ta.duration(), tb.duration());
    assert_eq!(ta.total_distance(), tb.total_distance());
    assert_eq!(ta.samples()[50].position, tb.samples()[50].position);
}

#[test]
fn test_demo_low_battery_trip_depletes() {
    let store = demo_store();
    let trip = store.trip(&Selection::new(12, 3)).unwrap();
    assert!(trip.first_soc().unwrap().0 <= 4.0);
    assert!(trip.soc_consumed().0 > 1.0);
}
