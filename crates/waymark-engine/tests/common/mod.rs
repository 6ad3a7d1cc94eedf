#![allow(dead_code, missing_docs, unused_results)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use waymark_core::{PropValue, Vec3};
use waymark_engine::{RenderCollections, SyncConfig, SyncEngine, TelemetrySnapshot};
use waymark_store::{PackStore, PropOwner, StateStore};

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Shared, settable wall clock.
#[derive(Clone)]
pub struct TestClock(Arc<Mutex<DateTime<Utc>>>);

impl TestClock {
    pub fn new(s: &str) -> Self {
        Self(Arc::new(Mutex::new(at(s))))
    }

    pub fn set(&self, s: &str) {
        *self.0.lock().unwrap() = at(s);
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    pub fn source(&self) -> impl Fn() -> DateTime<Utc> + Send + 'static {
        let inner = Arc::clone(&self.0);
        move || *inner.lock().unwrap()
    }
}

pub fn snapshot(map_id: u32, position: [f32; 3]) -> TelemetrySnapshot {
    TelemetrySnapshot {
        map_id,
        position: position.into(),
        ..TelemetrySnapshot::default()
    }
}

pub fn marker(pack: &PackStore, typeid: &str, map: u32, pos: [f32; 3]) -> i64 {
    let id = pack.new_marker(typeid, map).unwrap();
    for (name, v) in [("xpos", pos[0]), ("ypos", pos[1]), ("zpos", pos[2])] {
        pack.set_property(PropOwner::Marker(id), name, Some(&PropValue::Real(f64::from(v))))
            .unwrap();
    }
    id
}

pub fn guid_marker(
    pack: &PackStore,
    typeid: &str,
    map: u32,
    pos: [f32; 3],
    guid: &str,
    behavior: i64,
) -> i64 {
    let id = marker(pack, typeid, map, pos);
    pack.set_property(PropOwner::Marker(id), "guid", Some(&guid.into())).unwrap();
    pack.set_property(PropOwner::Marker(id), "behavior", Some(&PropValue::Integer(behavior)))
        .unwrap();
    id
}

pub fn trail(pack: &PackStore, typeid: &str, map: u32, coords: &[[f32; 3]]) -> i64 {
    let id = pack.new_trail(typeid, map).unwrap();
    let pts: Vec<Vec3> = coords.iter().copied().map(Vec3::from).collect();
    pack.set_trail_coords(id, &pts).unwrap();
    id
}

pub fn engine_with(state: StateStore, config: SyncConfig, clock: &TestClock) -> SyncEngine {
    SyncEngine::new(state, RenderCollections::new("placeholder"), config).with_clock(clock.source())
}

pub fn engine(clock: &TestClock) -> SyncEngine {
    engine_with(StateStore::in_memory().unwrap(), SyncConfig::default(), clock)
}

pub fn settle(engine: &mut SyncEngine) {
    while !engine.poll_reload(8).unwrap() {}
}
