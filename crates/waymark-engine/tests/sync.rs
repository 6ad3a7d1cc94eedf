//! Sync engine: reloads, materialization, textures and pack loading.

#![allow(missing_docs, unused_results)]

mod common;

use assert_matches::assert_matches;
use waymark_core::logging::capture_logs;
use waymark_core::{CategoryKey, PrimitiveTag, Vec3};
use waymark_engine::{
    EngineError, Layer, RenderSink, ReloadCheckpoint, ReloadPhase, Sprite, SyncConfig,
};
use waymark_import::{ImportTask, MemorySource};
use waymark_store::{PackStore, StateStore, StoreError};

use common::{TestClock, engine, engine_with, marker, settle, snapshot, trail};

struct Ids {
    near: i64,
    far: i64,
    other: i64,
    elsewhere: i64,
    route: i64,
}

fn build_pack() -> (PackStore, Ids) {
    let pack = PackStore::in_memory("tekkit").unwrap();
    pack.category("a.b", true).unwrap();
    pack.category("a.c", true).unwrap();
    let ids = Ids {
        near: marker(&pack, "a.b", 15, [1.0, 0.0, 0.0]),
        far: marker(&pack, "a.b", 15, [5.0, 0.0, 0.0]),
        other: marker(&pack, "a.c", 15, [20.0, 0.0, 0.0]),
        elsewhere: marker(&pack, "a.b", 16, [1.0, 0.0, 0.0]),
        route: trail(
            &pack,
            "a.b",
            15,
            &[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [0.0, 0.0, 0.0], [3.0, 3.0, 3.0], [4.0, 4.0, 4.0]],
        ),
    };
    (pack, ids)
}

fn key(typeid: &str) -> CategoryKey {
    CategoryKey::new("tekkit", typeid)
}

fn loaded(clock: &TestClock) -> (waymark_engine::SyncEngine, Ids) {
    let (pack, ids) = build_pack();
    let mut e = engine(clock);
    e.add_pack(pack).unwrap();
    e.update_telemetry(snapshot(15, [0.0, 0.0, 0.0]));
    settle(&mut e);
    (e, ids)
}

fn sorted_sprites(e: &waymark_engine::SyncEngine, layer: Layer) -> Vec<Sprite> {
    let mut v = e.render().sprites(layer).to_vec();
    v.sort_by(|a, b| a.tag.cmp(&b.tag));
    v
}

// ── Full reload ─────────────────────────────────────────────────────

#[test]
fn full_reload_materializes_active_categories_on_map() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (e, ids) = loaded(&clock);

    let expected: std::collections::BTreeSet<_> = [key("a.b"), key("a.c")].into();
    assert_eq!(e.materialized(), &expected);
    assert_eq!(e.render().sprites(Layer::World).len(), 3);
    assert_eq!(e.render().sprites(Layer::Map).len(), 3);
    // two drawable segments, mirrored on the map
    assert_eq!(e.render().polylines(Layer::World).len(), 2);
    assert_eq!(e.render().polylines(Layer::Map).len(), 2);
    assert!(e.render().polylines(Layer::World).iter().all(|p| p.points.len() == 2));
    assert!(e.render().tags().contains(&(Layer::World, PrimitiveTag::trail(&key("a.b"), ids.route))));
    assert!(!e.render().tags().contains(&(Layer::World, PrimitiveTag::marker(&key("a.b"), ids.elsewhere))));
}

#[test]
fn map_change_clears_and_rescans() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, ids) = loaded(&clock);

    e.update_telemetry(snapshot(16, [0.0, 0.0, 0.0]));
    settle(&mut e);

    assert_eq!(e.materialized().len(), 1);
    let world = e.render().sprites(Layer::World);
    assert_eq!(world.len(), 1);
    assert_eq!(world[0].tag, PrimitiveTag::marker(&key("a.b"), ids.elsewhere));
    assert!(e.render().polylines(Layer::World).is_empty());
}

#[test]
fn moving_within_instance_does_not_reload() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, _) = loaded(&clock);
    e.update_telemetry(snapshot(15, [100.0, 0.0, 0.0]));
    assert!(!e.is_reloading());
}

// ── Incremental reload ──────────────────────────────────────────────

#[test]
fn toggling_a_category_only_touches_that_category() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, _) = loaded(&clock);
    let before = e.render().tags();

    e.set_category_active("a.b", false).unwrap();
    settle(&mut e);
    assert_eq!(e.materialized().iter().cloned().collect::<Vec<_>>(), vec![key("a.c")]);
    assert_eq!(e.render().sprites(Layer::World).len(), 1);
    assert!(e.render().polylines(Layer::World).is_empty());

    e.set_category_active("a.b", true).unwrap();
    settle(&mut e);
    assert_eq!(e.render().tags(), before);
}

#[test]
fn parent_override_hides_descendants() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, _) = loaded(&clock);

    e.set_category_active("a", false).unwrap();
    settle(&mut e);
    assert!(e.materialized().is_empty());
    assert!(e.render().is_empty());
    assert!(e.hover(Layer::World, Vec3::ZERO, 1000.0).is_empty());

    e.clear_category_override("a").unwrap();
    settle(&mut e);
    assert_eq!(e.materialized().len(), 2);
}

#[test]
fn dematerialize_then_materialize_is_identical() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, _) = loaded(&clock);
    let tags = e.render().tags();
    let world = sorted_sprites(&e, Layer::World);
    let triggers = e.triggers().len();

    e.dematerialize(&key("a.b")).unwrap();
    assert!(!e.materialized().contains(&key("a.b")));
    e.materialize(&key("a.b")).unwrap();

    assert_eq!(e.render().tags(), tags);
    assert_eq!(sorted_sprites(&e, Layer::World), world);
    assert_eq!(e.triggers().len(), triggers);
}

#[test]
fn dematerialize_recurses_into_children() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, _) = loaded(&clock);
    e.dematerialize(&key("a")).unwrap();
    assert!(e.materialized().is_empty());
    assert!(e.render().is_empty());
}

// ── Reload scheduling ───────────────────────────────────────────────

#[test]
fn request_during_reload_is_queued_not_cancelled() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, _) = loaded(&clock);

    e.update_telemetry(snapshot(16, [0.0, 0.0, 0.0]));
    assert!(!e.poll_reload(1).unwrap());
    e.set_category_active("a.b", false).unwrap();
    assert!(e.is_reloading());

    settle(&mut e);
    assert!(e.materialized().is_empty());
    assert!(e.render().is_empty());
}

#[test]
fn suspended_reload_resumes_from_checkpoint() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (reference, _) = loaded(&clock);

    let (mut e, _) = loaded(&clock);
    e.update_telemetry(snapshot(16, [0.0, 0.0, 0.0]));
    settle(&mut e);
    e.update_telemetry(snapshot(15, [0.0, 0.0, 0.0]));
    // clear, scan, then the markers of the first category
    assert!(!e.poll_reload(3).unwrap());

    let checkpoint = e.suspend_reload().unwrap();
    assert_eq!(checkpoint.phase, ReloadPhase::Materialize);
    assert_eq!(checkpoint.current.as_ref().map(|c| c.key.clone()), Some(key("a.b")));
    assert_eq!(checkpoint.queue.len(), 1);
    assert!(!e.is_reloading());

    let json = serde_json::to_string(&checkpoint).unwrap();
    let restored: ReloadCheckpoint = serde_json::from_str(&json).unwrap();
    e.resume_reload(restored).unwrap();
    assert_matches!(
        e.resume_reload(checkpoint),
        Err(EngineError::InvalidState(_))
    );
    settle(&mut e);

    assert_eq!(e.render().tags(), reference.render().tags());
    assert_eq!(e.materialized(), reference.materialized());
}

// ── Lookups and point removal ───────────────────────────────────────

#[test]
fn hover_is_nearest_first() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (e, ids) = loaded(&clock);
    let hits = e.hover(Layer::World, Vec3::ZERO, 6.0);
    assert_eq!(
        hits,
        vec![PrimitiveTag::marker(&key("a.b"), ids.near), PrimitiveTag::marker(&key("a.b"), ids.far)]
    );
    assert_eq!(
        e.hover(Layer::Map, Vec3::new(20.0, 99.0, 0.0), 1.0),
        vec![PrimitiveTag::marker(&key("a.c"), ids.other)]
    );
}

#[test]
fn remove_entry_is_a_point_removal() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, ids) = loaded(&clock);
    let tag = PrimitiveTag::marker(&key("a.b"), ids.near);
    e.remove_entry(&tag);
    assert_eq!(e.render().sprites(Layer::World).len(), 2);
    assert_eq!(e.render().sprites(Layer::Map).len(), 2);
    assert!(!e.hover(Layer::World, Vec3::ZERO, 2.0).contains(&tag));
    assert!(e.materialized().contains(&key("a.b")));
}

// ── Visibility properties ───────────────────────────────────────────

#[test]
fn visibility_flags_pick_layers() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let pack = PackStore::in_memory("p").unwrap();
    pack.category("v", true).unwrap();
    let hidden_map = marker(&pack, "v", 1, [1.0, 0.0, 0.0]);
    pack.set_property(
        waymark_store::PropOwner::Marker(hidden_map),
        "mapvisibility",
        Some(&waymark_core::PropValue::Integer(0)),
    )
    .unwrap();
    pack.set_property(
        waymark_store::PropOwner::Marker(hidden_map),
        "minimapvisibility",
        Some(&waymark_core::PropValue::Integer(0)),
    )
    .unwrap();
    let hidden_world = marker(&pack, "v", 1, [2.0, 0.0, 0.0]);
    pack.set_property(
        waymark_store::PropOwner::Marker(hidden_world),
        "ingamevisibility",
        Some(&waymark_core::PropValue::Integer(0)),
    )
    .unwrap();

    let mut e = engine(&clock);
    e.add_pack(pack).unwrap();
    e.update_telemetry(snapshot(1, [0.0, 0.0, 0.0]));
    settle(&mut e);

    let world = e.render().sprites(Layer::World);
    let map = e.render().sprites(Layer::Map);
    assert_eq!(world.len(), 1);
    assert_eq!(world[0].tag.entry, waymark_core::EntryId::Marker(hidden_map));
    assert_eq!(map.len(), 1);
    assert_eq!(map[0].tag.entry, waymark_core::EntryId::Marker(hidden_world));
}

#[test]
fn defaulttoggle_off_category_is_not_materialized() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (pack, _) = build_pack();
    pack.set_property(
        waymark_store::PropOwner::Category("a.c"),
        "defaulttoggle",
        Some(&"false".into()),
    )
    .unwrap();
    let mut e = engine(&clock);
    e.add_pack(pack).unwrap();
    e.update_telemetry(snapshot(15, [0.0, 0.0, 0.0]));
    settle(&mut e);
    assert!(!e.materialized().contains(&key("a.c")));

    e.set_category_active("a.c", true).unwrap();
    settle(&mut e);
    assert!(e.materialized().contains(&key("a.c")));
}

// ── Textures ────────────────────────────────────────────────────────

fn foo_pack(with_icon: bool) -> PackStore {
    let mut src = MemorySource::new("foo").with_file(
        "foo.xml",
        r#"<OverlayData>
  <MarkerCategory name="foo"/>
  <POIs><POI type="foo" MapID="1" xpos="1" iconfile="icons/a.png"/></POIs>
</OverlayData>"#,
    );
    if with_icon {
        src = src.with_file("icons/a.png", vec![0x89, b'P', b'N', b'G']);
    }
    let mut pack = PackStore::in_memory("foo").unwrap();
    ImportTask::default().run_to_completion(&mut src, &mut pack).unwrap();
    pack
}

#[test]
fn missing_icon_materializes_with_placeholder() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let mut e = engine(&clock);
    e.add_pack(foo_pack(false)).unwrap();

    let (logs, _guard) = capture_logs();
    e.update_telemetry(snapshot(1, [0.0, 0.0, 0.0]));
    settle(&mut e);

    let world = e.render().sprites(Layer::World);
    assert_eq!(world.len(), 1);
    assert_eq!(world[0].texture, "placeholder");
    let events = logs.find(tracing::Level::ERROR, "texture data file missing");
    assert!(!events.is_empty());
    assert_eq!(events[0].field("pack"), Some("foo"));
    assert_eq!(events[0].field("category"), Some("foo"));
    assert_eq!(events[0].field("path"), Some("icons/a.png"));
}

#[test]
fn present_icon_is_loaded_once_into_texture_cache() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let mut e = engine(&clock);
    e.add_pack(foo_pack(true)).unwrap();
    e.update_telemetry(snapshot(1, [0.0, 0.0, 0.0]));
    settle(&mut e);

    assert_eq!(e.render().sprites(Layer::World)[0].texture, "foo/icons/a.png");
    assert!(e.render().has_texture("foo/icons/a.png"));
    assert_eq!(e.render().texture_count(), 2);

    e.reload(true).unwrap();
    assert_eq!(e.render().texture_count(), 2);
}

// ── Pack loading ────────────────────────────────────────────────────

#[test]
fn bad_schema_fails_only_that_pack() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.db");
    let bad = dir.path().join("bad.db");
    {
        let pack = PackStore::open_or_create(&good).unwrap();
        pack.category("x", true).unwrap();
        let pack = PackStore::open_or_create(&bad).unwrap();
        pack.conn().execute_batch("UPDATE markerpack SET version = 2").unwrap();
    }

    let mut e = engine(&clock);
    assert_matches!(
        e.load_pack(&bad),
        Err(EngineError::Store(StoreError::SchemaVersion { found: Some(2), .. }))
    );
    assert_eq!(e.load_pack(&good).unwrap(), "good");
    assert_eq!(e.pack_names(), vec!["good"]);
}

#[test]
fn duplicate_and_unload() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let (mut e, _) = loaded(&clock);
    let (again, _) = build_pack();
    assert_matches!(e.add_pack(again), Err(EngineError::DuplicatePack(name)) if name == "tekkit");

    assert!(e.unload_pack("tekkit").is_some());
    assert!(e.materialized().is_empty());
    assert!(e.render().is_empty());
    assert!(e.triggers().is_empty());
    assert!(e.unload_pack("tekkit").is_none());
}

fn two_packs(clock: &TestClock) -> waymark_engine::SyncEngine {
    let config = SyncConfig {
        categories_per_slice: 1,
        ..SyncConfig::default()
    };
    let mut e = engine_with(StateStore::in_memory().unwrap(), config, clock);
    for (name, typeid) in [("a", "x"), ("b", "y")] {
        let pack = PackStore::in_memory(name).unwrap();
        pack.category(typeid, true).unwrap();
        marker(&pack, typeid, 15, [1.0, 0.0, 0.0]);
        e.add_pack(pack).unwrap();
    }
    e.update_telemetry(snapshot(15, [0.0, 0.0, 0.0]));
    settle(&mut e);
    assert_eq!(e.materialized().len(), 2);
    e
}

#[test]
fn unloading_a_pack_mid_reload_keeps_the_reload_going() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let mut e = two_packs(&clock);

    e.start_reload(true);
    // clear, then scan
    assert!(!e.poll_reload(2).unwrap());
    let checkpoint = e.reload_checkpoint().unwrap();
    assert_eq!(checkpoint.phase, ReloadPhase::Materialize);
    assert_eq!(checkpoint.queue.len(), 2);

    assert!(e.unload_pack("a").is_some());
    let checkpoint = e.reload_checkpoint().unwrap();
    assert_eq!(checkpoint.queue, [CategoryKey::new("b", "y")]);

    settle(&mut e);
    assert_eq!(
        e.materialized().iter().cloned().collect::<Vec<_>>(),
        vec![CategoryKey::new("b", "y")]
    );
    assert!(e.render().tags().iter().all(|(_, tag)| tag.pack == "b"));
    assert!(!e.render().is_empty());
}

#[test]
fn resumed_checkpoint_skips_unloaded_packs() {
    let clock = TestClock::new("2024-05-15T12:00:00Z");
    let mut e = two_packs(&clock);

    e.start_reload(true);
    assert!(!e.poll_reload(2).unwrap());
    let checkpoint = e.suspend_reload().unwrap();
    assert_eq!(checkpoint.queue.len(), 2);

    assert!(e.unload_pack("a").is_some());
    e.resume_reload(checkpoint).unwrap();
    settle(&mut e);
    assert_eq!(
        e.materialized().iter().cloned().collect::<Vec<_>>(),
        vec![CategoryKey::new("b", "y")]
    );
}
