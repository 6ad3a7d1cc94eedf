//! Incremental render synchronization.
//!
//! [`SyncEngine`] keeps the render collections consistent with the pack
//! stores, the user's category overrides and the current map. It never
//! rebuilds everything on a toggle: an incremental reload dematerializes the
//! categories that turned inactive and materializes the ones that turned
//! active. A full reload (map or shard change) clears and rescans.
//!
//! Reloads run as a [`ReloadTask`] driven by [`SyncEngine::poll_reload`].
//! Each step does one bounded slice (a few categories' markers, or a few
//! trails of one category) and leaves the materialized set, the render
//! collections, the proximity lists and the trigger list consistent with
//! each other. A reload requested while one runs is queued, full winning
//! over incremental.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use waymark_core::{Behavior, CategoryKey, PrimitiveTag, Vec3};
use waymark_settings::WaymarkSettings;
use waymark_store::{PackStore, PropOwner, StateStore};

use crate::effective::{BehaviorCode, MarkerView, TrailView, merge};
use crate::errors::{EngineError, Result};
use crate::proximity::ProximityIndex;
use crate::render::{Layer, Polyline, RenderCollections, RenderSink, Sprite};
use crate::resolver::ActiveResolver;
use crate::segments::split_segments;
use crate::telemetry::TelemetrySnapshot;
use crate::trigger::is_consumed;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Engine tuning, taken from [`WaymarkSettings`].
#[derive(Clone, Debug, PartialEq)]
pub struct SyncConfig {
    /// Categories whose markers are materialized per reload step.
    pub categories_per_slice: usize,
    /// Trails drawn per reload step.
    pub trails_per_slice: usize,
    /// Trigger radius for markers without `triggerrange`.
    pub default_trigger_range: f32,
    /// Whether [`TriggerEngine::tick`](crate::TriggerEngine::tick) consumes.
    pub triggers_enabled: bool,
    /// Texture used when an icon or trail texture is unavailable.
    pub placeholder_texture: String,
    /// Whether markers and trails are mirrored onto the map layer.
    pub map_mirroring: bool,
    /// Base sprite size.
    pub marker_size: f32,
    /// Base trail width.
    pub trail_size: f32,
}

impl SyncConfig {
    /// Extract the engine's settings.
    pub fn from_settings(settings: &WaymarkSettings) -> Self {
        Self {
            categories_per_slice: settings.sync.categories_per_slice.max(1),
            trails_per_slice: settings.sync.trails_per_slice.max(1),
            default_trigger_range: settings.trigger.default_range,
            triggers_enabled: settings.trigger.enabled,
            placeholder_texture: settings.render.placeholder_texture.clone(),
            map_mirroring: settings.render.map_mirroring,
            marker_size: settings.render.marker_size,
            trail_size: settings.render.trail_size,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_settings(&WaymarkSettings::default())
    }
}

/// A live GUID marker that can be consumed by proximity.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerCandidate {
    /// Marker tag.
    pub tag: PrimitiveTag,
    /// Marker GUID.
    pub guid: String,
    /// Consumption behavior.
    pub behavior: Behavior,
    /// World position.
    pub position: Vec3,
    /// Squared trigger radius.
    pub radius_sq: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reload task
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadKind {
    /// Clear everything and rescan.
    Full,
    /// Diff against the materialized set.
    Incremental,
}

impl ReloadKind {
    /// The stronger of two queued requests.
    pub fn merge(self, other: Self) -> Self {
        if self == Self::Full || other == Self::Full {
            Self::Full
        } else {
            Self::Incremental
        }
    }
}

/// Stage of a reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPhase {
    /// Drop every live primitive (full reloads).
    Clear,
    /// Find materialized categories that are no longer active.
    FindStale,
    /// Dematerialize them.
    Dematerialize,
    /// Find active categories with entries on the current map.
    Scan,
    /// Materialize them.
    Materialize,
    /// Finished.
    Done,
}

/// Trails of one category still to draw.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailCursor {
    /// Category being materialized.
    pub key: CategoryKey,
    /// Remaining trail ids, in draw order.
    pub trails: VecDeque<i64>,
}

/// Serializable state of a [`ReloadTask`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadCheckpoint {
    /// Reload kind.
    pub kind: ReloadKind,
    /// Current stage.
    pub phase: ReloadPhase,
    /// Categories still to dematerialize.
    pub stale: VecDeque<CategoryKey>,
    /// Categories still to materialize.
    pub queue: VecDeque<CategoryKey>,
    /// Category whose trails are being drawn.
    pub current: Option<TrailCursor>,
}

/// Cooperative reload state machine.
#[derive(Clone, Debug)]
pub struct ReloadTask {
    kind: ReloadKind,
    phase: ReloadPhase,
    stale: VecDeque<CategoryKey>,
    queue: VecDeque<CategoryKey>,
    current: Option<TrailCursor>,
}

impl ReloadTask {
    /// A task at its first stage.
    pub fn new(kind: ReloadKind) -> Self {
        Self {
            kind,
            phase: match kind {
                ReloadKind::Full => ReloadPhase::Clear,
                ReloadKind::Incremental => ReloadPhase::FindStale,
            },
            stale: VecDeque::new(),
            queue: VecDeque::new(),
            current: None,
        }
    }

    /// Rebuild a task from a checkpoint.
    pub fn resume(checkpoint: ReloadCheckpoint) -> Self {
        Self {
            kind: checkpoint.kind,
            phase: checkpoint.phase,
            stale: checkpoint.stale,
            queue: checkpoint.queue,
            current: checkpoint.current,
        }
    }

    /// Current position.
    pub fn checkpoint(&self) -> ReloadCheckpoint {
        ReloadCheckpoint {
            kind: self.kind,
            phase: self.phase,
            stale: self.stale.clone(),
            queue: self.queue.clone(),
            current: self.current.clone(),
        }
    }

    /// Reload kind.
    pub fn kind(&self) -> ReloadKind {
        self.kind
    }

    /// Current stage.
    pub fn phase(&self) -> ReloadPhase {
        self.phase
    }

    /// Whether the task has finished.
    pub fn is_done(&self) -> bool {
        self.phase == ReloadPhase::Done
    }

    /// Drop every pending key whose pack fails `keep`.
    fn retain_packs(&mut self, keep: impl Fn(&str) -> bool) {
        self.stale.retain(|k| keep(&k.pack));
        self.queue.retain(|k| keep(&k.pack));
        if self.current.as_ref().is_some_and(|c| !keep(&c.key.pack)) {
            self.current = None;
        }
        if self.phase == ReloadPhase::Materialize && self.current.is_none() && self.queue.is_empty() {
            self.phase = ReloadPhase::Done;
        }
    }

    /// Perform one slice of work.
    pub fn step<R: RenderSink>(&mut self, engine: &mut SyncEngine<R>) -> Result<()> {
        match self.phase {
            ReloadPhase::Clear => {
                engine.clear_live();
                self.phase = ReloadPhase::Scan;
            }
            ReloadPhase::FindStale => {
                self.stale = engine.stale_categories()?.into();
                self.phase = ReloadPhase::Dematerialize;
            }
            ReloadPhase::Dematerialize => {
                for _ in 0..engine.config.categories_per_slice {
                    let Some(key) = self.stale.pop_front() else {
                        break;
                    };
                    engine.dematerialize(&key)?;
                }
                if self.stale.is_empty() {
                    self.phase = ReloadPhase::Scan;
                }
            }
            ReloadPhase::Scan => {
                self.queue = engine.scan_candidates()?.into();
                debug!(kind = ?self.kind, categories = self.queue.len(), "reload scan");
                self.phase = ReloadPhase::Materialize;
            }
            ReloadPhase::Materialize => self.step_materialize(engine)?,
            ReloadPhase::Done => {}
        }
        Ok(())
    }

    fn step_materialize<R: RenderSink>(&mut self, engine: &mut SyncEngine<R>) -> Result<()> {
        if let Some(cursor) = self.current.as_mut() {
            for _ in 0..engine.config.trails_per_slice {
                let Some(id) = cursor.trails.pop_front() else {
                    break;
                };
                engine.draw_trail(&cursor.key, id)?;
            }
            if cursor.trails.is_empty() {
                self.current = None;
            }
        } else {
            for _ in 0..engine.config.categories_per_slice {
                let Some(key) = self.queue.pop_front() else {
                    break;
                };
                let trails = engine.materialize_markers(&key)?;
                if !trails.is_empty() {
                    self.current = Some(TrailCursor {
                        key,
                        trails: trails.into(),
                    });
                    break;
                }
            }
        }
        if self.current.is_none() && self.queue.is_empty() {
            self.phase = ReloadPhase::Done;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Loaded packs, user state and the live render index.
pub struct SyncEngine<R: RenderSink = RenderCollections> {
    config: SyncConfig,
    packs: BTreeMap<String, PackStore>,
    state: StateStore,
    render: R,
    materialized: BTreeSet<CategoryKey>,
    world: ProximityIndex,
    map: ProximityIndex,
    triggers: Vec<TriggerCandidate>,
    session_consumed: HashSet<String>,
    unknown_behaviors: HashSet<i64>,
    telemetry: Option<TelemetrySnapshot>,
    clock: Clock,
    reload: Option<ReloadTask>,
    pending: Option<ReloadKind>,
}

impl<R: RenderSink> std::fmt::Debug for SyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("packs", &self.packs.keys().collect::<Vec<_>>())
            .field("materialized", &self.materialized.len())
            .field("triggers", &self.triggers.len())
            .field("telemetry", &self.telemetry)
            .field("reloading", &self.reload.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: RenderSink> SyncEngine<R> {
    /// An engine with no packs and no telemetry yet.
    pub fn new(state: StateStore, render: R, config: SyncConfig) -> Self {
        Self {
            config,
            packs: BTreeMap::new(),
            state,
            render,
            materialized: BTreeSet::new(),
            world: ProximityIndex::new(Layer::World),
            map: ProximityIndex::new(Layer::Map),
            triggers: Vec::new(),
            session_consumed: HashSet::new(),
            unknown_behaviors: HashSet::new(),
            telemetry: None,
            clock: Box::new(Utc::now),
            reload: None,
            pending: None,
        }
    }

    /// Replace the wall clock used for reset-period checks.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Engine tuning.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// User state store.
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Render collaborator.
    pub fn render(&self) -> &R {
        &self.render
    }

    /// A loaded pack.
    pub fn pack(&self, name: &str) -> Option<&PackStore> {
        self.packs.get(name)
    }

    /// Names of loaded packs, sorted.
    pub fn pack_names(&self) -> Vec<&str> {
        self.packs.keys().map(String::as_str).collect()
    }

    /// Categories currently materialized.
    pub fn materialized(&self) -> &BTreeSet<CategoryKey> {
        &self.materialized
    }

    /// Live trigger candidates.
    pub fn triggers(&self) -> &[TriggerCandidate] {
        &self.triggers
    }

    /// Last telemetry reading.
    pub fn telemetry(&self) -> Option<&TelemetrySnapshot> {
        self.telemetry.as_ref()
    }

    /// Whether a reload is running or queued.
    pub fn is_reloading(&self) -> bool {
        self.reload.is_some() || self.pending.is_some()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ── Packs ───────────────────────────────────────────────────────

    /// Open an existing pack file and add it.
    ///
    /// A pack with an unsupported schema fails here; other packs are
    /// unaffected.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_pack(&mut self, path: &Path) -> Result<String> {
        let pack = PackStore::open_existing(path)?;
        let name = pack.name().to_owned();
        self.add_pack(pack)?;
        Ok(name)
    }

    /// Add an opened pack and queue an incremental reload.
    pub fn add_pack(&mut self, pack: PackStore) -> Result<()> {
        let name = pack.name().to_owned();
        if self.packs.contains_key(&name) {
            return Err(EngineError::DuplicatePack(name));
        }
        info!(pack = %name, "pack loaded");
        let _ = self.packs.insert(name, pack);
        self.start_reload(false);
        Ok(())
    }

    /// Remove a pack and everything materialized from it.
    pub fn unload_pack(&mut self, name: &str) -> Option<PackStore> {
        let keys: Vec<_> = self
            .materialized
            .iter()
            .filter(|k| k.pack == name)
            .cloned()
            .collect();
        for key in &keys {
            self.drop_category(key);
        }
        let pack = self.packs.remove(name);
        if pack.is_some() {
            info!(pack = name, "pack unloaded");
        }
        if let Some(task) = self.reload.as_mut() {
            task.retain_packs(|p| p != name);
            debug!(pack = name, phase = ?task.phase(), "unloaded pack dropped from reload");
        }
        pack
    }

    // ── Reload driving ──────────────────────────────────────────────

    /// Start a reload, or queue it behind the one in flight.
    pub fn start_reload(&mut self, full: bool) {
        let kind = if full {
            ReloadKind::Full
        } else {
            ReloadKind::Incremental
        };
        if self.reload.is_some() {
            let queued = self.pending.map_or(kind, |p| p.merge(kind));
            debug!(requested = ?kind, queued = ?queued, "reload in flight, request queued");
            self.pending = Some(queued);
            return;
        }
        debug!(kind = ?kind, "reload started");
        self.reload = Some(ReloadTask::new(kind));
    }

    /// Run up to `max_steps` reload steps. Returns `true` once no reload is
    /// running or queued.
    pub fn poll_reload(&mut self, max_steps: usize) -> Result<bool> {
        for _ in 0..max_steps {
            let Some(mut task) = self.reload.take() else {
                match self.pending.take() {
                    Some(kind) => {
                        debug!(kind = ?kind, "starting queued reload");
                        self.reload = Some(ReloadTask::new(kind));
                        continue;
                    }
                    None => return Ok(true),
                }
            };
            task.step(self)?;
            if task.is_done() {
                debug!(
                    kind = ?task.kind(),
                    materialized = self.materialized.len(),
                    "reload complete"
                );
            } else {
                self.reload = Some(task);
            }
        }
        Ok(!self.is_reloading())
    }

    /// Start a reload and drive it, and anything queued, to completion.
    pub fn reload(&mut self, full: bool) -> Result<()> {
        self.start_reload(full);
        while !self.poll_reload(64)? {}
        Ok(())
    }

    /// Position of the reload in flight.
    pub fn reload_checkpoint(&self) -> Option<ReloadCheckpoint> {
        self.reload.as_ref().map(ReloadTask::checkpoint)
    }

    /// Pause the reload in flight and return its position. Queued requests
    /// stay queued; the live collections stay as the last step left them.
    pub fn suspend_reload(&mut self) -> Option<ReloadCheckpoint> {
        let task = self.reload.take()?;
        debug!(kind = ?task.kind(), phase = ?task.phase(), "reload suspended");
        Some(task.checkpoint())
    }

    /// Continue a reload from a checkpoint.
    pub fn resume_reload(&mut self, checkpoint: ReloadCheckpoint) -> Result<()> {
        if self.reload.is_some() {
            return Err(EngineError::InvalidState(
                "a reload is already in flight".into(),
            ));
        }
        let mut task = ReloadTask::resume(checkpoint);
        task.retain_packs(|p| self.packs.contains_key(p));
        self.reload = Some(task);
        Ok(())
    }

    // ── User actions ────────────────────────────────────────────────

    /// Set a category override and queue an incremental reload.
    pub fn set_category_active(&mut self, typeid: &str, active: bool) -> Result<()> {
        ActiveResolver::set_active(&self.state, typeid, active)?;
        self.start_reload(false);
        Ok(())
    }

    /// Drop a category override and queue an incremental reload.
    pub fn clear_category_override(&mut self, typeid: &str) -> Result<()> {
        let _ = ActiveResolver::clear_override(&self.state, typeid)?;
        self.start_reload(false);
        Ok(())
    }

    /// Record a telemetry reading. A new map instance or character queues a
    /// full reload.
    pub fn update_telemetry(&mut self, snapshot: TelemetrySnapshot) {
        let changed = self.telemetry.as_ref().is_none_or(|old| {
            old.instance_differs(&snapshot) || old.character != snapshot.character
        });
        if changed {
            info!(
                map_id = snapshot.map_id,
                shard_id = snapshot.shard_id,
                character = snapshot.character.as_deref().unwrap_or(""),
                "map instance changed"
            );
        }
        self.telemetry = Some(snapshot);
        if changed {
            self.start_reload(true);
        }
    }

    /// Live markers within `radius` of `point` on `layer`, nearest first.
    pub fn hover(&self, layer: Layer, point: Vec3, radius: f32) -> Vec<PrimitiveTag> {
        match layer {
            Layer::World => self.world.within(point, radius),
            Layer::Map => self.map.within(point, radius),
        }
    }

    /// Remove one marker from every live collection.
    pub fn remove_entry(&mut self, tag: &PrimitiveTag) {
        let _ = self.render.remove_tag(tag);
        self.world.remove_tag(tag);
        self.map.remove_tag(tag);
        self.triggers.retain(|c| &c.tag != tag);
    }

    pub(crate) fn session_consume(&mut self, guid: &str) {
        let _ = self.session_consumed.insert(guid.to_owned());
    }

    // ── Materialization ─────────────────────────────────────────────

    /// Materialize a category completely: markers, then every trail.
    pub fn materialize(&mut self, key: &CategoryKey) -> Result<()> {
        for id in self.materialize_markers(key)? {
            self.draw_trail(key, id)?;
        }
        Ok(())
    }

    /// Remove a category and, explicitly, all of its descendants from every
    /// live collection.
    pub fn dematerialize(&mut self, key: &CategoryKey) -> Result<()> {
        let mut stack = vec![key.clone()];
        while let Some(k) = stack.pop() {
            self.drop_category(&k);
            if let Some(pack) = self.packs.get(&k.pack) {
                for child in pack.children(Some(&k.typeid))? {
                    stack.push(CategoryKey::new(k.pack.clone(), child.typeid));
                }
            }
        }
        Ok(())
    }

    fn drop_category(&mut self, key: &CategoryKey) {
        let removed = self.render.remove_category(key);
        self.world.remove_category(key);
        self.map.remove_category(key);
        self.triggers.retain(|c| !c.tag.belongs_to(key));
        if self.materialized.remove(key) {
            debug!(category = %key, primitives = removed, "dematerialized");
        }
    }

    fn clear_live(&mut self) {
        self.render.clear();
        self.world.clear();
        self.map.clear();
        self.triggers.clear();
        self.materialized.clear();
    }

    fn stale_categories(&self) -> Result<Vec<CategoryKey>> {
        let mut stale = Vec::new();
        for key in &self.materialized {
            let active = match self.packs.get(&key.pack) {
                Some(pack) => ActiveResolver::is_active(pack, &self.state, &key.typeid, true)?,
                None => false,
            };
            if !active {
                stale.push(key.clone());
            }
        }
        Ok(stale)
    }

    fn scan_candidates(&self) -> Result<Vec<CategoryKey>> {
        let Some(snapshot) = &self.telemetry else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (name, pack) in &self.packs {
            for typeid in pack.categories_in_map(snapshot.map_id)? {
                let key = CategoryKey::new(name.clone(), typeid);
                if self.materialized.contains(&key) {
                    continue;
                }
                if ActiveResolver::is_active(pack, &self.state, &key.typeid, true)? {
                    out.push(key);
                }
            }
        }
        Ok(out)
    }

    /// Push a category's markers and return its trails on the current map.
    fn materialize_markers(&mut self, key: &CategoryKey) -> Result<Vec<i64>> {
        let pack = self
            .packs
            .get(&key.pack)
            .ok_or_else(|| EngineError::PackNotLoaded(key.pack.clone()))?;
        let Some(snapshot) = self.telemetry.as_ref() else {
            return Ok(Vec::new());
        };
        let now = self.now();
        let category = pack.effective_category_properties(&key.typeid)?;

        let mut pushed = 0_usize;
        for row in pack.markers_in_map(&key.typeid, snapshot.map_id)? {
            let props = merge(&category, pack.properties(PropOwner::Marker(row.id))?);
            let view = MarkerView::resolve(&props);

            let trigger = match (&view.guid, view.behavior) {
                (Some(guid), BehaviorCode::Known(behavior)) => {
                    if is_consumed(
                        &self.state,
                        &self.session_consumed,
                        Some(snapshot),
                        guid,
                        behavior,
                        now,
                    )? {
                        debug!(category = %key, guid = %guid, "marker consumed, skipped");
                        continue;
                    }
                    Some((guid.clone(), behavior))
                }
                (_, BehaviorCode::Unknown(code)) => {
                    if self.unknown_behaviors.insert(code) {
                        debug!(code, "unknown behavior code, treated as never consumed");
                    }
                    None
                }
                _ => None,
            };

            let texture = ensure_texture(
                &mut self.render,
                pack,
                &self.config.placeholder_texture,
                key,
                view.icon.as_deref(),
            )?;
            let tag = PrimitiveTag::marker(key, row.id);
            let sprite = Sprite {
                tag: tag.clone(),
                position: view.position,
                texture,
                size: self.config.marker_size * view.icon_size,
                color: view.color,
                alpha: view.alpha,
            };

            if view.in_game {
                self.render.add_sprite(Layer::World, sprite.clone());
                self.world.insert(tag.clone(), view.position);
            }
            if self.config.map_mirroring && (view.on_map || view.on_minimap) {
                self.render.add_sprite(Layer::Map, sprite);
                self.map.insert(tag.clone(), view.position);
            }
            if let Some((guid, behavior)) = trigger {
                let radius = view
                    .trigger_range
                    .unwrap_or(self.config.default_trigger_range);
                self.triggers.push(TriggerCandidate {
                    tag,
                    guid,
                    behavior,
                    position: view.position,
                    radius_sq: radius * radius,
                });
            }
            pushed += 1;
        }

        let trails = pack
            .trails_in_map(&key.typeid, snapshot.map_id)?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let _ = self.materialized.insert(key.clone());
        debug!(category = %key, markers = pushed, "materialized markers");
        Ok(trails)
    }

    fn draw_trail(&mut self, key: &CategoryKey, id: i64) -> Result<()> {
        let pack = self
            .packs
            .get(&key.pack)
            .ok_or_else(|| EngineError::PackNotLoaded(key.pack.clone()))?;
        if pack.trail(id)?.is_none() {
            warn!(category = %key, trail = id, "trail vanished before drawing");
            return Ok(());
        }
        let category = pack.effective_category_properties(&key.typeid)?;
        let view = TrailView::resolve(&merge(&category, pack.properties(PropOwner::Trail(id))?));
        let texture = ensure_texture(
            &mut self.render,
            pack,
            &self.config.placeholder_texture,
            key,
            view.texture.as_deref(),
        )?;
        let tag = PrimitiveTag::trail(key, id);

        for points in split_segments(&pack.trail_coords(id)?) {
            let line = Polyline {
                tag: tag.clone(),
                points,
                texture: texture.clone(),
                width: self.config.trail_size * view.scale,
                color: view.color,
                alpha: view.alpha,
            };
            if view.in_game {
                self.render.add_polyline(Layer::World, line.clone());
            }
            if self.config.map_mirroring && view.on_map {
                self.render.add_polyline(Layer::Map, line);
            }
        }
        Ok(())
    }
}

/// Texture cache key for `path`, loading it from the pack on a miss. Falls
/// back to the placeholder when the data is missing or unusable.
fn ensure_texture<R: RenderSink>(
    render: &mut R,
    pack: &PackStore,
    placeholder: &str,
    key: &CategoryKey,
    path: Option<&str>,
) -> Result<String> {
    let Some(path) = path else {
        return Ok(placeholder.to_owned());
    };
    let name = format!("{}/{path}", pack.name());
    if render.has_texture(&name) {
        return Ok(name);
    }
    match pack.data_file(path)? {
        Some(bytes) if render.load_texture(&name, &bytes) => Ok(name),
        Some(_) => {
            error!(pack = %key.pack, category = %key.typeid, path, "texture undecodable, using placeholder");
            Ok(placeholder.to_owned())
        }
        None => {
            error!(pack = %key.pack, category = %key.typeid, path, "texture data file missing, using placeholder");
            Ok(placeholder.to_owned())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
