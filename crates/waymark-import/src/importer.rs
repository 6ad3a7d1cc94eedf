//! Resumable bulk import.
//!
//! [`ImportTask`] is an explicit state machine. Each [`step`](ImportTask::step)
//! performs one bounded slice of work (at most `batch_size` elements), so a
//! caller can interleave an import with other work. All writes land in one
//! bulk transaction on the [`PackStore`]: foreign keys are off while it is
//! open, and an integrity scan after the commit reports orphaned markers and
//! trails without removing them.
//!
//! Element-level problems never abort the import. A category without a name
//! skips its subtree, a POI without `type`/`MapID` is skipped, a missing icon
//! or texture is logged at error level and counted, an unparseable attribute
//! value is logged and the property omitted.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use waymark_core::{PropValue, typeid};
use waymark_store::{PackStore, PropOwner};

use crate::archive::ArchiveSource;
use crate::attributes;
use crate::errors::{ImportError, Result};
use crate::trail_data::decode_trail;
use crate::xml::{Element, parse_document};

/// Default number of elements per step.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Counters accumulated over an import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Documents fully processed, skipped ones excluded.
    pub documents: usize,
    /// `MarkerCategory` elements written.
    pub categories: usize,
    /// Markers written.
    pub markers: usize,
    /// Trails written.
    pub trails: usize,
    /// Data files copied into the pack.
    pub data_files: usize,
    /// Documents or elements skipped as unusable.
    pub skipped: usize,
    /// Referenced files not present in the source.
    pub missing_files: usize,
    /// Markers and trails left referencing a missing category.
    pub orphans: usize,
}

/// Where a task is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    /// Nothing done yet.
    Begin,
    /// Walking documents.
    Documents,
    /// All documents done; commit and scan pending.
    Finish,
    /// Committed.
    Done,
}

/// Progress reported by [`ImportTask::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportStatus {
    /// More work remains.
    Running {
        /// Documents finished so far, skipped ones included.
        done: usize,
        /// Root documents in the source.
        total: usize,
    },
    /// The import committed.
    Complete(ImportReport),
}

/// Serializable position of a suspended import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCheckpoint {
    /// Document list captured when the task began.
    pub documents: Vec<String>,
    /// Index of the document being processed.
    pub doc_index: usize,
    /// Elements of that document already processed.
    pub item_index: usize,
    /// Lifecycle phase.
    pub phase: ImportPhase,
    /// Counters so far.
    pub report: ImportReport,
}

/// One unit of import work, flattened out of a document.
#[derive(Clone, Debug)]
enum Item {
    Category { typeid: String, element: Element },
    Poi(Element),
    Trail(Element),
}

/// Resumable import of one source into one pack.
#[derive(Debug)]
pub struct ImportTask {
    batch_size: usize,
    phase: ImportPhase,
    documents: Vec<String>,
    doc_index: usize,
    item_index: usize,
    current: Option<(String, Vec<Item>)>,
    report: ImportReport,
}

impl ImportTask {
    /// A fresh task. `batch_size` is clamped to at least 1.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            phase: ImportPhase::Begin,
            documents: Vec::new(),
            doc_index: 0,
            item_index: 0,
            current: None,
            report: ImportReport::default(),
        }
    }

    /// Rebuild a task from a checkpoint taken by [`suspend`](Self::suspend).
    pub fn resume(checkpoint: ImportCheckpoint, batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            phase: checkpoint.phase,
            documents: checkpoint.documents,
            doc_index: checkpoint.doc_index,
            item_index: checkpoint.item_index,
            current: None,
            report: checkpoint.report,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    /// Counters so far.
    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    /// Current position.
    pub fn checkpoint(&self) -> ImportCheckpoint {
        ImportCheckpoint {
            documents: self.documents.clone(),
            doc_index: self.doc_index,
            item_index: self.item_index,
            phase: self.phase,
            report: self.report.clone(),
        }
    }

    /// Commit what has been written so far and return the position.
    ///
    /// The work up to the checkpoint is durable; resuming reopens a bulk
    /// transaction and continues after it.
    pub fn suspend(self, pack: &mut PackStore) -> Result<ImportCheckpoint> {
        if pack.in_bulk() {
            pack.commit_bulk()?;
        }
        info!(
            pack = pack.name(),
            doc_index = self.doc_index,
            item_index = self.item_index,
            "import suspended"
        );
        Ok(self.checkpoint())
    }

    /// Roll back everything written since the bulk transaction opened.
    pub fn abort(self, pack: &mut PackStore) -> Result<()> {
        if pack.in_bulk() {
            pack.rollback_bulk()?;
        }
        warn!(pack = pack.name(), "import aborted");
        Ok(())
    }

    /// Step until the import completes.
    #[instrument(skip_all, fields(source = source.name(), pack = pack.name()))]
    pub fn run_to_completion(
        mut self,
        source: &mut dyn ArchiveSource,
        pack: &mut PackStore,
    ) -> Result<ImportReport> {
        loop {
            if let ImportStatus::Complete(report) = self.step(source, pack)? {
                return Ok(report);
            }
        }
    }

    /// Perform one slice of work.
    pub fn step(
        &mut self,
        source: &mut dyn ArchiveSource,
        pack: &mut PackStore,
    ) -> Result<ImportStatus> {
        match self.phase {
            ImportPhase::Begin => {
                if !pack.in_bulk() {
                    pack.begin_bulk()?;
                }
                self.documents = source.documents();
                self.phase = ImportPhase::Documents;
                info!(
                    source = source.name(),
                    documents = self.documents.len(),
                    "import started"
                );
            }
            ImportPhase::Documents => {
                if !pack.in_bulk() {
                    pack.begin_bulk()?;
                }
                self.step_documents(source, pack)?;
            }
            ImportPhase::Finish => return self.finish(pack).map(ImportStatus::Complete),
            ImportPhase::Done => {
                return Err(ImportError::InvalidState("import already complete".into()));
            }
        }
        Ok(ImportStatus::Running {
            done: self.doc_index,
            total: self.documents.len(),
        })
    }

    fn step_documents(&mut self, source: &mut dyn ArchiveSource, pack: &PackStore) -> Result<()> {
        let mut budget = self.batch_size;
        while budget > 0 {
            let Some(doc_name) = self.documents.get(self.doc_index).cloned() else {
                self.phase = ImportPhase::Finish;
                return Ok(());
            };

            if self.current.is_none() {
                budget -= 1;
                match load_items(source, &doc_name)? {
                    Some(items) => self.current = Some((doc_name, items)),
                    None => {
                        self.report.skipped += 1;
                        self.next_document();
                    }
                }
                continue;
            }

            let Some((doc, items)) = self.current.as_ref() else {
                continue;
            };
            let Some(item) = items.get(self.item_index).cloned() else {
                self.report.documents += 1;
                self.next_document();
                continue;
            };
            let doc = doc.clone();
            self.apply(source, pack, &doc, item)?;
            self.item_index += 1;
            budget -= 1;
        }
        Ok(())
    }

    fn next_document(&mut self) {
        self.current = None;
        self.doc_index += 1;
        self.item_index = 0;
    }

    fn finish(&mut self, pack: &mut PackStore) -> Result<ImportReport> {
        if pack.in_bulk() {
            pack.commit_bulk()?;
        }
        let orphans = pack.integrity_scan()?;
        for o in &orphans {
            warn!(kind = ?o.kind, id = o.id, typeid = %o.typeid, "orphaned entry after import");
        }
        self.report.orphans = orphans.len();
        self.phase = ImportPhase::Done;
        let r = &self.report;
        info!(
            pack = pack.name(),
            documents = r.documents,
            categories = r.categories,
            markers = r.markers,
            trails = r.trails,
            data_files = r.data_files,
            skipped = r.skipped,
            missing_files = r.missing_files,
            orphans = r.orphans,
            "import complete"
        );
        Ok(self.report.clone())
    }

    // ── Element handlers ────────────────────────────────────────────

    fn apply(
        &mut self,
        source: &mut dyn ArchiveSource,
        pack: &PackStore,
        doc: &str,
        item: Item,
    ) -> Result<()> {
        match item {
            Item::Category { typeid, element } => {
                let _ = pack.category(&typeid, true)?;
                self.write_properties(
                    source,
                    pack,
                    doc,
                    PropOwner::Category(&typeid),
                    &element,
                    &["name", "bh-name"],
                )?;
                self.report.categories += 1;
            }
            Item::Poi(element) => self.apply_poi(source, pack, doc, &element)?,
            Item::Trail(element) => self.apply_trail(source, pack, doc, &element)?,
        }
        Ok(())
    }

    fn apply_poi(
        &mut self,
        source: &mut dyn ArchiveSource,
        pack: &PackStore,
        doc: &str,
        el: &Element,
    ) -> Result<()> {
        let Some(typeid) = el.attr("type").and_then(typeid::normalize) else {
            warn!(document = doc, line = el.line, "POI without a usable type, skipped");
            self.report.skipped += 1;
            return Ok(());
        };
        let Some(mapid) = el
            .attr("mapid")
            .and_then(|raw| attributes::convert("mapid", raw))
            .and_then(|v| v.as_i64())
            .and_then(|v| u32::try_from(v).ok())
        else {
            warn!(document = doc, line = el.line, typeid = %typeid, "POI without a usable MapID, skipped");
            self.report.skipped += 1;
            return Ok(());
        };

        let id = pack.new_marker(&typeid, mapid)?;
        self.write_properties(source, pack, doc, PropOwner::Marker(id), el, &["type", "mapid"])?;
        self.report.markers += 1;
        Ok(())
    }

    fn apply_trail(
        &mut self,
        source: &mut dyn ArchiveSource,
        pack: &PackStore,
        doc: &str,
        el: &Element,
    ) -> Result<()> {
        let Some(typeid) = el.attr("type").and_then(typeid::normalize) else {
            warn!(document = doc, line = el.line, "Trail without a usable type, skipped");
            self.report.skipped += 1;
            return Ok(());
        };
        let Some(path) = el
            .attr("traildata")
            .map(waymark_store::normalize_path)
            .filter(|p| !p.is_empty())
        else {
            warn!(document = doc, line = el.line, typeid = %typeid, "Trail without traildata, skipped");
            self.report.skipped += 1;
            return Ok(());
        };

        let Some(bytes) = source.read(&path)? else {
            error!(document = doc, line = el.line, path = %path, "trail data file missing");
            self.report.missing_files += 1;
            self.report.skipped += 1;
            return Ok(());
        };
        let data = match decode_trail(&bytes) {
            Ok(data) => data,
            Err(e) => {
                let err = ImportError::TrailData { path, source: e };
                warn!(document = doc, line = el.line, error = %err, "trail skipped");
                self.report.skipped += 1;
                return Ok(());
            }
        };

        let id = pack.new_trail(&typeid, data.mapid)?;
        pack.set_trail_coords(id, &data.points)?;
        self.write_properties(source, pack, doc, PropOwner::Trail(id), el, &["type"])?;
        self.report.trails += 1;
        Ok(())
    }

    fn write_properties(
        &mut self,
        source: &mut dyn ArchiveSource,
        pack: &PackStore,
        doc: &str,
        owner: PropOwner<'_>,
        el: &Element,
        exclude: &[&str],
    ) -> Result<()> {
        for (raw_name, raw_value) in &el.attributes {
            let name = raw_name.to_lowercase();
            if exclude.contains(&name.as_str()) {
                continue;
            }
            let Some(value) = attributes::convert(&name, raw_value) else {
                warn!(
                    document = doc,
                    line = el.line,
                    attribute = %name,
                    value = %raw_value,
                    "unparseable attribute value, property omitted"
                );
                continue;
            };
            if attributes::is_data_file(&name) {
                if let PropValue::Text(path) = &value {
                    self.copy_data_file(source, pack, doc, el.line, path)?;
                }
            }
            pack.set_property(owner, &name, Some(&value))?;
        }
        Ok(())
    }

    fn copy_data_file(
        &mut self,
        source: &mut dyn ArchiveSource,
        pack: &PackStore,
        doc: &str,
        line: u32,
        path: &str,
    ) -> Result<()> {
        if pack.has_data_file(path)? {
            return Ok(());
        }
        match source.read(path)? {
            Some(bytes) => {
                if pack.put_data_file(path, &bytes)? {
                    self.report.data_files += 1;
                }
            }
            None => {
                error!(document = doc, line, path, "referenced data file missing");
                self.report.missing_files += 1;
            }
        }
        Ok(())
    }
}

impl Default for ImportTask {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

/// Read, parse and flatten a document. `None` when it is unusable.
fn load_items(source: &mut dyn ArchiveSource, name: &str) -> Result<Option<Vec<Item>>> {
    let Some(bytes) = source.read(name)? else {
        warn!(document = name, "document vanished from source, skipped");
        return Ok(None);
    };
    let doc = match parse_document(name, &bytes) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(document = name, error = %err, "document skipped");
            return Ok(None);
        }
    };
    if !doc.root.is("OverlayData") {
        warn!(document = name, root = %doc.root.name, "root is not OverlayData, skipped");
        return Ok(None);
    }

    let mut items = Vec::new();
    for child in &doc.root.children {
        if child.is("MarkerCategory") {
            flatten_category(name, child, None, &mut items);
        } else if child.is("POIs") {
            for el in &child.children {
                if el.is("POI") {
                    items.push(Item::Poi(el.clone()));
                } else if el.is("Trail") {
                    items.push(Item::Trail(el.clone()));
                }
            }
        }
    }
    Ok(Some(items))
}

fn flatten_category(doc: &str, el: &Element, parent: Option<&str>, out: &mut Vec<Item>) {
    let Some(name) = el
        .attr("name")
        .or_else(|| el.attr("bh-name"))
        .and_then(typeid::normalize)
    else {
        warn!(document = doc, line = el.line, "MarkerCategory without a name, subtree skipped");
        return;
    };
    let typeid = typeid::join(parent, &name);
    let element = Element {
        children: Vec::new(),
        ..el.clone()
    };
    out.push(Item::Category {
        typeid: typeid.clone(),
        element,
    });
    for child in el.children_named("MarkerCategory") {
        flatten_category(doc, child, Some(&typeid), out);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
