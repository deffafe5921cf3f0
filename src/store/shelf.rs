//! Shelf Store
//!
//! The one authoritative store: grids, items and the drag gesture, loaded from
//! a `StorageAdapter` and mirrored back to it after every mutation.
//!
//! Mutators change in-memory state synchronously and only then await the
//! write. A failed write leaves memory as it is and queues a warning notice.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelf_dragdrop::{DndState, DropOutcome};

use crate::config::ShelfConfig;
use crate::domain::{
    DomainError, DomainResult, Entity, Grid, GridId, GridPatch, GridSpec, Item, ItemId, ItemPatch,
    ItemPayload, ItemSpec, Slot,
};
use crate::engine::placement::{self, Placement, SlotRef};
use crate::engine::resize::{self, ResizeReport};
use crate::notice::Notice;
use crate::repository::{StorageAdapter, UsageStats};

use super::grid_store::GridStore;
use super::item_store::ItemStore;

/// Serializable view of the whole shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfSnapshot {
    pub grids: Vec<Grid>,
    pub items: Vec<Item>,
    pub active_grid: Option<GridId>,
}

/// What a drop event did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DropResult {
    /// Duplicate event inside the debounce window
    Debounced,
    /// No drag in progress or the target vanished
    Ignored,
    /// A new item was created from a dropped payload
    Created { item: ItemId },
    Placed { placement: Placement },
}

#[derive(Debug, Clone, Copy)]
enum Section {
    Grids,
    Items,
    ActiveGrid,
}

const ALL_SECTIONS: [Section; 3] = [Section::Grids, Section::Items, Section::ActiveGrid];

pub struct ShelfStore {
    grids: GridStore,
    items: ItemStore,
    dnd: DndState<ItemId, SlotRef>,
    notices: Vec<Notice>,
    storage: Arc<dyn StorageAdapter>,
    config: ShelfConfig,
}

impl ShelfStore {
    // ========================
    // Lifecycle
    // ========================

    /// Read persisted state, repair it and write the repaired state back
    pub async fn load(storage: Arc<dyn StorageAdapter>, config: ShelfConfig) -> Self {
        let mut notices = Vec::new();
        let (grids, skipped_grid_id): (Vec<Grid>, _) =
            read_collection(storage.as_ref(), &config.grids_key(), "shelves", &mut notices).await;
        let (items, skipped_item_id): (Vec<Item>, _) =
            read_collection(storage.as_ref(), &config.items_key(), "items", &mut notices).await;
        let active: Option<GridId> = storage
            .get(&config.active_grid_key())
            .await
            .and_then(|value| serde_json::from_value(value).ok());

        let stored = (grids.clone(), items.clone(), active);
        let grids = repair_grids(grids, &config);
        let items = repair_items(items, &grids);

        let mut grid_store = GridStore::from_parts(grids, active);
        let mut item_store = ItemStore::from_items(items);
        // unreadable records keep their ids
        if let Some(id) = skipped_grid_id {
            grid_store.reserve_ids(id);
        }
        if let Some(id) = skipped_item_id {
            item_store.reserve_ids(id);
        }

        let mut store = Self {
            grids: grid_store,
            items: item_store,
            dnd: DndState::new(config.dnd()),
            notices,
            storage,
            config,
        };
        if store.grids.is_empty() {
            store.create_default_grid();
        }

        let repaired = store.grids.list() != stored.0.as_slice()
            || store.items.list() != stored.1.as_slice()
            || store.grids.active() != stored.2;
        if repaired {
            log::info!("writing repaired shelf state back to storage");
            store.persist(&ALL_SECTIONS).await;
        }

        log::info!(
            "shelf loaded: {} grids, {} items",
            store.grids.len(),
            store.items.len()
        );
        store
    }

    /// Drop everything and start over with the default grid
    pub async fn reset(&mut self) {
        for key in [
            self.config.grids_key(),
            self.config.items_key(),
            self.config.active_grid_key(),
        ] {
            if !self.storage.remove(&key).await {
                log::warn!("failed to remove {}", key);
            }
        }

        self.grids = GridStore::new();
        self.items = ItemStore::new();
        self.dnd.end_drag();
        self.create_default_grid();
        log::info!("shelf reset");
        self.persist(&ALL_SECTIONS).await;
    }

    /// Give the storage back; pending notices are discarded
    pub fn teardown(self) -> Arc<dyn StorageAdapter> {
        if !self.notices.is_empty() {
            log::debug!("dropping {} undelivered notices", self.notices.len());
        }
        self.storage
    }

    fn create_default_grid(&mut self) {
        let spec = self.config.default_grid.to_spec();
        if let Err(e) = self.grids.create(spec, &self.config.limits()) {
            log::error!("default grid is invalid ({}), falling back to 1x1", e);
            let grid = Grid::new(
                GridId(1),
                self.config.default_grid.name.clone(),
                1,
                1,
                self.config.default_grid.kind,
            );
            self.grids = GridStore::from_parts(vec![grid], None);
        }
    }

    // ========================
    // Queries
    // ========================

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    pub fn grids(&self) -> &[Grid] {
        self.grids.list()
    }

    pub fn grid(&self, id: GridId) -> Option<&Grid> {
        self.grids.get(id)
    }

    pub fn active_grid(&self) -> Option<GridId> {
        self.grids.active()
    }

    pub fn items(&self) -> &[Item] {
        self.items.list()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn items_for_grid(&self, grid_id: GridId) -> Vec<&Item> {
        self.items.for_grid(grid_id).collect()
    }

    pub fn find_by_position(&self, grid_id: GridId, position: usize) -> Option<&Item> {
        self.items.find_by_position(grid_id, position)
    }

    pub fn snapshot(&self) -> ShelfSnapshot {
        ShelfSnapshot {
            grids: self.grids.list().to_vec(),
            items: self.items.list().to_vec(),
            active_grid: self.grids.active(),
        }
    }

    pub async fn usage(&self) -> UsageStats {
        self.storage.usage_stats().await
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ========================
    // Grids
    // ========================

    pub async fn create_grid(&mut self, spec: GridSpec) -> DomainResult<GridId> {
        let result = self.grids.create(spec, &self.config.limits());
        let id = self.report(result)?;
        log::info!("created grid {}", id);
        self.persist(&[Section::Grids, Section::ActiveGrid]).await;
        Ok(id)
    }

    /// Merge name/kind/style and step rows/columns through the resize engine
    pub async fn update_grid(&mut self, id: GridId, patch: GridPatch) -> DomainResult<ResizeReport> {
        let result = self.apply_grid_patch(id, patch);
        let report = self.report(result)?;
        self.persist(&[Section::Grids, Section::Items]).await;
        Ok(report)
    }

    fn apply_grid_patch(&mut self, id: GridId, patch: GridPatch) -> DomainResult<ResizeReport> {
        let limits = self.config.limits();
        let grid = self.grids.require(id)?;
        let rows = patch.rows.unwrap_or(grid.rows);
        let columns = patch.columns.unwrap_or(grid.columns);
        limits.check(rows, columns)?;

        if let Some(kind) = patch.kind {
            if let Some(item) = self
                .items
                .for_grid(id)
                .find(|i| i.is_visible() && !kind.accepts(i.kind()))
            {
                return Err(DomainError::InvalidInput(format!(
                    "A {} shelf cannot hold the {} in slot {}",
                    kind.as_str(),
                    item.kind().as_str(),
                    item.position
                )));
            }
        }

        self.grids.update_meta(id, patch.name, patch.kind, patch.style)?;
        let grid = self
            .grids
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("Grid {}", id)))?;
        let report = resize::resize_to(grid, self.items.items_mut(), rows, columns, &limits)?;
        self.check_invariants();
        Ok(report)
    }

    /// Delete a grid and every item on it
    pub async fn delete_grid(&mut self, id: GridId) -> DomainResult<()> {
        let result = self.grids.remove(id);
        self.report(result)?;
        let removed = self.items.remove_grid(id);
        log::info!("deleted grid {} with {} items", id, removed.len());
        self.persist(&ALL_SECTIONS).await;
        Ok(())
    }

    pub async fn set_active_grid(&mut self, id: GridId) -> DomainResult<()> {
        let result = self.grids.set_active(id);
        self.report(result)?;
        self.persist(&[Section::ActiveGrid]).await;
        Ok(())
    }

    // ========================
    // Resize
    // ========================

    pub async fn add_row(&mut self, grid_id: GridId) -> DomainResult<ResizeReport> {
        let limits = self.config.limits();
        self.resize(grid_id, |grid, items| resize::add_row(grid, items, &limits))
            .await
    }

    pub async fn remove_row(&mut self, grid_id: GridId) -> DomainResult<ResizeReport> {
        self.resize(grid_id, resize::remove_row).await
    }

    pub async fn add_column(&mut self, grid_id: GridId) -> DomainResult<ResizeReport> {
        let limits = self.config.limits();
        self.resize(grid_id, |grid, items| resize::add_column(grid, items, &limits))
            .await
    }

    pub async fn remove_column(&mut self, grid_id: GridId) -> DomainResult<ResizeReport> {
        self.resize(grid_id, resize::remove_column).await
    }

    async fn resize<F>(&mut self, grid_id: GridId, step: F) -> DomainResult<ResizeReport>
    where
        F: FnOnce(&mut Grid, &mut [Item]) -> DomainResult<ResizeReport>,
    {
        let result = match self.grids.get_mut(grid_id) {
            Some(grid) => step(grid, self.items.items_mut()),
            None => Err(DomainError::NotFound(format!("Grid {}", grid_id))),
        };
        let report = self.report(result)?;
        self.check_invariants();
        if let Some(grid) = self.grids.get(grid_id) {
            log::info!(
                "grid {} is now {}x{} ({} hidden, {} restored)",
                grid_id,
                grid.rows,
                grid.columns,
                report.hidden.len(),
                report.restored.len()
            );
        }
        // grid and items go out together
        self.persist(&[Section::Grids, Section::Items]).await;
        Ok(report)
    }

    // ========================
    // Items
    // ========================

    pub async fn add_item(&mut self, spec: ItemSpec) -> DomainResult<ItemId> {
        let result = match self.grids.require(spec.grid_id) {
            Ok(grid) => self.items.add(grid, spec.slot, spec.payload),
            Err(e) => Err(e),
        };
        let id = self.report(result)?;
        self.check_invariants();
        log::debug!("added item {} to grid {}", id, spec.grid_id);
        self.persist(&[Section::Items]).await;
        Ok(id)
    }

    pub async fn update_item(&mut self, id: ItemId, patch: ItemPatch) -> DomainResult<()> {
        let result = self.items.update(id, patch, &self.grids);
        self.report(result)?;
        self.check_invariants();
        self.persist(&[Section::Items]).await;
        Ok(())
    }

    /// Returns false when the item did not exist
    pub async fn delete_item(&mut self, id: ItemId) -> bool {
        if self.items.remove(id).is_none() {
            log::warn!("delete of unknown item {} ignored", id);
            return false;
        }
        if self.dnd.dragging() == Some(id) {
            self.dnd.end_drag();
        }
        self.persist(&[Section::Items]).await;
        true
    }

    // ========================
    // Drag and drop
    // ========================

    pub fn dragging(&self) -> Option<ItemId> {
        self.dnd.dragging()
    }

    /// Slot the pointer is over during a drag
    pub fn hovered(&self) -> Option<SlotRef> {
        self.dnd.drop_target()
    }

    /// Pointer pressed on an item; dragging starts past the threshold
    pub fn press(&mut self, id: ItemId, x: i32, y: i32) {
        match self.items.get(id) {
            Some(item) if item.is_visible() => self.dnd.press(id, x, y),
            _ => log::warn!("press on unknown or hidden item {}", id),
        }
    }

    /// Returns true when this move started the drag
    pub fn pointer_move(&mut self, x: i32, y: i32, now: Instant) -> bool {
        let started = self.dnd.pointer_move(x, y, now);
        if started {
            log::debug!("drag started for {:?}", self.dnd.dragging());
        }
        started
    }

    /// Start dragging right away (native drag start)
    pub fn begin_drag(&mut self, id: ItemId, now: Instant) {
        match self.items.get(id) {
            Some(item) if item.is_visible() => self.dnd.begin(id, now),
            _ => log::warn!("drag start on unknown or hidden item {}", id),
        }
    }

    pub fn hover(&mut self, target: SlotRef) {
        self.dnd.hover(target);
    }

    pub fn leave(&mut self) {
        self.dnd.leave();
    }

    /// Pointer released: the dragged item goes to the hovered slot.
    /// A plain click or a release outside any slot is ignored.
    pub async fn release(&mut self, now: Instant) -> DomainResult<DropResult> {
        match self.dnd.release(now) {
            Some((dragged, target)) => self.place(dragged, target).await,
            None => Ok(DropResult::Ignored),
        }
    }

    pub fn end_drag(&mut self) {
        self.dnd.end_drag();
    }

    /// Abandon the gesture without placing anything
    pub fn cancel_drag(&mut self) {
        if let Some(id) = self.dnd.dragging() {
            log::debug!("drag of {} cancelled", id);
        }
        self.dnd.cancel();
    }

    /// Clear a drag that outlived the safety timeout
    pub fn expire_drag(&mut self, now: Instant) -> bool {
        self.dnd.expire(now)
    }

    /// Handle a drop on `target`.
    /// A `payload` creates a new item there (or on the first empty slot);
    /// otherwise the dragged item is moved or swapped.
    pub async fn drop_at(
        &mut self,
        target: SlotRef,
        payload: Option<ItemPayload>,
        now: Instant,
    ) -> DomainResult<DropResult> {
        let dragged = match self.dnd.drop(now) {
            DropOutcome::Debounced => return Ok(DropResult::Debounced),
            DropOutcome::Accepted(dragged) => dragged,
        };

        if let Some(payload) = payload {
            let Some(grid) = self.grids.get(target.grid_id) else {
                log::warn!("payload dropped on unknown grid {}", target.grid_id);
                return Ok(DropResult::Ignored);
            };
            let free = grid.contains(target.position)
                && self.items.find_by_position(target.grid_id, target.position).is_none();
            let slot = if free {
                Slot::At(target.position)
            } else {
                Slot::FirstEmpty
            };
            let spec = ItemSpec {
                grid_id: target.grid_id,
                slot,
                payload,
            };
            let item = self.add_item(spec).await?;
            return Ok(DropResult::Created { item });
        }

        let Some(dragged) = dragged else {
            log::debug!("drop without a drag in progress");
            return Ok(DropResult::Ignored);
        };
        self.place(dragged, target).await
    }

    /// Move or swap `dragged` onto `target`
    async fn place(&mut self, dragged: ItemId, target: SlotRef) -> DomainResult<DropResult> {
        let placement = match placement::resolve_drop(&self.grids, &self.items, dragged, target) {
            Ok(placement) => placement,
            Err(DomainError::NotFound(msg)) => {
                log::warn!("drop ignored: {} not found", msg);
                return Ok(DropResult::Ignored);
            }
            Err(e) => return self.report(Err(e)),
        };

        placement::apply(&mut self.items, &placement);
        self.check_invariants();
        log::debug!("drop resolved: {:?}", placement);
        if !matches!(placement, Placement::Stay { .. }) {
            self.persist(&[Section::Items]).await;
        }
        Ok(DropResult::Placed { placement })
    }

    // ========================
    // Internals
    // ========================

    /// Log a failed operation and queue a notice for the user-facing ones
    fn report<T>(&mut self, result: DomainResult<T>) -> DomainResult<T> {
        if let Err(err) = &result {
            match err {
                DomainError::NotFound(_) => log::warn!("{}", err),
                _ if err.is_user_facing() => {
                    log::info!("refused: {}", err);
                    self.notices.push(Notice::from(err));
                }
                _ => {
                    log::error!("{}", err);
                    self.notices.push(Notice::from(err));
                }
            }
        }
        result
    }

    /// Every visible item sits inside an existing grid and no two share a slot
    pub fn validate(&self) -> Result<(), String> {
        self.items.check_invariants()?;
        for item in self.items.list().iter().filter(|i| i.is_visible()) {
            match self.grids.get(item.grid_id) {
                Some(grid) if grid.contains(item.position) => {}
                Some(_) => {
                    return Err(format!(
                        "Item {} is outside grid {} at position {}",
                        item.id, item.grid_id, item.position
                    ))
                }
                None => {
                    return Err(format!(
                        "Item {} belongs to missing grid {}",
                        item.id, item.grid_id
                    ))
                }
            }
        }
        Ok(())
    }

    fn check_invariants(&self) {
        debug_assert!(self.validate().is_ok(), "{:?}", self.validate());
    }

    fn section_entry(&self, section: Section) -> Result<(String, Value), serde_json::Error> {
        Ok(match section {
            Section::Grids => (
                self.config.grids_key(),
                serde_json::to_value(self.grids.list())?,
            ),
            Section::Items => (
                self.config.items_key(),
                serde_json::to_value(self.items.list())?,
            ),
            Section::ActiveGrid => (
                self.config.active_grid_key(),
                serde_json::to_value(self.grids.active())?,
            ),
        })
    }

    /// Write the given sections in one `set_many` call
    async fn persist(&mut self, sections: &[Section]) {
        let mut entries = Vec::with_capacity(sections.len());
        for section in sections {
            match self.section_entry(*section) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::error!("failed to serialize {:?}: {}", section, e);
                    self.notices
                        .push(Notice::error("Could not save changes"));
                    return;
                }
            }
        }

        if !self.storage.set_many(&entries).await {
            log::warn!("failed to persist {:?}", sections);
            self.notices.push(Notice::warning(
                "Could not save changes: storage is full or unavailable",
            ));
            return;
        }

        let usage = self.storage.usage_stats().await;
        if usage.percent >= self.config.storage_warning_percent {
            log::warn!("storage usage at {:.1}%", usage.percent);
            self.notices.push(Notice::info(format!(
                "Storage is {:.0}% full",
                usage.percent
            )));
        }
    }
}

/// Read a JSON array record by record.
/// Records that do not decode are skipped with a notice; the largest id among
/// them is returned so new records never reuse it.
async fn read_collection<T: DeserializeOwned>(
    storage: &dyn StorageAdapter,
    key: &str,
    label: &str,
    notices: &mut Vec<Notice>,
) -> (Vec<T>, Option<u32>) {
    let Some(raw) = storage.get_raw(key).await else {
        return (Vec::new(), None);
    };
    let values: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(e) => {
            log::warn!("discarding malformed {} at {}: {}", label, key, e);
            notices.push(Notice::warning(format!(
                "Saved {} could not be read and were reset",
                label
            )));
            return (Vec::new(), None);
        }
    };

    let mut records = Vec::with_capacity(values.len());
    let mut skipped = 0;
    let mut skipped_id: Option<u32> = None;
    for value in values {
        let id = value
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok());
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!("skipping unreadable record {:?} in {}: {}", id, key, e);
                skipped += 1;
                skipped_id = skipped_id.max(id);
            }
        }
    }
    if skipped > 0 {
        notices.push(Notice::warning(format!(
            "{} saved {} could not be read and were skipped",
            skipped, label
        )));
    }
    (records, skipped_id)
}

/// Keep the first record of every id
fn dedup_by_id<T: Entity>(records: Vec<T>, label: &str) -> Vec<T> {
    let mut seen = HashSet::new();
    let before = records.len();
    let records: Vec<T> = records.into_iter().filter(|r| seen.insert(r.id())).collect();
    if records.len() != before {
        log::warn!("dropped {} {} with duplicate ids", before - records.len(), label);
    }
    records
}

/// Clamp stored dimensions into policy bounds and drop duplicate ids
fn repair_grids(grids: Vec<Grid>, config: &ShelfConfig) -> Vec<Grid> {
    let limits = config.limits();
    let mut repaired: Vec<Grid> = Vec::with_capacity(grids.len());
    for mut grid in dedup_by_id(grids, "grids") {
        let rows = grid.rows.clamp(1, limits.max_rows);
        let columns = grid.columns.clamp(1, limits.max_columns);
        if (rows, columns) != (grid.rows, grid.columns) {
            log::warn!(
                "grid {} had {}x{}, clamped to {}x{}",
                grid.id,
                grid.rows,
                grid.columns,
                rows,
                columns
            );
            grid.rows = rows;
            grid.columns = columns;
        }
        repaired.push(grid);
    }
    repaired
}

/// Drop orphans and hide visible items that are out of range or collide
fn repair_items(items: Vec<Item>, grids: &[Grid]) -> Vec<Item> {
    let mut occupied = HashSet::new();
    let mut repaired: Vec<Item> = Vec::with_capacity(items.len());
    for mut item in dedup_by_id(items, "items") {
        let Some(grid) = grids.iter().find(|g| g.id == item.grid_id) else {
            log::warn!("dropping item {} of missing grid {}", item.id, item.grid_id);
            continue;
        };
        if item.is_visible()
            && (!grid.contains(item.position) || !occupied.insert((item.grid_id, item.position)))
        {
            log::warn!(
                "hiding item {} at grid {} position {}",
                item.id,
                item.grid_id,
                item.position
            );
            item.hide(grid.columns);
        }
        repaired.push(item);
    }
    repaired
}
