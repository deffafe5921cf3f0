//! Shelf Commands
//!
//! JSON command bridge between a UI host and the shelf store.
//! Each command runs against the store and answers with its data plus the
//! notices the operation produced.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    DomainError, DomainResult, GridId, GridPatch, GridSpec, ItemId, ItemPatch, ItemPayload,
    ItemSpec,
};
use crate::engine::SlotRef;
use crate::notice::Notice;
use crate::store::ShelfStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ShelfCommand {
    CreateGrid(GridSpec),
    UpdateGrid {
        grid_id: GridId,
        patch: GridPatch,
    },
    DeleteGrid {
        grid_id: GridId,
    },
    SetActiveGrid {
        grid_id: GridId,
    },
    AddRow {
        grid_id: GridId,
    },
    RemoveRow {
        grid_id: GridId,
    },
    AddColumn {
        grid_id: GridId,
    },
    RemoveColumn {
        grid_id: GridId,
    },
    AddItem(ItemSpec),
    UpdateItem {
        item_id: ItemId,
        patch: ItemPatch,
    },
    DeleteItem {
        item_id: ItemId,
    },
    DragStart {
        item_id: ItemId,
    },
    DragEnd,
    DragCancel,
    /// Pointer pressed on an item; the drag starts once it moves past the threshold
    Press {
        item_id: ItemId,
        x: i32,
        y: i32,
    },
    PointerMove {
        x: i32,
        y: i32,
    },
    Hover {
        grid_id: GridId,
        position: usize,
    },
    Leave,
    /// Pointer released over the hovered slot
    Release,
    /// Drop on a slot; a payload creates a new item instead of moving one
    Drop {
        grid_id: GridId,
        position: usize,
        #[serde(default)]
        payload: Option<ItemPayload>,
    },
    Snapshot,
    Usage,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

impl CommandResponse {
    pub fn success(data: Value, notices: Vec<Notice>) -> Self {
        Self {
            ok: true,
            data: (!data.is_null()).then_some(data),
            error: None,
            notices,
        }
    }

    pub fn failure(error: String, notices: Vec<Notice>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
            notices,
        }
    }
}

/// Run a command now
pub async fn dispatch(store: &mut ShelfStore, command: ShelfCommand) -> CommandResponse {
    dispatch_at(store, command, Instant::now()).await
}

/// Run a command at `now`. A drag past its safety timeout is cleared first.
pub async fn dispatch_at(
    store: &mut ShelfStore,
    command: ShelfCommand,
    now: Instant,
) -> CommandResponse {
    store.expire_drag(now);
    let result = run(store, command, now).await;
    let notices = store.drain_notices();
    match result {
        Ok(data) => CommandResponse::success(data, notices),
        Err(e) => CommandResponse::failure(e.to_string(), notices),
    }
}

async fn run(store: &mut ShelfStore, command: ShelfCommand, now: Instant) -> DomainResult<Value> {
    match command {
        ShelfCommand::CreateGrid(spec) => to_data(store.create_grid(spec).await?),
        ShelfCommand::UpdateGrid { grid_id, patch } => {
            to_data(store.update_grid(grid_id, patch).await?)
        }
        ShelfCommand::DeleteGrid { grid_id } => {
            store.delete_grid(grid_id).await?;
            Ok(Value::Null)
        }
        ShelfCommand::SetActiveGrid { grid_id } => {
            store.set_active_grid(grid_id).await?;
            Ok(Value::Null)
        }
        ShelfCommand::AddRow { grid_id } => to_data(store.add_row(grid_id).await?),
        ShelfCommand::RemoveRow { grid_id } => to_data(store.remove_row(grid_id).await?),
        ShelfCommand::AddColumn { grid_id } => to_data(store.add_column(grid_id).await?),
        ShelfCommand::RemoveColumn { grid_id } => to_data(store.remove_column(grid_id).await?),
        ShelfCommand::AddItem(spec) => to_data(store.add_item(spec).await?),
        ShelfCommand::UpdateItem { item_id, patch } => {
            store.update_item(item_id, patch).await?;
            Ok(Value::Null)
        }
        ShelfCommand::DeleteItem { item_id } => to_data(store.delete_item(item_id).await),
        ShelfCommand::DragStart { item_id } => {
            store.begin_drag(item_id, now);
            Ok(Value::Null)
        }
        ShelfCommand::DragEnd => {
            store.end_drag();
            Ok(Value::Null)
        }
        ShelfCommand::DragCancel => {
            store.cancel_drag();
            Ok(Value::Null)
        }
        ShelfCommand::Press { item_id, x, y } => {
            store.press(item_id, x, y);
            Ok(Value::Null)
        }
        ShelfCommand::PointerMove { x, y } => to_data(store.pointer_move(x, y, now)),
        ShelfCommand::Hover { grid_id, position } => {
            store.hover(SlotRef::new(grid_id, position));
            Ok(Value::Null)
        }
        ShelfCommand::Leave => {
            store.leave();
            Ok(Value::Null)
        }
        ShelfCommand::Release => to_data(store.release(now).await?),
        ShelfCommand::Drop {
            grid_id,
            position,
            payload,
        } => to_data(
            store
                .drop_at(SlotRef::new(grid_id, position), payload, now)
                .await?,
        ),
        ShelfCommand::Snapshot => to_data(store.snapshot()),
        ShelfCommand::Usage => to_data(store.usage().await),
        ShelfCommand::Reset => {
            store.reset().await;
            to_data(store.snapshot())
        }
    }
}

fn to_data<T: Serialize>(value: T) -> DomainResult<Value> {
    serde_json::to_value(value).map_err(|e| DomainError::Internal(e.to_string()))
}
