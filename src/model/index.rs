/// Vocabulary shared between the table model and the view driving it:
/// indices, roles, flags, and the notifications/requests the model queues.

use std::ops::{BitAnd, BitOr, Not};

use super::node::NodeId;
use crate::state::data::SortKey;
use crate::thumbnail::ThumbnailRequest;

/// Address of one cell. The default index is invalid and stands for the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    node: Option<NodeId>,
}

impl ModelIndex {
    pub const fn invalid() -> Self {
        Self { row: 0, column: 0, node: None }
    }

    pub(crate) const fn new(row: usize, column: usize, node: NodeId) -> Self {
        Self { row, column, node: Some(node) }
    }

    pub fn is_valid(&self) -> bool {
        self.node.is_some()
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }
}

/// What kind of value the view asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRole {
    Display,
    /// Raw value for delegates that render something other than text
    AdditionalInfo,
    Decoration,
    ToolTip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Interaction capabilities of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags(u8);

impl ItemFlags {
    pub const NONE: Self = Self(0);
    pub const SELECTABLE: Self = Self(1 << 0);
    pub const EDITABLE: Self = Self(1 << 1);
    pub const DRAG_ENABLED: Self = Self(1 << 2);
    pub const DROP_ENABLED: Self = Self(1 << 3);
    pub const USER_CHECKABLE: Self = Self(1 << 4);
    pub const ENABLED: Self = Self(1 << 5);

    /// Flags a view gives a plain cell
    pub const DEFAULT: Self = Self(Self::SELECTABLE.0 | Self::ENABLED.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ItemFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for ItemFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ItemFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Change notifications, drained by the view after each operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// Every index handed out so far is about to become invalid
    ResetStarted,
    ResetFinished,
    /// Rows `first..=last` under `parent` are about to appear
    RowsInsertStarted { parent: ModelIndex, first: usize, last: usize },
    RowsInserted { parent: ModelIndex, first: usize, last: usize },
    /// Cells in the rectangle changed. Two invalid corners mean "everything".
    DataChanged { top_left: ModelIndex, bottom_right: ModelIndex },
}

/// Work the model needs a collaborator to do, drained by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRequest {
    FetchThumbnail(ThumbnailRequest),
    /// Ask the record source to re-deliver its books in this order
    Sort { key: SortKey, ascending: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_index_is_invalid() {
        assert!(!ModelIndex::default().is_valid());
        assert_eq!(ModelIndex::default(), ModelIndex::invalid());
    }

    #[test]
    fn test_flag_arithmetic() {
        let flags = ItemFlags::DEFAULT | ItemFlags::EDITABLE;
        assert!(flags.contains(ItemFlags::SELECTABLE));
        assert!(flags.contains(ItemFlags::EDITABLE));

        let stripped = flags & !ItemFlags::EDITABLE & !ItemFlags::SELECTABLE;
        assert_eq!(stripped, ItemFlags::ENABLED);
    }

    #[test]
    fn test_sort_order_reversed() {
        assert_eq!(SortOrder::Ascending.reversed(), SortOrder::Descending);
    }
}
