/// Tree nodes for the catalog table
///
/// Nodes live in a flat arena (`NodeTree`) and refer to each other by
/// `NodeId`. A parent owns its children through the arena; children only
/// remember their parent's handle, so there are no ownership cycles and the
/// whole tree is dropped at once on rebuild.

use crate::state::downloads::{DownloadState, SharedDownloadState};

/// Columns of a book row, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Icon = 0,
    Name = 1,
    Date = 2,
    Size = 3,
    Tags = 4,
    Download = 5,
}

/// Number of columns a book row exposes
pub const COLUMN_COUNT: usize = 6;

impl Column {
    pub fn from_index(index: usize) -> Option<Column> {
        match index {
            0 => Some(Column::Icon),
            1 => Some(Column::Name),
            2 => Some(Column::Date),
            3 => Some(Column::Size),
            4 => Some(Column::Tags),
            5 => Some(Column::Download),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Handle of a node inside a `NodeTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Decoded icon bytes
    Image(Vec<u8>),
    /// Location an icon still has to be fetched from
    Url(String),
    Text(String),
    Download(DownloadState),
}

/// A book row: one value per column plus the live download state
#[derive(Debug, Clone)]
pub struct RowNode {
    columns: Vec<CellValue>,
    download: Option<SharedDownloadState>,
}

impl RowNode {
    pub fn new(columns: Vec<CellValue>) -> Self {
        debug_assert!(columns.len() <= COLUMN_COUNT);
        Self { columns, download: None }
    }

    pub fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    pub fn data(&self, column: usize) -> Option<CellValue> {
        if column == Column::Download.index() {
            if let Some(state) = &self.download {
                return Some(CellValue::Download(state.borrow().clone()));
            }
        }
        self.columns.get(column).cloned()
    }

    pub fn set_icon_data(&mut self, data: Vec<u8>) {
        match self.columns.first_mut() {
            Some(icon) => *icon = CellValue::Image(data),
            None => self.columns.push(CellValue::Image(data)),
        }
    }

    pub fn download_state(&self) -> Option<&SharedDownloadState> {
        self.download.as_ref()
    }

    pub fn set_download_state(&mut self, state: Option<SharedDownloadState>) {
        self.download = state;
    }
}

/// The expandable detail line under a book row
#[derive(Debug, Clone)]
pub struct DescriptionNode {
    description: String,
}

impl DescriptionNode {
    pub fn new(description: String) -> Self {
        Self { description }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Row(RowNode),
    Description(DescriptionNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Position within the parent's children
    row: usize,
    book_id: String,
    kind: NodeKind,
}

impl Node {
    pub fn column_count(&self) -> usize {
        match &self.kind {
            NodeKind::Row(row) => row.column_count(),
            NodeKind::Description(_) => 1,
        }
    }

    /// Description nodes ignore `column` and always answer with their text
    pub fn data(&self, column: usize) -> Option<CellValue> {
        match &self.kind {
            NodeKind::Row(row) => row.data(column),
            NodeKind::Description(desc) => Some(CellValue::Text(desc.description().to_string())),
        }
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, row: usize) -> Option<NodeId> {
        self.children.get(row).copied()
    }

    pub fn parent_item(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Empty for the root and for description nodes
    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn as_row(&self) -> Option<&RowNode> {
        match &self.kind {
            NodeKind::Row(row) => Some(row),
            NodeKind::Description(_) => None,
        }
    }

    pub fn as_row_mut(&mut self) -> Option<&mut RowNode> {
        match &mut self.kind {
            NodeKind::Row(row) => Some(row),
            NodeKind::Description(_) => None,
        }
    }

    pub fn is_description(&self) -> bool {
        matches!(self.kind, NodeKind::Description(_))
    }
}

/// Arena owning every node of one catalog snapshot
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    const ROOT: NodeId = NodeId(0);

    /// Create a tree whose root row carries `header` (the column titles)
    pub fn new(header: RowNode) -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            row: 0,
            book_id: String::new(),
            kind: NodeKind::Row(header),
        };
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[Self::ROOT.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Append a child under `parent` and return its handle.
    /// Description nodes are leaves; appending under one is a bug and yields None.
    pub fn append_child(&mut self, parent: NodeId, book_id: &str, kind: NodeKind) -> Option<NodeId> {
        let row = match self.nodes.get(parent.0) {
            Some(node) if !node.is_description() => node.children.len(),
            _ => {
                debug_assert!(false, "cannot append a child to {:?}", parent);
                return None;
            }
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            row,
            book_id: book_id.to_string(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    /// Number of book rows under the root
    pub fn row_count(&self) -> usize {
        self.nodes[Self::ROOT.0].children.len()
    }

    /// Book row at top-level position `row`
    pub fn row_node(&self, row: usize) -> Option<&RowNode> {
        let id = self.nodes[Self::ROOT.0].child(row)?;
        self.get(id)?.as_row()
    }

    pub fn row_node_mut(&mut self, row: usize) -> Option<&mut RowNode> {
        let id = self.nodes[Self::ROOT.0].child(row)?;
        self.get_mut(id)?.as_row_mut()
    }

    /// Total number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::downloads::Downloads;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn book_row(title: &str) -> RowNode {
        RowNode::new(vec![
            CellValue::Url("http://x/1.png".to_string()),
            text(title),
            text("2024-01-01"),
            text("1.00 MB"),
            text("wikipedia"),
        ])
    }

    fn tree_with_book() -> (NodeTree, NodeId, NodeId) {
        let mut tree = NodeTree::new(RowNode::new(vec![text("Icon"), text("Name")]));
        let root = tree.root();
        let row = tree.append_child(root, "book1", NodeKind::Row(book_row("Wikipedia"))).unwrap();
        let desc = tree
            .append_child(row, "", NodeKind::Description(DescriptionNode::new("All of it".into())))
            .unwrap();
        (tree, row, desc)
    }

    #[test]
    fn test_column_from_index() {
        assert_eq!(Column::from_index(2), Some(Column::Date));
        assert_eq!(Column::from_index(6), None);
        assert_eq!(Column::Download.index(), 5);
    }

    #[test]
    fn test_row_navigation() {
        let (tree, row, desc) = tree_with_book();
        let row_node = tree.get(row).unwrap();
        let desc_node = tree.get(desc).unwrap();

        assert_eq!(row_node.parent_item(), Some(tree.root()));
        assert_eq!(row_node.child_count(), 1);
        assert_eq!(row_node.child(0), Some(desc));
        assert_eq!(row_node.child(1), None);
        assert_eq!(desc_node.parent_item(), Some(row));
        assert_eq!(desc_node.row(), 0);
        assert_eq!(desc_node.child_count(), 0);
        assert_eq!(row_node.book_id(), "book1");
        assert_eq!(desc_node.book_id(), "");
    }

    #[test]
    fn test_rows_track_their_position() {
        let (mut tree, _, _) = tree_with_book();
        let root = tree.root();
        let second = tree.append_child(root, "book2", NodeKind::Row(book_row("Wiktionary"))).unwrap();

        assert_eq!(tree.get(second).unwrap().row(), 1);
        assert_eq!(tree.row_count(), 2);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_row_columns() {
        let (tree, row, _) = tree_with_book();
        let node = tree.get(row).unwrap();

        assert_eq!(node.column_count(), COLUMN_COUNT);
        assert_eq!(node.data(1), Some(text("Wikipedia")));
        assert_eq!(node.data(5), None);
        assert_eq!(node.data(42), None);
    }

    #[test]
    fn test_description_ignores_column() {
        let (tree, _, desc) = tree_with_book();
        let node = tree.get(desc).unwrap();

        assert_eq!(node.column_count(), 1);
        assert_eq!(node.data(0), Some(text("All of it")));
        assert_eq!(node.data(3), Some(text("All of it")));
    }

    #[test]
    fn test_icon_and_download_mutation() {
        let (mut tree, _, _) = tree_with_book();
        let mut downloads = Downloads::new();
        let state = downloads.start("book1", 10);

        let row = tree.row_node_mut(0).unwrap();
        row.set_icon_data(vec![0xFF, 0xD8]);
        row.set_download_state(Some(state));

        let row = tree.row_node(0).unwrap();
        assert_eq!(row.data(0), Some(CellValue::Image(vec![0xFF, 0xD8])));
        assert!(matches!(row.data(5), Some(CellValue::Download(_))));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_description_cannot_have_children() {
        let (mut tree, _, desc) = tree_with_book();
        tree.append_child(desc, "", NodeKind::Description(DescriptionNode::new(String::new())));
    }
}
