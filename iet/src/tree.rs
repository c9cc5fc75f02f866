//! ASCII rendering of iteration/expression trees.

use std::borrow::Cow;
use std::fmt;
use std::io;

use ptree::{Style, TreeItem};

use crate::node::{Arena, Iet, NodeId};

/// A node seen through its arena, for [`ptree`].
#[derive(Clone)]
pub struct NodeView<'a> {
    arena: &'a Arena,
    id: NodeId,
}

impl<'a> NodeView<'a> {
    pub fn new(arena: &'a Arena, id: NodeId) -> Self {
        Self { arena, id }
    }
}

impl TreeItem for NodeView<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        match self.arena.get(self.id) {
            Ok(node) => write!(f, "{node}"),
            Err(err) => write!(f, "<{err}>"),
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        let children = self.arena.children(self.id).unwrap_or_default();
        Cow::Owned(children.iter().map(|&id| NodeView::new(self.arena, id)).collect())
    }
}

/// Render the subtree at `id` as an ASCII tree.
pub fn render_tree(arena: &Arena, id: NodeId) -> String {
    let mut buf = Vec::new();
    match ptree::write_tree(&NodeView::new(arena, id), &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(err) => format!("<{err}>"),
    }
}

impl Iet {
    /// The whole tree as an ASCII tree.
    ///
    /// ```text
    /// List
    /// └─ Iteration time (time_s, time_e, 1) offsets=(0, -1) uindices=[t0 = time % 2, t1 = (time + 1) % 2]
    ///    └─ Iteration x (x_s, x_e, 1) offsets=(0, 0)
    ///       └─ Expression<float32> u[t1, x] = u[t0, x] + 1
    /// ```
    pub fn tree(&self) -> String {
        render_tree(self.arena(), self.root())
    }
}

impl fmt::Display for Iet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tree())
    }
}
