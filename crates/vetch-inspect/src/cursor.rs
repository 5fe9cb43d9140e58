//! Cursors: O(1) navigable handles into an [`Inspector`].
//!
//! A cursor is a `(inspector, event index)` pair. All navigation is total:
//! missing relations return `None`, never errors. Cursors from different
//! inspectors never compare equal.

use crate::inspector::Inspector;
use vetch_syntax::ast::{EdgeKind, NodeId, NodeTag, TagSet};
use vetch_syntax::fileset::Pos;

/// A handle to one node (or the synthetic root) in an [`Inspector`].
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    ins: &'a Inspector,
    index: u32,
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ins, other.ins) && self.index == other.index
    }
}

impl Eq for Cursor<'_> {}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cursor({}, {:?})", self.index, self.tag())
    }
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(ins: &'a Inspector, index: u32) -> Self {
        Cursor { ins, index }
    }

    /// The event index within the inspector; stable for the inspector's
    /// lifetime.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_root(&self) -> bool {
        self.index == 0
    }

    /// The node this cursor points at; `None` at the root.
    pub fn node(&self) -> Option<NodeId> {
        (!self.is_root()).then(|| self.ins.events[self.index as usize].node)
    }

    /// The node's variant tag; `None` at the root.
    pub fn tag(&self) -> Option<NodeTag> {
        (!self.is_root()).then(|| self.ins.events[self.index as usize].tag)
    }

    pub fn pos(&self) -> Pos {
        self.ins.events[self.index as usize].pos
    }

    pub fn end_pos(&self) -> Pos {
        self.ins.events[self.index as usize].end_pos
    }

    /// The parent cursor; `None` at the root.
    pub fn parent(&self) -> Option<Cursor<'a>> {
        let p = self.ins.events[self.index as usize].parent;
        (p != u32::MAX).then(|| Cursor::new(self.ins, p))
    }

    /// The labeled edge from the parent to this node, with the element
    /// index for list edges (-1 otherwise). The root reports its synthetic
    /// edge.
    pub fn parent_edge(&self) -> (EdgeKind, i32) {
        let ev = &self.ins.events[self.index as usize];
        (ev.edge, ev.edge_index)
    }

    /// Child cursors in source order.
    pub fn children(&self) -> Children<'a> {
        let ev = &self.ins.events[self.index as usize];
        let first = self.index + 1;
        Children {
            ins: self.ins,
            next: if first < ev.subtree_end { first } else { ev.subtree_end },
            end: ev.subtree_end,
        }
    }

    /// The next sibling under the same parent.
    pub fn next_sibling(&self) -> Option<Cursor<'a>> {
        let ev = &self.ins.events[self.index as usize];
        if ev.parent == u32::MAX {
            return None;
        }
        let parent_end = self.ins.events[ev.parent as usize].subtree_end;
        (ev.subtree_end < parent_end).then(|| Cursor::new(self.ins, ev.subtree_end))
    }

    /// The previous sibling under the same parent.
    pub fn prev_sibling(&self) -> Option<Cursor<'a>> {
        let parent = self.parent()?;
        let mut prev = None;
        for c in parent.children() {
            if c.index == self.index {
                return prev;
            }
            prev = Some(c);
        }
        None
    }

    /// Proper ancestors, innermost first, ending at the root.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            ins: self.ins,
            next: self.ins.events[self.index as usize].parent,
        }
    }

    /// Pre-order traversal of this cursor's subtree, self included (the
    /// root itself is never yielded).
    pub fn preorder(&self, filter: TagSet) -> Preorder<'a> {
        let ev = &self.ins.events[self.index as usize];
        let start = if self.is_root() { 1 } else { self.index };
        Preorder::new(self.ins, start, ev.subtree_end, filter)
    }

    /// True iff `self` is an ancestor of or equal to `other`.
    ///
    /// Reflexive, transitive, and antisymmetric; cursors from different
    /// inspectors are never related.
    pub fn contains(&self, other: Cursor<'a>) -> bool {
        std::ptr::eq(self.ins, other.ins)
            && self.index <= other.index
            && other.index < self.ins.events[self.index as usize].subtree_end
    }
}

// ============================================================================
// Iterators
// ============================================================================

/// Iterator over a cursor's children.
pub struct Children<'a> {
    ins: &'a Inspector,
    next: u32,
    end: u32,
}

impl<'a> Iterator for Children<'a> {
    type Item = Cursor<'a>;

    fn next(&mut self) -> Option<Cursor<'a>> {
        if self.next >= self.end {
            return None;
        }
        let c = Cursor::new(self.ins, self.next);
        self.next = self.ins.events[self.next as usize].subtree_end;
        Some(c)
    }
}

/// Iterator over proper ancestors.
pub struct Ancestors<'a> {
    ins: &'a Inspector,
    next: u32,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Cursor<'a>;

    fn next(&mut self) -> Option<Cursor<'a>> {
        if self.next == u32::MAX {
            return None;
        }
        let c = Cursor::new(self.ins, self.next);
        self.next = self.ins.events[self.next as usize].parent;
        Some(c)
    }
}

/// Filtered pre-order scan over an event range.
pub struct Preorder<'a> {
    ins: &'a Inspector,
    next: u32,
    end: u32,
    filter: TagSet,
}

impl<'a> Preorder<'a> {
    pub(crate) fn new(ins: &'a Inspector, start: u32, end: u32, filter: TagSet) -> Self {
        Preorder {
            ins,
            next: start,
            end,
            filter,
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = Cursor<'a>;

    fn next(&mut self) -> Option<Cursor<'a>> {
        while self.next < self.end {
            let idx = self.next;
            self.next += 1;
            if self.filter.contains(self.ins.events[idx as usize].tag) {
                return Some(Cursor::new(self.ins, idx));
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
