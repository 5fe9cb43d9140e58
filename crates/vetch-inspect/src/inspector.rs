//! The Inspector: a precomputed pre-order event array over a package's
//! files.
//!
//! Built once per package, the event array supports typed pre-order
//! iteration as a linear scan with a tag bitset, O(1) parent/child/sibling
//! navigation through stored indices, and position lookup by binary search.
//! There is no recursion and no per-visit allocation on the traversal
//! paths.
//!
//! Event 0 is a synthetic root wrapping the file list; every file's `File`
//! node is a child of it.

use vetch_syntax::ast::{Ast, EdgeKind, NodeId, NodeTag, TagSet};
use vetch_syntax::fileset::Pos;

/// One pre-order event.
#[derive(Debug, Clone)]
pub(crate) struct Event {
    pub(crate) node: NodeId,
    pub(crate) tag: NodeTag,
    pub(crate) pos: Pos,
    pub(crate) end_pos: Pos,
    /// Parent event index; `u32::MAX` for the root.
    pub(crate) parent: u32,
    /// Exclusive end of this event's subtree in the event array.
    pub(crate) subtree_end: u32,
    pub(crate) edge: EdgeKind,
    pub(crate) edge_index: i32,
}

/// The immutable index over a package's syntax trees.
#[derive(Debug)]
pub struct Inspector {
    pub(crate) events: Vec<Event>,
    /// (file start, file end, file event index), sorted by start position.
    file_ranges: Vec<(Pos, Pos, u32)>,
}

impl Inspector {
    /// Build the index for every file in `ast`.
    pub fn new(ast: &Ast) -> Inspector {
        let mut events = Vec::with_capacity(ast.len() + 1);
        // Synthetic root: node id and positions are placeholders, tag is
        // File for want of a dedicated variant; callers never see it as a
        // node (Cursor::node is None at the root).
        events.push(Event {
            node: NodeId(u32::MAX),
            tag: NodeTag::File,
            pos: Pos(0),
            end_pos: Pos(u32::MAX),
            parent: u32::MAX,
            subtree_end: 0, // patched below
            edge: EdgeKind::RootFiles,
            edge_index: -1,
        });

        let mut file_ranges = Vec::new();
        for (i, entry) in ast.files().iter().enumerate() {
            let idx = push_subtree(ast, &mut events, entry.node, 0, EdgeKind::RootFiles, i as i32);
            let ev = &events[idx as usize];
            file_ranges.push((ev.pos, ev.end_pos, idx));
        }
        let len = events.len() as u32;
        events[0].subtree_end = len;
        file_ranges.sort_by_key(|&(start, _, _)| start);

        Inspector {
            events,
            file_ranges,
        }
    }

    /// Number of events, including the synthetic root.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.len() <= 1
    }

    /// The root cursor, wrapping the implicit file list.
    pub fn root(&self) -> crate::cursor::Cursor<'_> {
        crate::cursor::Cursor::new(self, 0)
    }

    /// Pre-order iteration over every node, optionally filtered by tag.
    ///
    /// Nodes not matching the filter still have their subtrees traversed;
    /// filtering affects only which cursors are yielded.
    pub fn preorder(&self, filter: TagSet) -> crate::cursor::Preorder<'_> {
        crate::cursor::Preorder::new(self, 1, self.events.len() as u32, filter)
    }

    /// The smallest node whose range covers `[start, end]`, or `None`.
    ///
    /// `end < start` yields `None` rather than panicking; so do positions
    /// outside every file.
    pub fn find_by_pos(&self, start: Pos, end: Pos) -> Option<crate::cursor::Cursor<'_>> {
        if end < start || !start.is_valid() {
            return None;
        }
        // Locate the file by binary search over sorted start positions.
        let fi = self
            .file_ranges
            .partition_point(|&(s, _, _)| s <= start);
        if fi == 0 {
            return None;
        }
        let (fstart, fend, fevent) = self.file_ranges[fi - 1];
        if start < fstart || end > fend {
            return None;
        }

        // Within the file's subtree, event positions are non-decreasing:
        // binary search for the rightmost event with pos <= start, then
        // ascend to the smallest covering node.
        let lo = fevent as usize;
        let hi = self.events[lo].subtree_end as usize;
        let window = &self.events[lo..hi];
        let off = window.partition_point(|e| e.pos <= start);
        if off == 0 {
            return None;
        }
        let mut idx = (lo + off - 1) as u32;
        loop {
            let ev = &self.events[idx as usize];
            if ev.pos <= start && ev.end_pos >= end {
                return Some(crate::cursor::Cursor::new(self, idx));
            }
            if idx == fevent {
                return None;
            }
            idx = ev.parent;
        }
    }
}

/// Append `node`'s subtree; returns the node's event index.
fn push_subtree(
    ast: &Ast,
    events: &mut Vec<Event>,
    node: NodeId,
    parent: u32,
    edge: EdgeKind,
    edge_index: i32,
) -> u32 {
    let idx = events.len() as u32;
    let n = ast.node(node);
    events.push(Event {
        node,
        tag: n.kind.tag(),
        pos: n.pos,
        end_pos: n.end,
        parent,
        subtree_end: 0,
        edge,
        edge_index,
    });
    let mut children = Vec::new();
    ast.visit_children(node, |edge, i, child| children.push((edge, i, child)));
    for (edge, i, child) in children {
        push_subtree(ast, events, child, idx, edge, i);
    }
    let end = events.len() as u32;
    events[idx as usize].subtree_end = end;
    idx
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vetch_syntax::{parse_file, Ast, FileSet};

    pub(crate) fn build(src: &str) -> (FileSet, Ast, Inspector) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let parsed = parse_file(&mut fset, &mut ast, "test.go", src);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let ins = Inspector::new(&ast);
        (fset, ast, ins)
    }

    #[test]
    fn every_node_appears_exactly_once() {
        let (_, ast, ins) = build(
            "package p\n\nfunc f(a int) int {\n\tif a > 0 {\n\t\treturn a\n\t}\n\treturn -a\n}\n",
        );
        // The event array covers all nodes reachable from the files plus
        // the root; count via an independent walk.
        let mut reachable = 0usize;
        for entry in ast.files() {
            let mut stack = vec![entry.node];
            while let Some(id) = stack.pop() {
                reachable += 1;
                ast.visit_children(id, |_, _, c| stack.push(c));
            }
        }
        assert_eq!(ins.len(), reachable + 1);

        let mut seen = std::collections::HashSet::new();
        for c in ins.preorder(TagSet::ALL) {
            assert!(seen.insert(c.node().unwrap()), "node visited twice");
        }
        assert_eq!(seen.len(), reachable);
    }

    #[test]
    fn preorder_is_parents_before_children_in_source_order() {
        let (_, _, ins) = build("package p\n\nvar a = 1\nvar b = 2\n");
        let mut last_pos = Pos(0);
        for c in ins.preorder(TagSet::ALL) {
            let p = c.pos();
            assert!(p >= last_pos, "positions must be non-decreasing");
            last_pos = p;
            if let Some(parent) = c.parent() {
                if parent.node().is_some() {
                    assert!(parent.pos() <= c.pos());
                    assert!(parent.end_pos() >= c.end_pos());
                }
            }
        }
    }

    #[test]
    fn filtered_preorder_yields_only_matching_tags() {
        let (_, _, ins) = build(
            "package p\n\nfunc f() {\n\tg()\n\th(1)\n}\nfunc g() {}\nfunc h(int) {}\n",
        );
        let calls: Vec<_> = ins
            .preorder(TagSet::of(&[NodeTag::CallExpr]))
            .collect();
        assert_eq!(calls.len(), 2);
        for c in calls {
            assert_eq!(c.tag(), Some(NodeTag::CallExpr));
        }
    }

    #[test]
    fn find_by_pos_returns_smallest_covering_node() {
        let (_, ast, ins) = build("package p\n\nvar x = f(1, 2)\n");
        // Every node should be findable by its own range.
        for c in ins.preorder(TagSet::ALL) {
            let found = ins
                .find_by_pos(c.pos(), c.end_pos())
                .expect("every node findable");
            assert!(
                found.contains(c) || found == c,
                "found {:?} for {:?}",
                found.tag(),
                c.tag()
            );
            // The found node must cover and be minimal: its range covers,
            // and no child of it covers.
            assert!(found.pos() <= c.pos() && found.end_pos() >= c.end_pos());
        }
        let _ = ast;
    }

    #[test]
    fn find_by_pos_rejects_inverted_and_foreign_ranges() {
        let (_, _, ins) = build("package p\n");
        assert!(ins.find_by_pos(Pos(5), Pos(2)).is_none());
        assert!(ins.find_by_pos(Pos(100_000), Pos(100_001)).is_none());
    }
}
