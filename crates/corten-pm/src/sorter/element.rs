//! Generic precedence sorting with cycle breaking.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use log::trace;

use crate::error::SortError;

/// How strongly an edge binds its two elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Hard ordering requirement. Never broken on its own.
    Enforce,
    /// Soft preference. First to go when a cycle must be broken.
    Optional,
}

/// How the edges of a group relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// At least one edge of the group must survive loop breaking.
    Or,
    /// The edges live or die together.
    And,
}

/// Handle for a group created with [`ElementSorter::new_group`].
pub type GroupId = usize;

#[derive(Debug, Clone, Copy)]
struct Edge {
    kind: EdgeKind,
    group: Option<GroupId>,
}

#[derive(Debug)]
struct Group<E> {
    kind: GroupKind,
    members: Vec<(E, E)>,
}

/// Topological sorter over arbitrary elements, with edge kinds and
/// groups that tell the loop breaker which orderings may be
/// sacrificed.
///
/// Breaking rules, in order of preference:
///
/// 1. plain `Optional` edges, and `Optional` members of an `Or` group
///    with another live member
/// 2. `Enforce` members of an `Or` group with another live member, and
///    `And` groups made entirely of `Optional` edges (the whole group
///    is dropped together)
///
/// A plain `Enforce` edge is never broken; a cycle consisting only of
/// unbreakable edges fails the sort.
#[derive(Debug, Default)]
pub struct ElementSorter<E> {
    successors: IndexMap<E, IndexMap<E, Edge>>,
    groups: Vec<Group<E>>,
}

impl<E> ElementSorter<E>
where
    E: Copy + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        ElementSorter {
            successors: IndexMap::new(),
            groups: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.successors.clear();
        self.groups.clear();
    }

    /// Registers an element with no relations. Harmless if the element
    /// is already known.
    pub fn add_element(&mut self, elem: E) {
        self.successors.entry(elem).or_default();
    }

    pub fn element_count(&self) -> usize {
        self.successors.len()
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(IndexMap::len).sum()
    }

    /// Opens a new empty group; membership is given per edge.
    pub fn new_group(&mut self, kind: GroupKind) -> GroupId {
        self.groups.push(Group {
            kind,
            members: Vec::new(),
        });
        self.groups.len() - 1
    }

    /// Records that `pred` must sort before `succ`.
    ///
    /// A duplicate edge keeps its group but is upgraded to `Enforce`
    /// when the new kind is stronger. Self-edges are ignored.
    pub fn add_successor(&mut self, pred: E, succ: E, kind: EdgeKind) {
        self.insert_edge(pred, succ, kind, None);
    }

    /// Records `pred` before `succ` as a member of `group`.
    pub fn add_successor_in(&mut self, group: GroupId, pred: E, succ: E, kind: EdgeKind) {
        self.insert_edge(pred, succ, kind, Some(group));
    }

    fn insert_edge(&mut self, pred: E, succ: E, kind: EdgeKind, group: Option<GroupId>) {
        if pred == succ {
            return;
        }
        self.add_element(pred);
        self.add_element(succ);
        let slot = self
            .successors
            .get_mut(&pred)
            .and_then(|succs| succs.get_mut(&succ));
        if let Some(existing) = slot {
            if existing.kind == EdgeKind::Optional && kind == EdgeKind::Enforce {
                existing.kind = EdgeKind::Enforce;
            }
            return;
        }
        if let Some(succs) = self.successors.get_mut(&pred) {
            succs.insert(succ, Edge { kind, group });
        }
        if let Some(gid) = group {
            if let Some(grp) = self.groups.get_mut(gid) {
                grp.members.push((pred, succ));
            }
        }
    }

    fn edge(&self, pred: E, succ: E) -> Option<Edge> {
        self.successors
            .get(&pred)
            .and_then(|succs| succs.get(&succ))
            .copied()
    }

    fn edge_exists(&self, pred: E, succ: E) -> bool {
        self.edge(pred, succ).is_some()
    }

    /// Detects cycles and removes sacrificial edges until none remain.
    ///
    /// On failure returns the elements of a cycle that could not be
    /// broken, in path order.
    pub fn break_loops(&mut self) -> Result<(), Vec<E>> {
        while let Some(cycle) = self.find_cycle() {
            if !self.break_cycle(&cycle) {
                return Err(cycle);
            }
        }
        Ok(())
    }

    /// Breaks loops, then emits elements in precedence order.
    pub fn get_sorted(&mut self) -> Result<Vec<E>, SortError> {
        if let Err(cycle) = self.break_loops() {
            return Err(SortError::Loop(format!("{:?}", cycle)));
        }

        let mut pred_count: IndexMap<E, usize> =
            self.successors.keys().map(|&e| (e, 0)).collect();
        for succs in self.successors.values() {
            for &succ in succs.keys() {
                if let Some(count) = pred_count.get_mut(&succ) {
                    *count += 1;
                }
            }
        }

        let mut queue: VecDeque<E> = pred_count
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&e, _)| e)
            .collect();
        let mut result = Vec::with_capacity(pred_count.len());
        while let Some(elem) = queue.pop_front() {
            result.push(elem);
            if let Some(succs) = self.successors.get(&elem) {
                for &succ in succs.keys() {
                    if let Some(count) = pred_count.get_mut(&succ) {
                        *count -= 1;
                        if *count == 0 {
                            queue.push_back(succ);
                        }
                    }
                }
            }
        }

        // A size mismatch means an unbroken cycle survived, which
        // break_loops is supposed to rule out.
        if result.len() != self.successors.len() {
            return Err(SortError::Incomplete {
                expected: self.successors.len(),
                sorted: result.len(),
            });
        }
        Ok(result)
    }

    /// One cycle in path order, or `None` when the graph is acyclic.
    fn find_cycle(&self) -> Option<Vec<E>> {
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;

        let adjacency: IndexMap<E, Vec<E>> = self
            .successors
            .iter()
            .map(|(&e, succs)| (e, succs.keys().copied().collect()))
            .collect();
        let mut color: HashMap<E, u8> = HashMap::with_capacity(adjacency.len());

        for &start in adjacency.keys() {
            if color.get(&start).copied().unwrap_or(WHITE) != WHITE {
                continue;
            }
            let mut stack: Vec<(E, usize)> = vec![(start, 0)];
            color.insert(start, GRAY);
            while let Some(&(elem, idx)) = stack.last() {
                let succs = match adjacency.get(&elem) {
                    Some(succs) => succs,
                    None => {
                        stack.pop();
                        continue;
                    }
                };
                if idx >= succs.len() {
                    color.insert(elem, BLACK);
                    stack.pop();
                    continue;
                }
                if let Some(frame) = stack.last_mut() {
                    frame.1 = idx + 1;
                }
                let next = succs[idx];
                match color.get(&next).copied().unwrap_or(WHITE) {
                    WHITE => {
                        color.insert(next, GRAY);
                        stack.push((next, 0));
                    }
                    GRAY => {
                        if let Some(pos) = stack.iter().position(|&(e, _)| e == next) {
                            return Some(stack[pos..].iter().map(|&(e, _)| e).collect());
                        }
                    }
                    _ => {}
                }
            }
        }
        None
    }

    /// Removes one sacrificial edge of the cycle. Returns false when
    /// every edge is unbreakable.
    fn break_cycle(&mut self, cycle: &[E]) -> bool {
        let mut edges: Vec<(E, E)> = cycle.windows(2).map(|pair| (pair[0], pair[1])).collect();
        if let (Some(&first), Some(&last)) = (cycle.first(), cycle.last()) {
            edges.push((last, first));
        }
        for optional_only in [true, false] {
            for &(pred, succ) in &edges {
                if self.breakable(pred, succ, optional_only) {
                    trace!("breaking edge {:?} -> {:?}", pred, succ);
                    self.remove_edge(pred, succ);
                    return true;
                }
            }
        }
        false
    }

    fn breakable(&self, pred: E, succ: E, optional_only: bool) -> bool {
        let edge = match self.edge(pred, succ) {
            Some(edge) => edge,
            None => return false,
        };
        match edge.group {
            None => edge.kind == EdgeKind::Optional,
            Some(gid) => {
                let group = match self.groups.get(gid) {
                    Some(group) => group,
                    None => return false,
                };
                match group.kind {
                    GroupKind::Or => {
                        let survivors = group
                            .members
                            .iter()
                            .filter(|&&(p, s)| (p, s) != (pred, succ) && self.edge_exists(p, s))
                            .count();
                        survivors > 0 && (!optional_only || edge.kind == EdgeKind::Optional)
                    }
                    GroupKind::And => {
                        // Dropping one member drops them all, so every
                        // live member must be sacrificial.
                        !optional_only
                            && group.members.iter().all(|&(p, s)| {
                                match self.edge(p, s) {
                                    Some(member) => member.kind == EdgeKind::Optional,
                                    None => true,
                                }
                            })
                    }
                }
            }
        }
    }

    fn remove_edge(&mut self, pred: E, succ: E) {
        let edge = match self.successors.get_mut(&pred) {
            Some(succs) => succs.shift_remove(&succ),
            None => None,
        };
        let edge = match edge {
            Some(edge) => edge,
            None => return,
        };
        if let Some(gid) = edge.group {
            if self.groups.get(gid).map(|g| g.kind) == Some(GroupKind::And) {
                let members = match self.groups.get(gid) {
                    Some(group) => group.members.clone(),
                    None => Vec::new(),
                };
                for (p, s) in members {
                    if let Some(succs) = self.successors.get_mut(&p) {
                        succs.shift_remove(&s);
                    }
                }
            }
        }
    }
}
