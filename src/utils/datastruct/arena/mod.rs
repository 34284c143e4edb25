use crate::error::{DictionaryError, Result};

/// Index of a node inside an `Arena`.
/// 32 bits keep child arrays small; the arena refuses to grow past that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena
/// Append-only pool of nodes addressed by `NodeId`.
/// Nodes refer to each other by id instead of by pointer, so a whole
/// graph is owned by a single `Vec` and can be filtered in one pass.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    pool: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { pool: Vec::new() }
    }

    /// Arena holding `root` at `NodeId::ROOT`
    pub fn with_root(root: T) -> Self {
        Self { pool: vec![root] }
    }

    pub fn alloc(&mut self, value: T) -> Result<NodeId> {
        let idx = u32::try_from(self.pool.len())
            .map_err(|_| DictionaryError::CapacityExceeded("arena holds at most u32::MAX nodes"))?;
        self.pool.push(value);
        Ok(NodeId(idx))
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.pool.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.pool.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NodeId, &T)> {
        self.pool
            .iter()
            .enumerate()
            .map(|(idx, value)| (NodeId(idx as u32), value))
    }

    pub fn values_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.pool.iter_mut()
    }

    /// Drops every node whose flag in `keep` is false, preserving the
    /// relative order of the survivors, then lets `relink` rewrite the ids
    /// stored inside each surviving node through the returned mapping.
    ///
    /// # Returns
    /// * number of removed nodes
    pub fn retain<F>(&mut self, keep: &[bool], mut relink: F) -> usize
    where
        F: FnMut(&mut T, &dyn Fn(NodeId) -> Option<NodeId>),
    {
        debug_assert_eq!(keep.len(), self.pool.len());
        let mut remap = Vec::with_capacity(self.pool.len());
        let mut next = 0u32;
        for &kept in keep {
            if kept {
                remap.push(Some(NodeId(next)));
                next += 1;
            } else {
                remap.push(None);
            }
        }
        let before = self.pool.len();
        let mut flags = keep.iter();
        self.pool.retain(|_| flags.next().copied().unwrap_or(false));
        let lookup = |id: NodeId| remap.get(id.index()).copied().flatten();
        for value in self.pool.iter_mut() {
            relink(value, &lookup);
        }
        self.pool.shrink_to_fit();
        before - self.pool.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Node {
        label: &'static str,
        next: Option<NodeId>,
    }

    #[test]
    fn alloc_and_get() {
        let mut arena = Arena::new();
        let a = arena.alloc(1u8).unwrap();
        let b = arena.alloc(2u8).unwrap();
        assert_eq!(a, NodeId::ROOT);
        assert_eq!(arena.get(b), Some(&2));
        *arena.get_mut(a).unwrap() = 9;
        assert_eq!(arena.get(a), Some(&9));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn root_arena_starts_at_root() {
        let mut arena = Arena::with_root("root");
        assert_eq!(arena.get(NodeId::ROOT), Some(&"root"));
        assert_eq!(arena.alloc("child").unwrap().index(), 1);
    }

    #[test]
    fn retain_remaps_links() {
        let mut arena = Arena::new();
        let a = arena.alloc(Node { label: "a", next: None }).unwrap();
        let b = arena.alloc(Node { label: "b", next: None }).unwrap();
        let c = arena.alloc(Node { label: "c", next: None }).unwrap();
        arena.get_mut(a).unwrap().next = Some(c);
        arena.get_mut(b).unwrap().next = Some(c);

        let removed = arena.retain(&[true, false, true], |node, map| {
            node.next = node.next.and_then(|id| map(id));
        });

        assert_eq!(removed, 1);
        assert_eq!(arena.len(), 2);
        let first = arena.get(NodeId::ROOT).unwrap();
        assert_eq!(first.label, "a");
        let linked = arena.get(first.next.unwrap()).unwrap();
        assert_eq!(linked.label, "c");
        assert_eq!(b.index(), 1);
        assert_eq!(arena.iter().rev().next().unwrap().1.label, "c");
    }
}
