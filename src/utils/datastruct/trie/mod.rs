use crate::error::{DictionaryError, Result};
use crate::utils::datastruct::arena::{Arena, NodeId};

/// Payload stored in a trie node.
/// A vacant payload marks a node that only exists as a path prefix.
pub trait TrieValue: Default {
    fn is_vacant(&self) -> bool;
}

impl TrieValue for u32 {
    #[inline]
    fn is_vacant(&self) -> bool {
        *self == 0
    }
}

impl<T> TrieValue for Box<[T]> {
    #[inline]
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

#[derive(Debug, Clone)]
struct TrieNode<V> {
    ch: char,
    /// grown one slot at a time; branching is small for n-gram vocabularies
    children: Box<[NodeId]>,
    value: V,
}

impl<V: Default> TrieNode<V> {
    fn new(ch: char) -> Self {
        TrieNode {
            ch,
            children: Box::new([]),
            value: V::default(),
        }
    }
}

/// CharTrie
/// Character-level prefix tree over an `Arena`.
/// Terms sharing a prefix share the nodes of that prefix, which is what
/// makes overlapping n-gram vocabularies cheap to hold.
#[derive(Debug, Clone)]
pub struct CharTrie<V: TrieValue> {
    nodes: Arena<TrieNode<V>>,
}

impl<V: TrieValue> Default for CharTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: TrieValue> CharTrie<V> {
    pub fn new() -> Self {
        Self {
            nodes: Arena::with_root(TrieNode::new('\0')),
        }
    }

    /// Number of allocated nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn child(&self, parent: NodeId, ch: char) -> Option<NodeId> {
        self.nodes.get(parent).and_then(|node| {
            node.children
                .iter()
                .copied()
                .find(|&id| self.nodes.get(id).is_some_and(|child| child.ch == ch))
        })
    }

    fn find_node(&self, key: &str) -> Option<NodeId> {
        key.chars()
            .try_fold(NodeId::ROOT, |node, ch| self.child(node, ch))
    }

    /// Payload of `key`, `None` if the path does not exist or is vacant
    pub fn get(&self, key: &str) -> Option<&V> {
        self.find_node(key)
            .and_then(|id| self.nodes.get(id))
            .map(|node| &node.value)
            .filter(|value| !value.is_vacant())
    }

    /// Mutable payload of `key`, `None` if the path does not exist
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let id = self.find_node(key)?;
        self.nodes.get_mut(id).map(|node| &mut node.value)
    }

    /// Payload of `key`, creating the path if needed
    pub fn get_or_insert(&mut self, key: &str) -> Result<&mut V> {
        let mut current = NodeId::ROOT;
        for ch in key.chars() {
            current = match self.child(current, ch) {
                Some(id) => id,
                None => {
                    let id = self.nodes.alloc(TrieNode::new(ch))?;
                    if let Some(parent) = self.nodes.get_mut(current) {
                        let mut children = std::mem::take(&mut parent.children).into_vec();
                        children.push(id);
                        parent.children = children.into_boxed_slice();
                    }
                    id
                }
            };
        }
        self.nodes
            .get_mut(current)
            .map(|node| &mut node.value)
            .ok_or_else(|| DictionaryError::Corrupt("dangling trie node".to_string()))
    }

    /// Visits every payload mutably, vacant ones included
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.nodes.values_mut().map(|node| &mut node.value)
    }

    /// Depth-first iteration over all non-vacant payloads with their keys.
    /// Siblings come in insertion order.
    pub fn iter(&self) -> TrieIter<'_, V> {
        TrieIter {
            trie: self,
            stack: vec![(NodeId::ROOT, 0)],
            path: String::new(),
        }
    }

    /// Removes nodes that carry no payload and have no surviving children.
    ///
    /// # Returns
    /// * number of removed nodes
    pub fn compact(&mut self) -> usize {
        let mut keep = vec![false; self.nodes.len()];
        // children are always allocated after their parent, so a reverse
        // scan settles every subtree before its root
        for (id, node) in self.nodes.iter().rev() {
            keep[id.index()] = id == NodeId::ROOT
                || !node.value.is_vacant()
                || node.children.iter().any(|child| keep[child.index()]);
        }
        self.nodes.retain(&keep, |node, map| {
            let children: Vec<NodeId> = node.children.iter().filter_map(|&id| map(id)).collect();
            node.children = children.into_boxed_slice();
        })
    }
}

pub struct TrieIter<'a, V: TrieValue> {
    trie: &'a CharTrie<V>,
    /// (node, byte length of the path above the node)
    stack: Vec<(NodeId, usize)>,
    path: String,
}

impl<'a, V: TrieValue> Iterator for TrieIter<'a, V> {
    type Item = (String, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, prefix_len)) = self.stack.pop() {
            let Some(node) = self.trie.nodes.get(id) else {
                continue;
            };
            self.path.truncate(prefix_len);
            if id != NodeId::ROOT {
                self.path.push(node.ch);
            }
            let child_prefix = self.path.len();
            for &child in node.children.iter().rev() {
                self.stack.push((child, child_prefix));
            }
            if !node.value.is_vacant() {
                return Some((self.path.clone(), &node.value));
            }
        }
        None
    }
}
