pub mod arena;
pub mod trie;
