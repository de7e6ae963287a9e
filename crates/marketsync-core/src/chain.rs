//! Chain window — a sliding window of recent block headers that turns
//! parent-hash mismatches into the invalidated-hash list fix callbacks need.

use std::collections::VecDeque;

/// A block header reference: number, hash, parent hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    pub number: u64,
    /// Block hash (`0x…`).
    pub hash: String,
    /// Parent block hash (`0x…`).
    pub parent_hash: String,
}

impl BlockRef {
    pub fn new(
        number: u64,
        hash: impl Into<String>,
        parent_hash: impl Into<String>,
    ) -> Self {
        Self {
            number,
            hash: hash.into(),
            parent_hash: parent_hash.into(),
        }
    }

    /// Returns `true` if `parent` is the direct parent of `self`.
    pub fn extends(&self, parent: &BlockRef) -> bool {
        self.number == parent.number + 1 && self.parent_hash == parent.hash
    }
}

/// Tracks the last N block headers for reorg detection.
///
/// `push` either appends the block or, on a parent-hash mismatch, rewinds
/// the window to the fork point and returns the dropped blocks (newest
/// first) so the caller can issue fix callbacks for each invalidated hash.
pub struct ChainWindow {
    /// Recent blocks, oldest first.
    window: VecDeque<BlockRef>,
    /// Maximum number of blocks to retain. 128 covers deep reorgs on all
    /// major EVM chains.
    capacity: usize,
}

impl ChainWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Try to extend the window with `block`.
    ///
    /// On success the block becomes the new head. On a mismatch the window
    /// is rewound to the fork point, `block` is NOT appended (the caller
    /// re-fetches the new branch from the fork height), and the dropped
    /// blocks are returned newest first. If the fork point is older than
    /// the window, the whole window is dropped.
    pub fn push(&mut self, block: BlockRef) -> Result<(), Vec<BlockRef>> {
        match self.window.back() {
            None => {
                self.window.push_back(block);
                Ok(())
            }
            Some(head) if block.extends(head) => {
                if self.window.len() >= self.capacity {
                    self.window.pop_front();
                }
                self.window.push_back(block);
                Ok(())
            }
            Some(_) => {
                let mut dropped = Vec::new();
                while let Some(back) = self.window.back() {
                    if back.hash == block.parent_hash && back.number + 1 == block.number {
                        break;
                    }
                    dropped.push(self.window.pop_back().unwrap());
                }
                Err(dropped)
            }
        }
    }

    /// Current head (most recently accepted block).
    pub fn head(&self) -> Option<&BlockRef> {
        self.window.back()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
