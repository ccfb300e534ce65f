use crate::matrix::Cost;

const ARITY: usize = 4;
const ABSENT: usize = usize::MAX;

/// Indexed 4-ary min-heap over column indices `0..capacity`.
///
/// Each column appears at most once; its key can be lowered in place with
/// [`IndexedHeap::push_or_decrease`]. Ties are broken by column index so that
/// the pop order is deterministic.
#[derive(Debug, Clone)]
pub(crate) struct IndexedHeap {
    nodes: Vec<(Cost, usize)>,
    position: Vec<usize>,
}

impl IndexedHeap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            position: vec![ABSENT; capacity],
        }
    }

    /// Smallest `(key, column)` without removing it
    pub fn peek(&self) -> Option<(Cost, usize)> {
        self.nodes.first().copied()
    }

    pub fn pop(&mut self) -> Option<(Cost, usize)> {
        let last = self.nodes.len().checked_sub(1)?;
        self.swap(0, last);
        let top = self.nodes.pop()?;
        self.position[top.1] = ABSENT;
        if !self.nodes.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    /// Insert `col` with `key`, or lower its key if it is already queued.
    ///
    /// A larger key for a queued column is ignored.
    pub fn push_or_decrease(&mut self, col: usize, key: Cost) {
        match self.position[col] {
            ABSENT => {
                let at = self.nodes.len();
                self.nodes.push((key, col));
                self.position[col] = at;
                self.sift_up(at);
            }
            at if key < self.nodes[at].0 => {
                self.nodes[at].0 = key;
                self.sift_up(at);
            }
            _ => {}
        }
    }

    /// Empty the heap without releasing its storage
    pub fn clear(&mut self) {
        for &(_, col) in &self.nodes {
            self.position[col] = ABSENT;
        }
        self.nodes.clear();
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / ARITY;
            if self.nodes[at] >= self.nodes[parent] {
                break;
            }
            self.swap(at, parent);
            at = parent;
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        let len = self.nodes.len();
        loop {
            let first = at * ARITY + 1;
            if first >= len {
                break;
            }
            let last = (first + ARITY).min(len);
            let mut best = first;
            for child in first + 1..last {
                if self.nodes[child] < self.nodes[best] {
                    best = child;
                }
            }
            if self.nodes[best] >= self.nodes[at] {
                break;
            }
            self.swap(at, best);
            at = best;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.nodes.swap(a, b);
        self.position[self.nodes[a].1] = a;
        self.position[self.nodes[b].1] = b;
    }
}
