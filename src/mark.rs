//! Pooled boolean flags attached to darts.
//!
//! Traversals need to remember which darts they've already visited,
//! and incidence/adjacency tests need to remember which darts belong to a cell.
//! Rather than allocating a visited set per call, a map owns a small pool of marks
//! that are reserved for the duration of one operation and released afterwards.
//! Several marks may be reserved at once, which is what makes nested traversals
//! (e.g. walking one cell while another is marked) possible.

use fixedbitset as fb;
use std::cell::RefCell;

use crate::{map::DartId, CmapError};

/// The maximum number of marks that can be reserved simultaneously.
pub const MAX_MARKS: usize = 32;

/// Identifier of a reserved mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkToken(u8);

impl MarkToken {
    /// Index of the mark in the pool, in `0..MAX_MARKS`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage for all marks of one map.
///
/// Tokens are only reserved and released through [`Mark`] guards:
/// ```compile_fail
/// let mut pool = combimap::MarkPool::default();
/// let token = pool.acquire();
/// ```
#[derive(Clone, Debug)]
pub struct MarkPool {
    /// bit `t` is set when token `t` is reserved
    in_use: u32,
    /// one bitset per token, indexed by dart slot.
    /// grown lazily, so darts created after a bitset was last touched
    /// simply read as unmarked
    bits: Vec<fb::FixedBitSet>,
    /// number of set bits per token, so that release can check for leftovers
    /// without scanning the whole bitset
    marked: [usize; MAX_MARKS],
}

impl Default for MarkPool {
    fn default() -> Self {
        Self {
            in_use: 0,
            bits: (0..MAX_MARKS).map(|_| fb::FixedBitSet::new()).collect(),
            marked: [0; MAX_MARKS],
        }
    }
}

impl MarkPool {
    /// Reserve a free token.
    pub(crate) fn acquire(&mut self) -> Result<MarkToken, CmapError> {
        let free = self.in_use.trailing_ones() as usize;
        if free >= MAX_MARKS {
            return Err(CmapError::PoolExhausted);
        }
        self.in_use |= 1 << free;
        Ok(MarkToken(free as u8))
    }

    /// Return a token to the free set.
    ///
    /// Any darts still carrying the mark are unmarked here,
    /// so a released token is always clean when it's handed out again.
    pub(crate) fn release(&mut self, token: MarkToken) {
        let t = token.index();
        if self.marked[t] != 0 {
            log::warn!(
                "mark {t} released with {} darts still marked, clearing",
                self.marked[t]
            );
            self.bits[t].clear();
            self.marked[t] = 0;
        }
        self.in_use &= !(1 << t);
    }

    /// Mark a dart. Returns whether it was already marked.
    #[inline]
    pub fn set(&mut self, dart: DartId, token: MarkToken) -> bool {
        let t = token.index();
        let bits = &mut self.bits[t];
        if dart.index() >= bits.len() {
            bits.grow(dart.index() + 1);
        }
        let was_set = bits.put(dart.index());
        if !was_set {
            self.marked[t] += 1;
        }
        was_set
    }

    /// Unmark a dart. Returns whether it was marked.
    #[inline]
    pub fn clear(&mut self, dart: DartId, token: MarkToken) -> bool {
        let t = token.index();
        let bits = &mut self.bits[t];
        if !bits.contains(dart.index()) {
            return false;
        }
        bits.set(dart.index(), false);
        self.marked[t] -= 1;
        true
    }

    /// Check whether a dart carries a mark.
    #[inline]
    pub fn test(&self, dart: DartId, token: MarkToken) -> bool {
        self.bits[token.index()].contains(dart.index())
    }

    /// Number of darts currently carrying a mark.
    #[inline]
    pub fn marked_count(&self, token: MarkToken) -> usize {
        self.marked[token.index()]
    }

    /// Number of tokens currently reserved.
    #[inline]
    pub fn reserved_count(&self) -> usize {
        self.in_use.count_ones() as usize
    }

    /// Drop a dart from every mark, used when the dart is removed from its map.
    pub(crate) fn forget(&mut self, dart: DartId) {
        for t in 0..MAX_MARKS {
            if self.bits[t].contains(dart.index()) {
                self.bits[t].set(dart.index(), false);
                self.marked[t] -= 1;
            }
        }
    }
}

/// A reserved mark, released when dropped.
///
/// Obtained from [`CombinatorialMap::reserve_mark`][crate::CombinatorialMap::reserve_mark].
/// Because the guard borrows the map immutably,
/// the map cannot be mutated while any mark is held.
#[derive(Debug)]
pub struct Mark<'a> {
    pool: &'a RefCell<MarkPool>,
    token: MarkToken,
}

impl<'a> Mark<'a> {
    pub(crate) fn reserve(pool: &'a RefCell<MarkPool>) -> Result<Self, CmapError> {
        let token = pool.borrow_mut().acquire()?;
        Ok(Self { pool, token })
    }

    /// The token this guard holds.
    #[inline]
    pub fn token(&self) -> MarkToken {
        self.token
    }

    /// Mark a dart. Returns whether it was already marked.
    #[inline]
    pub fn set(&self, dart: DartId) -> bool {
        self.pool.borrow_mut().set(dart, self.token)
    }

    /// Unmark a dart. Returns whether it was marked.
    #[inline]
    pub fn clear(&self, dart: DartId) -> bool {
        self.pool.borrow_mut().clear(dart, self.token)
    }

    /// Check whether a dart is marked.
    #[inline]
    pub fn test(&self, dart: DartId) -> bool {
        self.pool.borrow().test(dart, self.token)
    }

    /// Number of darts currently marked.
    #[inline]
    pub fn count(&self) -> usize {
        self.pool.borrow().marked_count(self.token)
    }
}

impl Drop for Mark<'_> {
    fn drop(&mut self) {
        self.pool.borrow_mut().release(self.token);
    }
}
