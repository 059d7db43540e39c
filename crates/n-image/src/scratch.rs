// SPDX-License-Identifier: MIT
//
// Scratch memory for encoders.
//
// Sixel needs an indexed copy of the image, iTerm2 needs a PNG, the
// presenter needs a scaled raster. None of it outlives the call that made
// it. The arena doesn't own the memory (every allocation is a plain Vec the
// caller drops) but it owns the budget: allocations are charged against a
// fixed byte limit, and a scope gives the charge back when it ends.

use std::mem::size_of;

use n_term::error::{Error, Result, checked_mul};

/// Default budget: 64 MiB, enough for a full-screen image at 4K.
pub const DEFAULT_BUDGET: usize = 64 * 1024 * 1024;

/// A byte budget for temporary encoder buffers.
#[derive(Debug, Clone)]
pub struct ScratchArena {
    budget: usize,
    used: usize,
}

impl ScratchArena {
    #[must_use]
    pub const fn new(budget: usize) -> Self {
        Self { budget, used: 0 }
    }

    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Bytes charged so far.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.budget - self.used
    }

    fn charge(&mut self, bytes: usize) -> Result<()> {
        if bytes > self.remaining() {
            tracing::debug!(bytes, remaining = self.remaining(), "scratch budget exhausted");
            return Err(Error::Limit("scratch arena exhausted"));
        }
        self.used += bytes;
        Ok(())
    }

    /// `n` zeroed bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Limit`] when the budget can't cover `n` bytes.
    pub fn alloc_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.alloc_zeroed(n)
    }

    /// `n` default values of `T`, charged at `n * size_of::<T>()` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Overflow`] when the byte size overflows, [`Error::Limit`]
    /// when the budget can't cover it.
    pub fn alloc_zeroed<T: Default + Clone>(&mut self, n: usize) -> Result<Vec<T>> {
        self.charge(checked_mul(n, size_of::<T>())?)?;
        Ok(vec![T::default(); n])
    }

    /// An empty byte vector with room for `n` bytes, charged up front.
    ///
    /// # Errors
    ///
    /// [`Error::Limit`] when the budget can't cover `n` bytes.
    pub fn alloc_capacity(&mut self, n: usize) -> Result<Vec<u8>> {
        self.charge(n)?;
        Ok(Vec::with_capacity(n))
    }

    /// Run `f`, then give back everything it charged.
    pub fn scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let mark = self.used;
        let result = f(self);
        self.used = mark;
        result
    }

    /// Give back everything.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

impl Default for ScratchArena {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
