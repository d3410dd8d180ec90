//! Allocator adapter for the scripting context.
//!
//! Every byte the Lua state uses comes from a host-provided [`GlobalAlloc`]
//! through [`AllocatorAdapter::resize`], which follows the Lua allocator
//! contract: a request for zero bytes releases the block, anything else
//! allocates or resizes while preserving the old contents.

use serde::Serialize;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

/// Alignment of every block handed to Lua (max fundamental alignment)
pub const BLOCK_ALIGN: usize = 16;

/// Allocation counters for the scripting context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatorStats {
    /// Bytes currently allocated
    pub used_bytes: usize,
    /// Highest value `used_bytes` has reached
    pub peak_bytes: usize,
    /// Number of live blocks
    pub live_blocks: usize,
    /// Requests that could not be satisfied
    pub failed_requests: u64,
}

/// Adapts a host allocator to the Lua `lua_Alloc` contract
pub struct AllocatorAdapter {
    inner: Box<dyn GlobalAlloc>,
    limit: Option<usize>,
    used: Cell<usize>,
    peak: Cell<usize>,
    live: Cell<usize>,
    failures: Cell<u64>,
}

impl AllocatorAdapter {
    /// Create an adapter over `inner`, optionally capping total usage at `limit` bytes
    pub fn new(inner: impl GlobalAlloc + 'static, limit: Option<usize>) -> Self {
        Self {
            inner: Box::new(inner),
            limit,
            used: Cell::new(0),
            peak: Cell::new(0),
            live: Cell::new(0),
            failures: Cell::new(0),
        }
    }

    /// Create an adapter over the system allocator
    pub fn system(limit: Option<usize>) -> Self {
        Self::new(System, limit)
    }

    /// Current counters
    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            used_bytes: self.used.get(),
            peak_bytes: self.peak.get(),
            live_blocks: self.live.get(),
            failed_requests: self.failures.get(),
        }
    }

    /// Configured limit, if any
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Resize `block` from `old_size` to `new_size` bytes.
    ///
    /// A `new_size` of zero releases the block and returns null. When `block`
    /// is null, `old_size` is ignored (Lua passes an object tag there) and a
    /// fresh block is allocated. On failure null is returned and the original
    /// block is left untouched.
    ///
    /// # Safety
    /// `block` must be null or a live block returned by this adapter whose
    /// current size is `old_size`.
    pub unsafe fn resize(&self, block: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        if new_size == 0 {
            if !block.is_null() {
                // SAFETY: caller guarantees block/old_size came from this adapter
                unsafe { self.release(block, old_size) };
            }
            return ptr::null_mut();
        }

        let Ok(new_layout) = Layout::from_size_align(new_size, BLOCK_ALIGN) else {
            return self.fail();
        };

        if block.is_null() {
            if !self.admits(0, new_size) {
                return self.fail();
            }
            // SAFETY: new_layout has a non-zero size
            let fresh = unsafe { self.inner.alloc(new_layout) };
            if fresh.is_null() {
                return self.fail();
            }
            self.live.set(self.live.get() + 1);
            self.account(0, new_size);
            return fresh;
        }

        // Shrinking never fails the limit check
        if new_size > old_size && !self.admits(old_size, new_size) {
            return self.fail();
        }

        // SAFETY: block was allocated by this adapter with this exact layout
        let resized = unsafe {
            let old_layout = Layout::from_size_align_unchecked(old_size, BLOCK_ALIGN);
            self.inner.realloc(block, old_layout, new_size)
        };
        if resized.is_null() {
            return self.fail();
        }
        self.account(old_size, new_size);
        resized
    }

    unsafe fn release(&self, block: *mut u8, size: usize) {
        // SAFETY: forwarded from resize
        unsafe {
            let layout = Layout::from_size_align_unchecked(size, BLOCK_ALIGN);
            self.inner.dealloc(block, layout);
        }
        self.live.set(self.live.get().saturating_sub(1));
        self.used.set(self.used.get().saturating_sub(size));
    }

    fn admits(&self, old_size: usize, new_size: usize) -> bool {
        match self.limit {
            None => true,
            Some(limit) => {
                let projected = self.used.get().saturating_sub(old_size).saturating_add(new_size);
                projected <= limit
            }
        }
    }

    fn account(&self, old_size: usize, new_size: usize) {
        let used = self.used.get().saturating_sub(old_size) + new_size;
        self.used.set(used);
        if used > self.peak.get() {
            self.peak.set(used);
        }
    }

    fn fail(&self) -> *mut u8 {
        self.failures.set(self.failures.get() + 1);
        ptr::null_mut()
    }
}

impl std::fmt::Debug for AllocatorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocatorAdapter")
            .field("limit", &self.limit)
            .field("stats", &self.stats())
            .finish()
    }
}

/// `lua_Alloc` entry point; `ud` points at the context's [`AllocatorAdapter`]
pub(crate) unsafe extern "C-unwind" fn lua_alloc(
    ud: *mut c_void,
    block: *mut c_void,
    old_size: usize,
    new_size: usize,
) -> *mut c_void {
    // SAFETY: ud is the boxed adapter owned by the context, which outlives the state
    let adapter = unsafe { &*(ud as *const AllocatorAdapter) };
    // SAFETY: Lua only hands back blocks this adapter produced, with their real size
    unsafe { adapter.resize(block.cast(), old_size, new_size).cast() }
}
