//! The scripting context.
//!
//! A [`ScriptContext`] owns the single Lua state, the allocator adapter that
//! backs it, and (through the state's application data) the callback
//! registry. Entry points borrow it; nothing reaches the state any other way.

use crate::alloc::{lua_alloc, AllocatorAdapter, AllocatorStats};
use crate::error::{BridgeError, Result};
use crate::registry::{self, EventKind};
use mlua::{ffi, Function, Lua, StdLib, Table};
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use tracing::{debug, warn};
use uuid::Uuid;

/// Exclusively owned embedded Lua runtime
pub struct ScriptContext {
    /// Unique context ID, used as a tracing field
    id: Uuid,
    /// Handle over the raw state; dropped before the state is closed
    lua: ManuallyDrop<Lua>,
    /// Raw state created over `allocator`
    state: *mut ffi::lua_State,
    /// Backing allocator; must outlive `state`
    allocator: Box<AllocatorAdapter>,
    /// Set after an allocation failure
    poisoned: bool,
}

impl ScriptContext {
    /// Create a context whose memory comes from `allocator`.
    ///
    /// Opens the safe standard libraries and installs an empty callback
    /// registry.
    pub fn new(allocator: AllocatorAdapter) -> Result<Self> {
        let allocator = Box::new(allocator);
        let ud = &*allocator as *const AllocatorAdapter as *mut c_void;

        // SAFETY: the adapter is boxed, so `ud` stays valid until the state is
        // closed in Drop, which happens before the box is freed.
        let state = unsafe { ffi::lua_newstate(lua_alloc, ud) };
        if state.is_null() {
            return Err(BridgeError::AllocationFailed);
        }

        // SAFETY: `state` is a fresh main state; ownership stays with us and
        // it is closed exactly once in Drop.
        let lua = unsafe { Lua::init_from_ptr(state) };

        let context = Self {
            id: Uuid::new_v4(),
            lua: ManuallyDrop::new(lua),
            state,
            allocator,
            poisoned: false,
        };

        // `load_std_libs` leaves out the base library; open it in protected mode
        // so an allocation failure surfaces as an error instead of aborting.
        // SAFETY: luaopen_base only populates the global table.
        let open_base = unsafe { context.lua.create_c_function(ffi::luaopen_base) }?;
        open_base.call::<()>(())?;
        context.lua.load_std_libs(StdLib::ALL_SAFE)?;
        registry::install(&context.lua);

        debug!(
            context_id = %context.id,
            used_bytes = context.allocator.stats().used_bytes,
            "Scripting context created"
        );

        Ok(context)
    }

    /// Context ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The Lua state
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Allocation counters
    pub fn memory(&self) -> AllocatorStats {
        self.allocator.stats()
    }

    /// Whether an allocation failure has made the context unusable
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Mark the context unusable
    pub fn poison(&mut self) {
        if !self.poisoned {
            warn!(context_id = %self.id, "Scripting context poisoned by allocation failure");
        }
        self.poisoned = true;
    }

    /// Register or clear the callable for `kind`
    pub fn set_callback(&self, kind: EventKind, callable: Option<Function>) -> Result<()> {
        Ok(registry::set_callback(&self.lua, kind, callable)?)
    }

    /// Callable registered for `kind`
    pub fn callback(&self, kind: EventKind) -> Result<Option<Function>> {
        Ok(registry::callback(&self.lua, kind)?)
    }

    /// Replace the Main Object
    pub fn set_main_object(&self, object: Option<Table>) -> Result<()> {
        Ok(registry::set_main_object(&self.lua, object)?)
    }

    /// Current Main Object
    pub fn main_object(&self) -> Result<Option<Table>> {
        Ok(registry::main_object(&self.lua)?)
    }

    /// Event kinds that currently have a callable
    pub fn registered_events(&self) -> Result<Vec<EventKind>> {
        Ok(registry::registered_events(&self.lua)?)
    }
}

impl Drop for ScriptContext {
    fn drop(&mut self) {
        // SAFETY: `lua` is not used again; it does not own the state, so the
        // state is closed here, while the allocator box is still alive.
        unsafe {
            ManuallyDrop::drop(&mut self.lua);
            ffi::lua_close(self.state);
        }
        debug!(context_id = %self.id, "Scripting context closed");
    }
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("id", &self.id)
            .field("allocator", &self.allocator)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
