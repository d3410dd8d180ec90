//! Callback registry.
//!
//! The registry maps each [`EventKind`] to at most one script callable and
//! holds the Main Object, the receiver passed first to every callback. It is
//! stored as application data on the Lua state, so the scripting context owns
//! it and nothing else keeps a reference to it.

use mlua::{AppDataRef, AppDataRefMut, Function, Lua, RegistryKey, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved name of the Main Object slot; never a valid event name
pub const MAIN_OBJECT_KEY: &str = "MainObject";

/// Events the host can dispatch into script code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Fired once after the bootstrap script has run
    OnInit,
    /// Fired every frame while the drawing surface is open
    OnFrame,
    /// Key pressed
    OnKeyDown,
    /// Key released
    OnKeyUp,
    /// Text input
    OnChar,
}

impl EventKind {
    /// Every event kind, in slot order
    pub const ALL: [EventKind; 5] = [
        EventKind::OnInit,
        EventKind::OnFrame,
        EventKind::OnKeyDown,
        EventKind::OnKeyUp,
        EventKind::OnChar,
    ];

    /// Number of event kinds
    pub const COUNT: usize = Self::ALL.len();

    /// Name scripts use to register a handler for this event
    pub fn name(self) -> &'static str {
        match self {
            EventKind::OnInit => "OnInit",
            EventKind::OnFrame => "OnFrame",
            EventKind::OnKeyDown => "OnKeyDown",
            EventKind::OnKeyUp => "OnKeyUp",
            EventKind::OnChar => "OnChar",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a name does not match any [`EventKind`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown callback name '{0}'")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Registration table owned by the scripting context
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    callbacks: [Option<RegistryKey>; EventKind::COUNT],
    main_object: Option<RegistryKey>,
}

impl CallbackRegistry {
    /// Swap the handle stored for `kind`, returning the previous one
    fn replace_callback(
        &mut self,
        kind: EventKind,
        key: Option<RegistryKey>,
    ) -> Option<RegistryKey> {
        std::mem::replace(&mut self.callbacks[kind.slot()], key)
    }

    fn replace_main_object(&mut self, key: Option<RegistryKey>) -> Option<RegistryKey> {
        std::mem::replace(&mut self.main_object, key)
    }

    /// Whether a callable is registered for `kind`
    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.callbacks[kind.slot()].is_some()
    }

    /// Event kinds that currently have a callable
    pub fn registered(&self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| self.is_registered(*kind))
            .collect()
    }
}

/// Install an empty registry into `lua`
pub fn install(lua: &Lua) {
    lua.set_app_data(CallbackRegistry::default());
}

fn registry(lua: &Lua) -> mlua::Result<AppDataRef<'_, CallbackRegistry>> {
    lua.app_data_ref::<CallbackRegistry>()
        .ok_or_else(|| mlua::Error::RuntimeError("callback registry is not installed".into()))
}

fn registry_mut(lua: &Lua) -> mlua::Result<AppDataRefMut<'_, CallbackRegistry>> {
    lua.app_data_mut::<CallbackRegistry>()
        .ok_or_else(|| mlua::Error::RuntimeError("callback registry is not installed".into()))
}

/// Store or clear the callable for `kind`.
///
/// The change is visible to the next lookup. A dispatch already in flight
/// holds its own handle to the previous callable and is unaffected.
pub fn set_callback(lua: &Lua, kind: EventKind, callable: Option<Function>) -> mlua::Result<()> {
    let key = callable
        .map(|f| lua.create_registry_value(f))
        .transpose()?;
    // The borrow is released before touching the Lua registry again
    let previous = registry_mut(lua)?.replace_callback(kind, key);
    if let Some(previous) = previous {
        lua.remove_registry_value(previous)?;
    }
    Ok(())
}

/// Current callable for `kind`, if any
pub fn callback(lua: &Lua, kind: EventKind) -> mlua::Result<Option<Function>> {
    let registry = registry(lua)?;
    match &registry.callbacks[kind.slot()] {
        Some(key) => lua.registry_value::<Function>(key).map(Some),
        None => Ok(None),
    }
}

/// Replace the Main Object
pub fn set_main_object(lua: &Lua, object: Option<Table>) -> mlua::Result<()> {
    let key = object
        .map(|t| lua.create_registry_value(t))
        .transpose()?;
    let previous = registry_mut(lua)?.replace_main_object(key);
    if let Some(previous) = previous {
        lua.remove_registry_value(previous)?;
    }
    Ok(())
}

/// Current Main Object, if any
pub fn main_object(lua: &Lua) -> mlua::Result<Option<Table>> {
    let registry = registry(lua)?;
    match &registry.main_object {
        Some(key) => lua.registry_value::<Table>(key).map(Some),
        None => Ok(None),
    }
}

/// Event kinds that currently have a callable
pub fn registered_events(lua: &Lua) -> mlua::Result<Vec<EventKind>> {
    Ok(registry(lua)?.registered())
}
