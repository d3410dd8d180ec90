//! Synchronous host surface.
//!
//! Hosts that call the bridge from a plain event loop use [`BlockingBridge`]:
//! each entry point drives the async [`Bridge`] to completion on a private
//! current-thread runtime and returns the numeric status (`0` or `1`).
//! A pending `Paste` is resolved on that runtime before the call returns.

use crate::bridge::Bridge;
use crate::capability::Host;
use crate::config::BridgeConfig;
use crate::draw::DrawSubsystem;
use crate::error::Result;
use std::rc::Rc;
use tokio::runtime::{Builder, Runtime};

/// [`Bridge`] with blocking entry points
pub struct BlockingBridge {
    bridge: Bridge,
    runtime: Runtime,
}

impl BlockingBridge {
    /// Create the scripting context and install every host function
    pub fn init(
        config: BridgeConfig,
        host: Rc<dyn Host>,
        draw: Rc<dyn DrawSubsystem>,
    ) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let bridge = Bridge::init(config, host, draw)?;
        Ok(Self { bridge, runtime })
    }

    /// Run the bootstrap script, `OnInit`, and one frame
    pub fn start(&mut self, boot_source: &str) -> i32 {
        self.runtime.block_on(self.bridge.start(boot_source)).code()
    }

    /// Run one frame
    pub fn on_frame(&mut self) -> i32 {
        self.runtime.block_on(self.bridge.on_frame()).code()
    }

    /// Dispatch `OnKeyDown`
    pub fn on_key_down(&mut self, key: &str, is_repeat: bool) -> i32 {
        self.runtime
            .block_on(self.bridge.on_key_down(key, is_repeat))
            .code()
    }

    /// Dispatch `OnKeyUp`; `None` omits the repeat flag from the call
    pub fn on_key_up(&mut self, key: &str, is_repeat: Option<bool>) -> i32 {
        self.runtime
            .block_on(self.bridge.on_key_up(key, is_repeat))
            .code()
    }

    /// Dispatch `OnChar`
    pub fn on_char(&mut self, text: &str, is_repeat: bool) -> i32 {
        self.runtime
            .block_on(self.bridge.on_char(text, is_repeat))
            .code()
    }

    /// The underlying async bridge
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::status_codes;
    use crate::test_support::{CountingDraw, RecordingHost};

    #[test]
    fn test_blocking_entry_points() {
        let host = Rc::new(RecordingHost::new());
        *host.clipboard.borrow_mut() = Some("pasted".to_string());
        let mut bridge = BlockingBridge::init(
            BridgeConfig::default(),
            host.clone(),
            Rc::new(CountingDraw::default()),
        )
        .unwrap();

        let boot = r#"
            SetMainObject({})
            SetCallback("OnKeyDown", function(self, key) self.text = Paste() .. key end)
            SetCallback("OnKeyUp", function(self, key) error("released " .. key) end)
        "#;
        assert_eq!(bridge.start(boot), status_codes::SUCCESS);
        assert_eq!(bridge.on_key_down("!", false), status_codes::SUCCESS);
        assert_eq!(bridge.on_key_up("!", None), status_codes::FAILURE);
        assert_eq!(bridge.on_char("x", false), status_codes::SUCCESS);
        assert_eq!(bridge.on_frame(), status_codes::SUCCESS);

        let main = bridge.bridge().context().main_object().unwrap().unwrap();
        assert_eq!(main.get::<String>("text").unwrap(), "pasted!");
        assert_eq!(host.commits.borrow().len(), 2);
    }
}
