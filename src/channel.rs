//! Error channel.
//!
//! Failures that the host should see go through here: they are written to
//! the diagnostic stream (tracing) and forwarded to [`Host::on_error`].

use crate::capability::Host;
use crate::config::BridgeConfig;
use crate::error::DispatchError;
use tracing::{error, warn};

/// Routes failures to diagnostics and the host's error handler
#[derive(Debug, Clone, Copy)]
pub struct ErrorChannel {
    forward: bool,
    capture_traceback: bool,
}

impl ErrorChannel {
    /// Create a channel from the bridge configuration
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            forward: config.forward_errors,
            capture_traceback: config.capture_traceback,
        }
    }

    /// Report a failed dispatch or boot run.
    ///
    /// Never fails; the host callback is expected to return promptly.
    pub fn report(&self, host: &dyn Host, err: &DispatchError) {
        let event = err.event.map_or("boot", |kind| kind.name());

        match err.traceback.as_deref() {
            Some(traceback) if self.capture_traceback => error!(
                event,
                code = %err.code,
                traceback,
                "Error: {}",
                err.message
            ),
            _ => error!(event, code = %err.code, "Error: {}", err.message),
        }

        if self.forward {
            match err.traceback.as_deref() {
                Some(traceback) if self.capture_traceback => {
                    host.on_error(&format!("{}\n{}", err, traceback))
                }
                _ => host.on_error(&err.to_string()),
            }
        }
    }

    /// Forward a message raised explicitly by script code (`OnError`)
    pub fn forward(host: &dyn Host, message: &str) {
        warn!(source = "script", "{}", message);
        host.on_error(message);
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}
