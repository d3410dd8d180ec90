#[allow(dead_code)]
#[path = "../../src/test_support.rs"]
mod test_support;

pub use test_support::{CountingDraw, RecordingHost};

use driver_bridge::{Bridge, BridgeConfig};
use std::rc::Rc;

pub struct Harness {
    pub bridge: Bridge,
    pub host: Rc<RecordingHost>,
    pub draw: Rc<CountingDraw>,
}

pub fn harness(config: BridgeConfig) -> Harness {
    let host = Rc::new(RecordingHost::new());
    let draw = Rc::new(CountingDraw::default());
    let bridge = Bridge::init(config, host.clone(), draw.clone()).unwrap();
    Harness { bridge, host, draw }
}
