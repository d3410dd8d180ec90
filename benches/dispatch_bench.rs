use criterion::{criterion_group, criterion_main, Criterion};
use driver_bridge::{Bridge, BridgeConfig, CommandEncoder, NullHost};
use std::rc::Rc;
use tokio::runtime::Builder;

const BOOT: &str = r#"
SetMainObject({ keys = 0 })
SetCallback("OnKeyDown", function(self, key, is_repeat) self.keys = self.keys + 1 end)
SetCallback("OnFrame", function(self)
    SetColor(255, 255, 255)
    for i = 1, 16 do DrawImage(0, i * 4, i * 4, 8, 8) end
end)
"#;

fn bench_dispatch(c: &mut Criterion) {
    let runtime = Builder::new_current_thread().enable_all().build().unwrap();
    let mut bridge = Bridge::init(
        BridgeConfig::default(),
        Rc::new(NullHost),
        Rc::new(CommandEncoder::new()),
    )
    .unwrap();
    runtime.block_on(bridge.start(BOOT));

    c.bench_function("on_key_down", |b| {
        b.iter(|| runtime.block_on(bridge.on_key_down("a", false)))
    });

    c.bench_function("on_char_no_handler", |b| {
        b.iter(|| runtime.block_on(bridge.on_char("a", false)))
    });

    c.bench_function("on_frame", |b| {
        b.iter(|| runtime.block_on(bridge.on_frame()))
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
