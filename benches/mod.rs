use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    telemetry::bench_serialize,
    telemetry::bench_serialize_multiple_sets,
    c2d::bench_parse_command,
    c2d::bench_parse_ota,
    c2d::bench_receive_and_ack
);
criterion_main!(benches);
