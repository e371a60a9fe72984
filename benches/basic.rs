use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use telnet_uart_bridge::{acknowledgment, MockSerialPort, SerialWriter};

pub fn bench_acknowledgment(c: &mut Criterion) {
    let mut group = c.benchmark_group("acknowledgment");
    for size in [20usize, 256, 1024] {
        let payload = vec![b'~'; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(acknowledgment(black_box(payload))))
        });
    }
    group.finish();
}

pub fn bench_serial_writer(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mock = MockSerialPort::new("BENCH0");
    let (writer, _task) =
        runtime.block_on(async { SerialWriter::spawn(Box::new(mock.clone()), 64) });
    let command = b"~20004642E00200FD37\r".to_vec();

    c.bench_function("serial_writer_roundtrip", |b| {
        b.to_async(&runtime).iter(|| {
            let writer = writer.clone();
            let command = command.clone();
            async move { black_box(writer.write(command).await) }
        });
        mock.clear_write_log();
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_acknowledgment, bench_serial_writer
}
criterion_main!(benches);
