use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use focus_core::config::SessionConfig;
use focus_core::framer::PassthroughFramer;
use focus_core::receiver::Receiver;
use focus_core::transmitter::Transmitter;

fn config_for(nsubchannels: usize, shape: (usize, usize)) -> SessionConfig {
    SessionConfig {
        nsubchannels,
        shape,
        ..SessionConfig::default()
    }
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("transmitter_encode");
    for &nsub in &[4usize, 16, 32] {
        let config = config_for(nsub, (512, 512));
        let framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let tx = Transmitter::new(config.clone(), framer).unwrap();
        let per_channel = config.data_bytes_per_subchannel();
        let data = vec![0xA5u8; nsub * per_channel];

        group.bench_with_input(BenchmarkId::from_parameter(nsub), &data, |b, data| {
            b.iter(|| black_box(tx.encode(black_box(data)).unwrap()))
        });
    }
    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("receiver_decode");
    for &nsub in &[4usize, 16, 32] {
        let config = config_for(nsub, (512, 512));
        let tx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let tx = Transmitter::new(config.clone(), tx_framer).unwrap();
        let per_channel = config.data_bytes_per_subchannel();
        let data = vec![0x3Cu8; nsub * per_channel];
        let frame = tx.encode(&data).unwrap();

        let rx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let mut recv = Receiver::new(config, rx_framer, false).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(nsub), &frame, |b, frame| {
            b.iter(|| black_box(recv.decode(black_box(frame)).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
