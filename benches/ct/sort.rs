use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput,
};
use obsort::test_fixture::sort;
use tokio::runtime::Builder;

pub fn criterion_benchmark(c: &mut Criterion) {
    let rt = Builder::new_multi_thread()
        .worker_threads(3)
        .thread_name("store-worker")
        .enable_time()
        .build()
        .expect("Creating runtime failed");

    let mut group = c.benchmark_group("oblivious_sort");
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);

    for batchsize in [32_usize, 64, 128, 256] {
        group.throughput(Throughput::Elements(batchsize as u64));
        group.bench_with_input(
            BenchmarkId::new("sort", batchsize),
            &batchsize,
            |b, &batchsize| {
                b.to_async(&rt).iter(|| sort(black_box(batchsize)));
            },
        );
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
