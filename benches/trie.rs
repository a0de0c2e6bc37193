use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mtree_index::{Content, HashAlgorithm, MerkleTrie};

fn contents(count: usize) -> Vec<Content> {
    (0..count)
        .map(|i| Content::new(format!("key-{:08}", i), format!("value-{}", i)))
        .collect()
}

fn add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    for alg in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
        for count in [100, 1_000, 10_000] {
            let data = contents(count);
            group.bench_with_input(BenchmarkId::new(alg.name(), count), &data, |b, data| {
                b.iter(|| MerkleTrie::from_contents(alg, data.iter().cloned()).unwrap())
            });
        }
    }
    group.finish();
}

fn merkle_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle_path");
    for count in [1_000, 100_000] {
        let data = contents(count);
        let trie = MerkleTrie::from_contents(HashAlgorithm::Sha256, data.iter().cloned()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % data.len();
                black_box(trie.merkle_path(&data[i]).unwrap())
            })
        });
    }
    group.finish();
}

fn update(c: &mut Criterion) {
    let data = contents(10_000);
    let mut trie = MerkleTrie::from_contents(HashAlgorithm::Sha256, data.iter().cloned()).unwrap();
    let mut round = 0u64;
    c.bench_function("update/10000", |b| {
        b.iter(|| {
            round += 1;
            let key = &data[(round as usize) % data.len()].key;
            trie.update(Content::new(key.as_str(), round.to_le_bytes()))
                .unwrap()
        })
    });
}

criterion_group!(benches, add, merkle_path, update);
criterion_main!(benches);
