use criterion::{black_box, criterion_group, criterion_main, Criterion};
use namelink_core::{encode_for_signing, Chunk};
use namelink_testkit::vectors::{all_vectors, link_from_vector};

fn canonical_benchmark(c: &mut Criterion) {
    let link = link_from_vector(&all_vectors()[0]);
    let chunk = Chunk::single(None, link.clone());
    let chunk_bytes = chunk.to_bytes();

    c.bench_function("encode_for_signing", |b| {
        b.iter(|| encode_for_signing(black_box(&link.body)))
    });

    c.bench_function("signing_digest", |b| {
        b.iter(|| black_box(&link.body).signing_digest())
    });

    c.bench_function("recover_signer", |b| {
        let digest = link.body.signing_digest();
        b.iter(|| link.signature.recover(black_box(&digest)))
    });

    c.bench_function("chunk_cid", |b| b.iter(|| black_box(&chunk).cid()));

    c.bench_function("decode_chunk", |b| {
        b.iter(|| Chunk::from_bytes(black_box(&chunk_bytes)))
    });
}

criterion_group!(benches, canonical_benchmark);
criterion_main!(benches);
