use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flate2::{write::ZlibEncoder, Compression};
use stingray_tools::{
    chunk::{ChunkReader, ChunkStream},
    codec::{ZlibCodec, CHUNK_LENGTH},
    hasher::hash64,
};

/// 64 compressed chunks of mildly repetitive text
fn chunk_run() -> (Vec<u8>, usize) {
    let text = b"content/units/weapons/sword_01 content/textures/sword_01_df ".repeat(2000);
    let mut out = vec![];

    for piece in text.chunks(CHUNK_LENGTH).cycle().take(64) {
        let mut encoder = ZlibEncoder::new(vec![], Compression::default());
        encoder.write_all(piece).unwrap();
        let compressed = encoder.finish().unwrap();

        out.write_u32::<LittleEndian>(compressed.len() as u32).unwrap();
        out.extend(compressed);
    }

    (out, 64 * CHUNK_LENGTH)
}

fn hash_benchmark(c: &mut Criterion) {
    let names: Vec<String> = (0..1000)
        .map(|i| format!("content/levels/area_{i}/props/crate_{i}"))
        .collect();

    c.bench_function("hash64_names", |b| {
        b.iter(|| {
            black_box(&names)
                .iter()
                .map(|name| hash64(name.as_bytes(), 0))
                .fold(0, u64::wrapping_add)
        })
    });
}

fn stream_benchmark(c: &mut Criterion) {
    let (source, len) = chunk_run();

    let mut group = c.benchmark_group("chunk_stream");
    group.throughput(Throughput::Bytes(len as u64));

    for read_ahead in [1, 2, 8] {
        group.bench_function(format!("read_ahead_{read_ahead}"), |b| {
            b.iter(|| {
                let reader =
                    ChunkReader::new(Cursor::new(black_box(&source)), Box::new(ZlibCodec)).unwrap();
                let mut stream = ChunkStream::new(reader, read_ahead);

                let mut out = Vec::with_capacity(len);
                stream.read_to_end(&mut out).unwrap();
                out.len()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, hash_benchmark, stream_benchmark);
criterion_main!(benches);
