use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pointscope_3d::vertex::{decode_vertices, ScalarType, VertexLayout, VertexProperty};

// x y z as float32, red green blue as uint8, nx ny nz as float32
fn xyz_rgb_normals_layout() -> VertexLayout {
    let mut properties = vec![
        VertexProperty::new("x", 0, ScalarType::Float32),
        VertexProperty::new("y", 4, ScalarType::Float32),
        VertexProperty::new("z", 8, ScalarType::Float32),
        VertexProperty::new("red", 12, ScalarType::UInt8),
        VertexProperty::new("green", 13, ScalarType::UInt8),
        VertexProperty::new("blue", 14, ScalarType::UInt8),
    ];
    for (i, name) in ["nx", "ny", "nz"].iter().enumerate() {
        properties.push(VertexProperty::new(*name, 15 + i * 4, ScalarType::Float32));
    }
    VertexLayout::new(27, properties, true).unwrap()
}

fn bench_decode_vertices(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_vertices");
    let layout = xyz_rgb_normals_layout();

    for num_vertices in [1_000, 100_000, 1_000_000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_vertices as u64));

        let buffer = (0..num_vertices * layout.stride())
            .map(|i| (i % 251) as u8)
            .collect::<Vec<_>>();

        group.bench_with_input(
            BenchmarkId::new("xyz_rgb_normals", num_vertices),
            &buffer,
            |b, buf| b.iter(|| black_box(decode_vertices(Some(buf.as_slice()), &layout))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode_vertices);
criterion_main!(benches);
