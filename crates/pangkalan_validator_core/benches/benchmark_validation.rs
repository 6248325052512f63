use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pangkalan_core::{default_runner, sanitize, validate_value, DocumentInput};
use serde_json::{json, Value};

fn generate_document(count: usize) -> Value {
    let features: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "type": "Feature",
                "properties": {
                    "nama_lokasi": format!("  Pangkalan {}  ", i % (count / 2 + 1)),
                    "jenis_lokasi": "Minimarket",
                    "jam_ramainya": "06:00 - 10:00 & 16:00 - 20:00",
                    "tingkat_kepadatan": (i % 5) + 1,
                    "tingkat_keamanan": 3,
                    "akses_internet": 4.4,
                    "kenyamanan": 2,
                    "fasilitas": "Tempat duduk",
                    "alamat": format!("Jl. Contoh No.{}", i)
                },
                "geometry": {
                    "type": "Point",
                    "coordinates": [106.0 + (i as f64) * 0.0001, -6.0 - (i as f64) * 0.0001]
                }
            })
        })
        .collect();
    json!({"type": "FeatureCollection", "features": features})
}

fn benchmark_validation(c: &mut Criterion) {
    let document = generate_document(5_000);
    let runner = default_runner();

    c.bench_function("validate_5000_locations", |b| {
        b.iter(|| validate_value(black_box(&document), &runner))
    });

    let input = DocumentInput::from_value(&document).unwrap();
    c.bench_function("sanitize_5000_locations", |b| {
        b.iter(|| sanitize(black_box(&input)))
    });
}

criterion_group!(benches, benchmark_validation);
criterion_main!(benches);
