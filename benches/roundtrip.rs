use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use niml::{parse, to_bytes, DataElement, Element, Form, Matrix, NumericData};

fn node_data(rows: usize) -> Element {
    let values: Vec<f32> = (0..rows * 3).map(|i| i as f32 * 0.25).collect();
    let matrix = Matrix::new(rows, 3, NumericData::Float(values)).unwrap();
    DataElement::matrix("node_data", matrix)
        .with_attr("dset_type", "Node_Bucket")
        .into()
}

fn benchmark_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    for rows in [100, 1_000, 10_000] {
        let element = node_data(rows);
        for (label, form) in [
            ("text", Form::Text),
            ("binary", Form::binary_native()),
            ("base64", Form::base64_native()),
        ] {
            group.bench_with_input(
                BenchmarkId::new(label, rows),
                &element,
                |b, element| {
                    b.iter(|| to_bytes(black_box(std::slice::from_ref(element)), form))
                },
            );
        }
    }
    group.finish();
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for rows in [100, 1_000, 10_000] {
        let element = node_data(rows);
        for (label, form) in [
            ("text", Form::Text),
            ("binary", Form::binary_native()),
            ("base64", Form::base64_native()),
        ] {
            let bytes = to_bytes(std::slice::from_ref(&element), form).unwrap();
            group.bench_with_input(BenchmarkId::new(label, rows), &bytes, |b, bytes| {
                b.iter(|| parse(black_box(bytes)))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_serialize, benchmark_parse);
criterion_main!(benches);
