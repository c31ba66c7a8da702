//! Performance benchmarks for the PDF tools server
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdf_tools_server::archive::zip_entries;
use pdf_tools_server::pdf::{parse_page_range, QpdfWrapper};
use qpdf::{QPdf, QPdfObject, QPdfObjectLike};

/// Generate a document with `pages` letter-sized text pages
fn generated_pdf(pages: usize) -> Vec<u8> {
    let qpdf = QPdf::empty();
    for i in 0..pages {
        let font = qpdf
            .parse_object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>")
            .unwrap();
        let fonts = qpdf.new_dictionary_from([("/F1", font.into_indirect())]);
        let resources = qpdf.new_dictionary_from([("/Font", QPdfObject::from(fonts))]);
        let contents = qpdf.new_stream(format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", i + 1));
        let page = qpdf.new_dictionary_from([
            ("/Type", qpdf.new_name("/Page")),
            ("/MediaBox", qpdf.parse_object("[0 0 612 792]").unwrap()),
            ("/Contents", QPdfObject::from(contents)),
            ("/Resources", QPdfObject::from(resources)),
        ]);
        qpdf.add_page(&page.into_indirect(), false).unwrap();
    }
    qpdf.writer().write_to_memory().unwrap()
}

/// Benchmark range expression parsing
fn bench_range_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_parsing");

    group.bench_function("short", |b| {
        b.iter(|| parse_page_range(black_box("1-3,5,7-9"), 500).unwrap());
    });

    let long: String = (0..200)
        .map(|i| format!("{}-{}", i * 5 + 1, i * 5 + 3))
        .collect::<Vec<_>>()
        .join(",");
    group.bench_function("200_items", |b| {
        b.iter(|| parse_page_range(black_box(&long), 1000).unwrap());
    });

    group.bench_function("wide_range_clamped", |b| {
        b.iter(|| parse_page_range(black_box("1-4000000000"), 1000).unwrap());
    });

    group.finish();
}

/// Benchmark merging batches of generated documents
fn bench_merge(c: &mut Criterion) {
    let doc = generated_pdf(10);
    let mut group = c.benchmark_group("merge");

    for count in [2, 10, 50] {
        let inputs: Vec<&[u8]> = (0..count).map(|_| doc.as_slice()).collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("10_page_docs", count),
            &inputs,
            |b, inputs| {
                b.iter(|| QpdfWrapper::merge(black_box(inputs), |_, _| {}).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark range extraction and positional split
fn bench_split(c: &mut Criterion) {
    let doc = generated_pdf(100);
    let pages = parse_page_range("1-20,40,60-80", 100).unwrap();

    let mut group = c.benchmark_group("split");
    group.throughput(Throughput::Bytes(doc.len() as u64));

    group.bench_function("extract_ranges", |b| {
        b.iter(|| QpdfWrapper::extract_pages(black_box(&doc), &pages).unwrap());
    });

    group.bench_function("split_at_middle", |b| {
        b.iter(|| QpdfWrapper::split_at(black_box(&doc), 50).unwrap());
    });

    group.finish();
}

/// Benchmark zip packaging of page-sized blobs
fn bench_archive(c: &mut Criterion) {
    let blob = vec![0x5Au8; 256 * 1024];
    let names: Vec<String> = (1..=20).map(|i| format!("page_{}.jpg", i)).collect();

    c.bench_function("zip_20_pages", |b| {
        b.iter(|| {
            zip_entries(
                names
                    .iter()
                    .map(|name| (name.as_str(), black_box(blob.as_slice()))),
            )
            .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_range_parsing,
    bench_merge,
    bench_split,
    bench_archive,
);

criterion_main!(benches);
