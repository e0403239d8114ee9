//! Benchmarks for prompt extraction at varying payload sizes.
//!
//! Run with: `cargo bench --bench content_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vidmaker::content::{collapse_blank_lines, extract_text, ContentRouter};

/// Generate a realistic HTML document of approximately `target_bytes`.
///
/// Produces a well-formed document with headings, paragraphs, lists and the
/// script/style blocks the extractor has to skip.
fn generate_html(target_bytes: usize) -> String {
    let header = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"><title>Benchmark Page</title>
<style>body { font-family: sans-serif; } .hidden { display: none; }</style>
<script>window.analytics = { track: function () { return 1; } };</script>
</head>
<body>
<main>
"#;

    let footer = r#"
</main>
<script>document.querySelectorAll("p").forEach(function (p) { p.dataset.seen = 1; });</script>
</body>
</html>"#;

    let paragraph = "<p>Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
        Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \
        Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris.</p>\n\n";

    let heading = "<h2>Section Heading</h2>\n\n";

    let inline_script = "<script>console.log('inline');</script>\n";

    let list_block = "<ul>\n\
        <li>First item with some text</li>\n\
        <li>Second item with more text</li>\n\
        <li>Third item closing out the list</li>\n\
        </ul>\n\n\n\n";

    let mut html = String::with_capacity(target_bytes + 1024);
    html.push_str(header);

    let blocks = [
        heading, paragraph, paragraph, inline_script, list_block, paragraph,
    ];
    let mut block_idx = 0;

    while html.len() < target_bytes {
        html.push_str(blocks[block_idx % blocks.len()]);
        block_idx += 1;
    }

    html.push_str(footer);
    html
}

fn bench_extract_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_text");

    let sizes: &[(usize, &str)] = &[
        (1_024, "1KB"),
        (10_240, "10KB"),
        (51_200, "50KB"),
        (204_800, "200KB"),
    ];

    for &(size, label) in sizes {
        let html = generate_html(size);

        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("extract", label), &html, |b, html| {
            b.iter(|| black_box(extract_text(black_box(html))));
        });
    }

    group.finish();
}

fn bench_content_router_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_router_dispatch");

    // Small HTML payload: router overhead + extraction
    let small_html = generate_html(1_024);
    let small_bytes = small_html.as_bytes();

    group.bench_function("html_1kb", |b| {
        let router = ContentRouter::new();
        b.iter(|| black_box(router.convert(black_box(small_bytes), "text/html")));
    });

    let medium_html = generate_html(51_200);
    let medium_bytes = medium_html.as_bytes();

    group.bench_function("html_50kb", |b| {
        let router = ContentRouter::new();
        b.iter(|| black_box(router.convert(black_box(medium_bytes), "text/html")));
    });

    // Plain text (passthrough, baseline)
    let plain = "Hello, world! This is plain text content.\n\n\n".repeat(25);
    let plain_bytes = plain.as_bytes();

    group.bench_function("plain_text_1kb", |b| {
        let router = ContentRouter::new();
        b.iter(|| black_box(router.convert(black_box(plain_bytes), "text/plain")));
    });

    group.bench_function("html_with_charset", |b| {
        let router = ContentRouter::new();
        b.iter(|| {
            black_box(router.convert(black_box(small_bytes), "text/html; charset=utf-8"))
        });
    });

    // Fallback path: unknown content type but HTML bytes
    group.bench_function("html_fallback_detection", |b| {
        let router = ContentRouter::new();
        b.iter(|| {
            black_box(router.convert(black_box(small_bytes), "application/octet-stream"))
        });
    });

    group.finish();
}

fn bench_collapse_blank_lines(c: &mut Criterion) {
    let text = "Paragraph one.\n\n\n\n\nParagraph two.\n\n\nParagraph three.\n".repeat(200);

    c.bench_function("collapse_blank_lines", |b| {
        b.iter(|| black_box(collapse_blank_lines(black_box(&text))));
    });
}

criterion_group!(
    benches,
    bench_extract_text,
    bench_content_router_dispatch,
    bench_collapse_blank_lines,
);

criterion_main!(benches);
