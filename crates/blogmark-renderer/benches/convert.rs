//! Benchmarks for markdown conversion.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use std::io;

use blogmark_renderer::Markdown;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

/// Generate a post with sections, callouts and links.
fn generate_post(sections: usize, paragraphs_per_section: usize) -> String {
    let mut md = String::with_capacity(sections * 300 + sections * paragraphs_per_section * 200);
    md.push_str("# Post Title\n\n");

    for i in 0..sections {
        md.push_str(&format!("## Section {i}\n\n"));
        md.push_str(&format!("> [!NOTE]\n> Callout number {i} with a [link](/posts/{i}).\n\n"));
        for j in 0..paragraphs_per_section {
            md.push_str(&format!(
                "Paragraph {j} in section {i} has **bold**, *italic* and ![an image](img/{i}-{j}.png) \
                 plus https://example.org/{i}/{j} as a bare URL.\n\n"
            ));
        }
    }
    md
}

fn bench_convert_simple(c: &mut Criterion) {
    let md = Markdown::new("https://example.com");

    c.bench_function("convert_simple", |b| {
        b.iter(|| md.convert("# Hello\n\nSimple content.", false, "en", &mut io::sink()));
    });
}

fn bench_convert_by_size(c: &mut Criterion) {
    let md = Markdown::new("https://example.com");
    let mut group = c.benchmark_group("convert_by_size");

    for (sections, paragraphs) in [(5, 2), (20, 3), (50, 5)] {
        let post = generate_post(sections, paragraphs);
        group.throughput(Throughput::Bytes(post.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("relative", format!("{sections}s_{paragraphs}p")),
            &post,
            |b, post| b.iter(|| md.convert(post, false, "en", &mut io::sink())),
        );
        group.bench_with_input(
            BenchmarkId::new("absolute", format!("{sections}s_{paragraphs}p")),
            &post,
            |b, post| b.iter(|| md.convert(post, true, "en", &mut io::sink())),
        );
    }

    group.finish();
}

fn bench_plain_text(c: &mut Criterion) {
    let md = Markdown::new("https://example.com");
    let post = generate_post(10, 3);
    let mut group = c.benchmark_group("plain_text");

    group.bench_function("body", |b| {
        b.iter(|| md.convert_to_plain_text(&post));
    });
    group.bench_function("title", |b| {
        b.iter(|| md.convert_title("A *quick* \"title\" -- with `code`..."));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_convert_simple,
    bench_convert_by_size,
    bench_plain_text,
);
criterion_main!(benches);
