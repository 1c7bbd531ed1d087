use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use std::collections::BTreeMap;
use tempfile::TempDir;

use shelter_availability::id_cache::{load_cache, save_cache};
use shelter_availability::place_id::extract_place_id;

// Detail page of roughly `kb` kilobytes with the booking script near the end
fn detail_page(kb: usize, place_id: u64) -> String {
    let mut rng = thread_rng();
    let mut html = String::from("<html><body>");
    while html.len() < kb * 1024 {
        let len = rng.gen_range(3..12);
        let word: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        html.push_str(&format!("<p class=\"{word}\">{word} i= place</p>\n"));
    }
    html.push_str(&format!(
        "<script src=\"/inc/inc_ajaxgetbookingsforsingleplace.asp?i={place_id}\"></script></body></html>"
    ));
    html
}

pub fn extract_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_id_extraction");

    for kb in [4, 64, 512].iter() {
        let html = detail_page(*kb, 4711);
        group.bench_with_input(BenchmarkId::from_parameter(kb), &html, |b, html| {
            b.iter(|| black_box(extract_place_id(black_box(html))));
        });
    }

    // Fallback path: no booking endpoint, id only in a query parameter
    let fallback = detail_page(64, 0).replace("inc_ajaxgetbookingsforsingleplace.asp?i=0", "x?i=77");
    group.bench_function("fallback_64kb", |b| {
        b.iter(|| black_box(extract_place_id(black_box(&fallback))));
    });

    group.finish();
}

pub fn cache_load_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("id_cache_load");
    let dir = TempDir::new().unwrap();
    let mut rng = thread_rng();

    for entries in [100, 1_000, 10_000].iter() {
        let path = dir.path().join(format!("ids_{entries}.json"));
        let map: BTreeMap<String, u64> = (0..*entries)
            .map(|i| {
                (
                    format!("https://book.naturstyrelsen.dk/sted/shelter-{i}/"),
                    rng.gen_range(4000..200_000),
                )
            })
            .collect();
        save_cache(Some(&path), &map).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(entries), &path, |b, path| {
            b.iter(|| black_box(load_cache(path)));
        });
    }

    group.finish();
}

criterion_group!(benches, extract_benchmark, cache_load_benchmark);
criterion_main!(benches);
