use buoy_wind::{day_series, hourly_series, parse_feed, PipelineOptions, RequestCache};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;

/// About 45 days of 10-minute rows, newest first, the size of a realtime file.
fn synthetic_feed() -> String {
    let mut raw = String::from(
        "#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE\n\
         #yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft\n",
    );
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start");
    for i in (0..45 * 144).rev() {
        let t = start + Duration::minutes(10 * i);
        let direction = (i * 7) % 360;
        let speed = 3.0 + (i % 50) as f64 / 10.0;
        let _ = writeln!(
            raw,
            "{} {:3} {:4.1} {:4.1}   1.2     8   5.1 270 1013.0  16.0  17.0  12.3   MM   MM    MM",
            t.format("%Y %m %d %H %M"),
            direction,
            speed,
            speed + 2.0
        );
    }
    raw
}

fn bench_pipeline(c: &mut Criterion) {
    let raw = synthetic_feed();
    let options = PipelineOptions::default();
    c.bench_function("parse_feed", |b| b.iter(|| parse_feed(black_box(&raw))));
    c.bench_function("hourly_series", |b| {
        b.iter(|| hourly_series(black_box(&raw), &options))
    });
    c.bench_function("day_series", |b| b.iter(|| day_series(black_box(&raw), &options)));
}

fn bench_cache(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let dir = tempfile::tempdir().expect("temp dir");
    let days = day_series(&synthetic_feed(), &PipelineOptions::default());
    let cache = runtime.block_on(async {
        let cache = RequestCache::open(dir.path()).await;
        cache.set("bench", &days, std::time::Duration::from_secs(3600)).await;
        cache
    });

    c.bench_function("cache_hit_days", |b| {
        b.to_async(&runtime)
            .iter(|| async { cache.get::<Vec<buoy_wind::DayData>>(black_box("bench"), None).await })
    });
}

criterion_group!(benches, bench_pipeline, bench_cache);
criterion_main!(benches);
