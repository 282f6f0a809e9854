use chrono::{NaiveDate, NaiveTime};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use urania::chart::{BirthInput, ChartAssembler, ChartSettings, Place};
use urania::ephemeris::{AnalyticEphemeris, Body, EphemerisProvider, GeoLocation};
use urania::frame::Frame;
use urania::geo::StaticPlaces;
use urania::houses::HouseMode;

fn bench_positions(c: &mut Criterion) {
    let provider = AnalyticEphemeris::new();
    let jd = 2_450_030.343_75;

    c.bench_function("positions_default_set", |b| {
        b.iter(|| {
            for &body in Body::DEFAULT_SET.iter() {
                let _ = provider.position(black_box(jd), body, Frame::Tropical);
            }
        })
    });

    let location = GeoLocation {
        lat: 39.9334,
        lon: 32.8597,
    };
    c.bench_function("quadrant_houses", |b| {
        b.iter(|| provider.quadrant_houses(black_box(jd), black_box(location), Frame::Tropical))
    });
}

fn bench_compute_resolved(c: &mut Criterion) {
    let places = Arc::new(StaticPlaces::builtin());
    let assembler = ChartAssembler::new(
        Arc::new(AnalyticEphemeris::new()),
        places.clone(),
        places,
        ChartSettings::default(),
    )
    .unwrap();
    let location = GeoLocation {
        lat: 39.9334,
        lon: 32.8597,
    };
    let input = BirthInput::new(
        NaiveDate::from_ymd_opt(1995, 11, 8).unwrap(),
        NaiveTime::from_hms_opt(22, 15, 0),
        Place::new("Ankara", "Turkey"),
    );

    c.bench_function("compute_quadrant", |b| {
        b.iter(|| assembler.compute_resolved(black_box(&input), location, "Europe/Istanbul"))
    });

    let auto = input.clone().with_house_mode(HouseMode::Auto).with_uncertainty(60);
    c.bench_function("compute_auto", |b| {
        b.iter(|| assembler.compute_resolved(black_box(&auto), location, "Europe/Istanbul"))
    });
}

criterion_group!(benches, bench_positions, bench_compute_resolved);
criterion_main!(benches);
