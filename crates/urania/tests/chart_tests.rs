use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use urania::chart::{BirthInput, ChartAssembler, ChartSettings, ComputeRequest, Place};
use urania::ephemeris::{AnalyticEphemeris, Body, GeoLocation, HouseSystemName};
use urania::frame::{Ayanamsha, Frame};
use urania::geo::{GeoError, PlaceResolver, StaticPlaces};
use urania::houses::{AutoReason, HouseMode};
use urania::time::DstChoice;
use urania::zodiac::ZodiacSign;

fn assembler() -> ChartAssembler {
    let places = Arc::new(StaticPlaces::builtin());
    ChartAssembler::new(
        Arc::new(AnalyticEphemeris::new()),
        places.clone(),
        places,
        ChartSettings::default(),
    )
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h, m, 0)
}

fn ankara() -> BirthInput {
    BirthInput::new(date(1995, 11, 8), time(22, 15), Place::new("Ankara", "Turkey"))
}

#[tokio::test]
async fn test_ankara_end_to_end() {
    let chart = assembler().compute(&ankara()).await.unwrap();

    assert_eq!(chart.tzid, "Europe/Istanbul");
    assert_eq!(chart.datetime_utc, "1995-11-08 20:15:00 UTC");
    assert!(chart.datetime_local.starts_with("1995-11-08 22:15:00"));
    assert_eq!(chart.utc_offset, "+02:00");
    assert!(!chart.is_dst);
    assert!(!chart.is_approximate_time);
    assert!((chart.julian_day - 2_450_030.343_75).abs() < 1e-9);

    let sun = chart.planets[&Body::Sun];
    assert_eq!(sun.sign, ZodiacSign::Scorpio);
    assert!((216.0..246.0).contains(&sun.ecliptic_long));

    // Time was supplied, so every angle is populated
    assert_eq!(chart.houses.system, HouseSystemName::Placidus);
    assert!(chart.midheaven.is_some());
    assert_eq!(chart.ascendant.ecliptic_long, chart.houses.cusps_longitudes[0]);
    assert_eq!(chart.ascendant.sign, ZodiacSign::Leo);
    assert!(chart.auto.is_none());
}

#[tokio::test]
async fn test_compute_request_wire_format() {
    let req: ComputeRequest = serde_json::from_str(
        r#"{"name":"Test","dob":"1995-11-08","tob":"22:15","city":"Ankara","country":"Turkey",
            "zodiac":"Tropical","house_system":"Placidus"}"#,
    )
    .unwrap();
    let input = BirthInput::from_request(&req).unwrap();
    let chart = assembler().compute(&input).await.unwrap();

    let json = serde_json::to_value(&chart).unwrap();
    assert_eq!(json["planets"]["Sun"]["sign"], "Scorpio");
    assert_eq!(json["houses"]["system"], "Placidus");
    assert_eq!(json["houses"]["cusps_longitudes"].as_array().unwrap().len(), 12);
    assert_eq!(json["zodiac"], "Tropical");
    assert_eq!(json["input"]["name"], "Test");
    assert!(json["midheaven"].is_object());
}

#[tokio::test]
async fn test_all_longitudes_are_normalized_and_consistent() {
    let inputs = [
        ankara(),
        ankara().with_zodiac(Frame::Sidereal(Ayanamsha::Lahiri)),
        BirthInput::new(date(2024, 7, 1), time(6, 30), Place::new("Sydney", "Australia")),
        BirthInput::new(date(1969, 7, 20), time(20, 17), Place::new("New York", "United States")),
    ];

    for input in inputs {
        let chart = assembler().compute(&input).await.unwrap();
        let mut angles: Vec<(ZodiacSign, f64, f64)> = chart
            .planets
            .values()
            .map(|p| (p.sign, p.degree, p.ecliptic_long))
            .collect();
        angles.push((chart.ascendant.sign, chart.ascendant.degree, chart.ascendant.ecliptic_long));
        if let Some(mc) = chart.midheaven {
            angles.push((mc.sign, mc.degree, mc.ecliptic_long));
        }

        for (sign, degree, lon) in angles {
            assert!((0.0..360.0).contains(&lon), "{lon}");
            let index = (lon / 30.0).floor();
            assert_eq!(sign, ZodiacSign::from_index(index as usize));
            assert!((degree - (lon - 30.0 * index)).abs() < 0.006);
            assert!((0.0..30.0).contains(&degree));
            // Two decimal places
            assert!(((lon * 100.0).round() - lon * 100.0).abs() < 1e-6);
        }
        for cusp in chart.houses.cusps_longitudes {
            assert!((0.0..360.0).contains(&cusp));
        }
    }
}

#[tokio::test]
async fn test_compute_is_idempotent() {
    let a = assembler();
    let input = ankara().with_house_mode(HouseMode::Auto).with_uncertainty(30);
    let first = a.compute(&input).await.unwrap();
    let second = a.compute(&input).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_sidereal_frame_shifts_every_body() {
    let tropical = assembler().compute(&ankara()).await.unwrap();
    let sidereal = assembler()
        .compute(&ankara().with_zodiac(Frame::Sidereal(Ayanamsha::Lahiri)))
        .await
        .unwrap();

    assert_eq!(sidereal.zodiac, Frame::Sidereal(Ayanamsha::Lahiri));
    for (body, trop) in &tropical.planets {
        let sid = sidereal.planets[body];
        let shift = (trop.ecliptic_long - sid.ecliptic_long).rem_euclid(360.0);
        // Lahiri in 1995 is about 23.8°
        assert!((shift - 23.8).abs() < 0.1, "{body}: {shift}");
    }
    let asc_shift =
        (tropical.ascendant.ecliptic_long - sidereal.ascendant.ecliptic_long).rem_euclid(360.0);
    assert!((asc_shift - 23.8).abs() < 0.1);
}

#[tokio::test]
async fn test_quadrant_without_time_fails() {
    let input = BirthInput::new(date(1995, 11, 8), None, Place::new("Ankara", "Turkey"));
    let err = assembler().compute(&input).await.unwrap_err();
    assert_eq!(err.kind(), "missing_birth_time_for_quadrant");
    assert!(err.is_caller_error());

    let auto = input.with_house_mode(HouseMode::Auto);
    let err = assembler().compute(&auto).await.unwrap_err();
    assert_eq!(err.kind(), "missing_birth_time_for_quadrant");
}

#[tokio::test]
async fn test_solar_whole_sign_without_time() {
    let input = BirthInput::new(date(1995, 11, 8), None, Place::new("Ankara", "Turkey"))
        .with_house_mode(HouseMode::WholeSign);
    let chart = assembler().compute(&input).await.unwrap();

    assert!(chart.is_approximate_time);
    assert!(chart.houses.approximate);
    assert!(chart.midheaven.is_none());
    assert!(chart.datetime_local.starts_with("1995-11-08 12:00:00"));
    assert_eq!(chart.houses.system, HouseSystemName::WholeSign);
    assert_eq!(chart.ascendant.sign, chart.planets[&Body::Sun].sign);
    for (k, cusp) in chart.houses.cusps_longitudes.iter().enumerate() {
        assert_eq!(*cusp, (210.0 + 30.0 * k as f64) % 360.0);
    }
}

#[tokio::test]
async fn test_whole_sign_with_time_is_anchored_on_ascendant() {
    let chart = assembler()
        .compute(&ankara().with_house_mode(HouseMode::WholeSign))
        .await
        .unwrap();
    assert_eq!(chart.houses.system, HouseSystemName::WholeSign);
    assert_eq!(chart.houses.cusps_longitudes[0], 120.0);
    assert_eq!(chart.ascendant.sign, ZodiacSign::Leo);
    assert!(chart.midheaven.is_some());
    assert!(!chart.houses.approximate);
}

#[tokio::test]
async fn test_auto_mode_stable_ascendant_keeps_quadrant() {
    let chart = assembler()
        .compute(&ankara().with_house_mode(HouseMode::Auto).with_uncertainty(15))
        .await
        .unwrap();
    let diag = chart.auto.unwrap();
    assert_eq!(diag.asc_sign_minus, ZodiacSign::Leo);
    assert_eq!(diag.asc_sign_plus, ZodiacSign::Leo);
    assert_eq!(diag.reason, AutoReason::AscSignStable);
    assert_eq!(diag.mode_final, HouseMode::Quadrant);
    assert_eq!(chart.houses.system, HouseSystemName::Placidus);
}

#[tokio::test]
async fn test_auto_mode_unstable_ascendant_falls_back_to_whole_sign() {
    let input = BirthInput::new(date(1990, 6, 15), time(12, 0), Place::new("Izmir", "Turkey"))
        .with_house_mode(HouseMode::Auto)
        .with_uncertainty(60);
    let chart = assembler().compute(&input).await.unwrap();

    let diag = chart.auto.clone().unwrap();
    assert_ne!(diag.asc_sign_minus, diag.asc_sign_plus);
    assert_eq!(diag.reason, AutoReason::AscSignChangesWithinWindow);
    assert_eq!(diag.mode_final, HouseMode::WholeSign);
    assert_eq!(diag.window_minutes, 60);
    assert_eq!(chart.houses.system, HouseSystemName::WholeSign);

    let json = serde_json::to_value(&chart).unwrap();
    assert_eq!(json["auto"]["mode_final"], "whole-sign");
    assert_eq!(json["auto"]["reason"], "asc_sign_changes_within_window");
}

#[tokio::test]
async fn test_auto_mode_uses_configured_default_window() {
    let settings = ChartSettings {
        default_uncertainty_minutes: 60,
        ..ChartSettings::default()
    };
    let places = Arc::new(StaticPlaces::builtin());
    let a = ChartAssembler::new(Arc::new(AnalyticEphemeris::new()), places.clone(), places, settings)
        .unwrap();
    let chart = a.compute(&ankara().with_house_mode(HouseMode::Auto)).await.unwrap();
    assert_eq!(chart.auto.unwrap().window_minutes, 60);
    assert_eq!(chart.input.uncertainty_minutes, Some(60));
}

#[tokio::test]
async fn test_ambiguous_local_time_is_refused() {
    // Europe/Berlin fell back from 03:00 to 02:00 on 2023-10-29
    let input = BirthInput::new(date(2023, 10, 29), time(2, 30), Place::new("Berlin", "Germany"));
    let err = assembler().compute(&input).await.unwrap_err();
    assert_eq!(err.kind(), "ambiguous_local_time");

    let earlier = assembler()
        .compute(&input.clone().with_dst_choice(DstChoice::Earlier))
        .await
        .unwrap();
    let later = assembler()
        .compute(&input.with_dst_choice(DstChoice::Later))
        .await
        .unwrap();
    assert_eq!(earlier.datetime_utc, "2023-10-29 00:30:00 UTC");
    assert_eq!(later.datetime_utc, "2023-10-29 01:30:00 UTC");
    assert!(earlier.is_dst);
    assert!(!later.is_dst);
}

#[tokio::test]
async fn test_nonexistent_local_time_is_refused() {
    let input = BirthInput::new(
        date(2024, 3, 10),
        time(2, 30),
        Place::new("New York", "United States"),
    );
    let err = assembler().compute(&input).await.unwrap_err();
    assert_eq!(err.kind(), "nonexistent_local_time");
}

#[tokio::test]
async fn test_explicit_location_bypasses_lookups() {
    let places = Arc::new(StaticPlaces::new());
    let a = ChartAssembler::new(
        Arc::new(AnalyticEphemeris::new()),
        places.clone(),
        places,
        ChartSettings::default(),
    )
    .unwrap();

    let input = BirthInput::new(date(1995, 11, 8), time(22, 15), Place::new("", ""))
        .with_location(GeoLocation { lat: 39.9334, lon: 32.8597 }, "Europe/Istanbul");
    let chart = a.compute(&input).await.unwrap();
    assert_eq!(chart.datetime_utc, "1995-11-08 20:15:00 UTC");

    let err = a.compute(&ankara()).await.unwrap_err();
    assert_eq!(err.kind(), "place_not_found");
}

#[tokio::test]
async fn test_polar_latitude_reports_porphyry() {
    let input = BirthInput::new(date(2000, 1, 1), time(12, 0), Place::new("Tromso", "Norway"));
    let chart = assembler().compute(&input).await.unwrap();
    assert_eq!(chart.houses.system, HouseSystemName::Porphyry);
}

#[tokio::test]
async fn test_out_of_range_date_is_a_service_error() {
    let input = BirthInput::new(date(500, 1, 1), time(12, 0), Place::new("", ""))
        .with_location(GeoLocation { lat: 0.0, lon: 0.0 }, "UTC");
    let err = assembler().compute(&input).await.unwrap_err();
    assert_eq!(err.kind(), "ephemeris_unavailable");
    assert!(!err.is_caller_error());
}

#[tokio::test]
async fn test_aspects_are_reported() {
    let chart = assembler().compute(&ankara()).await.unwrap();
    for aspect in &chart.aspects {
        assert!(aspect.orb < 4.0);
        assert_ne!(aspect.from, aspect.to);
    }
}

#[tokio::test]
async fn test_concurrent_charts_in_different_frames() {
    let a = assembler();
    let mut handles = Vec::new();
    for i in 0..8 {
        let a = a.clone();
        let frame = if i % 2 == 0 {
            Frame::Tropical
        } else {
            Frame::Sidereal(Ayanamsha::Lahiri)
        };
        handles.push(tokio::spawn(async move {
            a.compute(&ankara().with_zodiac(frame)).await.unwrap()
        }));
    }
    let tropical = assembler().compute(&ankara()).await.unwrap();
    for (i, handle) in handles.into_iter().enumerate() {
        let chart = handle.await.unwrap();
        if i % 2 == 0 {
            assert_eq!(chart, tropical);
        } else {
            assert_eq!(chart.zodiac, Frame::Sidereal(Ayanamsha::Lahiri));
            assert_ne!(chart.planets[&Body::Sun], tropical.planets[&Body::Sun]);
        }
    }
}

/// Geocoder that answers only after a delay.
struct SlowPlaces {
    delay: Duration,
}

#[async_trait]
impl PlaceResolver for SlowPlaces {
    async fn resolve_place(&self, _city: &str, _country: &str) -> Result<GeoLocation, GeoError> {
        tokio::time::sleep(self.delay).await;
        Ok(GeoLocation { lat: 39.9334, lon: 32.8597 })
    }
}

#[tokio::test]
async fn test_slow_geocoder_times_out() {
    let settings = ChartSettings {
        timeout: Duration::from_millis(100),
        ..ChartSettings::default()
    };
    let a = ChartAssembler::new(
        Arc::new(AnalyticEphemeris::new()),
        Arc::new(SlowPlaces {
            delay: Duration::from_secs(5),
        }),
        Arc::new(StaticPlaces::builtin()),
        settings,
    )
    .unwrap();

    let err = a.compute(&ankara()).await.unwrap_err();
    assert_eq!(err.kind(), "upstream_service_unavailable");
    assert!(!err.is_caller_error());
}

#[tokio::test]
async fn test_geocoder_within_timeout_succeeds() {
    let a = ChartAssembler::new(
        Arc::new(AnalyticEphemeris::new()),
        Arc::new(SlowPlaces {
            delay: Duration::from_millis(10),
        }),
        Arc::new(StaticPlaces::builtin()),
        ChartSettings::default(),
    )
    .unwrap();

    let chart = a.compute(&ankara()).await.unwrap();
    assert_eq!(chart.tzid, "Europe/Istanbul");
}
