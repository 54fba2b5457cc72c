//! End-to-end checks of the engine-facing protocol.

use popenv::geometry;
use popenv::prelude::*;

#[test]
fn thousand_trials_stay_geometrically_valid() {
    let size = 10;
    let max = geometry::max_distance(size) + 1e-4;
    let samplers = [
        SamplerSpec::UniformPair { distinct: false },
        SamplerSpec::UniformPair { distinct: true },
        SamplerSpec::PolarOffset {
            min_dist: 2.0,
            max_dist: 9.0,
        },
    ];
    for sampler in samplers {
        let cfg = EnvConfig::spatial_attention(size, 100).with_sampler(sampler);
        let mut env = Environment::new(cfg, 1234).unwrap();
        env.init(0);
        for _ in 0..1000 {
            assert!(env.step().unwrap());
            let d = env.derived();
            assert!((0.0..=max).contains(&d.distance), "{sampler:?} {d:?}");
            assert!((0.0..360.0).contains(&d.angle), "{sampler:?} {d:?}");
        }
    }
}

#[test]
fn five_trials_per_epoch_roll_over_once() {
    let mut env = Environment::new(EnvConfig::distance_pair(10, 5), 9).unwrap();
    env.init(0);
    for _ in 0..5 {
        env.step().unwrap();
    }
    assert_eq!(env.counter(Scale::Trial).cur, 0);
    let epoch = env.counter(Scale::Epoch);
    assert_eq!(epoch.cur, 1);
    assert!(epoch.changed);
}

#[test]
fn infeasible_band_fails_instead_of_hanging() {
    let cfg = EnvConfig::distance_pair(10, 5)
        .with_sampler(SamplerSpec::DistanceBand {
            min: 100.0,
            max: 200.0,
        })
        .with_max_attempts(10_000);
    let mut env = Environment::new(cfg, 9).unwrap();
    env.init(0);
    match env.step() {
        Err(EnvError::Sample(SampleError::RetriesExhausted { attempts, .. })) => {
            assert_eq!(attempts, 10_000)
        }
        other => panic!("expected retries to run out, got {other:?}"),
    }
}

#[test]
fn same_seed_replays_the_same_trials() {
    let run = |seed: u64| {
        let mut env = Environment::new(EnvConfig::spatial_attention(9, 20), seed).unwrap();
        env.init(0);
        (0..30)
            .map(|_| {
                env.step().unwrap();
                (env.sample(), env.state("AlloInput").unwrap().clone())
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(77), run(77));
    assert_ne!(run(77), run(78));
}

#[test]
fn listed_states_match_buffers() {
    let mut env = Environment::new(EnvConfig::spatial_attention(10, 5), 3).unwrap();
    env.init(0);
    env.step().unwrap();

    let names: Vec<String> = env.states().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["Distance", "Angle", "Attn", "AlloInput", "EgoInput"]);

    for spec in env.states() {
        let t = env.state(&spec.name).unwrap();
        assert_eq!(t.shape(), spec.shape.as_slice());
        assert_eq!(t.len(), spec.shape.iter().product::<usize>());
    }
    assert_eq!(env.state("EgoInput").unwrap().shape(), &[19, 19]);
    assert_eq!(env.state("AlloInput").unwrap().shape(), &[13, 13]);
    assert!(env.state("X").is_none());
}

#[test]
fn decoded_outputs_track_the_sample() {
    let mut env = Environment::new(EnvConfig::spatial_attention(10, 50), 5).unwrap();
    env.init(0);
    for _ in 0..50 {
        env.step().unwrap();
        let truth = env.derived();
        let a = env.sample().a;

        let Some(Ok(Decoded::Scalar(d))) = env.decode("Distance") else {
            panic!("distance should decode")
        };
        assert!((d - truth.distance).abs() < 1.0, "{d} vs {}", truth.distance);

        let Some(Ok(Decoded::Scalar(ang))) = env.decode("Angle") else {
            panic!("angle should decode")
        };
        let diff = (ang - truth.angle).abs();
        assert!(diff.min(360.0 - diff) < 2.0, "{ang} vs {}", truth.angle);

        let Some(Ok(Decoded::Point(p))) = env.decode("Attn") else {
            panic!("attention should decode")
        };
        assert!((p.x - a.x as f32).abs() < 1.0 && (p.y - a.y as f32).abs() < 1.0);
    }
}

#[cfg(feature = "serde")]
#[test]
fn json_config_round_trips_and_validates() {
    let cfg = EnvConfig::spatial_attention(8, 12);
    let text = cfg.to_json_string();
    let back = EnvConfig::from_json_str(&text).unwrap();
    assert_eq!(back, cfg);

    let minimal = r#"{
        "size": 6,
        "trials_per_epoch": 3,
        "sampler": { "kind": "distance_band", "min": 1.0, "max": 4.0 },
        "features": [
            { "name": "Distance", "source": { "kind": "distance" },
              "encoder": { "kind": "linear", "units": 8, "min": 0.0, "max": 8.0 } },
            { "name": "Where", "source": { "kind": "point_a" },
              "encoder": { "kind": "grid", "units_x": 6, "units_y": 6,
                           "min": { "x": 0.0, "y": 0.0 }, "max": { "x": 5.0, "y": 5.0 } } }
        ]
    }"#;
    let cfg = EnvConfig::from_json_str(minimal).unwrap();
    assert_eq!(cfg.categories, 8);
    let mut env = Environment::new(cfg, 1).unwrap();
    env.init(0);
    env.step().unwrap();
    assert_eq!(env.state("Where").unwrap().shape(), &[6, 6]);

    assert!(matches!(
        EnvConfig::from_json_str("{ \"size\": \"big\" }"),
        Err(ConfigError::Parse(_))
    ));
    assert_eq!(
        EnvConfig::from_json_str("{ \"size\": 0 }"),
        Err(ConfigError::InvalidGridSize(0))
    );
}
