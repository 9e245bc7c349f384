//! Integration tests for leaf and stem symbols
use adel::{
    Error,
    symbol::{
        AngleMode, LeafShapeDatabase, LeafSpec, OrganSpec, StemSpec, Symbols,
        fit_leaf, optical,
    },
};
use approx::assert_relative_eq;
use rand::{SeedableRng, rngs::StdRng};

fn leaf(rank: u32, seed: u64) -> LeafSpec {
    LeafSpec {
        tissue_type: 1,
        final_length: 18.0,
        length: 12.0,
        radius_max: 0.6,
        s_base: 0.0,
        s_top: 1.0,
        leaf_rank: rank,
        seed,
        insertion_angle: None,
        shape_index: None,
    }
}

fn stem(length: f64) -> StemSpec {
    StemSpec {
        tissue_type: 2,
        length,
        diameter_base: 0.4,
        diameter_top: 0.3,
    }
}

#[test]
fn leaf_is_deterministic() {
    let db = LeafShapeDatabase::sample();
    let symbols = Symbols::new(&db);
    let mut rng = StdRng::seed_from_u64(123);
    for seed in 0..20 {
        let a = symbols.build_leaf(&mut rng, &leaf(3, seed)).unwrap();
        // Generator state in between calls does not matter
        let mut other = StdRng::seed_from_u64(seed + 1000);
        let b = symbols.build_leaf(&mut other, &leaf(3, seed)).unwrap();
        assert_eq!(a, b);
        assert!(a.geometry.is_some());
    }
}

#[test]
fn builder_seed_overrides_call_seed() {
    let db = LeafShapeDatabase::sample();
    let symbols = Symbols {
        seed: Some(5),
        ..Symbols::new(&db)
    };
    let mut rng = StdRng::seed_from_u64(0);
    let first = symbols.build_leaf(&mut rng, &leaf(2, 0)).unwrap();
    for seed in 1..10 {
        let other = symbols.build_leaf(&mut rng, &leaf(2, seed)).unwrap();
        assert_eq!(first, other);
    }

    // Without a builder seed, some per-call seed picks another shape
    let symbols = Symbols::new(&db);
    let organs: Vec<_> = (0..10)
        .map(|seed| symbols.build_leaf(&mut rng, &leaf(2, seed)).unwrap())
        .collect();
    assert!(organs.iter().any(|o| o.geometry != organs[0].geometry));
}

#[test]
fn rank_is_clamped() {
    let db = LeafShapeDatabase::sample();
    let symbols = Symbols::new(&db);
    let mut rng = StdRng::seed_from_u64(0);
    let max = db.max_rank().unwrap();
    for seed in 0..5 {
        let at_max = symbols.build_leaf(&mut rng, &leaf(max, seed)).unwrap();
        for rank in [max + 1, 50, 998] {
            let beyond = symbols.build_leaf(&mut rng, &leaf(rank, seed)).unwrap();
            assert_eq!(at_max.geometry, beyond.geometry);
        }
    }

    // Labels wrap at 999, and are never 0
    let o = symbols.build_leaf(&mut rng, &leaf(999, 0)).unwrap();
    assert_eq!(o.label.leaf_id, 1);
    let o = symbols.build_leaf(&mut rng, &leaf(1001, 0)).unwrap();
    assert_eq!(o.label.leaf_id, 2);
}

#[test]
fn missing_shape_is_reported() {
    let sample = LeafShapeDatabase::sample();
    let shape = sample.lookup(1).unwrap().1[0].clone();
    let mut db = LeafShapeDatabase::new();
    db.insert(10, shape).unwrap();

    let symbols = Symbols::new(&db);
    let mut rng = StdRng::seed_from_u64(0);
    match symbols.build_leaf(&mut rng, &leaf(3, 0)) {
        Err(Error::ShapeNotFound { rank, available }) => {
            assert_eq!(rank, 3);
            assert_eq!(available, vec![10]);
        }
        r => panic!("expected a missing shape, got {r:?}"),
    }
    // Neighbor ranks are used as fallbacks
    assert!(symbols.build_leaf(&mut rng, &leaf(9, 0)).is_ok());
    assert!(symbols.build_leaf(&mut rng, &leaf(11, 0)).is_ok());
}

#[test]
fn explicit_shape_index() {
    let db = LeafShapeDatabase::sample();
    let symbols = Symbols::new(&db);
    let mut rng = StdRng::seed_from_u64(0);
    let (_, shapes) = db.lookup(4).unwrap();

    for (i, shape) in shapes.iter().enumerate() {
        let spec = LeafSpec {
            shape_index: Some(i + 1),
            ..leaf(4, 99)
        };
        let o = symbols.build_leaf(&mut rng, &spec).unwrap();
        let expected = fit_leaf(shape, 18.0, 12.0, 0.0, 1.0, 0.6);
        assert_eq!(o.geometry, expected);
    }
    for index in [0, shapes.len() + 1] {
        let spec = LeafSpec {
            shape_index: Some(index),
            ..leaf(4, 0)
        };
        assert!(matches!(
            symbols.build_leaf(&mut rng, &spec),
            Err(Error::BadShapeIndex { rank: 4, count: 3, .. })
        ));
    }
}

#[test]
fn insertion_angle() {
    let db = LeafShapeDatabase::sample();
    let mut rng = StdRng::seed_from_u64(0);
    let spec = LeafSpec {
        length: 18.0,
        shape_index: Some(1),
        ..leaf(3, 0)
    };

    // A relative angle of 1 keeps the reference shape
    let relative = Symbols::new(&db);
    let plain = relative.build_leaf(&mut rng, &spec).unwrap();
    let same = relative
        .build_leaf(&mut rng, &LeafSpec {
            insertion_angle: Some(1.0),
            ..spec.clone()
        })
        .unwrap();
    let (a, b) = (plain.geometry.unwrap(), same.geometry.unwrap());
    for (p, q) in a.vertices.iter().zip(&b.vertices) {
        assert_relative_eq!(p, q, epsilon = 1e-4);
    }

    // Negative angles are ignored
    let ignored = relative
        .build_leaf(&mut rng, &LeafSpec {
            insertion_angle: Some(-1.0),
            ..spec.clone()
        })
        .unwrap();
    assert_eq!(ignored.geometry, Some(a));

    // An absolute angle of 0° makes the leaf start vertically
    let absolute = Symbols {
        angle_mode: AngleMode::Absolute,
        ..Symbols::new(&db)
    };
    let vertical = absolute
        .build_leaf(&mut rng, &LeafSpec {
            insertion_angle: Some(0.0),
            ..spec
        })
        .unwrap()
        .geometry
        .unwrap();
    assert_relative_eq!(vertical.vertices[0].x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(vertical.vertices[2].x, 0.0, epsilon = 1e-5);
    assert!(vertical.vertices[2].z > 0.0);
}

#[test]
fn degenerate_leaf_has_no_mesh() {
    let db = LeafShapeDatabase::sample();
    let symbols = Symbols::new(&db);
    let mut rng = StdRng::seed_from_u64(0);
    let spec = LeafSpec {
        length: 0.0,
        ..leaf(2, 0)
    };
    let o = symbols.build_leaf(&mut rng, &spec).unwrap();
    assert!(o.geometry.is_none());
    assert_eq!(o.label.optical_id, 1);
    assert_eq!(o.tissue_type, 1);
}

#[test]
fn stem_tessellation() {
    let db = LeafShapeDatabase::sample();
    let mut rng = StdRng::seed_from_u64(0);

    let slim = Symbols::new(&db);
    for length in [0.0, 1e-7, 9.9e-7] {
        let o = slim.build_stem(&stem(length)).unwrap();
        assert!(o.geometry.is_none());
        assert_eq!(o.label.leaf_id, 0);
    }
    let m = slim.build_stem(&stem(1e-6)).unwrap().geometry.unwrap();
    assert_eq!(m.vertices.len(), 6);
    assert_eq!(m.triangles.len(), 8);

    let classic = Symbols {
        classic: true,
        ..Symbols::new(&db)
    };
    let seeded = Symbols {
        seed: Some(1),
        ..Symbols::new(&db)
    };
    for symbols in [classic, seeded] {
        let o = symbols
            .build(&mut rng, &OrganSpec::Stem(stem(4.0)))
            .unwrap();
        let m = o.geometry.unwrap();
        assert_eq!(m.vertices.len(), 8);
        assert_eq!(m.triangles.len(), 12);
    }
}

#[test]
fn optical_ids() {
    let db = LeafShapeDatabase::sample();
    let symbols = Symbols::new(&db);
    let mut rng = StdRng::seed_from_u64(0);
    for tissue_type in 1..=12 {
        let expected = if tissue_type % 2 == 1 { 1 } else { 2 };
        assert_eq!(optical(tissue_type).unwrap(), expected);
        let s = StemSpec {
            tissue_type,
            ..stem(1.0)
        };
        let o = symbols.build_stem(&s).unwrap();
        assert_eq!(o.label.optical_id, expected);
        let l = LeafSpec {
            tissue_type,
            ..leaf(1, 0)
        };
        let o = symbols.build(&mut rng, &OrganSpec::Leaf(l)).unwrap();
        assert_eq!(o.label.optical_id, expected);
    }
    for tissue_type in [0, 13, -2] {
        let s = StemSpec {
            tissue_type,
            ..stem(1.0)
        };
        assert!(matches!(
            symbols.build_stem(&s),
            Err(Error::BadTissueType(t)) if t == tissue_type
        ));
    }
}
