use intraday_bridge::{
    fit, fit_gaussians, BridgeError, GaussianFit, ReturnSample, ReversionStrength, SampleWindow,
};

fn open_sample(values: &[f64]) -> ReturnSample {
    ReturnSample::new(SampleWindow::Open, values.iter().copied())
}

fn close_sample(values: &[f64]) -> ReturnSample {
    ReturnSample::new(SampleWindow::Close, values.iter().copied())
}

fn session_samples() -> (ReturnSample, ReturnSample) {
    (
        open_sample(&[0.001, -0.002, 0.0015, -0.0005]),
        close_sample(&[-0.0003, 0.0002, -0.0001, 0.0004]),
    )
}

#[test]
fn four_by_four_session_bridges_toward_quieter_close() {
    let (open, close) = session_samples();
    let fit = fit(&open, &close, 5).expect("fit should succeed");

    assert_eq!(fit.path.times(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert!(fit.open.mean.abs() < 1e-12);
    assert!((fit.close.mean - 0.00005).abs() < 1e-12);
    assert!((fit.open.std_dev - 0.00158).abs() < 1e-5);
    assert!((fit.close.std_dev - 0.00031).abs() < 1e-5);

    let means = fit.path.means();
    let std_devs = fit.path.std_devs();
    assert!(means.windows(2).all(|pair| pair[1] > pair[0]));
    assert!(std_devs.windows(2).all(|pair| pair[1] < pair[0]));

    match fit.summary.reversion_strength {
        ReversionStrength::Value(v) => assert!(v > 0.0 && v.is_finite()),
        ReversionStrength::Undefined => panic!("volatility is positive"),
    }
}

#[test]
fn endpoints_reproduce_fitted_gaussians() {
    let open = open_sample(&[0.003, -0.001, 0.0042, 0.0007, -0.0025, 0.0011]);
    let close = close_sample(&[-0.0009, 0.0013, 0.0004, -0.0002, 0.0021]);

    for steps in [2, 3, 7, 100, 391] {
        let fit = fit(&open, &close, steps).expect("fit should succeed");
        let first = fit.path.points.first().expect("non-empty path");
        let last = fit.path.points.last().expect("non-empty path");

        assert_eq!(fit.path.len(), steps);
        assert!((first.mean - fit.open.mean).abs() < 1e-9);
        assert!((last.mean - fit.close.mean).abs() < 1e-9);
        assert_eq!(first.std_dev, fit.open.std_dev);
        assert_eq!(last.std_dev, fit.close.std_dev);
        assert_eq!(first.t, 0.0);
        assert_eq!(last.t, 1.0);
        assert!(fit.path.points.iter().all(|p| p.std_dev >= 0.0));
    }
}

#[test]
fn two_steps_yield_only_the_endpoints() {
    let (open, close) = session_samples();
    let fit = fit(&open, &close, 2).expect("fit should succeed");

    assert_eq!(fit.path.times(), vec![0.0, 1.0]);
    assert!((fit.summary.drift - (fit.close.mean - fit.open.mean)).abs() < 1e-15);
}

#[test]
fn grid_below_two_steps_is_invalid_configuration() {
    let (open, close) = session_samples();
    for steps in [0, 1] {
        let err = fit(&open, &close, steps).expect_err("grid too small");
        assert!(matches!(err, BridgeError::InvalidConfiguration(_)));
    }
}

#[test]
fn empty_sample_is_insufficient_data() {
    let (open, _) = session_samples();
    let empty = close_sample(&[]);

    let err = fit(&open, &empty, 10).expect_err("empty close sample");
    assert_eq!(
        err,
        BridgeError::InsufficientData {
            window: SampleWindow::Close,
            observations: 0,
        }
    );
}

#[test]
fn non_finite_values_never_reach_the_fit() {
    let open = open_sample(&[f64::NAN, 0.001, f64::INFINITY, -0.001]);
    let close = close_sample(&[0.0005, f64::NEG_INFINITY, -0.0005]);
    assert_eq!(open.len(), 2);
    assert_eq!(close.len(), 2);

    let fit = fit(&open, &close, 4).expect("finite values remain");
    assert!(fit.path.points.iter().all(|p| p.mean.is_finite() && p.std_dev.is_finite()));
}

#[test]
fn constant_samples_leave_reversion_undefined() {
    let open = open_sample(&[0.0078125, 0.0078125, 0.0078125]);
    let close = close_sample(&[0.015625, 0.015625]);

    let fit = fit(&open, &close, 10).expect("fit should succeed");
    assert_eq!(fit.summary.volatility, 0.0);
    assert_eq!(fit.summary.reversion_strength, ReversionStrength::Undefined);
    assert!(fit.path.points.iter().all(|p| p.std_dev == 0.0));
}

#[test]
fn repeated_fits_are_bit_identical() {
    let (open, close) = session_samples();
    let a = fit(&open, &close, 100).expect("fit should succeed");
    let b = fit(&open, &close, 100).expect("fit should succeed");

    for (x, y) in a.path.points.iter().zip(&b.path.points) {
        assert_eq!(x.t.to_bits(), y.t.to_bits());
        assert_eq!(x.mean.to_bits(), y.mean.to_bits());
        assert_eq!(x.std_dev.to_bits(), y.std_dev.to_bits());
    }
    assert_eq!(a.summary.drift.to_bits(), b.summary.drift.to_bits());
}

#[test]
fn variance_interpolates_linearly_in_time() {
    let open = GaussianFit {
        mean: 0.0,
        std_dev: 0.03,
        observations: 50,
    };
    let close = GaussianFit {
        mean: 0.0,
        std_dev: 0.01,
        observations: 50,
    };
    let fit = fit_gaussians(open, close, 11).expect("fit should succeed");

    for point in &fit.path.points {
        let expected = 0.0009 + (0.0001 - 0.0009) * point.t;
        assert!((point.std_dev * point.std_dev - expected).abs() < 1e-15);
    }
}
