use std::fs::File;
use std::io::Write;

use rstest::rstest;
use tempfile::tempdir;
use thermocal_config::CubicCoefficients;
use thermocal_config::fit::{RecordedRow, fit_cubic, fit_piecewise, load_recorded_run_csv};

const UPPER: CubicCoefficients = CubicCoefficients {
    a: 240.0,
    b: -0.11,
    c: 2.6e-5,
    d: -3.2e-9,
};
const LOWER: CubicCoefficients = CubicCoefficients {
    a: 225.0,
    b: -0.09,
    c: 2.2e-5,
    d: -3.6e-9,
};

fn eval(c: &CubicCoefficients, x: f64) -> f64 {
    c.a + c.b * x + c.c * x * x + c.d * x * x * x
}

fn synthetic_run(cutoff: i32) -> Vec<RecordedRow> {
    (400..3800)
        .step_by(25)
        .map(|raw| {
            let curve = if raw <= cutoff { &UPPER } else { &LOWER };
            RecordedRow {
                raw,
                temp_f: eval(curve, f64::from(raw)),
            }
        })
        .collect()
}

#[test]
fn piecewise_fit_recovers_known_curves() {
    let fit = fit_piecewise(&synthetic_run(2019), 2019).expect("fit");
    for (got, want) in [
        (fit.upper.coefficients, UPPER),
        (fit.lower.coefficients, LOWER),
    ] {
        for x in [500.0, 1500.0, 2500.0, 3500.0] {
            let diff = (eval(&got, x) - eval(&want, x)).abs();
            assert!(diff < 1e-6, "at {x}: {diff}");
        }
        assert!((got.d - want.d).abs() / want.d.abs() < 1e-4);
    }
    assert!(fit.upper.rms_f < 1e-6);
    assert_eq!(fit.upper.rejected, 0);
}

#[test]
fn outlier_is_rejected_and_refit() {
    let mut pts: Vec<(f64, f64)> = (0..40)
        .map(|i| {
            let x = 1000.0 + f64::from(i) * 20.0;
            // Small deterministic wobble so rms is non-zero.
            let wobble = if i % 2 == 0 { 0.01 } else { -0.01 };
            (x, eval(&UPPER, x) + wobble)
        })
        .collect();
    pts[20].1 += 25.0;
    let fit = fit_cubic(&pts).expect("fit");
    assert_eq!(fit.rejected, 1);
    assert_eq!(fit.used, 39);
    assert!(fit.rms_f < 0.02, "{}", fit.rms_f);
}

#[rstest]
#[case(390, "upper side")]
#[case(460, "upper side")]
#[case(3900, "lower side")]
fn each_side_needs_enough_rows(#[case] cutoff: i32, #[case] needle: &str) {
    let err = fit_piecewise(&synthetic_run(cutoff), cutoff).expect_err("must fail");
    assert!(format!("{err}").contains(needle), "{err}");
}

#[test]
fn fitted_block_parses_back_as_config() {
    let fit = fit_piecewise(&synthetic_run(2019), 2019).expect("fit");
    let text = fit.to_toml();
    let cfg = thermocal_config::load_toml(&text).expect("parse emitted block");
    assert_eq!(cfg.calibration, fit.calibration());
    cfg.validate().expect("emitted block validates");
}

#[rstest]
fn loads_csv_written_by_a_record_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("probe_calibration.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "\"Data Set: ADC Reading\",\"Data Set: Temp F\"").unwrap();
    writeln!(f, "1500,101.2500").unwrap();
    writeln!(f, "2100,72.1250").unwrap();
    drop(f);

    let rows = load_recorded_run_csv(&path).expect("load");
    assert_eq!(
        rows,
        vec![
            RecordedRow {
                raw: 1500,
                temp_f: 101.25
            },
            RecordedRow {
                raw: 2100,
                temp_f: 72.125
            },
        ]
    );
}

#[rstest]
#[case("raw,temp\n1,2\n", "must have headers")]
#[case("\"Data Set: ADC Reading\",\"Data Set: Temp F\"\nabc,2\n", "invalid CSV row 2")]
#[case("\"Data Set: ADC Reading\",\"Data Set: Temp F\"\n1,2\n3,x\n", "invalid CSV row 3")]
fn rejects_malformed_csv(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.csv");
    std::fs::write(&path, body).unwrap();
    let err = load_recorded_run_csv(&path).expect_err("must fail");
    assert!(format!("{err}").contains(needle), "{err}");
}
