use rstest::rstest;
use thermocal_config::{Config, load_path, load_toml};

#[test]
fn empty_document_yields_bench_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    assert_eq!(cfg, Config::default());
    assert_eq!(
        cfg.sampling.buffer_sizes,
        vec![15, 31, 65, 129, 255, 511, 1025, 2049, 4095]
    );
    assert_eq!(cfg.sampling.std_dev_sample_size, 32);
    assert_eq!(cfg.sampling.data_interval_ms, 1000);
    assert!(cfg.sampling.use_median);
    assert_eq!(cfg.probe.conversion_ms, 750);
    assert_eq!(cfg.record.end_temp_f, 40.0);
    assert_eq!(cfg.record.end_temp_time_ms, 30_000);
    assert_eq!(cfg.record.file, "probe_calibration.csv");
    assert_eq!(cfg.calibration.upper_cutoff, 2019);
    assert_eq!(cfg.calibration.lower, cfg.calibration.upper);
    assert_eq!(cfg.encoder.steps_per_detent, 4);
    cfg.validate().expect("defaults must validate");
}

#[test]
fn partial_sections_keep_other_defaults() {
    let toml = r#"
[sampling]
use_median = false

[calibration]
upper_cutoff = 1800
upper = { a = 1.0, b = 2.0, c = 3.0, d = 4.0 }
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    assert!(!cfg.sampling.use_median);
    assert_eq!(cfg.sampling.data_interval_ms, 1000);
    assert_eq!(cfg.calibration.upper_cutoff, 1800);
    assert_eq!(cfg.calibration.upper.d, 4.0);
    assert_eq!(cfg.calibration.lower.a, 233.2);
    cfg.validate().expect("valid config should pass");
}

#[rstest]
#[case("[sampling]\nbuffer_sizes = []", "buffer_sizes must not be empty")]
#[case("[sampling]\nbuffer_sizes = [15, 32]", "buffer_sizes must be odd")]
#[case("[sampling]\nbuffer_sizes = [4097]", "buffer_sizes must be <= 4095")]
#[case("[sampling]\nstd_dev_sample_size = 1", "std_dev_sample_size must be >= 2")]
#[case("[sampling]\ndata_interval_ms = 700", "must be greater than probe.conversion_ms")]
#[case("[sampling]\ndata_interval_ms = 750", "must be greater than probe.conversion_ms")]
#[case("[sampling]\nskew_deviations = 0.0", "skew_deviations must be > 0")]
#[case("[record]\nend_temp_time_ms = 0", "end_temp_time_ms must be >= 1")]
#[case("[record]\nfile = \"  \"", "record.file must not be empty")]
#[case("[calibration]\nupper_cutoff = -1", "upper_cutoff must be in")]
#[case("[calibration]\nlower = { a = nan, b = 0.0, c = 0.0, d = 0.0 }", "lower coefficients must be finite")]
#[case("[encoder]\nsteps_per_detent = 0", "steps_per_detent must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "{msg:?} does not mention {needle:?}");
}

#[test]
fn unknown_type_is_a_parse_error() {
    assert!(load_toml("[sampling]\ndata_interval_ms = \"fast\"").is_err());
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_path(&dir.path().join("nope.toml")).expect("defaults");
    assert_eq!(cfg, Config::default());
}

#[test]
fn file_on_disk_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thermocal.toml");
    std::fs::write(&path, "[record]\nend_temp_f = 35.5\n").unwrap();
    let cfg = load_path(&path).expect("parse");
    assert_eq!(cfg.record.end_temp_f, 35.5);
}

#[test]
fn malformed_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[record\n").unwrap();
    let err = load_path(&path).expect_err("malformed");
    assert!(format!("{err}").contains("broken.toml"));
}

#[test]
fn shipped_sample_config_matches_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/thermocal.toml");
    let cfg = load_path(&path).expect("sample config parses");
    cfg.validate().expect("sample config validates");
    assert_eq!(cfg, Config::default());
}
