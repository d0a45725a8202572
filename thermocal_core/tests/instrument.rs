mod common;

use common::{bench, bench_with, small_cfg};
use rstest::rstest;
use thermocal_core::mocks::{ScriptedAdc, ScriptedProbe};
use thermocal_core::{AbortReason, InstrumentError, Mode, StepStatus};
use thermocal_traits::Clock;

fn aborted_with(status: &StepStatus, reason: &AbortReason) -> bool {
    matches!(status, StepStatus::Aborted(InstrumentError::Abort(r)) if r == reason)
}

#[rstest]
#[case(1, Mode::SelectSampleSize)]
#[case(2, Mode::PrintBuffer)]
#[case(3, Mode::TestMode)]
#[case(4, Mode::RecordData)]
#[case(5, Mode::Standby)]
#[case(6, Mode::SelectSampleSize)]
fn clicks_cycle_modes_from_standby(#[case] clicks: usize, #[case] expected: Mode) {
    let mut b = bench(ScriptedProbe::new([70.0]));
    assert_eq!(b.inst.mode(), Mode::Standby);
    let statuses = b.click_n(clicks);
    assert_eq!(statuses.last(), Some(&StepStatus::ModeChanged(expected)));
    assert_eq!(b.inst.mode(), expected);
}

#[test]
fn banners_and_log_lifecycle_follow_the_cycle() {
    let mut b = bench(ScriptedProbe::new([70.0]));
    b.click_n(5);
    let lines = b.sink.lines();
    assert_eq!(
        lines,
        vec!["STANDBY_MODE", "TEST_MODE", "RECORD_DATA", "STANDBY_MODE"]
    );
    assert_eq!(b.log.sessions(), 1);
    assert_eq!(b.log.closes(), 1);
    assert_eq!(
        b.log.header(),
        vec!["Data Set: ADC Reading", "Data Set: Temp F"]
    );
    assert!(!b.inst.is_log_open());
}

#[test]
fn select_reports_statistics_and_meta_after_history_fills() {
    let mut b = bench(ScriptedProbe::new([70.0]));
    b.click_n(1);
    while b.sink.count_containing("Median:") < 3 {
        b.steps(1);
    }
    let cycles: Vec<String> = b
        .sink
        .lines()
        .into_iter()
        .filter(|l| l.contains("Median:"))
        .collect();
    assert_eq!(
        cycles[0],
        "SAMPLE_SIZE: 3   Median: 2048   Average: 2048   Time(ms): 0   Slope:  0.00   Skew: 0"
    );
    assert!(!cycles[1].contains("MedianStdDev"));
    assert!(cycles[2].ends_with("\t\tMedianStdDev: 0.00\t\tAverageStdDev: 0.00"));
    assert_eq!(b.adc.reads(), 9);
}

#[test]
fn rotation_in_select_resizes_and_clears() {
    let mut b = bench(ScriptedProbe::new([70.0]));
    b.click_n(1);
    b.steps(50);
    b.counter.record(4);
    assert_eq!(b.inst.step(), StepStatus::Running);
    assert_eq!(b.inst.sample_size(), 5);
    assert_eq!(b.inst.size_index(), 1);
    assert_eq!(b.sink.lines().last().map(String::as_str), Some("SAMPLE_SIZE: 5"));

    // Clamped at the top of the list.
    b.counter.record(40);
    b.inst.step();
    assert_eq!(b.inst.sample_size(), 7);
}

#[test]
fn rotation_mid_burst_restarts_the_burst_and_statistics_history() {
    let mut b = bench_with(small_cfg(), ScriptedProbe::new([70.0]), |_| {
        ScriptedAdc::from_fn(|i| i16::try_from(i).unwrap())
    });
    b.click_n(1);
    while b.sink.count_containing("MedianStdDev") == 0 {
        b.steps(1);
    }
    // One read into the next burst of three.
    while b.adc.reads() % 3 == 0 {
        b.steps(1);
    }
    let reads_at_rotation = b.adc.reads();
    b.sink.clear();

    b.counter.record(4);
    assert_eq!(b.inst.step(), StepStatus::Running);
    assert_eq!(b.inst.sample_size(), 5);
    assert_eq!(b.adc.reads(), reads_at_rotation);

    while b.sink.count_containing("Median:") < 3 {
        b.steps(1);
    }
    let cycles: Vec<String> = b
        .sink
        .lines()
        .into_iter()
        .filter(|l| l.contains("Median:"))
        .collect();
    // The first burst after the resize holds only fresh reads.
    let first_median = reads_at_rotation + 2;
    assert!(
        cycles[0].starts_with(&format!("SAMPLE_SIZE: 5   Median: {first_median}   ")),
        "{}",
        cycles[0]
    );
    assert!(!cycles[0].contains("MedianStdDev"));
    assert!(!cycles[1].contains("MedianStdDev"));
    assert!(cycles[2].contains("MedianStdDev"));
    assert_eq!(b.adc.reads(), reads_at_rotation + 15);
}

#[test]
fn rotation_while_idle_is_discarded() {
    let mut b = bench(ScriptedProbe::new([70.0]));
    b.steps(3);
    b.counter.record(8);
    b.steps(3);
    assert_eq!(b.inst.sample_size(), 3);
    b.click_n(1);
    b.steps(3);
    assert_eq!(b.inst.sample_size(), 3);
    assert_eq!(b.sink.count_containing("SAMPLE_SIZE: 5"), 0);
}

#[test]
fn print_buffer_dumps_each_burst_in_order() {
    let mut b = bench_with(small_cfg(), ScriptedProbe::new([70.0]), |_| {
        ScriptedAdc::from_fn(|i| i16::try_from(i).unwrap())
    });
    b.click_n(2);
    while b.sink.count_containing("SAMPLE_SIZE: 3") < 2 {
        b.steps(1);
    }
    let lines = b.sink.lines();
    let dumps: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .filter(|l| !l.starts_with("SAMPLE_SIZE") && *l != "STANDBY_MODE")
        .collect();
    assert_eq!(dumps, vec!["0 1 2", "3 4 5"]);
}

#[test]
fn test_mode_compares_calibration_with_probe() {
    let mut b = bench(ScriptedProbe::new([70.0]));
    b.click_n(3);
    while b.sink.count_containing("ADC_TempF") == 0 {
        b.steps(1);
    }
    let line = b.sink.lines().pop().unwrap();
    let expected_adc = b.inst.calibration().temperature_f(2048);
    assert_eq!(
        line,
        format!(
            "SampleSize: 3   Median: 2048   ADC_TempF: {expected_adc:.2}   TempF: 70.0000   Slope:  0.00"
        )
    );
    assert_eq!(b.probe.requests(), 1);
}

#[test]
fn disconnected_probe_aborts_to_standby() {
    let mut b = bench(ScriptedProbe::new([]));
    b.click_n(3);
    let status = b.step_until(1_000, |s| !matches!(s, StepStatus::Running));
    assert!(aborted_with(&status, &AbortReason::SensorDisconnected), "{status:?}");
    assert_eq!(b.inst.mode(), Mode::Standby);
    let lines = b.sink.lines();
    assert_eq!(
        &lines[lines.len() - 2..],
        ["Error: Could not read temp data from 1-wire sensor!", "STANDBY_MODE"]
    );
}

#[test]
fn storage_failure_at_record_entry_never_samples() {
    let mut b = bench(ScriptedProbe::new([70.0]));
    b.log.fail_begin(true);
    let statuses = b.click_n(4);
    match statuses.last() {
        Some(StepStatus::Aborted(InstrumentError::Abort(AbortReason::StorageUnavailable(msg)))) => {
            assert!(msg.contains("storage not mounted"), "{msg}");
        }
        other => panic!("expected storage abort, got {other:?}"),
    }
    assert_eq!(b.inst.mode(), Mode::Standby);
    assert_eq!(b.adc.reads(), 0);
    assert_eq!(b.probe.requests(), 0);
    assert!(b.sink.lines().contains(
        &"!!!!!!!!!!!!!! Error opening .csv file !!!!!!!!!!!!!!!!!!".to_string()
    ));
}

#[test]
fn log_write_failure_aborts_record() {
    let mut b = bench(ScriptedProbe::new([70.0]));
    b.click_n(4);
    b.log.fail_append(true);
    let status = b.step_until(1_000, |s| !matches!(s, StepStatus::Running));
    assert!(
        matches!(
            status,
            StepStatus::Aborted(InstrumentError::Abort(AbortReason::StorageWrite(_)))
        ),
        "{status:?}"
    );
    assert!(!b.log.is_open());
}

#[test]
fn adc_failure_aborts_session() {
    let mut b = bench_with(small_cfg(), ScriptedProbe::new([70.0]), |_| {
        ScriptedAdc::fallible(|_| Err(Box::new(std::io::Error::other("adc offline"))))
    });
    b.click_n(1);
    let status = b.step_until(1_000, |s| !matches!(s, StepStatus::Running));
    match status {
        StepStatus::Aborted(InstrumentError::Abort(AbortReason::Adc(msg))) => {
            assert!(msg.contains("adc offline"));
        }
        other => panic!("expected adc abort, got {other:?}"),
    }
    assert_eq!(b.inst.mode(), Mode::Standby);
}

#[test]
fn record_hold_is_reset_by_a_warm_reading() {
    // Rows are logged 100 ms apart. Cold for two rows, warm once, then the
    // hold runs from row 5 and expires at row 8.
    let probe = ScriptedProbe::new([50.0, 39.0, 39.0, 45.0, 39.0, 39.0, 39.0]);
    let mut b = bench(probe);
    b.click_n(4);
    assert!(b.inst.is_log_open());

    for _ in 0..4 {
        let before = b.inst.run_count();
        while b.inst.run_count() == before {
            b.steps(1);
        }
    }
    assert_eq!(b.inst.mode(), Mode::RecordData);

    let status = b.step_until(1_000, |s| !matches!(s, StepStatus::Running));
    assert_eq!(status, StepStatus::Completed);
    assert_eq!(b.inst.run_count(), 8);
    assert_eq!(b.inst.mode(), Mode::Standby);
    assert!(!b.log.is_open());

    let rows = b.log.rows();
    assert_eq!(rows.len(), 8);
    assert_eq!(rows[3], (2048, 45.0));
    let lines = b.sink.lines();
    assert_eq!(
        &lines[lines.len() - 3..],
        [
            "SampleSize: 3   Median: 2048   TempF: 39.0000   EndTemp: 40.00   count: 8",
            "Data Collection Completed!!!",
            "STANDBY_MODE",
        ]
    );
}

#[test]
fn record_hold_runs_from_the_first_cold_row() {
    let mut b = bench(ScriptedProbe::new([39.0]));
    b.click_n(4);
    while b.inst.run_count() == 0 {
        b.steps(1);
    }
    let first_cold_ms = b.clock.millis();

    let status = b.step_until(1_000, |s| !matches!(s, StepStatus::Running));
    assert_eq!(status, StepStatus::Completed);
    let cold_span_ms = b.clock.millis() - first_cold_ms;
    assert!(cold_span_ms >= 300, "completed after {cold_span_ms} ms cold");
    assert_eq!(b.inst.run_count(), 4);
    assert_eq!(b.log.rows().len(), 4);
}

#[test]
fn overrun_is_fatal_only_while_recording() {
    let slow = |clock: &thermocal_traits::ManualClock| {
        let clock = clock.clone();
        ScriptedAdc::from_fn(move |_| {
            clock.advance(40);
            2048
        })
    };

    let mut select = bench_with(small_cfg(), ScriptedProbe::new([70.0]), slow);
    select.click_n(1);
    while select.sink.count_containing("WARNING: Data Collection") < 2 {
        select.steps(1);
    }
    assert_eq!(select.inst.mode(), Mode::SelectSampleSize);

    let mut record = bench_with(small_cfg(), ScriptedProbe::new([70.0]), slow);
    record.click_n(4);
    let status = record.step_until(1_000, |s| !matches!(s, StepStatus::Running));
    assert!(aborted_with(&status, &AbortReason::CadenceOverrun), "{status:?}");
    assert_eq!(record.inst.mode(), Mode::Standby);
    assert_eq!(record.log.rows().len(), 1);
    assert!(!record.log.is_open());
    assert_eq!(
        record.sink.count_containing("Either decrease SAMPLE_SIZE or increase data_interval."),
        1
    );
}

#[test]
fn click_during_probe_wait_leaves_the_mode() {
    let mut cfg = small_cfg();
    cfg.encoder.debounce_ms = 5;
    let mut b = bench_with(cfg, ScriptedProbe::new([70.0]), |_| ScriptedAdc::constant(2048));
    b.click_n(3);
    while b.adc.reads() < 2 {
        b.steps(1);
    }
    // Held through the burst's last read and into the settle wait.
    b.button.press();
    let status = b.inst.step();
    assert_eq!(status, StepStatus::ModeChanged(Mode::RecordData));
    assert_eq!(b.adc.reads(), 3);
    assert_eq!(b.sink.count_containing("ADC_TempF"), 0);
    assert!(b.log.is_open());
}
