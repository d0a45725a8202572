#![allow(dead_code)]

use thermocal_core::mocks::{MemoryLog, ScriptedAdc, ScriptedProbe, SharedButton, VecSink};
use thermocal_core::{
    EncoderCfg, Instrument, InstrumentCfg, PiecewiseCalibration, ProbeCfg, RecordCfg,
    SamplingCfg, StepStatus,
};
use thermocal_traits::{EncoderCounter, ManualClock};

/// Small, fast configuration: 100 ms interval, 20 ms probe settle, 300 ms hold.
pub fn small_cfg() -> InstrumentCfg {
    InstrumentCfg {
        sampling: SamplingCfg {
            buffer_sizes: vec![3, 5, 7],
            std_dev_sample_size: 2,
            data_interval_ms: 100,
            use_median: true,
            skew_deviations: 2.0,
        },
        probe: ProbeCfg {
            conversion_ms: 20,
            device_index: 0,
        },
        record: RecordCfg {
            end_temp_f: 40.0,
            end_temp_time_ms: 300,
        },
        encoder: EncoderCfg::default(),
        calibration: PiecewiseCalibration::default(),
    }
}

pub struct Bench {
    pub inst: Instrument,
    pub clock: ManualClock,
    pub adc: ScriptedAdc,
    pub probe: ScriptedProbe,
    pub log: MemoryLog,
    pub sink: VecSink,
    pub button: SharedButton,
    pub counter: EncoderCounter,
}

/// Build an instrument on a manual clock that advances 1 ms per idle poll.
pub fn bench_with(
    cfg: InstrumentCfg,
    probe: ScriptedProbe,
    make_adc: impl FnOnce(&ManualClock) -> ScriptedAdc,
) -> Bench {
    let clock = ManualClock::new().with_relax_step(1);
    let adc = make_adc(&clock);
    let log = MemoryLog::new();
    let sink = VecSink::new();
    let counter = EncoderCounter::new();
    let button = SharedButton::new();
    let inst = Instrument::builder()
        .with_adc(adc.clone())
        .with_probe(probe.clone())
        .with_log(log.clone())
        .with_sink(sink.clone())
        .with_button(button.clone())
        .with_clock(clock.clone())
        .with_encoder_counter(counter.clone())
        .with_config(cfg)
        .build()
        .expect("valid bench");
    Bench {
        inst,
        clock,
        adc,
        probe,
        log,
        sink,
        button,
        counter,
    }
}

pub fn bench(probe: ScriptedProbe) -> Bench {
    bench_with(small_cfg(), probe, |_| ScriptedAdc::constant(2048))
}

impl Bench {
    /// Queue `n` clicks and step until each has been consumed.
    pub fn click_n(&mut self, n: usize) -> Vec<StepStatus> {
        for _ in 0..n {
            self.inst.click();
        }
        (0..n).map(|_| self.inst.step()).collect()
    }

    /// Step until `pred` accepts a status; panics after `max` steps.
    pub fn step_until(&mut self, max: usize, pred: impl Fn(&StepStatus) -> bool) -> StepStatus {
        for _ in 0..max {
            let s = self.inst.step();
            if pred(&s) {
                return s;
            }
        }
        panic!("condition not reached within {max} steps");
    }

    pub fn steps(&mut self, n: usize) {
        for _ in 0..n {
            let s = self.inst.step();
            assert!(
                matches!(s, StepStatus::Running),
                "unexpected status {s:?}"
            );
        }
    }
}
