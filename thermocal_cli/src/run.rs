//! `run`: wire peripherals into an instrument and drive it until it stops.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use serde_json::json;
use thermocal_config::Config;
use thermocal_core::{
    CsvDataLog, InstrumentCfg, InstrumentCore, RunLimits, RunSummary, StopReason, Wiring,
    build_instrument, run,
};
use thermocal_hardware::{
    BathModel, HostClock, SimulatedAdc, SimulatedButton, SimulatedEncoder, SimulatedProbe,
    Thermistor,
};
use thermocal_traits::{Clock, EncoderCounter, StatusSink};

use crate::cli::{Backend, RunArgs};

/// Prints status lines on stdout, one JSON object per line in `--json` mode.
#[derive(Debug, Clone, Copy)]
pub struct StdoutSink {
    pub json: bool,
}

impl StatusSink for StdoutSink {
    fn line(&mut self, text: &str) {
        if self.json {
            println!("{}", json!({ "line": text }));
        } else {
            println!("{text}");
        }
    }
}

/// Operator console on stdin: `c` or an empty line clicks, runs of `+`/`-`
/// turn the encoder, `q` stops.
fn spawn_console(
    button: SimulatedButton,
    encoder: SimulatedEncoder,
    press_ms: u32,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let cmd = line.trim();
                match cmd {
                    "" | "c" => button.press_for(press_ms),
                    "q" => {
                        shutdown.store(true, Ordering::Relaxed);
                        break;
                    }
                    s if s.chars().all(|c| c == '+') => encoder.turn(detents(s.len())),
                    s if s.chars().all(|c| c == '-') => encoder.turn(-detents(s.len())),
                    other => tracing::warn!(input = other, "unknown console command (c, +, -, q)"),
                }
            }
            tracing::debug!("console closed");
        })
        .wrap_err("spawn console thread")?;
    Ok(())
}

fn detents(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Both backends share the simulated bath; only the operator inputs differ.
type BenchInstrument = InstrumentCore<SimulatedAdc, SimulatedProbe>;

/// Peripherals that only need to outlive the run loop.
#[derive(Default)]
struct Keepalive {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    _encoder: Option<thermocal_hardware::rpi::RpiEncoder>,
}

fn build(
    cfg: &Config,
    args: &RunArgs,
    json: bool,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<(BenchInstrument, Keepalive)> {
    let inst_cfg = InstrumentCfg::try_from(cfg).map_err(eyre::Report::new)?;

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(HostClock::default());
    let bath = Arc::new(BathModel::new(
        Arc::clone(&clock),
        args.bath.start_f,
        args.bath.ambient_f,
        args.bath.tau_ms,
    ));
    let adc = SimulatedAdc::new(Arc::clone(&bath), Thermistor::default(), args.bath.adc_noise);
    let probe = SimulatedProbe::new(Arc::clone(&bath), cfg.probe.conversion_ms);
    if args.bath.disconnected_probe {
        probe.disconnect_handle().store(true, Ordering::Relaxed);
    }

    let counter = EncoderCounter::default();
    let log = Box::new(CsvDataLog::new(&cfg.record.file));
    let mut wiring = Wiring {
        sink: Some(Box::new(StdoutSink { json })),
        button: None,
        counter: Some(counter.clone()),
        clock: Some(Arc::clone(&clock)),
    };

    let keepalive = match args.backend {
        Backend::Sim => {
            let button = SimulatedButton::new(Arc::clone(&clock));
            if !args.no_stdin {
                let encoder = SimulatedEncoder::new(counter, cfg.encoder.steps_per_detent);
                let press_ms = cfg.encoder.debounce_ms.saturating_add(20);
                spawn_console(button.clone(), encoder, press_ms, Arc::clone(shutdown))?;
            }
            wiring.button = Some(Box::new(button));
            Keepalive::default()
        }
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        Backend::Gpio => {
            use thermocal_hardware::rpi::{RpiButton, RpiEncoder, open_gpio};
            let gpio = open_gpio().map_err(eyre::Report::new)?;
            let button = RpiButton::new(&gpio, cfg.pins.encoder_button)
                .map_err(eyre::Report::new)
                .wrap_err("open encoder button pin")?;
            let encoder = RpiEncoder::new(&gpio, cfg.pins.encoder_a, cfg.pins.encoder_b, counter)
                .map_err(eyre::Report::new)
                .wrap_err("open encoder pins")?;
            wiring.button = Some(Box::new(button));
            Keepalive {
                _encoder: Some(encoder),
            }
        }
        #[cfg(not(all(feature = "hardware", target_os = "linux")))]
        Backend::Gpio => {
            eyre::bail!("gpio backend requires the `hardware` feature on Linux")
        }
    };

    let inst = build_instrument(adc, probe, log, inst_cfg, wiring)?;
    Ok((inst, keepalive))
}

pub fn run_instrument(
    cfg: &Config,
    args: &RunArgs,
    json: bool,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<()> {
    let (mut inst, _keepalive) = build(cfg, args, json, shutdown)?;
    for _ in 0..args.clicks {
        inst.click();
    }

    let limits = RunLimits {
        max_runtime_ms: args.max_runtime_ms,
        stop_on_session_end: args.until_done,
    };
    let summary = run(&mut inst, shutdown, limits)?;
    print_summary(&summary, &cfg.record.file, json);

    if args.until_done
        && summary.stop == StopReason::SessionEnded
        && summary.aborted > 0
        && let Some(err) = summary.last_error
    {
        return Err(eyre::Report::new(err));
    }
    Ok(())
}

fn stop_name(stop: StopReason) -> &'static str {
    match stop {
        StopReason::Shutdown => "shutdown",
        StopReason::Timeout => "timeout",
        StopReason::SessionEnded => "session_ended",
    }
}

fn print_summary(s: &RunSummary, log_path: &str, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "stop": stop_name(s.stop),
                "steps": s.steps,
                "mode_changes": s.mode_changes,
                "completed": s.completed,
                "aborted": s.aborted,
                "final_mode": s.final_mode.to_string(),
                "last_error": s.last_error.as_ref().map(ToString::to_string),
                "record_file": log_path,
            })
        );
        return;
    }
    println!(
        "stopped ({}): {} steps, {} mode changes, {} completed, {} aborted, final mode {}",
        stop_name(s.stop),
        s.steps,
        s.mode_changes,
        s.completed,
        s.aborted,
        s.final_mode
    );
    if let Some(e) = &s.last_error {
        println!("last abort: {e}");
    }
}
