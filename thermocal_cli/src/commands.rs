//! Offline subcommands: fitting, conversion and config checks.

use std::path::Path;

use serde_json::json;
use thermocal_config::Config;
use thermocal_config::fit::{CubicFit, fit_piecewise, load_recorded_run_csv};
use thermocal_core::{Branch, InstrumentCfg, PiecewiseCalibration};

fn side_json(f: &CubicFit) -> serde_json::Value {
    let c = f.coefficients;
    json!({
        "a": c.a, "b": c.b, "c": c.c, "d": c.d,
        "used": f.used,
        "rejected": f.rejected,
        "rms_f": f.rms_f,
    })
}

pub fn fit(csv: &Path, cutoff: i32, json: bool) -> eyre::Result<()> {
    let rows = load_recorded_run_csv(csv)?;
    let fit = fit_piecewise(&rows, cutoff)?;
    tracing::info!(rows = rows.len(), cutoff, "fitted recorded run");

    if json {
        println!(
            "{}",
            json!({
                "upper_cutoff": fit.upper_cutoff,
                "rows": rows.len(),
                "upper": side_json(&fit.upper),
                "lower": side_json(&fit.lower),
            })
        );
        return Ok(());
    }
    print!("{}", fit.to_toml());
    for (name, side) in [("upper", &fit.upper), ("lower", &fit.lower)] {
        println!(
            "# {name}: {} rows ({} rejected), rms {:.3} °F",
            side.used, side.rejected, side.rms_f
        );
    }
    Ok(())
}

fn branch_name(b: Branch) -> &'static str {
    match b {
        Branch::Upper => "upper",
        Branch::Lower => "lower",
    }
}

pub fn convert(cfg: &Config, raw: &[i32], json: bool) -> eyre::Result<()> {
    let cal = PiecewiseCalibration::from(&cfg.calibration);
    for &r in raw {
        if !(0..=thermocal_config::ADC_MAX).contains(&r) {
            eyre::bail!("raw value {r} is outside 0..={}", thermocal_config::ADC_MAX);
        }
        let temp_f = cal.temperature_f(r);
        let branch = branch_name(cal.branch(r));
        if json {
            println!("{}", json!({ "raw": r, "temp_f": temp_f, "branch": branch }));
        } else {
            println!("{r}\t{temp_f:.2}\t{branch}");
        }
    }
    Ok(())
}

pub fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let inst = InstrumentCfg::try_from(cfg).map_err(eyre::Report::new)?;
    let mut sizes = inst.sampling.buffer_sizes.clone();
    sizes.sort_unstable();
    sizes.dedup();
    let cal = inst.calibration;
    let cutoff = cal.upper_cutoff;
    let at_cutoff = cal.temperature_f(cutoff);
    let past_cutoff = cal.temperature_f(cutoff.saturating_add(1));

    let record_dir = Path::new(&cfg.record.file)
        .parent()
        .filter(|p| !p.as_os_str().is_empty());
    let record_dir_ok = record_dir.is_none_or(Path::is_dir);
    if !record_dir_ok {
        tracing::warn!(file = %cfg.record.file, "record file directory does not exist");
    }

    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "buffer_sizes": sizes,
                "initial_sample_size": sizes.first(),
                "data_interval_ms": inst.sampling.data_interval_ms,
                "aggregate": if inst.sampling.use_median { "median" } else { "average" },
                "upper_cutoff": cutoff,
                "temp_at_cutoff_f": at_cutoff,
                "temp_past_cutoff_f": past_cutoff,
                "record_file": cfg.record.file,
                "record_dir_exists": record_dir_ok,
            })
        );
        return Ok(());
    }
    println!("buffer sizes: {sizes:?}");
    if let Some(first) = sizes.first() {
        println!("initial SAMPLE_SIZE: {first}");
    }
    println!(
        "data interval: {} ms ({}), probe conversion: {} ms",
        inst.sampling.data_interval_ms,
        if inst.sampling.use_median { "median" } else { "average" },
        inst.probe.conversion_ms
    );
    println!(
        "calibration: {cutoff} -> {at_cutoff:.2} °F (upper), {} -> {past_cutoff:.2} °F (lower)",
        cutoff.saturating_add(1)
    );
    println!("record file: {}", cfg.record.file);
    if !record_dir_ok {
        println!("warning: record file directory does not exist");
    }
    println!("config OK");
    Ok(())
}
