//! Recorded-run loading and piecewise cubic fitting.
//!
//! A record session writes `(aggregate ADC, probe °F)` rows. Fitting one
//! cubic per side of the cutoff turns that run into a `[calibration]` block.
//!
//! The abscissa is centred and scaled before solving the normal equations;
//! raw counts go up to 4095 so `x³` alone would span ~11 orders of magnitude.

use std::path::Path;

use crate::{Calibration, CubicCoefficients};

/// Header written by the instrument at the start of every record session.
pub const RUN_HEADER: [&str; 2] = ["Data Set: ADC Reading", "Data Set: Temp F"];

/// Minimum rows per side of the cutoff.
pub const MIN_POINTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedRow {
    pub raw: i32,
    pub temp_f: f64,
}

/// One fitted cubic plus how well it fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicFit {
    pub coefficients: CubicCoefficients,
    /// Points used in the final solve.
    pub used: usize,
    /// Points dropped by the outlier pass.
    pub rejected: usize,
    /// RMS residual over the used points (°F).
    pub rms_f: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiecewiseFit {
    pub upper_cutoff: i32,
    pub upper: CubicFit,
    pub lower: CubicFit,
}

impl PiecewiseFit {
    pub fn calibration(&self) -> Calibration {
        Calibration {
            upper_cutoff: self.upper_cutoff,
            lower: self.lower.coefficients,
            upper: self.upper.coefficients,
        }
    }

    /// Ready-to-paste `[calibration]` section.
    pub fn to_toml(&self) -> String {
        fn inline(c: &CubicCoefficients) -> String {
            format!("{{ a = {:?}, b = {:?}, c = {:?}, d = {:?} }}", c.a, c.b, c.c, c.d)
        }
        format!(
            "[calibration]\nupper_cutoff = {}\nlower = {}\nupper = {}\n",
            self.upper_cutoff,
            inline(&self.lower.coefficients),
            inline(&self.upper.coefficients),
        )
    }
}

pub fn load_recorded_run_csv(path: &Path) -> eyre::Result<Vec<RecordedRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open recorded run {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != RUN_HEADER {
        eyre::bail!(
            "recorded run CSV must have headers '{}', got: {}",
            RUN_HEADER.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let line = idx + 2;
        let rec = rec.map_err(|e| eyre::eyre!("invalid CSV row {line}: {e}"))?;
        if rec.len() != 2 {
            eyre::bail!("invalid CSV row {line}: expected 2 fields, got {}", rec.len());
        }
        let raw: i32 = rec[0]
            .parse()
            .map_err(|e| eyre::eyre!("invalid CSV row {line}: raw {:?}: {e}", &rec[0]))?;
        let temp_f: f64 = rec[1]
            .parse()
            .map_err(|e| eyre::eyre!("invalid CSV row {line}: temp {:?}: {e}", &rec[1]))?;
        if !temp_f.is_finite() {
            eyre::bail!("invalid CSV row {line}: temperature is not finite");
        }
        rows.push(RecordedRow { raw, temp_f });
    }
    Ok(rows)
}

/// Split rows at `upper_cutoff` (`raw <= cutoff` goes to `upper`) and fit each side.
pub fn fit_piecewise(rows: &[RecordedRow], upper_cutoff: i32) -> eyre::Result<PiecewiseFit> {
    let (upper, lower): (Vec<_>, Vec<_>) = rows
        .iter()
        .map(|r| (f64::from(r.raw), r.temp_f))
        .partition(|(x, _)| *x <= f64::from(upper_cutoff));

    let upper = fit_cubic(&upper).map_err(|e| eyre::eyre!("upper side (raw <= {upper_cutoff}): {e}"))?;
    let lower = fit_cubic(&lower).map_err(|e| eyre::eyre!("lower side (raw > {upper_cutoff}): {e}"))?;
    Ok(PiecewiseFit {
        upper_cutoff,
        upper,
        lower,
    })
}

/// Least-squares cubic through `(x, y)` with one 2σ outlier-rejection pass.
pub fn fit_cubic(points: &[(f64, f64)]) -> eyre::Result<CubicFit> {
    if points.len() < MIN_POINTS {
        eyre::bail!(
            "cubic fit requires at least {MIN_POINTS} rows, got {}",
            points.len()
        );
    }
    let c0 = solve(points)?;
    let rms0 = rms(points, &c0);
    if let Some((c, used)) = robust_refit(points, &c0, rms0, 2.0) {
        let kept: Vec<(f64, f64)> = points
            .iter()
            .copied()
            .filter(|&(x, y)| (y - eval(&c0, x)).abs() <= 2.0 * rms0)
            .collect();
        return Ok(CubicFit {
            coefficients: c,
            used,
            rejected: points.len() - used,
            rms_f: rms(&kept, &c),
        });
    }
    Ok(CubicFit {
        coefficients: c0,
        used: points.len(),
        rejected: 0,
        rms_f: rms0,
    })
}

/// Refit on points within `k·rms` of the first fit. `None` when nothing was
/// rejected, too few points remain, or the reduced system is degenerate.
fn robust_refit(
    pts: &[(f64, f64)],
    c0: &CubicCoefficients,
    rms: f64,
    k: f64,
) -> Option<(CubicCoefficients, usize)> {
    if !(rms.is_finite() && rms > 0.0) {
        return None;
    }
    let thr = k * rms;
    let inliers: Vec<(f64, f64)> = pts
        .iter()
        .copied()
        .filter(|&(x, y)| (y - eval(c0, x)).abs() <= thr)
        .collect();
    if inliers.len() < MIN_POINTS || inliers.len() == pts.len() {
        return None;
    }
    solve(&inliers).ok().map(|c| (c, inliers.len()))
}

fn eval(c: &CubicCoefficients, x: f64) -> f64 {
    ((c.d * x + c.c) * x + c.b) * x + c.a
}

fn rms(pts: &[(f64, f64)], c: &CubicCoefficients) -> f64 {
    if pts.is_empty() {
        return 0.0;
    }
    let ss: f64 = pts
        .iter()
        .map(|&(x, y)| {
            let r = y - eval(c, x);
            r * r
        })
        .sum();
    (ss / pts.len() as f64).sqrt()
}

fn solve(pts: &[(f64, f64)]) -> eyre::Result<CubicCoefficients> {
    let n = pts.len() as f64;
    let m = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let half_range = pts
        .iter()
        .map(|p| (p.0 - m).abs())
        .fold(0.0f64, f64::max);
    if half_range == 0.0 {
        eyre::bail!("cubic fit cannot proceed (all raw values identical)");
    }
    let s = half_range;

    // Normal equations in u = (x - m) / s.
    let mut ata = [[0.0f64; 4]; 4];
    let mut aty = [0.0f64; 4];
    for &(x, y) in pts {
        let u = (x - m) / s;
        let pw = [1.0, u, u * u, u * u * u];
        for i in 0..4 {
            for j in 0..4 {
                ata[i][j] += pw[i] * pw[j];
            }
            aty[i] += pw[i] * y;
        }
    }
    let p = gauss_solve(ata, aty)
        .ok_or_else(|| eyre::eyre!("cubic fit is degenerate (need at least 4 distinct raw values)"))?;

    // y = Σ q_k (x - m)^k, expanded back into powers of x.
    let q = [p[0], p[1] / s, p[2] / (s * s), p[3] / (s * s * s)];
    let c = CubicCoefficients {
        a: q[0] - q[1] * m + q[2] * m * m - q[3] * m * m * m,
        b: q[1] - 2.0 * q[2] * m + 3.0 * q[3] * m * m,
        c: q[2] - 3.0 * q[3] * m,
        d: q[3],
    };
    if !c.is_finite() {
        eyre::bail!("cubic fit produced non-finite coefficients");
    }
    Ok(c)
}

/// Gaussian elimination with partial pivoting.
fn gauss_solve(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let pivot = (col..4).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..4 {
            let f = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut x = [0.0f64; 4];
    for row in (0..4).rev() {
        let tail: f64 = (row + 1..4).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauss_solves_identity_system() {
        let mut a = [[0.0; 4]; 4];
        for (i, row) in a.iter_mut().enumerate() {
            row[i] = 2.0;
        }
        let x = gauss_solve(a, [2.0, 4.0, 6.0, 8.0]).unwrap();
        assert_eq!(x, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn gauss_rejects_singular_system() {
        assert!(gauss_solve([[1.0; 4]; 4], [1.0; 4]).is_none());
    }

    #[test]
    fn too_few_distinct_points_is_degenerate() {
        let pts = [(10.0, 1.0), (10.0, 2.0), (20.0, 3.0), (20.0, 4.0), (30.0, 5.0)];
        assert!(fit_cubic(&pts).is_err());
    }
}
