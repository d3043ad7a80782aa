use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Running mean and variance (Welford's algorithm).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn mean(&self) -> f64 {
        if self.n_vals > 0 { self.mean } else { f64::NAN }
    }

    pub fn std_dev(&self) -> f64 {
        if self.n_vals > 1 {
            (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
        } else {
            f64::NAN
        }
    }
}

/// Summary of the finite values of a yearly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub mean: f64,
    pub std_dev: f64,
    /// First year holding the largest finite value.
    pub peak_year: Option<i64>,
    pub peak_val: f64,
    /// Number of years holding `NaN` or an infinite value.
    pub n_non_finite: usize,
}

impl SeriesSummary {
    pub fn new(series: &Series) -> Self {
        let mut acc = Accumulator::new();
        let mut peak: Option<(i64, f64)> = None;
        let mut n_non_finite = 0;

        for (year, val) in series.iter() {
            if !val.is_finite() {
                n_non_finite += 1;
                continue;
            }
            acc.add(val);
            if peak.is_none_or(|(_, peak_val)| val > peak_val) {
                peak = Some((year, val));
            }
        }

        Self {
            mean: acc.mean(),
            std_dev: acc.std_dev(),
            peak_year: peak.map(|(year, _)| year),
            peak_val: peak.map_or(f64::NAN, |(_, val)| val),
            n_non_finite,
        }
    }
}
