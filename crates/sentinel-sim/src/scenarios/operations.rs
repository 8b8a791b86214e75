use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index;
use rand_distr::StandardNormal;
use sentinel_core::{Column, Table};
use std::f64::consts::PI;

use super::Scenario;

pub const TRANSACTION_AMOUNT: &str = "transaction_amount";
pub const TRANSACTION_FREQUENCY: &str = "transaction_frequency";
pub const ERROR_RATE: &str = "error_rate";
pub const LATENCY_MS: &str = "latency_ms";

/// The four operations metrics, one value per row
#[derive(Debug, Clone)]
struct Operations {
    transaction_amount: Vec<f64>,
    transaction_frequency: Vec<f64>,
    error_rate: Vec<f64>,
    latency_ms: Vec<f64>,
}

impl Operations {
    fn baseline(rows: usize, rng: &mut StdRng) -> Self {
        Self {
            transaction_amount: bounded_normal(rng, 500.0, 20.0, rows, 400.0, 600.0),
            transaction_frequency: bounded_normal(rng, 50.0, 5.0, rows, 35.0, 65.0),
            error_rate: bounded_normal(rng, 0.5, 0.1, rows, 0.1, 1.5),
            latency_ms: bounded_normal(rng, 120.0, 10.0, rows, 90.0, 150.0),
        }
    }

    fn into_table(self) -> Table {
        Table::new()
            .with_column(Column::numeric(TRANSACTION_AMOUNT, self.transaction_amount))
            .with_column(Column::numeric(TRANSACTION_FREQUENCY, self.transaction_frequency))
            .with_column(Column::numeric(ERROR_RATE, self.error_rate))
            .with_column(Column::numeric(LATENCY_MS, self.latency_ms))
    }
}

fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + std * z
}

fn bounded_normal(
    rng: &mut StdRng,
    mean: f64,
    std: f64,
    rows: usize,
    low: f64,
    high: f64,
) -> Vec<f64> {
    (0..rows)
        .map(|_| normal(rng, mean, std).clamp(low, high))
        .collect()
}

/// `n` evenly spaced points from `start` to `end` inclusive
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Distinct row indices, at least `min_count` and at most `rows`
fn pick_rows(rng: &mut StdRng, rows: usize, min_count: usize, divisor: usize) -> Vec<usize> {
    let count = (rows / divisor).max(min_count).min(rows);
    index::sample(rng, rows, count).into_vec()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalOps;

impl Scenario for NormalOps {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn description(&self) -> &'static str {
        "Steady operations inside normal bounds"
    }

    fn generate(&self, rows: usize, rng: &mut StdRng) -> Table {
        Operations::baseline(rows, rng).into_table()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MediumRiskOps;

impl Scenario for MediumRiskOps {
    fn name(&self) -> &'static str {
        "medium"
    }

    fn description(&self) -> &'static str {
        "Mild drift with occasional error and latency spikes"
    }

    fn generate(&self, rows: usize, rng: &mut StdRng) -> Table {
        let mut ops = Operations::baseline(rows, rng);

        for (amount, drift) in ops.transaction_amount.iter_mut().zip(linspace(0.0, 40.0, rows)) {
            *amount += drift * 0.5;
        }
        for (freq, phase) in ops
            .transaction_frequency
            .iter_mut()
            .zip(linspace(0.0, 3.0 * PI, rows))
        {
            *freq += phase.sin() * 5.0;
        }

        for i in pick_rows(rng, rows, 3, 20) {
            ops.error_rate[i] += rng.random_range(1.0..2.0);
            ops.latency_ms[i] += rng.random_range(30.0..60.0);
        }

        ops.into_table()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HighRiskOps;

impl Scenario for HighRiskOps {
    fn name(&self) -> &'static str {
        "high"
    }

    fn description(&self) -> &'static str {
        "Heavy upward pressure, volatility and extreme outliers"
    }

    fn generate(&self, rows: usize, rng: &mut StdRng) -> Table {
        let mut ops = Operations::baseline(rows, rng);

        for (amount, drift) in ops.transaction_amount.iter_mut().zip(linspace(0.0, 200.0, rows)) {
            *amount += drift + normal(rng, 0.0, 50.0);
        }
        for freq in &mut ops.transaction_frequency {
            *freq += normal(rng, 0.0, 15.0);
        }
        for rate in &mut ops.error_rate {
            *rate += rng.random_range(2.0..4.0);
        }
        for latency in &mut ops.latency_ms {
            *latency += rng.random_range(60.0..140.0);
        }

        for i in pick_rows(rng, rows, 5, 15) {
            ops.transaction_amount[i] += rng.random_range(400.0..800.0);
            ops.error_rate[i] += rng.random_range(3.0..6.0);
            ops.latency_ms[i] += rng.random_range(120.0..200.0);
        }

        ops.into_table()
    }
}
