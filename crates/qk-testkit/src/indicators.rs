use std::collections::VecDeque;

use qk_runtime::{BackendError, Indicator, IndicatorLibrary};

/// Simple moving average over the last `period` prices.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
        }
    }
}

impl Indicator for Sma {
    fn update(&mut self, price: f64) {
        self.window.push_back(price);
        self.sum += price;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
    }

    fn value(&self) -> f64 {
        if self.period == 0 || self.window.len() < self.period {
            return 0.0;
        }
        self.sum / self.period as f64
    }
}

/// Knows `SMA(period)` only; names are case-insensitive.
#[derive(Debug, Default)]
pub struct SmaLibrary;

impl IndicatorLibrary for SmaLibrary {
    fn build(&self, name: &str, params: &[i64]) -> Result<Box<dyn Indicator>, BackendError> {
        if !name.eq_ignore_ascii_case("sma") {
            return Err(BackendError::NotFound(format!("indicator {name}")));
        }
        match params {
            [period] if *period > 0 => Ok(Box::new(Sma::new(*period as usize))),
            _ => Err(BackendError::Rejected(format!(
                "SMA takes one positive period, got {params:?}"
            ))),
        }
    }
}
