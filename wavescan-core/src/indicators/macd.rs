//! MACD: trend-following oscillator with its own signal line.
//!
//! line[t]   = EMA(close, fast)[t] - EMA(close, slow)[t]
//! signal[t] = EMA(line, signal)[t], seeded at the first `signal` valid line values
//! hist[t]   = line[t] - signal[t]
//!
//! Lookbacks: line = slow - 1, signal/histogram = slow + signal - 2.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

/// The three MACD outputs for a whole series.
#[derive(Debug, Clone)]
pub struct MacdOutput {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute line, signal and histogram together.
pub fn macd_of_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let fast_ema = ema_of_series(closes, fast);
    let slow_ema = ema_of_series(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema_of_series(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();
    MacdOutput {
        line,
        signal: signal_line,
        histogram,
    }
}

fn check_periods(fast: usize, slow: usize, signal: usize) {
    assert!(fast >= 1, "MACD fast period must be >= 1");
    assert!(slow > fast, "MACD slow period must be > fast period");
    assert!(signal >= 1, "MACD signal period must be >= 1");
}

fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// MACD line.
#[derive(Debug, Clone)]
pub struct MacdLine {
    fast: usize,
    slow: usize,
    name: String,
}

impl MacdLine {
    pub fn new(fast: usize, slow: usize) -> Self {
        check_periods(fast, slow, 1);
        Self {
            fast,
            slow,
            name: format!("macd_{fast}_{slow}"),
        }
    }
}

impl Indicator for MacdLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        macd_of_series(&closes(bars), self.fast, self.slow, 1).line
    }
}

/// MACD signal line.
#[derive(Debug, Clone)]
pub struct MacdSignal {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl MacdSignal {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        check_periods(fast, slow, signal);
        Self {
            fast,
            slow,
            signal,
            name: format!("macd_signal_{fast}_{slow}_{signal}"),
        }
    }
}

impl Indicator for MacdSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow + self.signal - 2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        macd_of_series(&closes(bars), self.fast, self.slow, self.signal).signal
    }
}

/// MACD histogram (line minus signal).
#[derive(Debug, Clone)]
pub struct MacdHistogram {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl MacdHistogram {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        check_periods(fast, slow, signal);
        Self {
            fast,
            slow,
            signal,
            name: format!("macd_hist_{fast}_{slow}_{signal}"),
        }
    }
}

impl Indicator for MacdHistogram {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow + self.signal - 2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        macd_of_series(&closes(bars), self.fast, self.slow, self.signal).histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_close, bars_from_closes, EPS};

    fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.2).collect()
    }

    #[test]
    fn default_warmups() {
        let bars = bars_from_closes(&trending(60));
        let line = MacdLine::new(12, 26).compute(&bars);
        let signal = MacdSignal::new(12, 26, 9).compute(&bars);

        assert!(line[..25].iter().all(|v| v.is_nan()));
        assert!(!line[25].is_nan());
        assert!(signal[..33].iter().all(|v| v.is_nan()));
        assert!(!signal[33].is_nan());
        assert_eq!(MacdSignal::new(12, 26, 9).lookback(), 33);
    }

    #[test]
    fn small_periods_known_values() {
        // fast=1 → EMA = close; slow=2 → alpha 2/3, seed SMA(c0,c1)
        // closes 10, 12, 15, 13
        // slow: [NaN, 11, 13.6667, 13.2222]
        // line: [NaN, 1, 1.3333, -0.2222]
        // signal(2): seed at 2 = (1 + 1.3333)/2 = 1.16667; [3] = 2/3*-0.2222 + 1/3*1.16667
        let out = macd_of_series(&[10.0, 12.0, 15.0, 13.0], 1, 2, 2);
        assert!(out.line[0].is_nan());
        assert_close(out.line[1], 1.0, EPS);
        assert_close(out.line[2], 15.0 - 41.0 / 3.0, EPS);
        assert!(out.signal[1].is_nan());
        let seed = (1.0 + (15.0 - 41.0 / 3.0)) / 2.0;
        assert_close(out.signal[2], seed, EPS);
        assert_close(out.histogram[2], out.line[2] - seed, EPS);
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let bars = bars_from_closes(&trending(80));
        let out = macd_of_series(&closes(&bars), 12, 26, 9);
        let hist = MacdHistogram::new(12, 26, 9).compute(&bars);
        for i in 33..80 {
            assert_close(hist[i], out.line[i] - out.signal[i], EPS);
        }
    }
}
