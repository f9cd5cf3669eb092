//! WaveScan Core: momentum oscillators, event scanning and entry verdicts.
//!
//! This crate holds the pure computation of the engine:
//! - Domain types (bars, validated series, timeframes) and resampling
//! - AO / MACD kernels behind the `Indicator` trait
//! - Prior-window zero-cross scanner and per-bar traffic light
//! - Wave state classification and the verdict table
//! - Entry evaluation with a closed audit trail
//! - Multi-timeframe alignment
//!
//! Nothing here performs I/O. The same functions serve backtest replay and
//! live scans; the runner crate only decides which bars to feed them.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod oscillators;
pub mod signals;

pub use cache::OscillatorCache;
pub use config::EngineConfig;
pub use error::EngineError;
pub use oscillators::{compute_oscillators, OscillatorConfig, Oscillators};
