//! Domain types: bars, validated series, timeframes and resampling.

pub mod bar;
pub mod ids;
pub mod resample;
pub mod series;
pub mod timeframe;

pub use bar::Bar;
pub use ids::DatasetHash;
pub use resample::resample;
pub use series::{BarSeries, OscillatorSeries, SignalLineSeries};
pub use timeframe::{Timeframe, TimeframeState};
