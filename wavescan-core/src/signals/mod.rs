//! Signal components: zero-cross scanner, bar and wave classifiers, market
//! filter, entry evaluator, multi-timeframe aligner and weekly stage.

pub mod align;
pub mod classifier;
pub mod entry;
pub mod market;
pub mod scanner;
pub mod stage;
pub mod wave;

pub use align::{align, AggregateVerdict, AlignmentPolicy, TimeframeReading};
pub use classifier::{classify_bar, classify_bar_at, TrafficLight};
pub use entry::{
    evaluate_entry, evaluate_entry_at, evaluate_with_oscillators, EntryChecks, EntryCondition,
    Verdict,
};
pub use market::{
    snapshots_from_benchmark, MarketFilter, MarketFilterConfig, MarketGate, MarketSnapshot,
};
pub use scanner::{find_prior_cross, find_prior_cross_in, CrossDirection, PriorCross};
pub use stage::{classify_stage, StageConfig, StageReading, WeinsteinStage};
pub use wave::{
    classify_wave, DivergenceTable, StateTable, Swing, SwingKind, VerdictCell, WaveAssessment,
    WaveConfig, WaveState,
};
