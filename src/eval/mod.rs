//! Threat detection and position evaluation

pub mod heuristic;
pub mod patterns;
pub mod threats;

pub use heuristic::{win_probability, Evaluation, Evaluator, MoveQuality, WIN_SCORE};
pub use patterns::WeightTable;
pub use threats::{Threat, ThreatCounts, ThreatDetector, ThreatKind, ThreatReport, ThreatTracker};
