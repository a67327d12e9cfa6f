//! Move review over complete game histories

pub mod classify;
pub mod orchestrator;

pub use classify::{classify, Classification, ForcedWinFacts, Mistake, MistakeKind, Severity};
pub use orchestrator::{
    AnalysisResult, Analyzer, BestMove, MistakeRecord, MoveInput, TimelineEntry,
};
