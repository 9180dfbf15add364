use crate::plot::MarkerSymbol;
use serde::{Deserialize, Serialize};

/// Per-beat classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeatType {
    Normal,
    Supraventricular,
    Ventricular,
    Unknown,
}

impl BeatType {
    pub fn all() -> [BeatType; 4] {
        [
            BeatType::Normal,
            BeatType::Supraventricular,
            BeatType::Ventricular,
            BeatType::Unknown,
        ]
    }

    /// Single-letter code used by the annotation CSVs. Unrecognized codes
    /// fold into `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "N" | "n" => BeatType::Normal,
            "S" | "s" => BeatType::Supraventricular,
            "V" | "v" => BeatType::Ventricular,
            _ => BeatType::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            BeatType::Normal => "N",
            BeatType::Supraventricular => "S",
            BeatType::Ventricular => "V",
            BeatType::Unknown => "U",
        }
    }

    /// Total mapping onto a display symbol; a new variant without a symbol
    /// will not compile.
    pub fn marker(&self) -> MarkerSymbol {
        match self {
            BeatType::Normal => MarkerSymbol::Circle,
            BeatType::Supraventricular => MarkerSymbol::TriangleUp,
            BeatType::Ventricular => MarkerSymbol::Square,
            BeatType::Unknown => MarkerSymbol::Star,
        }
    }
}

/// One row per detected heartbeat. Rows are assumed ascending in
/// `time_second` within a case; the loaders do not enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub time_second: f64,
    pub beat_type: BeatType,
    pub rhythm_label: String,
    pub bad_signal_quality: bool,
}

/// One row per case in the metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMetadata {
    pub case_id: u32,
    pub rhythm_classes: Vec<String>,
}

impl CaseMetadata {
    pub fn has_rhythm(&self, label: &str) -> bool {
        self.rhythm_classes.iter().any(|class| class == label)
    }
}

/// Sorted unique rhythm labels across the whole metadata table.
pub fn rhythm_classes(metadata: &[CaseMetadata]) -> Vec<String> {
    let mut labels: Vec<String> = metadata
        .iter()
        .flat_map(|case| case.rhythm_classes.iter().cloned())
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Sorted case ids whose metadata lists the given rhythm label.
pub fn cases_with_rhythm(metadata: &[CaseMetadata], label: &str) -> Vec<u32> {
    let mut ids: Vec<u32> = metadata
        .iter()
        .filter(|case| case.has_rhythm(label))
        .map(|case| case.case_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
