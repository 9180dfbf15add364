use std::path::PathBuf;
use thiserror::Error;

/// User-visible failure taxonomy. Every variant is local to one view: the
/// caller reports it and stays interactive, with no retry and no crash.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Metadata or annotation CSV is absent; halts processing for the view.
    #[error("could not find '{}'", .0.display())]
    MissingFile(PathBuf),

    /// Waveform retrieval failed; halts processing for the view.
    #[error("failed to load waveform data for case {case_id}: {reason}")]
    FetchFailure { case_id: u32, reason: String },

    /// No segment starts for the rhythm/case combination; navigation is
    /// disabled for that selection only.
    #[error("could not find a clear starting segment for the label '{rhythm}'")]
    EmptySelection { rhythm: String },

    /// Requested window exceeds the available samples; recoverable by
    /// choosing a different segment.
    #[error("could not generate the plot for {start:.1}s-{end:.1}s; check the data range")]
    OutOfRangeWindow { start: f64, end: f64 },
}
