use crate::annotations::AnnotationRecord;

/// Gap above which two same-label rows belong to different episodes.
pub const DEFAULT_GAP_THRESHOLD_S: f64 = 1.0;

/// Find the start times of contiguous rhythm episodes.
///
/// Rows whose `rhythm_label` matches are scanned in order; a row opens a new
/// episode when its gap from the previous matching row exceeds
/// `gap_threshold` seconds. The first matching row always counts as a start.
/// No matching rows yields an empty vec, which the caller reports as an empty
/// selection rather than an error. Input must be ascending in `time_second`.
pub fn find_segment_starts(
    annotations: &[AnnotationRecord],
    rhythm_label: &str,
    gap_threshold: f64,
) -> Vec<f64> {
    let mut starts = Vec::new();
    let mut prev_time: Option<f64> = None;
    for row in annotations
        .iter()
        .filter(|row| row.rhythm_label == rhythm_label)
    {
        let gap = match prev_time {
            Some(prev) => row.time_second - prev,
            None => f64::INFINITY,
        };
        if gap > gap_threshold {
            starts.push(row.time_second);
        }
        prev_time = Some(row.time_second);
    }
    starts
}
