use crate::annotations::{AnnotationRecord, BeatType, CaseMetadata};
use crate::error::ViewerError;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Read the case metadata table. Requires `case_id` and `rhythm_classes`
/// columns; the latter is a comma-separated label set.
pub fn read_metadata_csv(path: &Path) -> Result<Vec<CaseMetadata>> {
    if !path.exists() {
        return Err(ViewerError::MissingFile(path.to_path_buf()).into());
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader.headers().context("reading header")?.clone();

    let case_idx = locate_column(&headers, "case_id")?;
    let classes_idx = locate_column(&headers, "rhythm_classes")?;

    let mut cases = Vec::new();
    for result in reader.records() {
        let record = result.context("reading record")?;
        let case_id = record
            .get(case_idx)
            .ok_or_else(|| anyhow::anyhow!("missing case_id"))?
            .trim()
            .parse::<u32>()
            .context("parsing case_id")?;
        let rhythm_classes = record
            .get(classes_idx)
            .map(split_classes)
            .unwrap_or_default();
        cases.push(CaseMetadata {
            case_id,
            rhythm_classes,
        });
    }
    Ok(cases)
}

/// Read one case's beat annotations. Requires `time_second`, `beat_type`
/// and `rhythm_label` columns; `bad_signal_quality` is optional and its
/// absence means no bad-quality information (all false).
pub fn read_annotation_csv(path: &Path) -> Result<Vec<AnnotationRecord>> {
    if !path.exists() {
        return Err(ViewerError::MissingFile(path.to_path_buf()).into());
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader.headers().context("reading header")?.clone();

    let time_idx = locate_column(&headers, "time_second")?;
    let beat_idx = locate_column(&headers, "beat_type")?;
    let rhythm_idx = locate_column(&headers, "rhythm_label")?;
    let bad_idx = locate_column(&headers, "bad_signal_quality").ok();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("reading record")?;
        let time_second = record
            .get(time_idx)
            .ok_or_else(|| anyhow::anyhow!("missing time_second"))?
            .trim()
            .parse::<f64>()
            .context("parsing time_second")?;
        let beat_type = record
            .get(beat_idx)
            .map(BeatType::from_code)
            .unwrap_or(BeatType::Unknown);
        let rhythm_label = record
            .get(rhythm_idx)
            .unwrap_or_default()
            .trim()
            .to_string();
        let bad_signal_quality = bad_idx
            .and_then(|idx| record.get(idx))
            .map(parse_bool)
            .unwrap_or(false);
        rows.push(AnnotationRecord {
            time_second,
            beat_type,
            rhythm_label,
            bad_signal_quality,
        });
    }
    Ok(rows)
}

fn split_classes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

// Pandas exports write True/False, hand-edited files often 1/0.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "1" | "yes"
    )
}

fn locate_column(headers: &csv::StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow::anyhow!("missing column '{}'", requested))
}

#[cfg(feature = "polars")]
pub mod polars_io {
    use anyhow::Result;
    use polars::prelude::*;

    /// Annotation times for one rhythm label, straight from the CSV via a
    /// dataframe filter.
    pub fn load_rhythm_times(path: &str, rhythm_label: &str) -> Result<Vec<f64>> {
        let df = CsvReadOptions::default()
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?;
        let mask = df.column("rhythm_label")?.str()?.equal(rhythm_label);
        let filtered = df.filter(&mask)?;
        let times = filtered.column("time_second")?;
        Ok(times.f64()?.into_no_null_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{cases_with_rhythm, rhythm_classes};
    use std::path::PathBuf;

    fn test_data() -> PathBuf {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        manifest_dir
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join("test_data")
    }

    #[test]
    fn reads_metadata_and_splits_classes() {
        let cases = read_metadata_csv(&test_data().join("metadata.csv")).unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].case_id, 1);
        assert_eq!(cases[0].rhythm_classes, vec!["AFIB", "SR"]);
        assert_eq!(rhythm_classes(&cases), vec!["AFIB", "SR", "VT"]);
        assert_eq!(cases_with_rhythm(&cases, "AFIB"), vec![1, 3]);
    }

    #[test]
    fn reads_annotations_with_quality_column() {
        let rows = read_annotation_csv(&test_data().join("annotations_1.csv")).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].beat_type, BeatType::Normal);
        assert_eq!(rows[1].beat_type, BeatType::Supraventricular);
        assert_eq!(rows[2].rhythm_label, "AFIB");
        assert!(rows[2].bad_signal_quality);
        assert!(!rows[3].bad_signal_quality);
    }

    #[test]
    fn missing_quality_column_means_all_clean() {
        let rows = read_annotation_csv(&test_data().join("annotations_2.csv")).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| !row.bad_signal_quality));
    }

    #[test]
    fn missing_file_maps_to_the_error_taxonomy() {
        let err = read_metadata_csv(Path::new("no/such/metadata.csv")).unwrap_err();
        let viewer = err
            .downcast_ref::<crate::error::ViewerError>()
            .expect("MissingFile variant");
        assert!(matches!(
            viewer,
            crate::error::ViewerError::MissingFile(_)
        ));
    }

    #[test]
    fn bool_parsing_accepts_pandas_and_numeric_forms() {
        for truthy in ["True", "true", "1", "YES", " t "] {
            assert!(parse_bool(truthy), "{truthy} should be true");
        }
        for falsy in ["False", "0", "", "no", "nan"] {
            assert!(!parse_bool(falsy), "{falsy} should be false");
        }
    }
}
