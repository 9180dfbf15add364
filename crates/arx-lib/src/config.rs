use crate::io::waveform::{SampleDirSource, WaveformSource, WfdbSource};
use crate::segments::DEFAULT_GAP_THRESHOLD_S;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 100.0;
pub const DEFAULT_WINDOW_S: f64 = 12.0;

/// On-disk layout of the per-case waveform files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformFormat {
    /// `{waveform_dir}/{case_id}.txt`, newline-delimited samples.
    Samples,
    /// `{waveform_dir}/{case_id}.hea` WFDB records.
    Wfdb,
}

/// Viewer settings, loadable from a TOML file. Every field has a default so
/// a partial document works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub metadata_path: PathBuf,
    pub annotation_dir: PathBuf,
    pub waveform_dir: PathBuf,
    pub sample_rate_hz: f64,
    pub window_s: f64,
    pub gap_threshold_s: f64,
    pub waveform_format: WaveformFormat,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            metadata_path: PathBuf::from("metadata.csv"),
            annotation_dir: PathBuf::from("annotations"),
            waveform_dir: PathBuf::from("waveforms"),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            window_s: DEFAULT_WINDOW_S,
            gap_threshold_s: DEFAULT_GAP_THRESHOLD_S,
            waveform_format: WaveformFormat::Samples,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid viewer config {}", path.display()))
    }

    /// Annotation CSV for one case.
    pub fn annotation_path(&self, case_id: u32) -> PathBuf {
        self.annotation_dir
            .join(format!("annotations_{case_id}.csv"))
    }

    /// Waveform collaborator matching the configured layout.
    pub fn waveform_source(&self) -> Box<dyn WaveformSource> {
        match self.waveform_format {
            WaveformFormat::Samples => Box::new(SampleDirSource::new(
                self.waveform_dir.clone(),
                self.sample_rate_hz,
            )),
            WaveformFormat::Wfdb => Box::new(WfdbSource::new(self.waveform_dir.clone(), 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_design_constants() {
        let cfg = ViewerConfig::default();
        assert_eq!(cfg.sample_rate_hz, 100.0);
        assert_eq!(cfg.window_s, 12.0);
        assert_eq!(cfg.gap_threshold_s, 1.0);
        assert_eq!(cfg.waveform_format, WaveformFormat::Samples);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "metadata_path = \"data/metadata.csv\"\nwaveform_format = \"wfdb\""
        )
        .unwrap();
        let cfg = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(cfg.metadata_path, PathBuf::from("data/metadata.csv"));
        assert_eq!(cfg.waveform_format, WaveformFormat::Wfdb);
        assert_eq!(cfg.window_s, 12.0);
    }

    #[test]
    fn annotation_paths_embed_the_case_id() {
        let cfg = ViewerConfig::default();
        assert_eq!(
            cfg.annotation_path(42),
            PathBuf::from("annotations/annotations_42.csv")
        );
    }

    #[test]
    fn missing_config_reports_the_path() {
        let err = ViewerConfig::load(Path::new("no/such/arx.toml")).unwrap_err();
        assert!(err.to_string().contains("no/such/arx.toml"));
    }
}
