use crate::error::ViewerError;
use crate::signal::WaveformSeries;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Seam for the per-case waveform collaborator. A fetch is blocking and is
/// never retried; a failure is terminal for the current request only.
pub trait WaveformSource {
    fn fetch(&self, case_id: u32) -> Result<WaveformSeries>;
}

/// Newline-delimited sample files, one `{case_id}.txt` per case, at a fixed
/// configured rate.
pub struct SampleDirSource {
    dir: PathBuf,
    fs: f64,
}

impl SampleDirSource {
    pub fn new(dir: impl Into<PathBuf>, fs: f64) -> Self {
        Self { dir: dir.into(), fs }
    }

    fn path_for(&self, case_id: u32) -> PathBuf {
        self.dir.join(format!("{case_id}.txt"))
    }
}

impl WaveformSource for SampleDirSource {
    fn fetch(&self, case_id: u32) -> Result<WaveformSeries> {
        let path = self.path_for(case_id);
        if !path.exists() {
            return Err(ViewerError::MissingFile(path).into());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let data = parse_samples(&text).map_err(|err| ViewerError::FetchFailure {
            case_id,
            reason: err.to_string(),
        })?;
        Ok(WaveformSeries { fs: self.fs, data })
    }
}

/// Parse newline-delimited floating point samples, ignoring blank and
/// `#`-comment lines.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(value);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Local WFDB records, one `{case_id}.hea` header (plus data file) per case.
pub struct WfdbSource {
    dir: PathBuf,
    lead: usize,
}

impl WfdbSource {
    pub fn new(dir: impl Into<PathBuf>, lead: usize) -> Self {
        Self {
            dir: dir.into(),
            lead,
        }
    }
}

impl WaveformSource for WfdbSource {
    fn fetch(&self, case_id: u32) -> Result<WaveformSeries> {
        let header = self.dir.join(format!("{case_id}.hea"));
        if !header.exists() {
            return Err(ViewerError::MissingFile(header).into());
        }
        load_wfdb_lead(&header, self.lead).map_err(|err| {
            ViewerError::FetchFailure {
                case_id,
                reason: err.to_string(),
            }
            .into()
        })
    }
}

/// Load the specified signal (lead) from a WFDB header/data pair, scaled to
/// physical units via the header's gain and baseline.
pub fn load_wfdb_lead(header_path: &Path, lead: usize) -> Result<WaveformSeries> {
    let (header, signals) = wfdb_rust::parse_wfdb(header_path);
    let raw = signals.get(lead).ok_or_else(|| {
        anyhow::anyhow!(
            "{} has {} signal(s), but lead {} was requested",
            header_path.display(),
            signals.len(),
            lead
        )
    })?;
    let spec = &header.signal_specs[lead];
    let gain = spec.adc_gain.unwrap_or(1.0) as f64;
    let baseline = spec.baseline.or(spec.adc_zero).unwrap_or(0) as f64;
    let data = raw
        .iter()
        .map(|&sample| (sample as f64 - baseline) / gain)
        .collect();
    Ok(WaveformSeries {
        fs: header
            .record
            .sampling_frequency
            .map(|f| f as f64)
            .unwrap_or(crate::config::DEFAULT_SAMPLE_RATE_HZ),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_samples_skipping_comments() {
        let text = "# lead II\n0.1\n\n-0.25\n0.0\n";
        assert_eq!(parse_samples(text).unwrap(), vec![0.1, -0.25, 0.0]);
    }

    #[test]
    fn rejects_non_numeric_lines() {
        assert!(parse_samples("0.1\nabc\n").is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_samples("# only a comment\n").is_err());
    }

    #[test]
    fn sample_dir_source_reads_by_case_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("7.txt")).unwrap();
        writeln!(file, "0.0\n0.5\n1.0").unwrap();
        let source = SampleDirSource::new(dir.path(), 100.0);
        let waveform = source.fetch(7).unwrap();
        assert_eq!(waveform.fs, 100.0);
        assert_eq!(waveform.data, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn missing_case_file_is_a_missing_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SampleDirSource::new(dir.path(), 100.0);
        let err = source.fetch(99).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::MissingFile(_))
        ));
    }

    #[test]
    fn corrupt_case_file_is_a_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("3.txt"), "not a number\n").unwrap();
        let source = SampleDirSource::new(dir.path(), 100.0);
        let err = source.fetch(3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::FetchFailure { case_id: 3, .. })
        ));
    }

    // Two 12-bit two's complement samples packed into three bytes (212).
    fn pack_212(samples: &[i16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for pair in samples.chunks(2) {
            let s1 = pair[0] as u16;
            let s2 = *pair.get(1).unwrap_or(&0) as u16;
            bytes.push((s1 & 0xFF) as u8);
            bytes.push((((s1 >> 8) & 0x0F) | (((s2 >> 8) & 0x0F) << 4)) as u8);
            bytes.push((s2 & 0xFF) as u8);
        }
        bytes
    }

    fn write_wfdb_record(dir: &Path, case_id: u32, samples: &[i16]) {
        let header = format!(
            "{case_id} 1 100 {len}\n{case_id}.dat 212 200(1024)/mV\n",
            len = samples.len()
        );
        std::fs::write(dir.join(format!("{case_id}.hea")), header).unwrap();
        std::fs::write(dir.join(format!("{case_id}.dat")), pack_212(samples)).unwrap();
    }

    #[test]
    fn wfdb_source_scales_by_gain_and_baseline() {
        let dir = tempfile::tempdir().unwrap();
        // Gain 200 ADU/mV, baseline 1024: raw 1224 is +1 mV, 824 is -1 mV.
        write_wfdb_record(dir.path(), 7, &[1024, 1224, 824, 1124]);
        let source = WfdbSource::new(dir.path(), 0);
        let waveform = source.fetch(7).unwrap();
        assert_eq!(waveform.fs, 100.0);
        assert_eq!(waveform.data, vec![0.0, 1.0, -1.0, 0.5]);
    }

    #[test]
    fn wfdb_lead_out_of_range_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_wfdb_record(dir.path(), 7, &[1024, 1224]);
        let err = load_wfdb_lead(&dir.path().join("7.hea"), 3).unwrap_err();
        assert!(err.to_string().contains("lead 3"));
    }

    #[test]
    fn missing_wfdb_header_is_a_missing_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = WfdbSource::new(dir.path(), 0);
        let err = source.fetch(42).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::MissingFile(_))
        ));
    }
}
