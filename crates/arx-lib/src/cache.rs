use crate::annotations::AnnotationRecord;
use crate::signal::WaveformSeries;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-through cache over per-case resources, keyed by resource kind and
/// case id. Values are immutable once loaded and shared via `Arc`; there is
/// no invalidation because inputs never change for a given case.
#[derive(Default)]
pub struct ResourceCache {
    annotations: HashMap<u32, Arc<Vec<AnnotationRecord>>>,
    waveforms: HashMap<u32, Arc<WaveformSeries>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotation table for a case, loading it on the first request only.
    pub fn annotations<F>(&mut self, case_id: u32, load: F) -> Result<Arc<Vec<AnnotationRecord>>>
    where
        F: FnOnce() -> Result<Vec<AnnotationRecord>>,
    {
        if let Some(hit) = self.annotations.get(&case_id) {
            return Ok(Arc::clone(hit));
        }
        let value = Arc::new(load()?);
        self.annotations.insert(case_id, Arc::clone(&value));
        Ok(value)
    }

    /// Waveform for a case, fetching it on the first request only.
    pub fn waveform<F>(&mut self, case_id: u32, fetch: F) -> Result<Arc<WaveformSeries>>
    where
        F: FnOnce() -> Result<WaveformSeries>,
    {
        if let Some(hit) = self.waveforms.get(&case_id) {
            return Ok(Arc::clone(hit));
        }
        let value = Arc::new(fetch()?);
        self.waveforms.insert(case_id, Arc::clone(&value));
        Ok(value)
    }

    /// Drop everything, e.g. when the data directories change.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.waveforms.clear();
    }
}
