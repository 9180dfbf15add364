use anyhow::Result;
use arx_lib::{
    annotations::AnnotationRecord,
    cache::ResourceCache,
    config::ViewerConfig,
    error::ViewerError,
    io::tables,
    nav::SegmentCursor,
    plot::{figure_from_waveform, Figure},
    render::{render_window, segment_figure},
    segments::find_segment_starts,
    signal::{Segment, WaveformSeries},
};
use std::sync::Arc;

const MAX_OVERVIEW_POINTS: usize = 2048;
const OVERVIEW_COLOR: u32 = 0x00AA44;

#[derive(Clone, PartialEq)]
pub struct Selection {
    pub rhythm: String,
    pub case_id: u32,
}

#[derive(Default)]
struct DirtyFlags {
    segment: bool,
    overview: bool,
}

/// Holds everything the viewer shows for the current rhythm/case pair and
/// recomputes figures lazily when the selection or cursor moves.
pub struct Store {
    cache: ResourceCache,
    selection: Option<Selection>,
    annotations: Option<Arc<Vec<AnnotationRecord>>>,
    waveform: Option<Arc<WaveformSeries>>,
    starts: Vec<f64>,
    cursor: SegmentCursor,
    window_s: f64,
    segment_figure: Option<Figure>,
    overview_figure: Option<Figure>,
    out_of_range: bool,
    dirty: DirtyFlags,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            cache: ResourceCache::new(),
            selection: None,
            annotations: None,
            waveform: None,
            starts: Vec::new(),
            cursor: SegmentCursor::new(0),
            window_s: arx_lib::config::DEFAULT_WINDOW_S,
            segment_figure: None,
            overview_figure: None,
            out_of_range: false,
            dirty: DirtyFlags::default(),
        }
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or re-use from cache) the tables and waveform for a selection
    /// and recompute the segment starts. A selection with zero starts loads
    /// fine but comes back as `EmptySelection` so the caller can warn.
    pub fn select(&mut self, cfg: &ViewerConfig, rhythm: &str, case_id: u32) -> Result<()> {
        let selection = Selection {
            rhythm: rhythm.to_string(),
            case_id,
        };
        if self.selection.as_ref() == Some(&selection) {
            return Ok(());
        }

        let annotation_path = cfg.annotation_path(case_id);
        let annotations = self
            .cache
            .annotations(case_id, || tables::read_annotation_csv(&annotation_path))?;
        let waveform = self
            .cache
            .waveform(case_id, || cfg.waveform_source().fetch(case_id))?;

        self.starts = find_segment_starts(&annotations, rhythm, cfg.gap_threshold_s);
        self.cursor = SegmentCursor::new(self.starts.len());
        self.window_s = cfg.window_s;
        self.annotations = Some(annotations);
        self.waveform = Some(waveform);
        self.selection = Some(selection);
        self.dirty.segment = true;
        self.dirty.overview = true;

        if self.starts.is_empty() {
            return Err(ViewerError::EmptySelection {
                rhythm: rhythm.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Drop cached tables/waveforms, e.g. after a data directory change.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.selection = None;
        self.annotations = None;
        self.waveform = None;
        self.starts.clear();
        self.cursor = SegmentCursor::new(0);
        self.segment_figure = None;
        self.overview_figure = None;
        self.out_of_range = false;
    }

    pub fn next(&mut self) {
        let moved = self.cursor.next();
        if moved != self.cursor {
            self.cursor = moved;
            self.dirty.segment = true;
        }
    }

    pub fn previous(&mut self) {
        let moved = self.cursor.previous();
        if moved != self.cursor {
            self.cursor = moved;
            self.dirty.segment = true;
        }
    }

    /// Recompute whatever the last interaction invalidated.
    pub fn prepare(&mut self) {
        self.ensure_segment_figure();
        self.ensure_overview_figure();
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn cursor(&self) -> SegmentCursor {
        self.cursor
    }

    pub fn segment_starts(&self) -> &[f64] {
        &self.starts
    }

    /// Window derived from the cursor position; recomputed, never stored.
    pub fn current_segment(&self) -> Option<Segment> {
        self.starts
            .get(self.cursor.index())
            .map(|&start| Segment::with_window(start, self.window_s))
    }

    pub fn segment_figure(&self) -> Option<&Figure> {
        self.segment_figure.as_ref()
    }

    pub fn overview_figure(&self) -> Option<&Figure> {
        self.overview_figure.as_ref()
    }

    /// True when the current window ran past the end of the recording.
    pub fn out_of_range(&self) -> bool {
        self.out_of_range
    }

    pub fn sample_count(&self) -> usize {
        self.waveform.as_ref().map(|w| w.len()).unwrap_or(0)
    }

    pub fn beat_count(&self) -> usize {
        self.annotations.as_ref().map(|a| a.len()).unwrap_or(0)
    }

    fn ensure_segment_figure(&mut self) {
        if !self.dirty.segment {
            return;
        }
        self.segment_figure = None;
        self.out_of_range = false;
        if let (Some(waveform), Some(annotations), Some(selection), Some(segment)) = (
            self.waveform.as_ref(),
            self.annotations.as_ref(),
            self.selection.as_ref(),
            self.current_segment(),
        ) {
            match render_window(
                waveform,
                Some(annotations),
                segment.start_time,
                segment.end_time,
            ) {
                Some(rendered) => {
                    self.segment_figure = Some(segment_figure(selection.case_id, &rendered));
                }
                None => self.out_of_range = true,
            }
        }
        self.dirty.segment = false;
    }

    fn ensure_overview_figure(&mut self) {
        if !self.dirty.overview {
            return;
        }
        self.overview_figure = self.waveform.as_ref().map(|waveform| {
            figure_from_waveform("Full recording", waveform, MAX_OVERVIEW_POINTS, OVERVIEW_COLOR)
        });
        self.dirty.overview = false;
    }
}
