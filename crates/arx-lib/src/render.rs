use crate::annotations::{AnnotationRecord, BeatType};
use crate::plot::{Band, Color, Figure, LineSeries, MarkerSeries, Series, Style};
use crate::signal::WaveformSeries;
use serde::{Deserialize, Serialize};

const TRACE_COLOR: Color = Color(0x00AA44);
const MARKER_COLOR: Color = Color(0x000000);
const BAD_SIGNAL_COLOR: Color = Color(0xD3D3D3);

/// Markers for one beat-type category inside a window. Each point is
/// (annotation time, trace amplitude at the mapped sample).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatMarkers {
    pub beat_type: BeatType,
    pub points: Vec<[f64; 2]>,
}

/// Windowed slice of a waveform plus its overlays, ready to be turned into
/// a chart description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSegment {
    pub start_time: f64,
    pub end_time: f64,
    /// One entry per sample, `index / fs`.
    pub time: Vec<f64>,
    pub amplitude: Vec<f64>,
    /// Only categories with at least one marker appear here.
    pub markers: Vec<BeatMarkers>,
    /// Single `[min, max]` interval over all bad-quality rows in the window.
    pub bad_signal: Option<[f64; 2]>,
}

/// Extract the `[start_time, end_time]` slice of `waveform` and overlay
/// beat markers and bad-signal shading from `annotations`.
///
/// Returns `None` when the window falls outside the recording or the slice
/// is empty; the caller distinguishes that from a hard failure. Window
/// bounds and marker positions truncate toward zero with the same
/// conversion, so markers stay aligned with the trace.
pub fn render_window(
    waveform: &WaveformSeries,
    annotations: Option<&[AnnotationRecord]>,
    start_time: f64,
    end_time: f64,
) -> Option<RenderedSegment> {
    let fs = waveform.fs;
    let start_idx = (start_time * fs) as i64;
    let end_idx = (end_time * fs) as i64;
    if start_idx < 0 || end_idx > waveform.len() as i64 || start_idx >= end_idx {
        return None;
    }
    let (start_idx, end_idx) = (start_idx as usize, end_idx as usize);
    let slice = &waveform.data[start_idx..end_idx];

    let time: Vec<f64> = (start_idx..end_idx).map(|i| i as f64 / fs).collect();
    let mut markers = Vec::new();
    let mut bad_signal = None;

    if let Some(rows) = annotations {
        let in_window: Vec<&AnnotationRecord> = rows
            .iter()
            .filter(|row| row.time_second >= start_time && row.time_second <= end_time)
            .collect();
        for beat_type in BeatType::all() {
            let mut points = Vec::new();
            for row in in_window.iter().filter(|row| row.beat_type == beat_type) {
                let offset = (row.time_second * fs) as i64 - start_idx as i64;
                if offset >= 0 && (offset as usize) < slice.len() {
                    points.push([row.time_second, slice[offset as usize]]);
                }
            }
            if !points.is_empty() {
                markers.push(BeatMarkers { beat_type, points });
            }
        }

        let mut bad_times = in_window
            .iter()
            .filter(|row| row.bad_signal_quality)
            .map(|row| row.time_second);
        if let Some(first) = bad_times.next() {
            let (mut lo, mut hi) = (first, first);
            for t in bad_times {
                lo = lo.min(t);
                hi = hi.max(t);
            }
            bad_signal = Some([lo, hi]);
        }
    }

    Some(RenderedSegment {
        start_time,
        end_time,
        time,
        amplitude: slice.to_vec(),
        markers,
        bad_signal,
    })
}

/// Chart description for a rendered window: the trace, one marker series
/// per populated beat type with its fixed symbol, and the bad-signal band
/// if present.
pub fn segment_figure(case_id: u32, segment: &RenderedSegment) -> Figure {
    let mut fig = Figure::new(Some(format!(
        "Case {} | {:.1}s - {:.1}s",
        case_id, segment.start_time, segment.end_time
    )));
    fig.x.label = Some("Time (seconds)".into());
    fig.y.label = Some("Amplitude (mV)".into());

    if let Some([x0, x1]) = segment.bad_signal {
        fig.add_band(Band {
            name: "Bad signal".into(),
            x0,
            x1,
            color: BAD_SIGNAL_COLOR,
            opacity: 0.5,
        });
    }

    let points: Vec<[f64; 2]> = segment
        .time
        .iter()
        .zip(&segment.amplitude)
        .map(|(&t, &a)| [t, a])
        .collect();
    fig.add_series(Series::Line(LineSeries {
        name: "ECG".into(),
        points,
        style: Style {
            width: 1.4,
            dash: None,
            color: TRACE_COLOR,
        },
    }));

    for group in &segment.markers {
        fig.add_series(Series::Marker(MarkerSeries {
            name: format!("Beat: {}", group.beat_type.code()),
            points: group.points.clone(),
            symbol: group.beat_type.marker(),
            size: 8.0,
            color: MARKER_COLOR,
        }));
    }
    fig
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_waveform(len: usize, fs: f64) -> WaveformSeries {
        WaveformSeries {
            fs,
            data: (0..len).map(|i| i as f64 * 0.001).collect(),
        }
    }

    fn beat(time_second: f64, beat_type: BeatType, bad: bool) -> AnnotationRecord {
        AnnotationRecord {
            time_second,
            beat_type,
            rhythm_label: "AFIB".into(),
            bad_signal_quality: bad,
        }
    }

    #[test]
    fn full_window_returns_every_sample() {
        let waveform = ramp_waveform(1200, 100.0);
        let segment = render_window(&waveform, None, 0.0, 12.0).expect("in range");
        assert_eq!(segment.time.len(), 1200);
        assert_eq!(segment.amplitude.len(), 1200);
        assert_eq!(segment.time[0], 0.0);
        assert!((segment.time[1] - 0.01).abs() < 1e-12);
        assert!((segment.time[1199] - 11.99).abs() < 1e-12);
    }

    #[test]
    fn window_outside_recording_is_absent() {
        let waveform = ramp_waveform(1200, 100.0);
        assert!(render_window(&waveform, None, 20.0, 32.0).is_none());
        assert!(render_window(&waveform, None, -1.0, 11.0).is_none());
        assert!(render_window(&waveform, None, 6.0, 18.0).is_none());
    }

    #[test]
    fn empty_slice_is_absent() {
        let waveform = ramp_waveform(1200, 100.0);
        assert!(render_window(&waveform, None, 3.0, 3.0).is_none());
    }

    #[test]
    fn inverted_window_is_absent() {
        let waveform = ramp_waveform(1200, 100.0);
        // Start beyond the recording with the end inside it.
        assert!(render_window(&waveform, None, 15.0, 10.0).is_none());
        assert!(render_window(&waveform, None, 8.0, 4.0).is_none());
    }

    #[test]
    fn markers_group_by_beat_type_inside_the_slice() {
        let waveform = ramp_waveform(1200, 100.0);
        let annotations = vec![
            beat(1.0, BeatType::Normal, false),
            beat(2.5, BeatType::Normal, false),
            beat(4.0, BeatType::Ventricular, false),
            beat(20.0, BeatType::Normal, false),
        ];
        let segment = render_window(&waveform, Some(&annotations), 0.0, 12.0).expect("in range");
        assert_eq!(segment.markers.len(), 2);
        let normal = &segment.markers[0];
        assert_eq!(normal.beat_type, BeatType::Normal);
        assert_eq!(normal.points.len(), 2);
        // Marker amplitude comes from the mapped sample of the slice.
        assert!((normal.points[0][1] - waveform.data[100]).abs() < 1e-12);
        let ventricular = &segment.markers[1];
        assert_eq!(ventricular.beat_type, BeatType::Ventricular);
        assert_eq!(ventricular.points.len(), 1);
    }

    #[test]
    fn marker_indices_stay_inside_the_slice() {
        let waveform = ramp_waveform(1200, 100.0);
        let annotations: Vec<AnnotationRecord> = (0..40)
            .map(|i| beat(i as f64 * 0.31, BeatType::Normal, false))
            .collect();
        let segment = render_window(&waveform, Some(&annotations), 2.0, 10.0).expect("in range");
        let slice_len = segment.amplitude.len();
        for group in &segment.markers {
            for point in &group.points {
                let offset = (point[0] * waveform.fs) as i64 - (2.0 * waveform.fs) as i64;
                assert!(offset >= 0 && (offset as usize) < slice_len);
                assert!(point[0] >= 2.0 && point[0] <= 10.0);
            }
        }
    }

    #[test]
    fn single_bad_row_shades_a_point_interval() {
        let waveform = ramp_waveform(1200, 100.0);
        let annotations = vec![beat(5.0, BeatType::Normal, true)];
        let segment = render_window(&waveform, Some(&annotations), 0.0, 12.0).expect("in range");
        assert_eq!(segment.bad_signal, Some([5.0, 5.0]));
    }

    #[test]
    fn bad_rows_collapse_to_one_interval() {
        let waveform = ramp_waveform(1200, 100.0);
        let annotations = vec![
            beat(1.0, BeatType::Normal, true),
            beat(3.0, BeatType::Normal, false),
            beat(9.5, BeatType::Unknown, true),
        ];
        let segment = render_window(&waveform, Some(&annotations), 0.0, 12.0).expect("in range");
        assert_eq!(segment.bad_signal, Some([1.0, 9.5]));
    }

    #[test]
    fn rendering_is_idempotent() {
        let waveform = ramp_waveform(1200, 100.0);
        let annotations = vec![
            beat(1.0, BeatType::Normal, false),
            beat(5.0, BeatType::Ventricular, true),
        ];
        let a = render_window(&waveform, Some(&annotations), 0.0, 12.0);
        let b = render_window(&waveform, Some(&annotations), 0.0, 12.0);
        assert_eq!(a, b);
    }

    #[test]
    fn figure_carries_trace_markers_and_band() {
        let waveform = ramp_waveform(1200, 100.0);
        let annotations = vec![
            beat(1.0, BeatType::Normal, false),
            beat(5.0, BeatType::Ventricular, true),
        ];
        let segment = render_window(&waveform, Some(&annotations), 0.0, 12.0).expect("in range");
        let fig = segment_figure(7, &segment);
        assert_eq!(fig.bands.len(), 1);
        assert_eq!(fig.series.len(), 3);
        assert!(fig.title.as_deref().unwrap_or("").contains("Case 7"));
        let Series::Line(line) = &fig.series[0] else {
            panic!("first series should be the trace");
        };
        assert_eq!(line.points.len(), 1200);
    }
}
