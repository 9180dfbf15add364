use anyhow::{anyhow, Result};
use arx_lib::{
    annotations::{cases_with_rhythm, rhythm_classes, AnnotationRecord},
    config::{ViewerConfig, DEFAULT_SAMPLE_RATE_HZ, DEFAULT_WINDOW_S},
    error::ViewerError,
    io::{tables, waveform as waveform_io},
    plot::{Figure, MarkerSymbol, Series},
    render::{render_window, segment_figure},
    segments::{find_segment_starts, DEFAULT_GAP_THRESHOLD_S},
    signal::WaveformSeries,
};
use clap::{Parser, Subcommand};
use plotters::prelude::*;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "arx", version, about = "ARX: arrhythmia explorer CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the rhythm classes present in a metadata table
    Rhythms {
        #[arg(long)]
        metadata: PathBuf,
    },
    /// List the cases whose metadata carries a rhythm label
    Cases {
        #[arg(long)]
        metadata: PathBuf,
        #[arg(long)]
        rhythm: String,
    },
    /// Find rhythm episode start times in an annotation CSV
    Segments {
        #[arg(long)]
        annotations: PathBuf,
        #[arg(long)]
        rhythm: String,
        #[arg(long, default_value_t = DEFAULT_GAP_THRESHOLD_S)]
        gap_threshold: f64,
    },
    /// Render one window to a JSON segment description
    Render {
        #[arg(long)]
        annotations: Option<PathBuf>,
        /// Newline-delimited samples; stdin when neither input is given
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        wfdb_header: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        wfdb_lead: usize,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE_HZ)]
        fs: f64,
        #[arg(long)]
        start: f64,
        #[arg(long, default_value_t = DEFAULT_WINDOW_S)]
        window: f64,
    },
    /// Render one window to a PNG via plotters
    Plot {
        #[arg(long)]
        annotations: Option<PathBuf>,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        wfdb_header: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        wfdb_lead: usize,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE_HZ)]
        fs: f64,
        #[arg(long)]
        start: f64,
        #[arg(long, default_value_t = DEFAULT_WINDOW_S)]
        window: f64,
        #[arg(long, default_value_t = 0)]
        case: u32,
        #[arg(long)]
        out: PathBuf,
    },
    /// Drive a full selection from a viewer config: rhythm + case + segment index to PNG
    Show {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        case: u32,
        #[arg(long)]
        rhythm: String,
        #[arg(long, default_value_t = 0)]
        segment: usize,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Rhythms { metadata } => cmd_rhythms(&metadata)?,
        Commands::Cases { metadata, rhythm } => cmd_cases(&metadata, &rhythm)?,
        Commands::Segments {
            annotations,
            rhythm,
            gap_threshold,
        } => cmd_segments(&annotations, &rhythm, gap_threshold)?,
        Commands::Render {
            annotations,
            input,
            wfdb_header,
            wfdb_lead,
            fs,
            start,
            window,
        } => cmd_render(
            annotations.as_deref(),
            input.as_deref(),
            wfdb_header.as_deref(),
            wfdb_lead,
            fs,
            start,
            window,
        )?,
        Commands::Plot {
            annotations,
            input,
            wfdb_header,
            wfdb_lead,
            fs,
            start,
            window,
            case,
            out,
        } => cmd_plot(
            annotations.as_deref(),
            input.as_deref(),
            wfdb_header.as_deref(),
            wfdb_lead,
            fs,
            start,
            window,
            case,
            &out,
        )?,
        Commands::Show {
            config,
            case,
            rhythm,
            segment,
            out,
        } => cmd_show(&config, case, &rhythm, segment, &out)?,
    }
    Ok(())
}

fn cmd_rhythms(metadata: &Path) -> Result<()> {
    let cases = tables::read_metadata_csv(metadata)?;
    println!("{}", serde_json::to_string(&rhythm_classes(&cases))?);
    Ok(())
}

fn cmd_cases(metadata: &Path, rhythm: &str) -> Result<()> {
    let cases = tables::read_metadata_csv(metadata)?;
    println!("{}", serde_json::to_string(&cases_with_rhythm(&cases, rhythm))?);
    Ok(())
}

fn cmd_segments(annotations: &Path, rhythm: &str, gap_threshold: f64) -> Result<()> {
    let rows = tables::read_annotation_csv(annotations)?;
    let starts = find_segment_starts(&rows, rhythm, gap_threshold);
    if starts.is_empty() {
        log::warn!(
            "{}",
            ViewerError::EmptySelection {
                rhythm: rhythm.to_string()
            }
        );
    }
    println!("{}", serde_json::to_string(&starts)?);
    Ok(())
}

fn load_waveform(
    fs: f64,
    input: Option<&Path>,
    wfdb_header: Option<&Path>,
    wfdb_lead: usize,
) -> Result<WaveformSeries> {
    if let Some(header) = wfdb_header {
        waveform_io::load_wfdb_lead(header, wfdb_lead)
    } else if let Some(path) = input {
        let text = std::fs::read_to_string(path)
            .map_err(|err| anyhow!("failed to read {}: {}", path.display(), err))?;
        Ok(WaveformSeries {
            fs,
            data: waveform_io::parse_samples(&text)?,
        })
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(WaveformSeries {
            fs,
            data: waveform_io::parse_samples(&buf)?,
        })
    }
}

fn load_annotations(path: Option<&Path>) -> Result<Option<Vec<AnnotationRecord>>> {
    match path {
        Some(path) => Ok(Some(tables::read_annotation_csv(path)?)),
        None => Ok(None),
    }
}

fn cmd_render(
    annotations: Option<&Path>,
    input: Option<&Path>,
    wfdb_header: Option<&Path>,
    wfdb_lead: usize,
    fs: f64,
    start: f64,
    window: f64,
) -> Result<()> {
    let waveform = load_waveform(fs, input, wfdb_header, wfdb_lead)?;
    let rows = load_annotations(annotations)?;
    let segment = render_window(&waveform, rows.as_deref(), start, start + window).ok_or(
        ViewerError::OutOfRangeWindow {
            start,
            end: start + window,
        },
    )?;
    println!("{}", serde_json::to_string(&segment)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_plot(
    annotations: Option<&Path>,
    input: Option<&Path>,
    wfdb_header: Option<&Path>,
    wfdb_lead: usize,
    fs: f64,
    start: f64,
    window: f64,
    case: u32,
    out: &Path,
) -> Result<()> {
    let waveform = load_waveform(fs, input, wfdb_header, wfdb_lead)?;
    let rows = load_annotations(annotations)?;
    let segment = render_window(&waveform, rows.as_deref(), start, start + window).ok_or(
        ViewerError::OutOfRangeWindow {
            start,
            end: start + window,
        },
    )?;
    let fig = segment_figure(case, &segment);
    draw_plotters_figure(out, &fig)?;
    Ok(())
}

fn cmd_show(config: &Path, case: u32, rhythm: &str, segment: usize, out: &Path) -> Result<()> {
    let cfg = ViewerConfig::load(config)?;
    let rows = tables::read_annotation_csv(&cfg.annotation_path(case))?;
    let starts = find_segment_starts(&rows, rhythm, cfg.gap_threshold_s);
    if starts.is_empty() {
        return Err(ViewerError::EmptySelection {
            rhythm: rhythm.to_string(),
        }
        .into());
    }
    if segment >= starts.len() {
        anyhow::bail!(
            "segment {} out of range: {} segment(s) for '{}'",
            segment,
            starts.len(),
            rhythm
        );
    }
    let waveform = cfg.waveform_source().fetch(case)?;
    let start = starts[segment];
    let end = start + cfg.window_s;
    let rendered = render_window(&waveform, Some(&rows), start, end)
        .ok_or(ViewerError::OutOfRangeWindow { start, end })?;
    let fig = segment_figure(case, &rendered);
    draw_plotters_figure(out, &fig)?;
    println!(
        "{}",
        serde_json::json!({
            "case_id": case,
            "rhythm": rhythm,
            "segment": segment,
            "segment_count": starts.len(),
            "start_time": start,
            "end_time": end,
            "out": out,
        })
    );
    Ok(())
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let backend = BitMapBackend::new(path, (1000, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    for series in &fig.series {
        let points = match series {
            Series::Line(line) => &line.points,
            Series::Marker(markers) => &markers.points,
        };
        for p in points {
            x_min = x_min.min(p[0]);
            x_max = x_max.max(p[0]);
        }
    }
    let (y_min, y_max) = fig
        .y_extent()
        .ok_or_else(|| anyhow!("nothing to draw: figure has no points"))?;
    let pad = ((y_max - y_min) * 0.05).max(0.01);
    let (y_min, y_max) = (y_min - pad, y_max + pad);

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Segment".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;

    // Bands go down first so the trace stays on top.
    for band in &fig.bands {
        let fill = rgb(band.color).mix(band.opacity as f64);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(band.x0, y_min), (band.x1, y_max)],
            fill.filled(),
        )))?;
    }

    for series in &fig.series {
        match series {
            Series::Line(line) => {
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    rgb(line.style.color),
                ))?;
            }
            Series::Marker(markers) => {
                let color = rgb(markers.color);
                let size = (markers.size / 2.0).round() as i32;
                let coords = || markers.points.iter().map(|p| (p[0], p[1]));
                // plotters has no square or star primitive; a cross and an
                // open circle are the nearest stand-ins.
                match markers.symbol {
                    MarkerSymbol::Circle => {
                        chart.draw_series(coords().map(|c| Circle::new(c, size, color.filled())))?;
                    }
                    MarkerSymbol::TriangleUp => {
                        chart.draw_series(
                            coords().map(|c| TriangleMarker::new(c, size, color.filled())),
                        )?;
                    }
                    MarkerSymbol::Square => {
                        chart.draw_series(
                            coords().map(|c| Cross::new(c, size, color.stroke_width(2))),
                        )?;
                    }
                    MarkerSymbol::Star => {
                        chart.draw_series(
                            coords().map(|c| Circle::new(c, size, color.stroke_width(2))),
                        )?;
                    }
                }
            }
        }
    }
    root.present()?;
    Ok(())
}

fn rgb(color: arx_lib::plot::Color) -> RGBColor {
    RGBColor(
        ((color.0 >> 16) & 0xFF) as u8,
        ((color.0 >> 8) & 0xFF) as u8,
        (color.0 & 0xFF) as u8,
    )
}
