use arx_lib::annotations::{cases_with_rhythm, rhythm_classes, CaseMetadata};
use arx_lib::config::ViewerConfig;
use arx_lib::io::tables;
use arx_lib::plot::{Band, Figure, MarkerSymbol, Series, Style};
use eframe::{egui, egui::ViewportBuilder};
use egui_plot::{Line, MarkerShape, Plot, Points, Polygon, VLine};
use rfd::FileDialog;
use std::path::Path;

mod store;

use store::Store;

fn main() -> eframe::Result<()> {
    env_logger::init();
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_inner_size([1100.0, 720.0]),
        ..Default::default()
    };
    eframe::run_native(
        "ARX — Arrhythmia Explorer",
        native_options,
        Box::new(|_cc| Ok(Box::<ArxApp>::default())),
    )
}

struct ArxApp {
    config: ViewerConfig,
    config_path: Option<String>,
    metadata: Vec<CaseMetadata>,
    rhythms: Vec<String>,
    selected_rhythm: Option<String>,
    selected_case: Option<u32>,
    store: Store,
    status: String,
}

impl Default for ArxApp {
    fn default() -> Self {
        let mut app = Self {
            config: ViewerConfig::default(),
            config_path: None,
            metadata: Vec::new(),
            rhythms: Vec::new(),
            selected_rhythm: None,
            selected_case: None,
            store: Store::new(),
            status: "No metadata loaded".into(),
        };
        // Best effort: a metadata table at the default location loads silently.
        if app.config.metadata_path.exists() {
            let _ = app.reload_metadata();
        }
        app
    }
}

impl ArxApp {
    fn load_config(&mut self, path: &Path) -> Result<(), String> {
        self.config = ViewerConfig::load(path).map_err(|e| e.to_string())?;
        self.config_path = Some(path.display().to_string());
        self.store.reset();
        self.selected_rhythm = None;
        self.selected_case = None;
        self.reload_metadata()?;
        self.status = format!("Loaded config from {}", path.display());
        Ok(())
    }

    fn reload_metadata(&mut self) -> Result<(), String> {
        self.metadata =
            tables::read_metadata_csv(&self.config.metadata_path).map_err(|e| e.to_string())?;
        self.rhythms = rhythm_classes(&self.metadata);
        if let Some(rhythm) = &self.selected_rhythm {
            if !self.rhythms.contains(rhythm) {
                self.selected_rhythm = None;
                self.selected_case = None;
            }
        }
        self.status = format!(
            "Loaded {} cases, {} rhythm classes",
            self.metadata.len(),
            self.rhythms.len()
        );
        Ok(())
    }

    fn case_choices(&self) -> Vec<u32> {
        match &self.selected_rhythm {
            Some(rhythm) => cases_with_rhythm(&self.metadata, rhythm),
            None => Vec::new(),
        }
    }

    /// Push the rhythm/case pair into the store once both are chosen.
    fn apply_selection(&mut self) {
        let (Some(rhythm), Some(case_id)) = (self.selected_rhythm.clone(), self.selected_case)
        else {
            return;
        };
        match self.store.select(&self.config, &rhythm, case_id) {
            Ok(()) => {
                let (_, count) = self.store.cursor().position();
                self.status = format!("Case {case_id}: {count} {rhythm} segments");
            }
            Err(err) => {
                log::warn!("selection failed: {err:#}");
                self.status = format!("{err}");
            }
        }
    }

    fn show_controls(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("controls").show(ctx, |ui| {
            ui.heading("Data");
            if ui.button("Load config (TOML)").clicked() {
                if let Some(path) = FileDialog::new().add_filter("TOML", &["toml"]).pick_file() {
                    if let Err(err) = self.load_config(&path) {
                        self.status = err;
                    }
                }
            }
            if ui.button("Load metadata CSV").clicked() {
                if let Some(path) = FileDialog::new().add_filter("CSV", &["csv"]).pick_file() {
                    self.config.metadata_path = path;
                    if let Err(err) = self.reload_metadata() {
                        self.status = err;
                    }
                }
            }
            if ui.button("Annotation directory").clicked() {
                if let Some(path) = FileDialog::new().pick_folder() {
                    self.config.annotation_dir = path;
                    self.store.reset();
                    self.apply_selection();
                }
            }
            if ui.button("Waveform directory").clicked() {
                if let Some(path) = FileDialog::new().pick_folder() {
                    self.config.waveform_dir = path;
                    self.store.reset();
                    self.apply_selection();
                }
            }
            if let Some(config) = &self.config_path {
                ui.horizontal(|ui| {
                    ui.label("Config: ");
                    ui.monospace(config);
                });
            }

            ui.separator();
            ui.heading("Selection");
            let rhythm_label = self
                .selected_rhythm
                .clone()
                .unwrap_or_else(|| "choose...".into());
            let mut rhythm_changed = false;
            egui::ComboBox::from_label("Rhythm class")
                .selected_text(rhythm_label)
                .show_ui(ui, |ui| {
                    for rhythm in &self.rhythms {
                        if ui
                            .selectable_label(
                                self.selected_rhythm.as_deref() == Some(rhythm),
                                rhythm,
                            )
                            .clicked()
                        {
                            self.selected_rhythm = Some(rhythm.clone());
                            rhythm_changed = true;
                        }
                    }
                });
            if rhythm_changed {
                // The case list depends on the rhythm; restart at the first one.
                self.selected_case = self.case_choices().first().copied();
                self.apply_selection();
            }

            let cases = self.case_choices();
            let case_label = self
                .selected_case
                .map(|id| id.to_string())
                .unwrap_or_else(|| "choose...".into());
            let mut case_changed = false;
            egui::ComboBox::from_label("Case")
                .selected_text(case_label)
                .show_ui(ui, |ui| {
                    for &case_id in &cases {
                        if ui
                            .selectable_label(
                                self.selected_case == Some(case_id),
                                case_id.to_string(),
                            )
                            .clicked()
                        {
                            self.selected_case = Some(case_id);
                            case_changed = true;
                        }
                    }
                });
            if case_changed {
                self.apply_selection();
            }

            ui.separator();
            ui.label(format!("Status: {}", self.status));
            ui.label(format!("Samples: {}", self.store.sample_count()));
            ui.label(format!("Beats: {}", self.store.beat_count()));
        });
    }

    fn show_segment(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.store.selection().is_none() {
                ui.centered_and_justified(|ui| {
                    ui.label("Pick a rhythm class and a case to view its segments.");
                });
                return;
            }

            let cursor = self.store.cursor();
            if cursor.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label("No clear starting segment for this rhythm in the chosen case.");
                });
                return;
            }

            let (position, count) = cursor.position();
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(position > 1, egui::Button::new("⬅ Previous"))
                    .clicked()
                {
                    self.store.previous();
                }
                ui.label(format!("Segment {position} of {count}"));
                if ui
                    .add_enabled(position < count, egui::Button::new("Next ➡"))
                    .clicked()
                {
                    self.store.next();
                }
            });

            self.store.prepare();

            if self.store.out_of_range() {
                ui.centered_and_justified(|ui| {
                    ui.colored_label(
                        egui::Color32::LIGHT_RED,
                        "This window runs past the end of the recording.",
                    );
                });
                return;
            }

            if let Some(fig) = self.store.segment_figure() {
                Plot::new("segment_plot").height(380.0).show(ui, |plot_ui| {
                    plot_plot_figure(plot_ui, fig);
                });
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label("Preparing segment...");
                });
            }

            ui.separator();
            ui.label("Full recording");
            let starts = self.store.segment_starts().to_vec();
            if let Some(fig) = self.store.overview_figure() {
                Plot::new("overview_plot").height(140.0).show(ui, |plot_ui| {
                    plot_plot_figure(plot_ui, fig);
                    for start in starts {
                        plot_ui.vline(
                            VLine::new(start)
                                .stroke(egui::Stroke::new(1.0, egui::Color32::LIGHT_BLUE)),
                        );
                    }
                });
            }
        });
    }
}

impl eframe::App for ArxApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.heading("ARX — single-page arrhythmia segment viewer");
        });
        self.show_controls(ctx);
        self.show_segment(ctx);
    }
}

fn plot_plot_figure(plot_ui: &mut egui_plot::PlotUi, figure: &Figure) {
    // Bands first so the trace and markers draw on top of the shading.
    if let Some((lo, hi)) = figure.y_extent() {
        let pad = (hi - lo).abs().max(1e-6) * 0.05;
        for band in &figure.bands {
            plot_ui.polygon(
                Polygon::new(band_corners(band, lo - pad, hi + pad))
                    .fill_color(band_color(band))
                    .stroke(egui::Stroke::NONE)
                    .name(band.name.clone()),
            );
        }
    }
    for series in &figure.series {
        match series {
            Series::Line(line) => {
                plot_ui.line(
                    Line::new(line.points.clone())
                        .stroke(stroke_from_style(&line.style))
                        .name(line.name.clone()),
                );
            }
            Series::Marker(markers) => {
                plot_ui.points(
                    Points::new(markers.points.clone())
                        .shape(marker_shape(markers.symbol))
                        .radius(markers.size / 2.0)
                        .color(color_from_u32(markers.color.0))
                        .name(markers.name.clone()),
                );
            }
        }
    }
}

fn band_corners(band: &Band, lo: f64, hi: f64) -> Vec<[f64; 2]> {
    vec![
        [band.x0, lo],
        [band.x1, lo],
        [band.x1, hi],
        [band.x0, hi],
    ]
}

fn band_color(band: &Band) -> egui::Color32 {
    let base = color_from_u32(band.color.0);
    let alpha = (band.opacity.clamp(0.0, 1.0) * 255.0) as u8;
    egui::Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), alpha)
}

fn marker_shape(symbol: MarkerSymbol) -> MarkerShape {
    match symbol {
        MarkerSymbol::Circle => MarkerShape::Circle,
        MarkerSymbol::TriangleUp => MarkerShape::Up,
        MarkerSymbol::Square => MarkerShape::Square,
        MarkerSymbol::Star => MarkerShape::Asterisk,
    }
}

fn stroke_from_style(style: &Style) -> egui::Stroke {
    egui::Stroke::new(style.width, color_from_u32(style.color.0))
}

fn color_from_u32(color: u32) -> egui::Color32 {
    let r = ((color >> 16) & 0xFF) as u8;
    let g = ((color >> 8) & 0xFF) as u8;
    let b = (color & 0xFF) as u8;
    egui::Color32::from_rgb(r, g, b)
}
