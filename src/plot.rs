use std::sync::Arc;
use std::time::Duration;
use eframe::egui;
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, TextureHandle, TextureOptions};
use log::{debug, info};

use crate::config::{NewestEdge, ViewerConfig};
use crate::display::format_status;
use crate::frame_decoder::MagnitudeFrame;
use crate::handoff::FrameHandoff;
use crate::serial_stream::ReaderStats;
use crate::spectrum_plot::{frequency_ticks, PlotArea, SpectrumPlot};
use crate::waterfall::WaterfallBuffer;

const MARGIN_LEFT: f32 = 80.0;
const MARGIN_RIGHT: f32 = 50.0;
const PLOT_HEIGHT: f32 = 300.0;
const LABEL_ROOM: f32 = 30.0;

const TEXT_COLOR: Color32 = Color32::BLACK;
const GRID_COLOR: Color32 = Color32::from_rgb(200, 200, 200);
const TRACE_COLOR: Color32 = Color32::from_rgb(0, 0, 255);

/// Render stage: takes the newest frame each display tick, scrolls it into
/// the waterfall and paints both views.
pub struct ViewerApp {
    config: ViewerConfig,
    handoff: FrameHandoff,
    stats: Arc<ReaderStats>,
    source_label: String,
    current: Option<MagnitudeFrame>,
    waterfall: WaterfallBuffer,
    waterfall_texture: Option<TextureHandle>,
    texture_dirty: bool,
}

impl ViewerApp {
    pub fn new(
        config: ViewerConfig,
        handoff: FrameHandoff,
        stats: Arc<ReaderStats>,
        source_label: String,
    ) -> Self {
        let waterfall = WaterfallBuffer::new(
            config.waterfall_columns(),
            config.waterfall_depth,
            config.newest_at,
            config.intensity,
        );
        info!(
            "Waterfall {}x{} (newest at {:?}, {:?} intensity)",
            waterfall.width(),
            waterfall.height(),
            config.newest_at,
            config.intensity
        );

        Self {
            config,
            handoff,
            stats,
            source_label,
            current: None,
            waterfall,
            waterfall_texture: None,
            texture_dirty: true,
        }
    }

    /// Pulls the latest published frame, if any, and adds it to the history.
    fn take_new_frame(&mut self) -> bool {
        match self.handoff.take_latest() {
            Some(frame) => {
                self.waterfall.push(frame.values());
                self.texture_dirty = true;
                debug!("Displaying frame #{}", frame.sequence);
                self.current = Some(frame);
                true
            }
            None => false,
        }
    }

    fn draw_spectrum(&self, ui: &mut egui::Ui, frame: &MagnitudeFrame) {
        let size = egui::vec2(ui.available_width(), PLOT_HEIGHT + LABEL_ROOM + 10.0);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let rect = response.rect;
        let area = PlotArea {
            left: rect.left() + MARGIN_LEFT,
            top: rect.top() + 10.0,
            right: rect.right() - MARGIN_RIGHT,
            bottom: rect.top() + 10.0 + PLOT_HEIGHT,
        };

        let plot = SpectrumPlot::layout(
            frame.values(),
            &area,
            self.config.sample_rate,
            self.config.fft_size,
        );

        let label_font = FontId::proportional(12.0);
        for tick in &plot.y_ticks {
            painter.line_segment(
                [Pos2::new(area.left, tick.position), Pos2::new(area.right, tick.position)],
                Stroke::new(1.0, GRID_COLOR),
            );
            painter.text(
                Pos2::new(area.left - 5.0, tick.position),
                Align2::RIGHT_CENTER,
                &tick.label,
                label_font.clone(),
                TEXT_COLOR,
            );
        }

        let axis = Stroke::new(2.0, TEXT_COLOR);
        painter.line_segment([Pos2::new(area.left, area.bottom), Pos2::new(area.right, area.bottom)], axis);
        painter.line_segment([Pos2::new(area.left, area.top), Pos2::new(area.left, area.bottom)], axis);
        draw_frequency_labels(&painter, &area, self.config.sample_rate);

        let points: Vec<Pos2> = plot.points.iter().map(|p| Pos2::new(p[0], p[1])).collect();
        painter.add(Shape::line(points, Stroke::new(1.0, TRACE_COLOR)));

        if plot.max_val == 0.0 {
            painter.text(
                Pos2::new((area.left + area.right) / 2.0, area.top + 10.0),
                Align2::CENTER_TOP,
                "Silent frame (all bins zero)",
                label_font.clone(),
                GRID_COLOR,
            );
        }

        for (i, line) in plot.info.iter().enumerate() {
            painter.text(
                Pos2::new(area.left + 10.0, area.top + 10.0 + i as f32 * 20.0),
                Align2::LEFT_TOP,
                line,
                label_font.clone(),
                TEXT_COLOR,
            );
        }
    }

    fn draw_waterfall(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Waterfall Spectrogram").color(TEXT_COLOR).size(14.0));

        if self.texture_dirty || self.waterfall_texture.is_none() {
            let image = self.waterfall.to_color_image();
            match &mut self.waterfall_texture {
                Some(texture) => texture.set(image, TextureOptions::NEAREST),
                None => {
                    self.waterfall_texture =
                        Some(ui.ctx().load_texture("waterfall", image, TextureOptions::NEAREST));
                }
            }
            self.texture_dirty = false;
        }

        let size = egui::vec2(ui.available_width(), PLOT_HEIGHT + LABEL_ROOM);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let rect = response.rect;
        let area = PlotArea {
            left: rect.left() + MARGIN_LEFT,
            top: rect.top(),
            right: rect.right() - MARGIN_RIGHT,
            bottom: rect.top() + PLOT_HEIGHT,
        };
        let image_rect = Rect::from_min_max(Pos2::new(area.left, area.top), Pos2::new(area.right, area.bottom));

        if let Some(texture) = &self.waterfall_texture {
            let uv = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0));
            painter.image(texture.id(), image_rect, uv, Color32::WHITE);
        }
        painter.rect_stroke(image_rect, 0.0, Stroke::new(2.0, TEXT_COLOR));
        draw_frequency_labels(&painter, &area, self.config.sample_rate);

        let caption = match self.waterfall.newest_at() {
            NewestEdge::Top => "Time (newest at top)",
            NewestEdge::Bottom => "Time (newest at bottom)",
        };
        painter.text(
            Pos2::new(rect.left() + 5.0, area.top + PLOT_HEIGHT / 2.0),
            Align2::LEFT_CENTER,
            caption,
            FontId::proportional(11.0),
            TEXT_COLOR,
        );
    }

    fn draw_status(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let last = self
                .current
                .as_ref()
                .map(|f| f.received_at.format("%H:%M:%S").to_string());
            ui.label(format!(
                "{}  |  {}",
                self.source_label,
                format_status(self.stats.accepted(), self.stats.rejected(), last.as_deref())
            ));
            if ui.button("Clear waterfall").clicked() {
                info!("Waterfall cleared");
                self.waterfall.reset();
                self.texture_dirty = true;
            }
        });
    }
}

fn draw_frequency_labels(painter: &egui::Painter, area: &PlotArea, sample_rate: f32) {
    for tick in frequency_ticks(area.left, area.right, sample_rate) {
        painter.text(
            Pos2::new(tick.position, area.bottom + 5.0),
            Align2::CENTER_TOP,
            &tick.label,
            FontId::proportional(14.0),
            TEXT_COLOR,
        );
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.take_new_frame();

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.draw_status(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            match self.current.clone() {
                Some(frame) => {
                    self.draw_spectrum(ui, &frame);
                    ui.add_space(20.0);
                    self.draw_waterfall(ui);
                }
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            egui::RichText::new("Waiting for FFT data...")
                                .size(20.0)
                                .color(TEXT_COLOR),
                        );
                    });
                }
            }
        });

        // Fixed-rate display tick
        ctx.request_repaint_after(Duration::from_millis(self.config.repaint_interval_ms));
    }
}
