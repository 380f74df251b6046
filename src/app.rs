//! The rendering surface: one long-lived window of stacked egui_plot
//! subplots, plus modal dialogs.
//!
//! The window is entered exactly once per process; every later pass reaches
//! it through [`LoopState`](crate::loops::LoopState), which
//! [`PlotApp::update`] drains each frame. Only the main thread may call
//! into this module.

use chrono::Local;
use eframe::egui;
use egui_plot::{Legend, Line, Plot};

use crate::error::{ProcessError, Result};
use crate::loops::{render_tick, LoopState, PendingError, POLL_INTERVAL};
use crate::plot::AxisTrace;
use crate::reprocess::AxisAssignment;

/// Turns a freshly published assignment into per-axis traces.
pub type TraceBuilder = Box<dyn FnMut(&AxisAssignment) -> Result<Vec<Vec<AxisTrace>>>>;

/// Show a blocking modal error dialog.
///
/// For failures before the window exists (bad CLI input, cancelled file
/// pickers). Once the window is up, errors surface as in-window modals
/// instead.
pub fn show_error_dialog(title: &str, message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Open the plot window and enter the event loop.
///
/// Blocks until the window is closed or exit is requested through `state`;
/// closing the window requests exit itself, so the watch loop winds down
/// with the window.
pub fn run(state: LoopState, build: TraceBuilder) -> Result<()> {
    let app = PlotApp {
        state,
        build,
        title: "Waiting for the first pass".to_string(),
        axes: Vec::new(),
        dialog: None,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(egui::vec2(1400.0, 900.0)),
        ..Default::default()
    };
    eframe::run_native("lflplot", options, Box::new(|_cc| Ok(Box::new(app))))
        .map_err(|err| ProcessError::Data(format!("plot window failed: {err}")))
}

/// The application state behind the single window: the traces of the most
/// recent pass and at most one dialog on screen.
struct PlotApp {
    state: LoopState,
    build: TraceBuilder,
    title: String,
    axes: Vec<Vec<AxisTrace>>,
    dialog: Option<PendingError>,
}

impl eframe::App for PlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.state.request_exit();
        }
        if self.state.exit_requested() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        // One tick per frame, paused while a dialog is on screen.
        if self.dialog.is_none() {
            let dialog = &mut self.dialog;
            let axes = &mut self.axes;
            let title = &mut self.title;
            let build = &mut self.build;
            render_tick(
                &self.state,
                |pending| *dialog = Some(pending.clone()),
                |assignment| {
                    *axes = build(&assignment)?;
                    *title = Local::now()
                        .format("Processed on %A, %d %B %Y at %X")
                        .to_string();
                    Ok(())
                },
            );
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(&self.title);
            let count = self.axes.len().max(1);
            let height = (ui.available_height() / count as f32).max(60.0);
            let link_group = ui.id().with("lfl_time_axis");
            for (index, traces) in self.axes.iter().enumerate() {
                let last = index + 1 == self.axes.len();
                let label_fmt = |_s: &str, val: &egui_plot::PlotPoint| {
                    format!("t = {:.2} s\n{:.3}", val.x, val.y)
                };
                Plot::new(format!("axis_{index}"))
                    .height(height)
                    .link_axis(link_group, [true, false])
                    .legend(Legend::default())
                    // Time tick labels only on the bottom subplot.
                    .show_axes([last, true])
                    .label_formatter(label_fmt)
                    .show(ui, |plot_ui| {
                        for trace in traces {
                            plot_ui.line(Line::new(&trace.label, trace.points.clone()));
                        }
                    });
            }
        });

        if let Some(pending) = self.dialog.clone() {
            egui::Window::new(pending.title.as_str())
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(&pending.message);
                    if ui.button("OK").clicked() {
                        self.dialog = None;
                    }
                });
        }

        // Wake up for the next publish even without user input.
        ctx.request_repaint_after(POLL_INTERVAL);
    }
}
