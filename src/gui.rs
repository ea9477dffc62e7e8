//! egui host for the dashboard.

use crate::dashboard::node::{Element, WidgetEvent, WidgetNode};
use crate::dashboard::{Dashboard, WidgetConfig, WidgetKind};
use eframe::egui;
use std::collections::HashMap;
use std::time::Duration;

const BUSY_REPAINT: Duration = Duration::from_millis(100);
const IDLE_REPAINT: Duration = Duration::from_secs(1);
/// Warnings kept on screen; older ones fall off.
const MAX_WARNINGS: usize = 5;

/// Something the user did this frame, applied once drawing is finished.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Add(WidgetKind),
    ClearAll,
    Widget(String, WidgetEvent),
    DismissWarnings,
}

pub struct DashboardApp {
    dashboard: Dashboard,
    /// Text typed into single-line inputs, keyed by `<widget id>/<input name>`.
    inputs: HashMap<String, String>,
    warnings: Vec<String>,
}

impl DashboardApp {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            inputs: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard {
        &mut self.dashboard
    }

    /// Warnings currently shown in the bottom strip, oldest first.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn collect_warnings(&mut self) {
        self.warnings.extend(self.dashboard.take_warnings());
        if self.warnings.len() > MAX_WARNINGS {
            let excess = self.warnings.len() - MAX_WARNINGS;
            self.warnings.drain(..excess);
        }
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        self.dashboard.poll();

        let mut commands = Vec::new();
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                for kind in self.dashboard.registry().kinds() {
                    if ui.button(format!("+ {}", kind.default_title())).clicked() {
                        commands.push(Command::Add(kind));
                    }
                }
                ui.separator();
                if ui.button("Clear all").clicked() {
                    commands.push(Command::ClearAll);
                }
            });
        });

        self.collect_warnings();
        if !self.warnings.is_empty() {
            egui::TopBottomPanel::bottom("warnings").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        for warning in &self.warnings {
                            ui.colored_label(ui.visuals().warn_fg_color, warning);
                        }
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                        if ui.small_button("Dismiss").clicked() {
                            commands.push(Command::DismissWarnings);
                        }
                    });
                });
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    if self.dashboard.is_empty() {
                        ui.weak("No widgets yet. Add one from the toolbar.");
                    }
                    for node in self.dashboard.nodes() {
                        node_ui(ui, node, &mut self.inputs, &mut commands);
                        ui.add_space(6.0);
                    }
                });
        });

        for command in commands {
            self.apply(command);
        }

        let repaint = if self.dashboard.is_busy() {
            BUSY_REPAINT
        } else {
            IDLE_REPAINT
        };
        ctx.request_repaint_after(repaint);
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Add(kind) => {
                if let Err(err) = self.dashboard.add_widget(kind.as_str(), WidgetConfig::default()) {
                    tracing::error!("failed to add widget: {err}");
                }
            }
            Command::ClearAll => {
                self.dashboard.clear_all();
                self.inputs.clear();
            }
            Command::Widget(id, event) => {
                if event == WidgetEvent::Close {
                    let prefix = format!("{id}/");
                    self.inputs.retain(|k, _| !k.starts_with(&prefix));
                }
                self.dashboard.dispatch(&id, event);
            }
            Command::DismissWarnings => self.warnings.clear(),
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
    }
}

fn node_ui(
    ui: &mut egui::Ui,
    node: &WidgetNode,
    inputs: &mut HashMap<String, String>,
    commands: &mut Vec<Command>,
) {
    let id = node.widget_id.as_str();
    let emit = |commands: &mut Vec<Command>, event: WidgetEvent| {
        commands.push(Command::Widget(id.to_string(), event));
    };

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.strong(&node.header.title);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                for control in node.header.controls.iter().rev() {
                    if ui.small_button(control.label()).clicked() {
                        emit(commands, control.event());
                    }
                }
            });
        });
        if !node.body.visible {
            return;
        }
        ui.separator();

        let mut notes: Vec<String> = Vec::new();
        let mut notes_changed = false;
        for region in &node.body.regions {
            for element in &region.elements {
                match element {
                    Element::Text(text) => {
                        ui.label(text);
                    }
                    Element::Heading(text) => {
                        ui.heading(text);
                    }
                    Element::Error(text) => {
                        ui.colored_label(ui.visuals().error_fg_color, text);
                    }
                    Element::Detail { label, value } => {
                        ui.horizontal(|ui| {
                            ui.weak(label);
                            ui.label(value);
                        });
                    }
                    Element::Input {
                        name,
                        placeholder,
                        submit,
                        submit_label,
                        ..
                    } => {
                        let buffer = inputs.entry(format!("{id}/{name}")).or_default();
                        ui.horizontal(|ui| {
                            let resp = ui.add(
                                egui::TextEdit::singleline(buffer).hint_text(placeholder.as_str()),
                            );
                            let entered =
                                resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                            if ui.button(submit_label).clicked() || entered {
                                let text = std::mem::take(buffer);
                                emit(commands, submit.event(text));
                            }
                        });
                    }
                    Element::Button {
                        label,
                        event,
                        enabled,
                    } => {
                        if ui.add_enabled(*enabled, egui::Button::new(label)).clicked() {
                            emit(commands, event.clone());
                        }
                    }
                    Element::Task {
                        id: task_id,
                        text,
                        completed,
                    } => {
                        ui.horizontal(|ui| {
                            let mut done = *completed;
                            if ui.checkbox(&mut done, "").changed() {
                                emit(commands, WidgetEvent::ToggleTask(task_id.clone()));
                            }
                            let label = if *completed {
                                egui::RichText::new(text).strikethrough().weak()
                            } else {
                                egui::RichText::new(text)
                            };
                            ui.label(label);
                            if ui.small_button("🗑").clicked() {
                                emit(commands, WidgetEvent::DeleteTask(task_id.clone()));
                            }
                        });
                    }
                    Element::Note {
                        index,
                        text,
                        deletable,
                    } => {
                        let mut buffer = text.clone();
                        ui.horizontal(|ui| {
                            let resp = ui.add(
                                egui::TextEdit::multiline(&mut buffer)
                                    .id_source((id, "note", *index))
                                    .desired_rows(3)
                                    .hint_text("Write a note..."),
                            );
                            notes_changed |= resp.changed();
                            if *deletable && ui.small_button("×").clicked() {
                                emit(commands, WidgetEvent::DeleteNote(*index));
                            }
                        });
                        notes.push(buffer);
                    }
                }
            }
        }
        if notes_changed {
            emit(commands, WidgetEvent::EditNotes(notes));
        }
    });
}
