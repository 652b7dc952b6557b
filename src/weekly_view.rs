//! Tab-per-day workout logging with per-set rest timers.

use crate::plan::{ALL_WEEKDAYS, SetEdit, WeeklyPlanEditor};
use crate::rest_timer::{
    ALL_PRESETS, RestPreset, ScheduledTimer, TimerBoard, TimerDisplay, TimerKey,
};
use crate::volume::VolumeTrend;
use eframe::egui;
use egui::{Color32, RichText};
use std::time::Instant;

/// Text and background colors for a volume cell.
pub fn trend_colors(trend: VolumeTrend) -> Option<(Color32, Color32)> {
    match trend {
        VolumeTrend::None => None,
        VolumeTrend::Up => Some((
            Color32::from_rgb(22, 163, 74),
            Color32::from_rgb(240, 253, 244),
        )),
        VolumeTrend::Down => Some((
            Color32::from_rgb(220, 38, 38),
            Color32::from_rgb(254, 242, 242),
        )),
        VolumeTrend::Flat => Some((
            Color32::from_rgb(202, 138, 4),
            Color32::from_rgb(254, 252, 232),
        )),
    }
}

pub struct WeeklyView {
    selected_day: usize,
    timers: TimerBoard,
}

impl WeeklyView {
    pub fn new(default_preset: RestPreset) -> Self {
        Self {
            selected_day: 0,
            timers: TimerBoard::new(default_preset),
        }
    }

    pub fn selected_day(&self) -> usize {
        self.selected_day
    }

    /// Switch tabs. Timers of the previous day are dropped with it.
    pub fn select_day(&mut self, day: usize) {
        if day != self.selected_day && day < ALL_WEEKDAYS.len() {
            self.selected_day = day;
            self.timers.clear();
        }
    }

    pub fn hide_timers(&mut self) {
        self.timers.clear();
    }

    pub fn show(&mut self, ui: &mut egui::Ui, editor: &mut WeeklyPlanEditor) {
        let now = Instant::now();
        if let Some(next) = self.timers.advance_all(now) {
            ui.ctx()
                .request_repaint_after(next.saturating_duration_since(now));
        }

        let plan = editor.plan();
        ui.heading(format!("Week {} workouts", plan.week_number));
        ui.label(format!("Program: {}", plan.program_name));
        ui.horizontal(|ui| {
            for (i, day) in ALL_WEEKDAYS.iter().enumerate() {
                if ui
                    .selectable_label(self.selected_day == i, day.short_label())
                    .clicked()
                {
                    self.select_day(i);
                }
            }
        });
        ui.separator();

        let day_index = self.selected_day;
        let day = plan.day(ALL_WEEKDAYS[day_index]);
        ui.horizontal(|ui| {
            ui.heading(day.day.label());
            if !day.is_off_day {
                ui.label(format!(
                    "{} sets, {:.0} kg volume",
                    day.set_count(),
                    day.total_volume()
                ));
                if let Some(prev) = day.previous_total_volume() {
                    ui.label(RichText::new(format!("last week {prev:.0} kg")).weak());
                }
            }
        });
        if day.is_off_day {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.label(RichText::new("Rest day").size(18.0));
                ui.label("Take it easy and recover");
                ui.add_space(24.0);
            });
            return;
        }

        let mut edits: Vec<(usize, usize, SetEdit)> = Vec::new();
        let mut toggled: Vec<TimerKey> = Vec::new();
        for (ex_idx, exercise) in day.exercises.iter().enumerate() {
            ui.group(|ui| {
                ui.strong(exercise.name());
                egui::Grid::new(("set_grid", day_index, ex_idx))
                    .striped(true)
                    .num_columns(7)
                    .show(ui, |ui| {
                        for header in ["Set", "Reps", "Actual", "Weight (kg)", "Volume", "Compare", "Timer"] {
                            ui.label(header);
                        }
                        ui.end_row();
                        for (set_idx, set) in exercise.sets().iter().enumerate() {
                            ui.label((set_idx + 1).to_string());
                            ui.label(set.planned_reps().to_string());

                            let mut reps = set.actual_reps();
                            if ui
                                .add(egui::DragValue::new(&mut reps).clamp_range(0..=999))
                                .changed()
                            {
                                edits.push((ex_idx, set_idx, SetEdit::ActualReps(reps)));
                            }
                            let mut weight = set.weight_kg();
                            if ui
                                .add(
                                    egui::DragValue::new(&mut weight)
                                        .speed(0.5)
                                        .clamp_range(0.0..=1000.0)
                                        .fixed_decimals(1),
                                )
                                .changed()
                            {
                                edits.push((ex_idx, set_idx, SetEdit::WeightKg(weight)));
                            }

                            let trend = set.trend();
                            let mut volume = RichText::new(format!("{:.1}", set.volume())).strong();
                            if let Some((fg, bg)) = trend_colors(trend) {
                                volume = volume.color(fg).background_color(bg);
                            }
                            ui.label(volume);

                            ui.horizontal(|ui| {
                                let mut symbol = RichText::new(trend.symbol());
                                if let Some((fg, _)) = trend_colors(trend) {
                                    symbol = symbol.color(fg);
                                }
                                ui.label(symbol);
                                if let Some(prev) = set.previous_week_volume() {
                                    ui.label(RichText::new(format!("{prev:.1}")).small().weak());
                                }
                            });

                            let key = TimerKey::new(exercise.name(), set_idx);
                            let caption = match self.timers.get(&key) {
                                Some(t) => format!("Hide ({})", t.timer().formatted()),
                                None => "Timer".to_string(),
                            };
                            if ui.small_button(caption).clicked() {
                                toggled.push(key);
                            }
                            ui.end_row();
                        }
                    });

                for set_idx in 0..exercise.sets().len() {
                    let key = TimerKey::new(exercise.name(), set_idx);
                    if let Some(timer) = self.timers.get_mut(&key) {
                        timer_widget(ui, &key, timer, now);
                    }
                }
            });
        }

        for key in toggled {
            self.timers.toggle(key);
        }
        for (ex_idx, set_idx, edit) in edits {
            // Rejections are logged by the editor.
            let _ = editor.update_set(day_index, ex_idx, set_idx, edit);
        }
    }
}

fn timer_widget(ui: &mut egui::Ui, key: &TimerKey, timer: &mut ScheduledTimer, now: Instant) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(format!("Timer - {} (Set {})", key.exercise, key.set_index + 1));
            for preset in ALL_PRESETS {
                let selected = timer.timer().preset() == preset;
                if ui
                    .selectable_label(selected, format!("{}m", preset.minutes()))
                    .clicked()
                {
                    timer.select_preset(preset);
                }
            }
        });
        ui.horizontal(|ui| {
            let display = timer.timer().display();
            let mut text = RichText::new(timer.timer().formatted())
                .monospace()
                .size(24.0)
                .strong();
            text = match display {
                TimerDisplay::Normal => text,
                TimerDisplay::Warning => text.color(Color32::from_rgb(220, 38, 38)),
                TimerDisplay::Expired => text.color(Color32::from_rgb(185, 28, 28)),
            };
            ui.label(text);
            let play = if timer.timer().is_running() { "\u{23F8}" } else { "\u{25B6}" };
            if ui.button(play).clicked() {
                timer.toggle(now);
            }
            if ui.button("\u{21BA}").clicked() {
                timer.reset();
            }
        });
        let total = timer.timer().preset().seconds() as f32;
        let left = timer.timer().remaining_seconds() as f32;
        ui.add(egui::ProgressBar::new(left / total).desired_width(200.0));
        if timer.timer().display() == TimerDisplay::Expired {
            ui.label(RichText::new("\u{23F0} Rest is over!").color(Color32::from_rgb(220, 38, 38)));
        }
    });
}
