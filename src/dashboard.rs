//! Login form and the two role dashboards.

use crate::auth::User;
use crate::backend::DataAccess;
use crate::export::{load_plan_json, save_plan_csv, save_plan_json};
use crate::plan::{WeeklyPlan, WeeklyPlanEditor, load_week};
use crate::progress::{
    WeightUnit, calorie_progress, goal_progress, group_meals, plan_calories, weight_summary,
};
use crate::records::{
    Client, MealPlan, Post, WeightEntry, list_clients, list_posts, list_weight_history,
    meal_plan_for, record_weight, update_client_sessions,
};
use crate::report::export_html_report;
use crate::rest_timer::RestPreset;
use crate::weekly_view::{WeeklyView, trend_colors};
use chrono::{Datelike, Local, NaiveDate};
use eframe::egui;
use egui::RichText;
use egui_extras::DatePickerButton;
use egui_plot::{Line, Plot, PlotPoints};
use rfd::FileDialog;
use std::path::PathBuf;

/// Something the app shell should react to after a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Toast(String),
    WeekChanged(u32),
    SignOut,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub error: Option<String>,
}

impl LoginForm {
    /// Returns `true` when the user asked to sign in.
    pub fn show(&mut self, ui: &mut egui::Ui, offline: bool) -> bool {
        let mut submit = false;
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("Sign in");
            if offline {
                ui.label(RichText::new("Offline demo: admin@fitness.com / admin123").weak());
            }
            egui::Grid::new("login_grid").num_columns(2).show(ui, |ui| {
                ui.label("Email");
                ui.text_edit_singleline(&mut self.email);
                ui.end_row();
                ui.label("Password");
                let resp = ui.add(egui::TextEdit::singleline(&mut self.password).password(true));
                if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                }
                ui.end_row();
            });
            if ui.button("Sign in").clicked() {
                submit = true;
            }
            if let Some(err) = &self.error {
                ui.colored_label(egui::Color32::RED, err.as_str());
            }
        });
        submit
    }
}

/// Navigation held back while the week has unsaved edits.
#[derive(Debug, Clone, PartialEq)]
enum PendingAction {
    LoadWeek(u32),
    OpenFile(PathBuf),
    SignOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnsavedChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientTab {
    Workout,
    Meals,
    Progress,
}

pub struct ClientDashboard {
    user: User,
    tab: ClientTab,
    editor: WeeklyPlanEditor,
    has_week: bool,
    weekly: WeeklyView,
    weights: Vec<WeightEntry>,
    target_weight: Option<f64>,
    meal_plan: Option<MealPlan>,
    calories_eaten: f64,
    unit: WeightUnit,
    /// Entry field, in `unit`.
    new_weight: f64,
    new_weight_date: NaiveDate,
    pending: Option<PendingAction>,
}

impl ClientDashboard {
    pub fn load(
        store: &dyn DataAccess,
        user: User,
        week: u32,
        preset: RestPreset,
        unit: WeightUnit,
    ) -> Self {
        let mut view = Self {
            tab: ClientTab::Workout,
            editor: WeeklyPlanEditor::new(WeeklyPlan::new(week, "")),
            has_week: false,
            weekly: WeeklyView::new(preset),
            weights: Vec::new(),
            target_weight: None,
            meal_plan: None,
            calories_eaten: 0.0,
            unit,
            new_weight: 0.0,
            new_weight_date: Local::now().date_naive(),
            pending: None,
            user,
        };
        view.load_week(store, week);
        view.reload_progress(store);
        view
    }

    fn load_week(&mut self, store: &dyn DataAccess, week: u32) {
        self.weekly.hide_timers();
        match load_week(store, &self.user.id, week) {
            Ok(Some(plan)) => {
                self.editor.replace(plan);
                self.has_week = true;
            }
            Ok(None) => {
                self.editor.replace(WeeklyPlan::new(week, ""));
                self.has_week = false;
            }
            Err(e) => {
                log::error!("Failed to load week {week}: {e}");
                self.editor.replace(WeeklyPlan::new(week, ""));
                self.has_week = false;
            }
        }
    }

    fn reload_progress(&mut self, store: &dyn DataAccess) {
        match list_weight_history(store, &self.user.id) {
            Ok(w) => self.weights = w,
            Err(e) => log::error!("Failed to load weight history: {e}"),
        }
        if let Some(last) = self.weights.last() {
            self.new_weight = self.unit.from_kg(last.weight_kg);
        }
        match list_clients(store) {
            Ok(clients) => {
                self.target_weight = clients
                    .into_iter()
                    .find(|c| c.id == self.user.id)
                    .and_then(|c| c.target_weight);
            }
            Err(e) => log::warn!("Failed to load client profile: {e}"),
        }
        match meal_plan_for(store, &self.user.id, Local::now().date_naive()) {
            Ok(plan) => self.meal_plan = plan,
            Err(e) => log::error!("Failed to load meal plan: {e}"),
        }
    }

    /// Run `action` now, or hold it until the user decides what happens to
    /// unsaved edits.
    fn request(&mut self, action: PendingAction, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) {
        if self.editor.is_dirty() {
            log::info!("Holding {action:?} until unsaved edits are resolved");
            self.pending = Some(action);
        } else {
            self.perform(action, store, events);
        }
    }

    fn perform(&mut self, action: PendingAction, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) {
        match action {
            PendingAction::LoadWeek(week) => {
                self.load_week(store, week);
                events.push(ViewEvent::WeekChanged(week));
            }
            PendingAction::OpenFile(path) => match load_plan_json(&path) {
                Ok(plan) => {
                    self.weekly.hide_timers();
                    self.editor.replace(plan);
                    self.has_week = true;
                }
                Err(e) => {
                    log::error!("Failed to open {}: {e}", path.display());
                    events.push(ViewEvent::Toast("Could not open that file".into()));
                }
            },
            PendingAction::SignOut => events.push(ViewEvent::SignOut),
        }
    }

    fn resolve_pending(&mut self, choice: UnsavedChoice, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) {
        let Some(action) = self.pending.take() else {
            return;
        };
        match choice {
            UnsavedChoice::Cancel => {}
            UnsavedChoice::Discard => self.perform(action, store, events),
            UnsavedChoice::Save => {
                if self.save_week(store, events) {
                    self.perform(action, store, events);
                } else {
                    self.pending = Some(action);
                }
            }
        }
    }

    fn save_week(&mut self, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) -> bool {
        match self.editor.save(store, &self.user.id) {
            Ok(n) => {
                events.push(ViewEvent::Toast(format!("Saved {n} sets")));
                true
            }
            Err(e) => {
                log::error!("Failed to save week: {e}");
                events.push(ViewEvent::Toast("Could not save the week".into()));
                false
            }
        }
    }

    fn unsaved_prompt(&mut self, ctx: &egui::Context, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) {
        if self.pending.is_none() {
            return;
        }
        let week = self.week_number();
        let mut choice = None;
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!("Week {week} has edits that are not saved yet."));
                ui.horizontal(|ui| {
                    if ui.button("Save and continue").clicked() {
                        choice = Some(UnsavedChoice::Save);
                    }
                    if ui.button("Discard").clicked() {
                        choice = Some(UnsavedChoice::Discard);
                    }
                    if ui.button("Cancel").clicked() {
                        choice = Some(UnsavedChoice::Cancel);
                    }
                });
            });
        if let Some(choice) = choice {
            self.resolve_pending(choice, store, events);
        }
    }

    pub fn week_number(&self) -> u32 {
        self.editor.plan().week_number
    }

    pub fn set_unit(&mut self, unit: WeightUnit) {
        if unit != self.unit {
            self.new_weight = unit.from_kg(self.unit.to_kg(self.new_weight));
            self.unit = unit;
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, store: &dyn DataAccess) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        ui.horizontal(|ui| {
            ui.heading(format!("Welcome, {}", self.user.name));
            if ui.button("Sign out").clicked() {
                self.request(PendingAction::SignOut, store, &mut events);
            }
        });
        self.overview(ui);
        ui.separator();
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, ClientTab::Workout, "Workout");
            ui.selectable_value(&mut self.tab, ClientTab::Meals, "Meal Plan");
            ui.selectable_value(&mut self.tab, ClientTab::Progress, "Progress");
        });
        if self.tab != ClientTab::Workout {
            self.weekly.hide_timers();
        }
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| match self.tab {
            ClientTab::Workout => self.workout_tab(ui, store, &mut events),
            ClientTab::Meals => self.meals_tab(ui),
            ClientTab::Progress => self.progress_tab(ui, store, &mut events),
        });
        self.unsaved_prompt(ui.ctx(), store, &mut events);
        events
    }

    fn overview(&self, ui: &mut egui::Ui) {
        let summary = weight_summary(&self.weights);
        let plan = self.editor.plan();
        ui.columns(3, |cols| {
            cols[0].label("Current weight");
            cols[0].strong(
                summary
                    .current_weight
                    .map(|w| self.unit.format(w))
                    .unwrap_or_else(|| "-".into()),
            );
            if let Some(change) = summary.change {
                let mut text = RichText::new(format!(
                    "{:+.1} {} since start",
                    self.unit.from_kg(change),
                    self.unit.suffix()
                ));
                if let Some((fg, _)) = trend_colors(summary.trend()) {
                    text = text.color(fg);
                }
                cols[0].label(text);
            }
            cols[1].label("This week");
            cols[1].strong(format!("{} training days", plan.training_days()));
            let trend = plan.volume_trend();
            let mut volume = RichText::new(format!(
                "{:.0} kg total volume {}",
                plan.total_volume(),
                trend.symbol()
            ));
            if let Some((fg, _)) = trend_colors(trend) {
                volume = volume.color(fg);
            }
            cols[1].label(volume);
            cols[2].label("Calories today");
            match &self.meal_plan {
                Some(mp) => {
                    cols[2].strong(format!(
                        "{:.0} / {:.0} cal",
                        self.calories_eaten,
                        plan_calories(mp)
                    ));
                }
                None => {
                    cols[2].strong("No meal plan");
                }
            }
        });
    }

    fn workout_tab(&mut self, ui: &mut egui::Ui, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) {
        let week = self.editor.plan().week_number;
        ui.horizontal(|ui| {
            if ui
                .add_enabled(week > 1, egui::Button::new("\u{25C0} Previous week"))
                .clicked()
            {
                self.request(PendingAction::LoadWeek(week - 1), store, events);
            }
            if ui.button("Next week \u{25B6}").clicked() {
                self.request(PendingAction::LoadWeek(week + 1), store, events);
            }
            ui.separator();
            let label = if self.editor.is_dirty() { "Save week *" } else { "Save week" };
            if ui.add_enabled(self.has_week, egui::Button::new(label)).clicked() {
                self.save_week(store, events);
            }
            if ui.button("Open JSON").clicked() {
                if let Some(path) = FileDialog::new().add_filter("JSON", &["json"]).pick_file() {
                    self.request(PendingAction::OpenFile(path), store, events);
                }
            }
            ui.menu_button("Export", |ui| {
                if ui.button("CSV").clicked() {
                    if let Some(path) = FileDialog::new().add_filter("CSV", &["csv"]).save_file() {
                        if let Err(e) = save_plan_csv(&path, self.editor.plan()) {
                            log::error!("Failed to export week: {e}");
                        }
                    }
                    ui.close_menu();
                }
                if ui.button("JSON").clicked() {
                    if let Some(path) = FileDialog::new().add_filter("JSON", &["json"]).save_file() {
                        if let Err(e) = save_plan_json(&path, self.editor.plan()) {
                            log::error!("Failed to export week: {e}");
                        }
                    }
                    ui.close_menu();
                }
                if ui.button("HTML report").clicked() {
                    if let Some(path) = FileDialog::new().add_filter("HTML", &["html"]).save_file() {
                        match export_html_report(&path, self.editor.plan()) {
                            Ok(()) => {
                                if let Err(e) = open::that(&path) {
                                    log::warn!("Failed to open report: {e}");
                                }
                            }
                            Err(e) => log::error!("Failed to write report: {e}"),
                        }
                    }
                    ui.close_menu();
                }
            });
        });
        ui.separator();
        if self.has_week {
            self.weekly.show(ui, &mut self.editor);
        } else {
            ui.label(format!("No workout assigned for week {week} yet."));
        }
    }

    fn meals_tab(&mut self, ui: &mut egui::Ui) {
        let Some(plan) = &self.meal_plan else {
            ui.label("Your trainer has not set a meal plan for today.");
            return;
        };
        let target = plan_calories(plan);
        ui.heading(format!("Today's meal plan ({target:.0} calories)"));
        for group in group_meals(plan) {
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.strong(capitalize(&group.meal_type));
                    ui.label(format!("{:.0} cal", group.calories));
                });
                ui.label(group.foods.join(" \u{2022} "));
            });
        }
        if let Some(notes) = &plan.notes {
            ui.label(RichText::new(notes).italics());
        }
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Eaten today");
            ui.add(
                egui::DragValue::new(&mut self.calories_eaten)
                    .speed(10.0)
                    .clamp_range(0.0..=10_000.0)
                    .suffix(" cal"),
            );
        });
        let pct = calorie_progress(self.calories_eaten, target);
        ui.add(egui::ProgressBar::new((pct / 100.0) as f32).text(format!("{pct:.0}%")));
    }

    fn progress_tab(&mut self, ui: &mut egui::Ui, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) {
        ui.heading("Weight tracking");
        let points: Vec<[f64; 2]> = self
            .weights
            .iter()
            .map(|e| {
                [
                    e.recorded_date.num_days_from_ce() as f64,
                    self.unit.from_kg(e.weight_kg),
                ]
            })
            .collect();
        Plot::new("weight_plot").height(200.0).show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(points))
                    .name(format!("Weight ({})", self.unit.suffix())),
            );
        });
        egui::Grid::new("weight_history").striped(true).show(ui, |ui| {
            for e in self.weights.iter().rev() {
                ui.label(e.recorded_date.format("%d/%m").to_string());
                ui.label(self.unit.format(e.weight_kg));
                ui.end_row();
            }
        });
        ui.horizontal(|ui| {
            ui.add(DatePickerButton::new(&mut self.new_weight_date).id_source("weight_date"));
            ui.add(
                egui::DragValue::new(&mut self.new_weight)
                    .speed(0.1)
                    .clamp_range(0.0..=900.0)
                    .suffix(format!(" {}", self.unit.suffix())),
            );
            if ui.button("Record weight").clicked() {
                let entry = WeightEntry {
                    recorded_date: self.new_weight_date,
                    weight_kg: self.unit.to_kg(self.new_weight),
                    body_fat_percentage: None,
                    notes: None,
                };
                match record_weight(store, &self.user.id, &entry) {
                    Ok(()) => {
                        events.push(ViewEvent::Toast("Weight recorded".into()));
                        self.reload_progress(store);
                    }
                    Err(e) => {
                        log::error!("Failed to record weight: {e}");
                        events.push(ViewEvent::Toast("Could not record weight".into()));
                    }
                }
            }
        });

        ui.separator();
        ui.heading("Goals");
        let summary = weight_summary(&self.weights);
        match (summary.start_weight, summary.current_weight, self.target_weight) {
            (Some(start), Some(current), Some(target)) => {
                let pct = goal_progress(start, current, target);
                ui.label(format!("Reach {}", self.unit.format(target)));
                ui.add(egui::ProgressBar::new((pct / 100.0) as f32).text(format!("{pct:.0}%")));
            }
            _ => {
                ui.label("No weight goal set.");
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Height and current/target weight, e.g. `170 cm, 70.0 -> 68.0 kg`.
fn body_summary(c: &Client) -> String {
    let kg = |w: Option<f64>| w.map_or_else(|| "-".to_string(), |w| format!("{w:.1}"));
    let weights = format!("{} -> {} kg", kg(c.weight), kg(c.target_weight));
    match c.height {
        Some(h) => format!("{h:.0} cm, {weights}"),
        None => weights,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminTab {
    Clients,
    Posts,
}

pub struct AdminDashboard {
    user: User,
    tab: AdminTab,
    clients: Vec<Client>,
    /// Edited session totals, parallel to `clients`.
    session_edits: Vec<u32>,
    posts: Vec<Post>,
    filter: String,
}

impl AdminDashboard {
    pub fn load(store: &dyn DataAccess, user: User) -> Self {
        let mut view = Self {
            user,
            tab: AdminTab::Clients,
            clients: Vec::new(),
            session_edits: Vec::new(),
            posts: Vec::new(),
            filter: String::new(),
        };
        view.reload(store);
        view
    }

    fn reload(&mut self, store: &dyn DataAccess) {
        match list_clients(store) {
            Ok(mut clients) => {
                clients.sort_by(|a, b| a.name.cmp(&b.name));
                self.session_edits = clients.iter().map(|c| c.total_sessions).collect();
                self.clients = clients;
            }
            Err(e) => log::error!("Failed to load clients: {e}"),
        }
        match list_posts(store) {
            Ok(posts) => self.posts = posts,
            Err(e) => log::error!("Failed to load posts: {e}"),
        }
    }

    /// Clients whose name or email contains the filter text.
    fn visible_clients(&self) -> Vec<usize> {
        let needle = self.filter.to_lowercase();
        self.clients
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                needle.is_empty()
                    || c.name.to_lowercase().contains(&needle)
                    || c.email.to_lowercase().contains(&needle)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn show(&mut self, ui: &mut egui::Ui, store: &dyn DataAccess) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        ui.horizontal(|ui| {
            ui.heading(format!("Admin dashboard ({})", self.user.name));
            if ui.button("Refresh").clicked() {
                self.reload(store);
            }
            if ui.button("Sign out").clicked() {
                events.push(ViewEvent::SignOut);
            }
        });
        ui.horizontal(|ui| {
            ui.label(format!("Clients: {}", self.clients.len()));
            ui.separator();
            ui.label(format!("Posts: {}", self.posts.len()));
        });
        ui.separator();
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, AdminTab::Clients, "Clients");
            ui.selectable_value(&mut self.tab, AdminTab::Posts, "Posts");
        });
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| match self.tab {
            AdminTab::Clients => self.clients_tab(ui, store, &mut events),
            AdminTab::Posts => self.posts_tab(ui),
        });
        events
    }

    fn clients_tab(&mut self, ui: &mut egui::Ui, store: &dyn DataAccess, events: &mut Vec<ViewEvent>) {
        ui.horizontal(|ui| {
            ui.label("Search");
            ui.text_edit_singleline(&mut self.filter);
        });
        let mut saved: Option<usize> = None;
        let visible = self.visible_clients();
        egui::Grid::new("clients_grid").striped(true).show(ui, |ui| {
            let headers = [
                "Name", "Email", "Program", "Start", "Body", "Activity", "Per week", "Done", "Left",
                "Total sessions", "",
            ];
            for header in headers {
                ui.label(header);
            }
            ui.end_row();
            for i in visible {
                let c = &self.clients[i];
                ui.label(c.name.as_str());
                ui.label(c.email.as_str());
                ui.label(c.workout_plan.as_str());
                ui.label(c.start_date.as_str());
                ui.label(body_summary(c));
                ui.label(capitalize(&c.activity_level));
                ui.label(c.sessions_per_week.to_string());
                ui.label(format!("{}/{}", c.sessions_completed, c.total_sessions));
                ui.label(c.sessions_remaining().to_string());
                ui.add(egui::DragValue::new(&mut self.session_edits[i]).clamp_range(0..=500));
                let changed = self.session_edits[i] != c.total_sessions;
                if ui.add_enabled(changed, egui::Button::new("Save")).clicked() {
                    saved = Some(i);
                }
                ui.end_row();
            }
        });
        if let Some(i) = saved {
            let total = self.session_edits[i];
            match update_client_sessions(store, &self.clients[i].id, total) {
                Ok(()) => {
                    self.clients[i].total_sessions = total;
                    events.push(ViewEvent::Toast("Sessions updated".into()));
                }
                Err(e) => {
                    log::error!("Failed to update sessions: {e}");
                    events.push(ViewEvent::Toast("Could not update sessions".into()));
                }
            }
        }
    }

    fn posts_tab(&self, ui: &mut egui::Ui) {
        if self.posts.is_empty() {
            ui.label("No posts yet.");
        }
        for post in &self.posts {
            ui.push_id(&post.id, |ui| ui.group(|ui| {
                ui.strong(post.title.as_str());
                ui.label(
                    RichText::new(format!(
                        "{} \u{2022} {}",
                        post.author_name.as_deref().unwrap_or("Unknown"),
                        post.created_at.get(..10).unwrap_or(&post.created_at)
                    ))
                    .weak(),
                );
                if let Some(content) = &post.content {
                    ui.label(content.as_str());
                }
            }));
        }
    }
}
