//! Application shell: persistent settings, sign-in and role routing.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

mod auth;
use auth::{Route, User, load_user};
mod backend;
use backend::{BackendConfig, BackendError, DataAccess, RestClient, resolve_backend};
mod dashboard;
use dashboard::{AdminDashboard, ClientDashboard, LoginForm, ViewEvent};
mod demo;
mod export;
mod plan;
mod progress;
use progress::WeightUnit;
mod records;
mod report;
mod rest_timer;
use rest_timer::{ALL_PRESETS, RestPreset};
mod volume;
mod weekly_view;

/// User preferences persisted between runs.
///
/// Every field carries `#[serde(default)]` so files written by older
/// versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    #[serde(default)]
    backend_url: Option<String>,
    #[serde(default)]
    anon_key: Option<String>,
    #[serde(default)]
    remembered_email: Option<String>,
    #[serde(default)]
    rest_preset: RestPreset,
    #[serde(default = "default_week")]
    last_week: u32,
    #[serde(default)]
    weight_unit: WeightUnit,
}

fn default_week() -> u32 {
    1
}

impl Settings {
    const FILE: &'static str = "trainer_desk_settings.json";

    fn path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring unreadable settings file: {e}"),
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(data) = serde_json::to_string_pretty(self) {
                if let Err(e) = std::fs::write(&path, data) {
                    log::error!("Failed to save settings: {e}");
                }
            }
        }
    }

    fn backend(&self) -> Option<BackendConfig> {
        resolve_backend(self.backend_url.as_deref(), self.anon_key.as_deref())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            remembered_email: None,
            rest_preset: RestPreset::default(),
            last_week: default_week(),
            weight_unit: WeightUnit::default(),
        }
    }
}

enum Screen {
    Login,
    Client(Box<ClientDashboard>),
    Admin(Box<AdminDashboard>),
}

struct TrainerApp {
    settings: Settings,
    settings_dirty: bool,
    show_settings: bool,
    /// `None` when running against the bundled demo data.
    backend: Option<BackendConfig>,
    store: Box<dyn DataAccess>,
    screen: Screen,
    login: LoginForm,
    toast: Option<(String, Instant)>,
}

fn connect(backend: Option<&BackendConfig>) -> Box<dyn DataAccess> {
    match backend {
        Some(cfg) => {
            log::info!("Using backend at {}", cfg.url);
            Box::new(RestClient::new(cfg.clone()))
        }
        None => {
            log::info!("No backend configured, using demo data");
            Box::new(demo::demo_store())
        }
    }
}

fn sign_in_message(err: &BackendError) -> String {
    match err {
        BackendError::Unauthorized(_) | BackendError::Status(400, _) => {
            "Invalid email or password".into()
        }
        BackendError::Forbidden(_) => "This account is not allowed to sign in".into(),
        _ => "Could not reach the server".into(),
    }
}

impl TrainerApp {
    fn new(settings: Settings) -> Self {
        let backend = settings.backend();
        let store = connect(backend.as_ref());
        let login = LoginForm {
            email: settings.remembered_email.clone().unwrap_or_default(),
            ..LoginForm::default()
        };
        Self {
            settings,
            settings_dirty: false,
            show_settings: false,
            backend,
            store,
            screen: Screen::Login,
            login,
            toast: None,
        }
    }

    fn toast(&mut self, message: impl Into<String>) {
        self.toast = Some((message.into(), Instant::now()));
    }

    /// Pick up backend changes made in the settings window while signed out.
    fn refresh_connection(&mut self) {
        let backend = self.settings.backend();
        if backend != self.backend {
            self.store = connect(backend.as_ref());
            self.backend = backend;
        }
    }

    fn authenticate(&mut self, email: &str, password: &str) -> Result<User, String> {
        match self.backend.clone() {
            Some(cfg) => {
                let client = RestClient::new(cfg);
                let session = client.sign_in(email, password).map_err(|e| {
                    log::warn!("Sign in failed: {e}");
                    sign_in_message(&e)
                })?;
                let client = client.with_session(&session);
                let user = load_user(&client, &session).map_err(|e| {
                    log::error!("Failed to load profile: {e}");
                    sign_in_message(&e)
                })?;
                self.store = Box::new(client);
                Ok(user)
            }
            None => demo::sign_in(email, password)
                .ok_or_else(|| "Invalid email or password".to_string()),
        }
    }

    fn sign_in(&mut self) {
        self.refresh_connection();
        let email = self.login.email.trim().to_string();
        let password = std::mem::take(&mut self.login.password);
        match self.authenticate(&email, &password) {
            Ok(user) => {
                log::info!("Signed in as {} ({:?})", user.email, user.role);
                self.login.error = None;
                self.settings.remembered_email = Some(email);
                self.settings_dirty = true;
                self.open_dashboard(user);
            }
            Err(message) => self.login.error = Some(message),
        }
    }

    fn open_dashboard(&mut self, user: User) {
        self.screen = match Route::for_user(Some(&user)) {
            Route::AdminDashboard => {
                Screen::Admin(Box::new(AdminDashboard::load(self.store.as_ref(), user)))
            }
            Route::ClientDashboard => Screen::Client(Box::new(ClientDashboard::load(
                self.store.as_ref(),
                user,
                self.settings.last_week,
                self.settings.rest_preset,
                self.settings.weight_unit,
            ))),
            Route::Login => Screen::Login,
        };
    }

    fn sign_out(&mut self) {
        log::info!("Signed out");
        self.screen = Screen::Login;
        if let Some(cfg) = &self.backend {
            self.store = Box::new(RestClient::new(cfg.clone()));
        }
        self.refresh_connection();
        self.toast("Signed out");
    }

    fn handle_events(&mut self, events: Vec<ViewEvent>) {
        for event in events {
            match event {
                ViewEvent::Toast(msg) => self.toast(msg),
                ViewEvent::WeekChanged(week) => {
                    self.settings.last_week = week;
                    self.settings_dirty = true;
                }
                ViewEvent::SignOut => self.sign_out(),
            }
        }
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        let mut changed = false;
        egui::Window::new("Settings").open(&mut open).show(ctx, |ui| {
            ui.heading("Backend");
            let mut url = self.settings.backend_url.clone().unwrap_or_default();
            ui.horizontal(|ui| {
                ui.label("URL");
                changed |= ui.text_edit_singleline(&mut url).changed();
            });
            let mut key = self.settings.anon_key.clone().unwrap_or_default();
            ui.horizontal(|ui| {
                ui.label("Anon key");
                changed |= ui
                    .add(egui::TextEdit::singleline(&mut key).password(true))
                    .changed();
            });
            self.settings.backend_url = Some(url).filter(|s| !s.trim().is_empty());
            self.settings.anon_key = Some(key).filter(|s| !s.trim().is_empty());
            ui.label(
                egui::RichText::new("Leave empty to use the demo data. Applies at next sign in.")
                    .weak(),
            );
            ui.separator();
            ui.heading("Workout");
            egui::ComboBox::from_label("Default rest")
                .selected_text(format!("{} min", self.settings.rest_preset.minutes()))
                .show_ui(ui, |ui| {
                    for preset in ALL_PRESETS {
                        changed |= ui
                            .selectable_value(
                                &mut self.settings.rest_preset,
                                preset,
                                format!("{} min", preset.minutes()),
                            )
                            .changed();
                    }
                });
            ui.horizontal(|ui| {
                ui.label("Weight unit");
                changed |= ui
                    .radio_value(&mut self.settings.weight_unit, WeightUnit::Kg, "kg")
                    .changed();
                changed |= ui
                    .radio_value(&mut self.settings.weight_unit, WeightUnit::Lbs, "lbs")
                    .changed();
            });
        });
        self.show_settings = open;
        if changed {
            self.settings_dirty = true;
            if let Screen::Client(view) = &mut self.screen {
                view.set_unit(self.settings.weight_unit);
            }
        }
    }

    fn ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Settings").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                if self.backend.is_none() {
                    ui.label(egui::RichText::new("Demo mode").weak());
                }
            });
        });

        let store = self.store.as_ref();
        let mut events = Vec::new();
        let mut submit = false;
        let offline = self.backend.is_none();
        egui::CentralPanel::default().show(ctx, |ui| match &mut self.screen {
            Screen::Login => submit = self.login.show(ui, offline),
            Screen::Client(view) => events = view.show(ui, store),
            Screen::Admin(view) => events = view.show(ui, store),
        });
        if submit {
            self.sign_in();
        }
        self.handle_events(events);

        if self.show_settings {
            self.settings_window(ctx);
        }

        if self
            .toast
            .as_ref()
            .is_some_and(|(_, start)| start.elapsed() >= Duration::from_secs(3))
        {
            self.toast = None;
        }
        if let Some((message, _)) = &self.toast {
            egui::Area::new(egui::Id::new("toast"))
                .anchor(egui::Align2::RIGHT_TOP, [-10.0, 30.0])
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(message.as_str());
                    });
                });
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }
}

impl App for TrainerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.ui(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Screen::Client(view) = &self.screen {
            self.settings.last_week = view.week_number();
        }
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions::default();
    let app = TrainerApp::new(Settings::load());
    eframe::run_native(
        "Trainer Desk",
        options,
        Box::new(|_cc| Box::new(app)),
    )
}
