use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::egui;
use tokio::runtime::Runtime;
use tracing::info;

use crate::api::{HttpTransport, Transport};
use crate::config::Config;
use crate::models::{filter_records, RecordRow};
use crate::records::RecordView;
use crate::session::{self, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Screen {
    Login,
    Records,
}

#[derive(Debug, Clone, PartialEq)]
enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated,
    Rejected(String),
}

enum RowAction {
    Toggle(i64),
    Delete(i64),
}

pub struct MacRegApp {
    runtime: Runtime,
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    view: RecordView,
    auth: Arc<Mutex<AuthPhase>>,
    screen: Screen,
    alert: Option<String>,
    user_name: String,
    password: String,
    mac_input: String,
    description_input: String,
    filter_text: String,
}

impl MacRegApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: &Config, runtime: Runtime) -> Self {
        let store = Arc::new(TokenStore::new(&config.token_path));
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(&config.base_url, Arc::clone(&store)));
        let view = RecordView::new(Arc::clone(&transport));

        let app = Self {
            runtime,
            transport,
            store,
            view,
            auth: Arc::new(Mutex::new(AuthPhase::Anonymous)),
            screen: Screen::Login,
            alert: None,
            user_name: String::new(),
            password: String::new(),
            mac_input: String::new(),
            description_input: String::new(),
            filter_text: String::new(),
        };

        app.start_auto_login();
        app
    }

    fn start_auto_login(&self) {
        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        let auth = Arc::clone(&self.auth);
        let view = self.view.clone();

        *auth.lock().unwrap() = AuthPhase::Authenticating;
        self.runtime.spawn(async move {
            if session::auto_login(transport.as_ref(), &store).await {
                *auth.lock().unwrap() = AuthPhase::Authenticated;
                view.load().await;
            } else {
                // Expected for first-time users; no alert.
                *auth.lock().unwrap() = AuthPhase::Anonymous;
            }
        });
    }

    fn start_login(&self) {
        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        let auth = Arc::clone(&self.auth);
        let view = self.view.clone();
        let user_name = self.user_name.trim().to_string();
        let passwd = self.password.clone();

        *auth.lock().unwrap() = AuthPhase::Authenticating;
        self.runtime.spawn(async move {
            match session::login(transport.as_ref(), &store, &user_name, &passwd).await {
                Ok(()) => {
                    *auth.lock().unwrap() = AuthPhase::Authenticated;
                    view.load().await;
                }
                Err(e) => {
                    *auth.lock().unwrap() = AuthPhase::Rejected(e.to_string());
                }
            }
        });
    }

    fn start_submit(&self) {
        let view = self.view.clone();
        let mac_address = self.mac_input.clone();
        let description = self.description_input.clone();
        self.runtime.spawn(async move {
            view.submit(&mac_address, &description).await;
        });
    }

    fn refresh(&self) {
        let view = self.view.clone();
        self.runtime.spawn(async move {
            view.load().await;
        });
    }

    fn dispatch(&self, action: RowAction) {
        let view = self.view.clone();
        match action {
            RowAction::Toggle(id) => {
                self.runtime.spawn(async move {
                    view.toggle(id).await;
                });
            }
            RowAction::Delete(id) => {
                self.runtime.spawn(async move {
                    view.delete(id).await;
                });
            }
        }
    }

    fn do_logout(&mut self) {
        session::logout(&self.store);
        self.view.records.lock().unwrap().clear();
        *self.auth.lock().unwrap() = AuthPhase::Anonymous;
        self.screen = Screen::Login;
        self.password.clear();
    }

    // Folds background task results into the UI state once per frame.
    fn poll_background(&mut self) {
        let phase = self.auth.lock().unwrap().clone();
        match phase {
            AuthPhase::Authenticated if self.screen == Screen::Login => {
                self.screen = Screen::Records;
                self.password.clear();
            }
            AuthPhase::Rejected(message) => {
                self.alert = Some(message);
                *self.auth.lock().unwrap() = AuthPhase::Anonymous;
            }
            _ => {}
        }

        if let Some(message) = self.view.alert.lock().unwrap().take() {
            self.alert = Some(message);
        }

        {
            let mut clear_form = self.view.clear_form.lock().unwrap();
            if *clear_form {
                *clear_form = false;
                self.mac_input.clear();
                self.description_input.clear();
            }
        }

        let was_expired = {
            let mut expired = self.view.expired.lock().unwrap();
            std::mem::replace(&mut *expired, false)
        };
        if was_expired {
            info!("session expired, returning to login");
            self.view.records.lock().unwrap().clear();
            *self.auth.lock().unwrap() = AuthPhase::Anonymous;
            self.screen = Screen::Login;
        }
    }

    fn render_login(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(80.0);
            ui.vertical_centered(|ui| {
                ui.heading("🖧 MAC Address Registration");
                ui.label("Sign in to manage your registered devices");
                ui.add_space(20.0);

                egui::Frame::none()
                    .fill(egui::Color32::from_rgb(245, 245, 245))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(200, 200, 200)))
                    .inner_margin(20.0)
                    .show(ui, |ui| {
                        ui.set_width(320.0);

                        egui::Grid::new("login_form")
                            .num_columns(2)
                            .spacing([10.0, 8.0])
                            .show(ui, |ui| {
                                ui.label("User name:");
                                ui.text_edit_singleline(&mut self.user_name);
                                ui.end_row();

                                ui.label("Password:");
                                ui.add(
                                    egui::TextEdit::singleline(&mut self.password).password(true),
                                );
                                ui.end_row();
                            });

                        ui.add_space(10.0);

                        let authenticating =
                            matches!(*self.auth.lock().unwrap(), AuthPhase::Authenticating);
                        let label = if authenticating {
                            "⏳ Signing in..."
                        } else {
                            "Sign in"
                        };
                        let button = egui::Button::new(
                            egui::RichText::new(label).color(egui::Color32::WHITE),
                        )
                        .fill(egui::Color32::from_rgb(0, 120, 215));
                        if ui.add_enabled(!authenticating, button).clicked() {
                            self.start_login();
                        }
                    });
            });
        });
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add_space(10.0);

            ui.heading("🖧 MAC Address Registration");
            ui.add_space(20.0);
            if !self.user_name.is_empty() {
                ui.label(format!("Signed in as {}", self.user_name));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.add_space(10.0);

                if ui.button("Log out").clicked() {
                    self.do_logout();
                }
                ui.add_space(5.0);

                let busy = *self.view.busy.lock().unwrap();
                let label = if busy { "⏳ Working..." } else { "🔄 Refresh" };
                if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                    self.refresh();
                }
            });
        });

        ui.add_space(5.0);
        ui.separator();
    }

    fn render_submit_form(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add_space(5.0);

            ui.label("MAC address:");
            ui.add(
                egui::TextEdit::singleline(&mut self.mac_input)
                    .desired_width(160.0)
                    .hint_text("AA:BB:CC:DD:EE:FF"),
            );
            ui.add_space(10.0);

            ui.label("Description:");
            ui.add(
                egui::TextEdit::singleline(&mut self.description_input)
                    .desired_width(260.0)
                    .hint_text("e.g. office laptop"),
            );
            ui.add_space(10.0);

            let busy = *self.view.busy.lock().unwrap();
            let button =
                egui::Button::new(egui::RichText::new("➕ Register").color(egui::Color32::WHITE))
                    .fill(egui::Color32::from_rgb(0, 120, 215));
            if ui.add_enabled(!busy, button).clicked() {
                self.start_submit();
            }
        });
    }

    fn render_filter(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add_space(5.0);

            ui.label("🔍 Filter:");
            ui.add(egui::TextEdit::singleline(&mut self.filter_text).desired_width(240.0));
            if !self.filter_text.is_empty() && ui.button("✖ Clear").clicked() {
                self.filter_text.clear();
            }
        });
    }

    fn render_record_table(&mut self, ui: &mut egui::Ui) {
        // Row models are rebuilt from the full fetched set every frame;
        // the filter never touches the source list.
        let rows: Vec<RecordRow> = {
            let records = self.view.records.lock().unwrap();
            filter_records(&records, &self.filter_text)
                .map(RecordRow::from_record)
                .collect()
        };

        ui.label(
            egui::RichText::new(format!("Registered MAC addresses ({})", rows.len()))
                .size(16.0)
                .strong(),
        );

        ui.add_space(5.0);

        // Table header
        egui::Frame::none()
            .fill(egui::Color32::from_rgb(245, 245, 245))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.add_space(10.0);
                    for (title, width) in [
                        ("Registered", 150.0),
                        ("User", 100.0),
                        ("MAC Address", 150.0),
                        ("Description", 220.0),
                        ("IPv4 Address", 120.0),
                        ("Actions", 160.0),
                    ] {
                        ui.add_sized(
                            [width, 18.0],
                            egui::Label::new(egui::RichText::new(title).strong().size(12.0)),
                        );
                    }
                });
            });

        ui.separator();

        let mut action = None;

        egui::ScrollArea::vertical().show(ui, |ui| {
            for (idx, row) in rows.iter().enumerate() {
                let bg_color = if idx % 2 == 0 {
                    egui::Color32::from_rgb(255, 255, 255)
                } else {
                    egui::Color32::from_rgb(250, 250, 250)
                };

                egui::Frame::none().fill(bg_color).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.add_space(10.0);

                        for (text, width) in [
                            (row.timestamp.as_str(), 150.0),
                            (row.user_name.as_str(), 100.0),
                            (row.mac_address.as_str(), 150.0),
                            (row.description.as_str(), 220.0),
                            (row.ipv4address.as_str(), 120.0),
                        ] {
                            ui.add_sized(
                                [width, 18.0],
                                egui::Label::new(egui::RichText::new(text).size(12.0)),
                            );
                        }

                        // Assigned IP means enabled, so the control
                        // offers the opposite state.
                        let toggle_fill = if row.enabled {
                            egui::Color32::from_rgb(200, 50, 50)
                        } else {
                            egui::Color32::from_rgb(50, 150, 50)
                        };
                        let toggle = egui::Button::new(
                            egui::RichText::new(row.toggle_label())
                                .color(egui::Color32::WHITE)
                                .size(12.0),
                        )
                        .fill(toggle_fill);
                        if ui.add_sized([70.0, 22.0], toggle).clicked() {
                            action = Some(RowAction::Toggle(row.id));
                        }

                        let delete = egui::Button::new(
                            egui::RichText::new("✖ Delete")
                                .color(egui::Color32::WHITE)
                                .size(12.0),
                        )
                        .fill(egui::Color32::from_rgb(120, 120, 120));
                        if ui.add_sized([70.0, 22.0], delete).clicked() {
                            action = Some(RowAction::Delete(row.id));
                        }
                    });
                });

                ui.add_space(2.0);
            }
        });

        if let Some(action) = action {
            self.dispatch(action);
        }
    }

    fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else {
            return;
        };

        egui::Window::new("⚠ Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.alert = None;
                }
            });
    }
}

impl eframe::App for MacRegApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background();

        match self.screen {
            Screen::Login => self.render_login(ctx),
            Screen::Records => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.add_space(10.0);

                    self.render_header(ui);
                    ui.add_space(15.0);

                    self.render_submit_form(ui);
                    ui.add_space(10.0);

                    self.render_filter(ui);
                    ui.add_space(10.0);

                    ui.separator();
                    ui.add_space(10.0);

                    self.render_record_table(ui);
                });
            }
        }

        self.render_alert(ctx);

        // Background completions should show up without user input
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
