use arc_swap::ArcSwapOption;
use clap::Parser;
use eframe::egui;
use egui::{Key, KeyboardShortcut, Modifiers};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing_subscriber::EnvFilter;

mod bindings;
mod commands;
mod config;
mod connection;
mod control_panel;
mod device;
mod device_worker;
mod error;
mod frequency;
mod hardware;
mod notifications;
mod window;
mod worker_interface;

use config::AppConfig;
use control_panel::ControlPanel;
use device::WorkerEvent;
use error::DeviceResult;
use notifications::NotificationManager;
use window::{CancelOutcome, ConnectOutcome, Session};
use worker_interface::ReceiverLink;

const EXIT_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Q);

#[derive(Default)]
struct ConnectDialog {
    hostname: String,
    focused: bool,
}

/// Connection attempt running on the runtime while the UI keeps drawing.
struct PendingConnection {
    address: String,
    result_rx: oneshot::Receiver<DeviceResult<ReceiverLink>>,
}

pub struct ReceiverApp {
    config: AppConfig,
    session: Session,
    control_panel: Option<ControlPanel>,
    dialog: Option<ConnectDialog>,
    pending: Option<PendingConnection>,
    notification_manager: NotificationManager,
    title: String,
    fatal: Arc<ArcSwapOption<String>>,
    exit_requested: bool,
}

impl ReceiverApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        fatal: Arc<ArcSwapOption<String>>,
    ) -> Self {
        let session = Session::new(config.model.profile());
        let title = session.title();
        let mut app = Self {
            config,
            session,
            control_panel: None,
            dialog: None,
            pending: None,
            notification_manager: NotificationManager::default(),
            title,
            fatal,
            exit_requested: false,
        };

        match app.config.address.clone() {
            Some(address) => app.open_device(address),
            None => app.open_device_dialog(),
        }
        app
    }

    fn open_device_dialog(&mut self) {
        if self.pending.is_none() {
            self.dialog = Some(ConnectDialog::default());
        }
    }

    fn open_device(&mut self, address: String) {
        if self.pending.is_some() {
            tracing::warn!("Connection attempt already running, ignoring {}", address);
            return;
        }

        let (result_tx, result_rx) = oneshot::channel();
        let port = self.config.port;
        let reset = self.config.reset;
        let target = address.clone();
        tokio::spawn(async move {
            let result = ReceiverLink::connect(&target, port, reset).await;
            // The window may have closed meanwhile
            let _ = result_tx.send(result);
        });

        self.notification_manager
            .add_info(format!("Connecting to {}", address));
        self.pending = Some(PendingConnection { address, result_rx });
    }

    fn poll_connection(&mut self) {
        let Some(pending) = &mut self.pending else {
            return;
        };

        let result = match pending.result_rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => {
                self.pending = None;
                self.fail(anyhow::anyhow!("connection task ended without a result"));
                return;
            }
        };
        self.pending = None;

        match self.session.resolve(result) {
            Ok(ConnectOutcome::Connected(address)) => {
                self.notification_manager
                    .add_success(format!("Connected to {}", address));
            }
            Ok(ConnectOutcome::FellBackToDemo(reason)) => {
                tracing::info!("Entering demo mode: {}", reason);
                self.notification_manager
                    .show_modal("Connection Error", self.session.demo_notice());
            }
            Err(e) => {
                self.fail(e.into());
                return;
            }
        }
        self.rebuild_panel();
    }

    fn cancel_dialog(&mut self) {
        self.dialog = None;
        if self.session.cancel_dialog() == CancelOutcome::ForcedDemo {
            self.notification_manager
                .show_modal("Connection Error", self.session.demo_notice());
        }
        self.rebuild_panel();
    }

    fn rebuild_panel(&mut self) {
        match self.session.build_panel() {
            Ok(panel) => self.control_panel = Some(panel),
            Err(e) => self.fail(e.into()),
        }
    }

    fn fail(&mut self, error: anyhow::Error) {
        tracing::error!("Fatal: {:#}", error);
        self.fatal.store(Some(Arc::new(format!("{:#}", error))));
        self.exit_requested = true;
    }

    fn poll_worker(&mut self) {
        let mut failure = None;
        if let Some(link) = self.session.link_mut() {
            while let Some(event) = link.poll_event() {
                match event {
                    WorkerEvent::Failed(message) => failure = Some(message),
                }
            }
        }
        if let Some(message) = failure {
            self.fail(anyhow::anyhow!(message));
        }

        if let Some(panel) = &mut self.control_panel {
            if let Err(e) = panel.poll_seeds() {
                self.fail(e.into());
            }
        }
    }

    fn sync_title(&mut self, ctx: &egui::Context) {
        let title = self.session.title();
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }

    fn dialog_ui(&mut self, ctx: &egui::Context) {
        // The connection-error notice goes first
        if self.notification_manager.modal().is_some() {
            return;
        }
        let Some(dialog) = &mut self.dialog else {
            return;
        };

        let mut submitted = false;
        let mut cancelled = false;
        egui::Window::new("Open Device")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Enter a hostname or IP address:");
                let response = ui.text_edit_singleline(&mut dialog.hostname);
                if !dialog.focused {
                    response.request_focus();
                    dialog.focused = true;
                }
                if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                    submitted = true;
                }
                ui.horizontal(|ui| {
                    submitted |= ui.button("OK").clicked();
                    cancelled |= ui.button("Cancel").clicked();
                });
            });
        cancelled |= ctx.input(|i| i.key_pressed(Key::Escape));

        if submitted {
            let hostname = dialog.hostname.clone();
            self.dialog = None;
            self.open_device(hostname);
        } else if cancelled {
            self.cancel_dialog();
        }
    }
}

impl eframe::App for ReceiverApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.notification_manager.update();
        self.poll_connection();
        self.poll_worker();
        self.sync_title(ctx);

        // Connection attempts and seed reads resolve off the UI thread
        ctx.request_repaint_after(Duration::from_millis(100));

        if ctx.input_mut(|i| i.consume_shortcut(&EXIT_SHORTCUT)) {
            self.exit_requested = true;
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Device").clicked() {
                        ui.close_menu();
                        self.open_device_dialog();
                    }
                    if ui
                        .add(
                            egui::Button::new("Exit")
                                .shortcut_text(ctx.format_shortcut(&EXIT_SHORTCUT)),
                        )
                        .clicked()
                    {
                        self.exit_requested = true;
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Status: {}", self.session.state()));
                if let Some(link) = self.session.link() {
                    let status = link.status.load();
                    let color = if link.is_connected() {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::RED
                    };
                    ui.separator();
                    ui.colored_label(color, "●");
                    ui.label(&status.address);
                    ui.separator();
                    ui.label(format!("Commands: {}", status.commands_sent));
                    if let Some(last) = &status.last_command {
                        ui.separator();
                        ui.label(egui::RichText::new(last).monospace().weak())
                            .on_hover_text(format!(
                                "Sent at {}",
                                status.last_update.format("%H:%M:%S")
                            ));
                    }
                }
            });
        });

        let mut commands = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(pending) = &self.pending {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label(format!("Connecting to {}...", pending.address));
                });
                ui.separator();
            }
            match &mut self.control_panel {
                Some(panel) => commands = panel.ui(ui),
                None => {
                    ui.label(egui::RichText::new("No device open").weak());
                }
            }
        });
        for command in commands {
            if let Err(e) = self.session.dispatch(command) {
                self.fail(e.into());
                break;
            }
        }

        self.dialog_ui(ctx);
        self.notification_manager.ui(ctx);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.session.close();
        } else if self.exit_requested {
            self.session.close();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!("Configuration: {}", serde_json::to_string(&config)?);

    let fatal = Arc::new(ArcSwapOption::empty());
    let title = config.model.profile().base_title();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([560.0, 320.0])
            .with_title(title.clone()),
        ..Default::default()
    };

    let app_fatal = fatal.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| Ok(Box::new(ReceiverApp::new(cc, config, app_fatal)))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    match fatal.load_full() {
        Some(message) => Err(anyhow::anyhow!("{}", message)),
        None => Ok(()),
    }
}
