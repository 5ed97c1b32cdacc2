use chrono::{DateTime, Utc};
use egui::{Color32, RichText};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Info,
    Success,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: usize,
    pub message: String,
    pub notification_type: NotificationType,
    pub created_at: DateTime<Utc>,
    pub duration_secs: f32,
}

impl Notification {
    pub fn new(message: String, notification_type: NotificationType) -> Self {
        Self {
            id: 0, // Will be set by the manager
            message,
            notification_type,
            created_at: Utc::now(),
            duration_secs: match notification_type {
                NotificationType::Success => 4.0,
                NotificationType::Info => 3.0,
            },
        }
    }

    fn elapsed_secs(&self) -> f32 {
        Utc::now()
            .signed_duration_since(self.created_at)
            .num_milliseconds() as f32
            / 1000.0
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed_secs() > self.duration_secs
    }

    pub fn get_color(&self) -> Color32 {
        match self.notification_type {
            NotificationType::Info => Color32::LIGHT_BLUE,
            NotificationType::Success => Color32::LIGHT_GREEN,
        }
    }
}

/// Blocking notice the operator has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalNotice {
    pub title: String,
    pub message: String,
}

pub struct NotificationManager {
    notifications: VecDeque<Notification>,
    modal: Option<ModalNotice>,
    next_id: usize,
    max_notifications: usize,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self {
            notifications: VecDeque::new(),
            modal: None,
            next_id: 1,
            max_notifications: 5,
        }
    }
}

impl NotificationManager {
    pub fn add_notification(&mut self, mut notification: Notification) {
        notification.id = self.next_id;
        self.next_id += 1;

        if self.notifications.len() >= self.max_notifications {
            self.notifications.pop_front();
        }

        self.notifications.push_back(notification);
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.add_notification(Notification::new(message.into(), NotificationType::Info));
    }

    pub fn add_success(&mut self, message: impl Into<String>) {
        self.add_notification(Notification::new(message.into(), NotificationType::Success));
    }

    /// Replaces any notice still on screen.
    pub fn show_modal(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.modal = Some(ModalNotice {
            title: title.into(),
            message: message.into(),
        });
    }

    pub fn modal(&self) -> Option<&ModalNotice> {
        self.modal.as_ref()
    }

    pub fn dismiss_modal(&mut self) {
        self.modal = None;
    }

    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn remove_notification(&mut self, id: usize) {
        self.notifications.retain(|n| n.id != id);
    }

    pub fn update(&mut self) {
        self.notifications.retain(|n| !n.is_expired());
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        let mut to_remove = Vec::new();

        egui::Area::new("notifications".into())
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-20.0, 40.0))
            .show(ctx, |ui| {
                ui.set_max_width(350.0);

                for notification in self.active() {
                    if render_notification(ui, notification) {
                        to_remove.push(notification.id);
                    }
                }
            });

        for id in to_remove {
            self.remove_notification(id);
        }

        self.modal_ui(ctx);
    }

    fn modal_ui(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.modal else {
            return;
        };

        let mut acknowledged = false;
        egui::Window::new(notice.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(&notice.message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    acknowledged = ui.button("OK").clicked()
                        || ui.input(|i| i.key_pressed(egui::Key::Enter));
                });
            });

        if acknowledged {
            self.dismiss_modal();
        }
    }
}

/// Draws one toast. Returns true when the operator dismissed it.
fn render_notification(ui: &mut egui::Ui, notification: &Notification) -> bool {
    let color = notification.get_color();
    let mut dismissed = false;

    egui::Frame::default()
        .fill(color.gamma_multiply(0.1))
        .stroke(egui::Stroke::new(1.0, color))
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(RichText::new(&notification.message).color(color).strong());

                    let progress = 1.0
                        - (notification.elapsed_secs() / notification.duration_secs)
                            .clamp(0.0, 1.0);
                    ui.add(
                        egui::ProgressBar::new(progress)
                            .desired_width(250.0)
                            .desired_height(3.0)
                            .fill(color.gamma_multiply(0.8)),
                    );
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                    dismissed = ui.small_button("✖").on_hover_text("Dismiss").clicked();
                });
            });
        });

    dismissed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_toast_is_dropped_past_the_limit() {
        let mut manager = NotificationManager::default();
        for i in 0..7 {
            manager.add_info(format!("message {}", i));
        }
        let messages: Vec<_> = manager.active().map(|n| n.message.clone()).collect();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], "message 2");
    }

    #[test]
    fn fresh_successes_outlive_infos() {
        let success = Notification::new("done".into(), NotificationType::Success);
        let info = Notification::new("fyi".into(), NotificationType::Info);
        assert!(success.duration_secs > info.duration_secs);
        assert!(!success.is_expired());
    }

    #[test]
    fn modal_notice_stays_until_dismissed() {
        let mut manager = NotificationManager::default();
        manager.show_modal("Connection Error", "Failed to connect");
        manager.update();
        assert_eq!(manager.modal().map(|m| m.title.as_str()), Some("Connection Error"));
        manager.dismiss_modal();
        assert!(manager.modal().is_none());
    }
}
