use egui::{Color32, RichText};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::bindings::{binding, command_for, seed_value, ControlId, ControlValue, Widget};
use crate::commands::{DeviceCommand, Query, Reading};
use crate::connection::ConnectionState;
use crate::error::{DeviceError, DeviceResult};
use crate::frequency::{
    FrequencyControl, FrequencyEdit, StepDirection, DEMO_CENTER_FREQ_HZ, STEPS_MHZ,
};
use crate::hardware::HardwareProfile;
use crate::worker_interface::ReceiverLink;

#[derive(Debug)]
struct ControlSlot {
    id: ControlId,
    /// `None` until the seed read completes
    value: Option<ControlValue>,
}

/// Form controls bound to the receiver parameters of one hardware
/// generation.
pub struct ControlPanel {
    profile: &'static HardwareProfile,
    state: ConnectionState,
    slots: Vec<ControlSlot>,
    frequency: FrequencyControl,
    pending_seeds: Vec<oneshot::Receiver<DeviceResult<Reading>>>,
}

impl ControlPanel {
    pub fn new(
        profile: &'static HardwareProfile,
        state: ConnectionState,
        link: Option<&ReceiverLink>,
    ) -> DeviceResult<Self> {
        let slots = profile
            .controls
            .iter()
            .map(|&id| ControlSlot {
                id,
                value: seed_value(binding(id), state, None),
            })
            .collect();

        let mut panel = Self {
            profile,
            state,
            slots,
            frequency: FrequencyControl::new(profile),
            pending_seeds: Vec::new(),
        };

        match (state, link) {
            (ConnectionState::Connected, Some(link)) => {
                if profile.reset_on_panel_build {
                    link.send(DeviceCommand::Reset)?;
                }
                for &id in profile.controls {
                    panel.pending_seeds.push(link.query(Query::Control(id))?);
                }
                panel.pending_seeds.push(link.query(Query::CenterFrequency)?);
            }
            (ConnectionState::Connected, None) => {
                tracing::warn!("Connected panel built without a receiver link");
            }
            (ConnectionState::Demo | ConnectionState::Disconnected, _) => {
                panel.frequency.seed(Some(DEMO_CENTER_FREQ_HZ));
            }
        }

        tracing::debug!(
            "Built {} panel ({:?}) in {} state",
            profile.model_name,
            profile.generation,
            state
        );
        Ok(panel)
    }

    #[cfg(test)]
    pub fn value(&self, id: ControlId) -> Option<ControlValue> {
        self.slots.iter().find(|s| s.id == id).and_then(|s| s.value)
    }

    #[cfg(test)]
    pub fn frequency(&self) -> &FrequencyControl {
        &self.frequency
    }

    pub fn is_seeded(&self) -> bool {
        self.pending_seeds.is_empty()
    }

    /// Apply any seed reads that completed since the last frame. A failed
    /// read is returned to the caller.
    pub fn poll_seeds(&mut self) -> DeviceResult<()> {
        let mut readings = Vec::new();
        let mut failure = None;

        self.pending_seeds.retain_mut(|rx| match rx.try_recv() {
            Ok(Ok(reading)) => {
                readings.push(reading);
                false
            }
            Ok(Err(e)) => {
                failure.get_or_insert(e);
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Closed) => {
                failure.get_or_insert(DeviceError::Closed);
                false
            }
        });

        for reading in readings {
            self.apply_reading(reading);
        }
        failure.map_or(Ok(()), Err)
    }

    fn apply_reading(&mut self, reading: Reading) {
        match reading {
            Reading::Control(value) => {
                let id = value.id();
                if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
                    slot.value = seed_value(binding(id), self.state, Some(value));
                }
            }
            Reading::CenterFrequency(hz) => self.frequency.seed(Some(hz)),
        }
    }

    /// A control changed on screen. Returns the write to issue, if any.
    pub fn apply_change(&mut self, value: ControlValue) -> Option<DeviceCommand> {
        let id = value.id();
        let slot = self.slots.iter_mut().find(|s| s.id == id)?;
        slot.value = Some(value);
        command_for(binding(id), &value, self.state)
    }

    #[cfg(test)]
    pub fn set_frequency_text(&mut self, text: impl Into<String>) {
        self.frequency.text = text.into();
    }

    pub fn commit_frequency_text(&mut self) -> Option<DeviceCommand> {
        let edit = self.frequency.commit_text(self.state);
        committed_command(edit)
    }

    pub fn step_frequency(&mut self, direction: StepDirection) -> Option<DeviceCommand> {
        let edit = self.frequency.step(direction, self.state);
        committed_command(edit)
    }

    /// Render the panel. Returns the writes triggered by this frame.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> Vec<DeviceCommand> {
        let mut commands = Vec::new();

        ui.horizontal(|ui| {
            ui.heading(format!("{} Receiver", self.profile.model_name));
            if self.state == ConnectionState::Demo {
                ui.label(RichText::new("DEMO").strong().color(Color32::YELLOW));
            }
        });
        ui.separator();

        let mut changes = Vec::new();
        egui::Grid::new("receiver_controls")
            .num_columns(2)
            .spacing([10.0, 10.0])
            .show(ui, |ui| {
                for pair in self.slots.chunks(2) {
                    for slot in pair {
                        ui.horizontal(|ui| {
                            if let Some(value) = render_control(ui, slot.id, slot.value) {
                                changes.push(value);
                            }
                        });
                    }
                    ui.end_row();
                }
            });
        for value in changes {
            commands.extend(self.apply_change(value));
        }

        ui.add_space(10.0);
        egui::Grid::new("frequency_controls")
            .num_columns(3)
            .spacing([10.0, 10.0])
            .show(ui, |ui| {
                ui.label("Center Freq:");
                let committed = match self.frequency.center_hz() {
                    Some(hz) => format!("Committed: {:.0} Hz", hz),
                    None => "Not read yet".to_string(),
                };
                let response = ui
                    .add(egui::TextEdit::singleline(&mut self.frequency.text).desired_width(120.0))
                    .on_hover_text(committed);
                ui.label("MHz");
                ui.end_row();
                if response.lost_focus() {
                    commands.extend(self.commit_frequency_text());
                }

                if ui.button("-").clicked() {
                    commands.extend(self.step_frequency(StepDirection::Down));
                }
                egui::ComboBox::from_id_source("frequency_step")
                    .selected_text(format!("Adjust: {} MHz", self.frequency.step_mhz()))
                    .show_ui(ui, |ui| {
                        for (index, step) in STEPS_MHZ.iter().enumerate() {
                            ui.selectable_value(
                                &mut self.frequency.step_index,
                                index,
                                format!("Adjust: {} MHz", step),
                            );
                        }
                    });
                if ui.button("+").clicked() {
                    commands.extend(self.step_frequency(StepDirection::Up));
                }
                ui.end_row();
            });

        commands
    }
}

fn committed_command(edit: FrequencyEdit) -> Option<DeviceCommand> {
    match edit {
        FrequencyEdit::Committed { hz, command } => {
            tracing::debug!("Center frequency set to {} Hz", hz);
            command
        }
        FrequencyEdit::Unparsed | FrequencyEdit::Rejected => None,
    }
}

/// Draw one bound control, returning the new value if the operator changed it.
fn render_control(
    ui: &mut egui::Ui,
    id: ControlId,
    current: Option<ControlValue>,
) -> Option<ControlValue> {
    let Some(current) = current else {
        ui.add(egui::Spinner::new());
        ui.label(RichText::new("reading...").weak());
        return None;
    };

    match (&binding(id).widget, current) {
        (Widget::Choice(choices), _) => {
            let mut selected = current;
            egui::ComboBox::from_id_source(id)
                .selected_text(current.label())
                .width(160.0)
                .show_ui(ui, |ui| {
                    for choice in choices.iter() {
                        ui.selectable_value(&mut selected, *choice, choice.label());
                    }
                });
            (selected != current).then_some(selected)
        }
        (Widget::SpinBox { min, max, suffix }, ControlValue::IfGain(db)) => {
            ui.label("IF Gain:");
            let mut value = db;
            let response = ui.add(
                egui::DragValue::new(&mut value)
                    .range(*min..=*max)
                    .suffix(*suffix),
            );
            (response.changed() && value != db).then_some(ControlValue::IfGain(value))
        }
        (Widget::Toggle(label), ControlValue::Attenuator(on)) => {
            let mut value = on;
            let response = ui.checkbox(&mut value, *label);
            (response.changed() && value != on).then_some(ControlValue::Attenuator(value))
        }
        (widget, value) => {
            tracing::error!("{:?} cannot display {:?}", widget, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{IqPath, RfGain, RfeMode};
    use crate::device::fake::FakeReceiver;
    use crate::hardware::{Generation, MHZ};
    use std::time::Duration;

    const WSA4000_RESPONSES: &[(&str, &str)] = &[
        (":INPUT:ANTENNA?", "2"),
        (":INPUT:FILTER:PRESELECT?", "0"),
        (":INPUT:GAIN:RF?", "LOW"),
        (":INPUT:GAIN:IF?", "5"),
        (":FREQ:CENTER?", "915000000"),
    ];

    const WSA5000_RESPONSES: &[(&str, &str)] = &[
        (":INPUT:ATTENUATOR?", "0"),
        ("OUTPUT:IQ:MODE?", "CONNECTOR"),
        ("INPUT:MODE?", "ZIF"),
        (":FREQ:CENTER?", "2400000000"),
    ];

    async fn settle(panel: &mut ControlPanel) {
        for _ in 0..200 {
            panel.poll_seeds().unwrap();
            if panel.is_seeded() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("seed reads never completed");
    }

    async fn connected(
        generation: Generation,
        responses: &[(&'static str, &'static str)],
    ) -> (ControlPanel, ReceiverLink, FakeReceiver) {
        let (stream, fake) = FakeReceiver::spawn(responses);
        let link = ReceiverLink::attach(stream, "fake".into(), false).await.unwrap();
        let mut panel =
            ControlPanel::new(generation.profile(), ConnectionState::Connected, Some(&link))
                .unwrap();
        settle(&mut panel).await;
        // Let the fake log the last line it answered
        tokio::time::sleep(Duration::from_millis(20)).await;
        (panel, link, fake)
    }

    #[test]
    fn demo_panel_shows_fixed_constants() {
        let mut panel =
            ControlPanel::new(Generation::Wsa4000.profile(), ConnectionState::Demo, None).unwrap();
        assert_eq!(panel.value(ControlId::Antenna), Some(ControlValue::Antenna(1)));
        assert_eq!(panel.value(ControlId::PreselectFilter), Some(ControlValue::PreselectFilter(true)));
        assert_eq!(panel.value(ControlId::RfGain), Some(ControlValue::RfGain(RfGain::High)));
        assert_eq!(panel.value(ControlId::IfGain), Some(ControlValue::IfGain(0)));
        assert_eq!(panel.frequency().text, "2400.0");
        assert_eq!(panel.frequency().center_hz(), Some(2400.0 * MHZ));
        assert!(panel.is_seeded());

        assert_eq!(panel.apply_change(ControlValue::Antenna(2)), None);
        assert_eq!(panel.value(ControlId::Antenna), Some(ControlValue::Antenna(2)));
    }

    #[test]
    fn panel_only_holds_its_generation_controls() {
        let panel =
            ControlPanel::new(Generation::Wsa5000.profile(), ConnectionState::Demo, None).unwrap();
        assert_eq!(panel.value(ControlId::Antenna), None);
        assert_eq!(panel.value(ControlId::Attenuator), Some(ControlValue::Attenuator(true)));
        assert_eq!(
            panel.value(ControlId::IqOutputPath),
            Some(ControlValue::IqOutputPath(IqPath::Digitizer))
        );
    }

    #[tokio::test]
    async fn connected_panel_seeds_from_device_and_writes_changes() {
        let (mut panel, _link, _fake) = connected(Generation::Wsa4000, WSA4000_RESPONSES).await;

        assert_eq!(panel.value(ControlId::Antenna).map(|v| v.label()), Some("Antenna 2".to_string()));
        assert_eq!(panel.value(ControlId::PreselectFilter), Some(ControlValue::PreselectFilter(false)));
        assert_eq!(panel.value(ControlId::RfGain), Some(ControlValue::RfGain(RfGain::Low)));
        assert_eq!(panel.value(ControlId::IfGain), Some(ControlValue::IfGain(5)));
        assert_eq!(panel.frequency().text, "915.0");

        assert_eq!(
            panel.apply_change(ControlValue::Antenna(1)),
            Some(DeviceCommand::SetAntenna(1))
        );
    }

    fn run_frame(panel: &mut ControlPanel) -> Vec<DeviceCommand> {
        let ctx = egui::Context::default();
        let mut commands = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| commands = panel.ui(ui));
        });
        commands
    }

    #[tokio::test]
    async fn seeded_panel_draws_without_writing() {
        let (mut panel, _link, _fake) = connected(Generation::Wsa4000, WSA4000_RESPONSES).await;
        assert!(run_frame(&mut panel).is_empty());
        assert!(run_frame(&mut panel).is_empty());
        assert_eq!(panel.value(ControlId::IfGain), Some(ControlValue::IfGain(5)));
    }

    #[tokio::test]
    async fn out_of_range_if_gain_fails_the_seed() {
        let (stream, _fake) = FakeReceiver::spawn(&[
            (":INPUT:ANTENNA?", "2"),
            (":INPUT:FILTER:PRESELECT?", "0"),
            (":INPUT:GAIN:RF?", "LOW"),
            (":INPUT:GAIN:IF?", "40"),
        ]);
        let link = ReceiverLink::attach(stream, "fake".into(), false).await.unwrap();
        let mut panel =
            ControlPanel::new(Generation::Wsa4000.profile(), ConnectionState::Connected, Some(&link))
                .unwrap();

        let mut result = Ok(());
        for _ in 0..200 {
            result = panel.poll_seeds();
            if result.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(matches!(result, Err(DeviceError::Protocol { .. })));
        assert_eq!(panel.value(ControlId::IfGain), None);
        assert!(run_frame(&mut panel).is_empty());
    }

    #[tokio::test]
    async fn newer_generation_resets_before_seeding() {
        let (panel, _link, mut fake) = connected(Generation::Wsa5000, WSA5000_RESPONSES).await;
        let seen = fake.drain();
        assert_eq!(seen.first().map(String::as_str), Some("*RST"));
        assert_eq!(seen.len(), 5);
        assert_eq!(panel.value(ControlId::RfeMode), Some(ControlValue::RfeMode(RfeMode::Zif)));
        assert_eq!(panel.value(ControlId::Attenuator), Some(ControlValue::Attenuator(false)));
    }

    #[tokio::test]
    async fn older_generation_does_not_reset() {
        let (_panel, _link, mut fake) = connected(Generation::Wsa4000, WSA4000_RESPONSES).await;
        assert!(fake.drain().iter().all(|line| line != "*RST"));
    }

    #[tokio::test]
    async fn out_of_range_frequency_is_not_written() {
        let (mut panel, _link, _fake) = connected(Generation::Wsa5000, WSA5000_RESPONSES).await;
        panel.set_frequency_text("9500");
        assert_eq!(panel.commit_frequency_text(), None);
        assert_eq!(panel.frequency().text, "2400.0");

        panel.set_frequency_text("5800");
        assert_eq!(
            panel.commit_frequency_text(),
            Some(DeviceCommand::SetCenterFrequency(5800.0 * MHZ))
        );
    }

    #[test]
    fn rfe_mode_is_written_while_disconnected() {
        let mut panel = ControlPanel::new(
            Generation::Wsa5000.profile(),
            ConnectionState::Disconnected,
            None,
        )
        .unwrap();
        let command = panel.apply_change(ControlValue::RfeMode(RfeMode::Hdr));
        assert_eq!(command, Some(DeviceCommand::Raw("INPUT:MODE: HDR".to_string())));
        assert_eq!(panel.apply_change(ControlValue::IqOutputPath(IqPath::Connector)), None);
    }

    #[test]
    fn step_buttons_commit_through_validation() {
        let mut panel =
            ControlPanel::new(Generation::Wsa4000.profile(), ConnectionState::Demo, None).unwrap();
        assert_eq!(panel.step_frequency(StepDirection::Up), None);
        assert_eq!(panel.frequency().center_hz(), Some(2410.0 * MHZ));
        assert_eq!(panel.frequency().text, "2410.0");
    }

    #[tokio::test]
    async fn failed_seed_read_is_reported() {
        let (stream, _fake) = FakeReceiver::spawn(&[(":INPUT:ANTENNA?", "seven")]);
        let link = ReceiverLink::attach(stream, "fake".into(), false).await.unwrap();
        let mut panel =
            ControlPanel::new(Generation::Wsa4000.profile(), ConnectionState::Connected, Some(&link))
                .unwrap();

        let mut result = Ok(());
        for _ in 0..200 {
            result = panel.poll_seeds();
            if result.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(matches!(result, Err(DeviceError::Protocol { .. })));
    }
}
