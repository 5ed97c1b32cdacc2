//! Control-to-parameter bindings.
//!
//! Every form control on the panel is described by one [`Binding`]: the
//! widget it renders as, the constant shown in demo mode, and the rule that
//! decides whether a changed value reaches the device. The panel never
//! branches on connection state itself; it asks [`seed_value`] and
//! [`command_for`].

use crate::commands::{DeviceCommand, IqPath, RfGain, RfeMode};
use crate::connection::ConnectionState;

pub const ANTENNA_PORTS: [u8; 2] = [1, 2];
pub const IF_GAIN_MIN_DB: i32 = -10;
pub const IF_GAIN_MAX_DB: i32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Antenna,
    PreselectFilter,
    RfGain,
    IfGain,
    Attenuator,
    IqOutputPath,
    RfeMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Antenna(u8),
    PreselectFilter(bool),
    RfGain(RfGain),
    IfGain(i32),
    Attenuator(bool),
    IqOutputPath(IqPath),
    RfeMode(RfeMode),
}

impl ControlValue {
    pub fn id(&self) -> ControlId {
        match self {
            ControlValue::Antenna(_) => ControlId::Antenna,
            ControlValue::PreselectFilter(_) => ControlId::PreselectFilter,
            ControlValue::RfGain(_) => ControlId::RfGain,
            ControlValue::IfGain(_) => ControlId::IfGain,
            ControlValue::Attenuator(_) => ControlId::Attenuator,
            ControlValue::IqOutputPath(_) => ControlId::IqOutputPath,
            ControlValue::RfeMode(_) => ControlId::RfeMode,
        }
    }

    /// Text shown in combo boxes
    pub fn label(&self) -> String {
        match self {
            ControlValue::Antenna(port) => format!("Antenna {}", port),
            ControlValue::PreselectFilter(true) => "BPF On".to_string(),
            ControlValue::PreselectFilter(false) => "BPF Off".to_string(),
            ControlValue::RfGain(gain) => format!("RF Gain: {}", gain.label()),
            ControlValue::IfGain(db) => format!("{} dB", db),
            ControlValue::Attenuator(true) => "Attenuation On".to_string(),
            ControlValue::Attenuator(false) => "Attenuation Off".to_string(),
            ControlValue::IqOutputPath(path) => format!("IQ Path: {}", path.label()),
            ControlValue::RfeMode(mode) => format!("RFE Mode: {}", mode.token()),
        }
    }

    /// Typed accessor call for the older generation, raw parameter strings
    /// for the newer one.
    pub fn to_command(&self) -> DeviceCommand {
        match *self {
            ControlValue::Antenna(port) => DeviceCommand::SetAntenna(port),
            ControlValue::PreselectFilter(on) => DeviceCommand::SetPreselectFilter(on),
            ControlValue::RfGain(gain) => DeviceCommand::SetRfGain(gain),
            ControlValue::IfGain(db) => DeviceCommand::SetIfGain(db),
            ControlValue::Attenuator(on) => DeviceCommand::attenuator(on),
            ControlValue::IqOutputPath(path) => DeviceCommand::iq_output_path(path),
            ControlValue::RfeMode(mode) => DeviceCommand::rfe_mode(mode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGuard {
    WhenConnected,
    /// Written regardless of connection state
    Always,
}

#[derive(Debug)]
pub enum Widget {
    Choice(&'static [ControlValue]),
    SpinBox { min: i32, max: i32, suffix: &'static str },
    Toggle(&'static str),
}

#[derive(Debug)]
pub struct Binding {
    pub id: ControlId,
    pub widget: Widget,
    pub demo: ControlValue,
    pub guard: WriteGuard,
}

static BINDINGS: [Binding; 7] = [
    Binding {
        id: ControlId::Antenna,
        widget: Widget::Choice(&[
            ControlValue::Antenna(ANTENNA_PORTS[0]),
            ControlValue::Antenna(ANTENNA_PORTS[1]),
        ]),
        demo: ControlValue::Antenna(1),
        guard: WriteGuard::WhenConnected,
    },
    Binding {
        id: ControlId::PreselectFilter,
        widget: Widget::Choice(&[
            ControlValue::PreselectFilter(true),
            ControlValue::PreselectFilter(false),
        ]),
        demo: ControlValue::PreselectFilter(true),
        guard: WriteGuard::WhenConnected,
    },
    Binding {
        id: ControlId::RfGain,
        widget: Widget::Choice(&[
            ControlValue::RfGain(RfGain::High),
            ControlValue::RfGain(RfGain::Med),
            ControlValue::RfGain(RfGain::Low),
            ControlValue::RfGain(RfGain::VLow),
        ]),
        demo: ControlValue::RfGain(RfGain::High),
        guard: WriteGuard::WhenConnected,
    },
    Binding {
        id: ControlId::IfGain,
        widget: Widget::SpinBox {
            min: IF_GAIN_MIN_DB,
            max: IF_GAIN_MAX_DB,
            suffix: " dB",
        },
        demo: ControlValue::IfGain(0),
        guard: WriteGuard::WhenConnected,
    },
    Binding {
        id: ControlId::Attenuator,
        widget: Widget::Toggle("Attenuation"),
        demo: ControlValue::Attenuator(true),
        guard: WriteGuard::WhenConnected,
    },
    Binding {
        id: ControlId::IqOutputPath,
        widget: Widget::Choice(&[
            ControlValue::IqOutputPath(IqPath::Digitizer),
            ControlValue::IqOutputPath(IqPath::Connector),
        ]),
        demo: ControlValue::IqOutputPath(IqPath::Digitizer),
        guard: WriteGuard::WhenConnected,
    },
    Binding {
        id: ControlId::RfeMode,
        widget: Widget::Choice(&[
            ControlValue::RfeMode(RfeMode::Zif),
            ControlValue::RfeMode(RfeMode::Sh),
            ControlValue::RfeMode(RfeMode::Hdr),
        ]),
        demo: ControlValue::RfeMode(RfeMode::Sh),
        // The front-end mode has always been pushed even without a
        // connection, unlike its siblings. Kept as is until the intended
        // behaviour is confirmed.
        guard: WriteGuard::Always,
    },
];

pub fn binding(id: ControlId) -> &'static Binding {
    // The table holds one entry per ControlId
    match BINDINGS.iter().find(|b| b.id == id) {
        Some(b) => b,
        None => unreachable!("no binding for {:?}", id),
    }
}

/// Value a control displays when the panel is built.
///
/// `device_value` is the answer read from the receiver, `None` while the
/// read is still in flight.
pub fn seed_value(
    binding: &Binding,
    state: ConnectionState,
    device_value: Option<ControlValue>,
) -> Option<ControlValue> {
    match state {
        ConnectionState::Connected => device_value,
        ConnectionState::Demo | ConnectionState::Disconnected => Some(binding.demo),
    }
}

/// Write issued when a control changes, if any.
pub fn command_for(
    binding: &Binding,
    value: &ControlValue,
    state: ConnectionState,
) -> Option<DeviceCommand> {
    debug_assert_eq!(binding.id, value.id());
    let permitted = match (binding.guard, state) {
        (WriteGuard::Always, _) => true,
        (WriteGuard::WhenConnected, ConnectionState::Connected) => true,
        (WriteGuard::WhenConnected, ConnectionState::Demo | ConnectionState::Disconnected) => {
            false
        }
    };
    permitted.then(|| value.to_command())
}
