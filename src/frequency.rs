use crate::commands::DeviceCommand;
use crate::connection::ConnectionState;
use crate::hardware::{HardwareProfile, MHZ};

/// Step sizes offered next to the +/- buttons, in MHz.
pub const STEPS_MHZ: [f64; 5] = [1.0, 2.5, 10.0, 25.0, 100.0];
pub const DEFAULT_STEP_INDEX: usize = 2;
pub const DEMO_CENTER_FREQ_HZ: f64 = 2400e6;
const PLACEHOLDER: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Down,
    Up,
}

impl StepDirection {
    fn sign(self) -> f64 {
        match self {
            StepDirection::Down => -1.0,
            StepDirection::Up => 1.0,
        }
    }
}

/// What happened to an edit of the frequency field.
#[derive(Debug, Clone, PartialEq)]
pub enum FrequencyEdit {
    /// The text was not a number
    Unparsed,
    /// Outside the hardware range, text reverted
    Rejected,
    Committed {
        hz: f64,
        command: Option<DeviceCommand>,
    },
}

/// Center frequency text field with its step buttons.
#[derive(Debug, Clone)]
pub struct FrequencyControl {
    profile: &'static HardwareProfile,
    center_hz: Option<f64>,
    pub text: String,
    pub step_index: usize,
}

pub fn format_mhz(center_hz: Option<f64>) -> String {
    match center_hz {
        Some(hz) => format!("{:.1}", hz / MHZ),
        None => PLACEHOLDER.to_string(),
    }
}

impl FrequencyControl {
    pub fn new(profile: &'static HardwareProfile) -> Self {
        Self {
            profile,
            center_hz: None,
            text: PLACEHOLDER.to_string(),
            step_index: DEFAULT_STEP_INDEX,
        }
    }

    pub fn center_hz(&self) -> Option<f64> {
        self.center_hz
    }

    pub fn step_mhz(&self) -> f64 {
        STEPS_MHZ[self.step_index.min(STEPS_MHZ.len() - 1)]
    }

    /// Replace the stored value with one read from the device (or the demo
    /// constant) without writing anything back.
    pub fn seed(&mut self, center_hz: Option<f64>) {
        self.center_hz = center_hz;
        self.refresh_text();
    }

    pub fn refresh_text(&mut self) {
        self.text = format_mhz(self.center_hz);
    }

    /// Validate and commit whatever is currently typed in the field.
    pub fn commit_text(&mut self, state: ConnectionState) -> FrequencyEdit {
        match self.text.trim().parse::<f64>() {
            Ok(mhz) => self.set_freq_mhz(mhz, state),
            Err(_) => FrequencyEdit::Unparsed,
        }
    }

    pub fn set_freq_mhz(&mut self, mhz: f64, state: ConnectionState) -> FrequencyEdit {
        // Adding zero folds -0 into 0
        let hz = mhz * MHZ + 0.0;
        if !self.profile.contains(hz) {
            tracing::debug!("Rejecting center frequency {} MHz", mhz);
            self.refresh_text();
            return FrequencyEdit::Rejected;
        }

        self.center_hz = Some(hz);
        let command = match state {
            ConnectionState::Connected => Some(DeviceCommand::SetCenterFrequency(hz)),
            ConnectionState::Demo | ConnectionState::Disconnected => None,
        };
        FrequencyEdit::Committed { hz, command }
    }

    /// Apply the selected step to the displayed value.
    pub fn step(&mut self, direction: StepDirection, state: ConnectionState) -> FrequencyEdit {
        let current = match self.text.trim().parse::<f64>() {
            Ok(mhz) => mhz,
            Err(_) => {
                self.refresh_text();
                return FrequencyEdit::Unparsed;
            }
        };
        self.text = format!("{:.1}", current + self.step_mhz() * direction.sign());
        self.commit_text(state)
    }
}
