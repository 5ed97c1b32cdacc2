use clap::ValueEnum;
use serde::Serialize;

use crate::bindings::ControlId;

pub const MHZ: f64 = 1e6;

/// Receiver hardware generation selected at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Wsa4000,
    Wsa5000,
}

/// Everything the panel needs to know about one hardware generation.
#[derive(Debug)]
pub struct HardwareProfile {
    pub generation: Generation,
    pub model_name: &'static str,
    pub min_freq_hz: f64,
    pub max_freq_hz: f64,
    pub controls: &'static [ControlId],
    /// Issue a device reset before seeding the controls (connected only)
    pub reset_on_panel_build: bool,
}

static WSA4000: HardwareProfile = HardwareProfile {
    generation: Generation::Wsa4000,
    model_name: "WSA4000",
    min_freq_hz: 0.0,
    max_freq_hz: 10e9,
    controls: &[
        ControlId::Antenna,
        ControlId::PreselectFilter,
        ControlId::RfGain,
        ControlId::IfGain,
    ],
    reset_on_panel_build: false,
};

static WSA5000: HardwareProfile = HardwareProfile {
    generation: Generation::Wsa5000,
    model_name: "WSA5000",
    min_freq_hz: 0.0,
    max_freq_hz: 8e9,
    controls: &[
        ControlId::Attenuator,
        ControlId::IqOutputPath,
        ControlId::RfeMode,
    ],
    reset_on_panel_build: true,
};

impl Generation {
    pub fn profile(self) -> &'static HardwareProfile {
        match self {
            Generation::Wsa4000 => &WSA4000,
            Generation::Wsa5000 => &WSA5000,
        }
    }
}

impl HardwareProfile {
    pub fn contains(&self, freq_hz: f64) -> bool {
        (self.min_freq_hz..=self.max_freq_hz).contains(&freq_hz)
    }

    pub fn base_title(&self) -> String {
        format!("{} Receiver Controller", self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_ceiling_differs_per_generation() {
        assert_eq!(Generation::Wsa4000.profile().max_freq_hz, 10e9);
        assert_eq!(Generation::Wsa5000.profile().max_freq_hz, 8e9);
        assert!(Generation::Wsa4000.profile().contains(9_500.0 * MHZ));
        assert!(!Generation::Wsa5000.profile().contains(9_500.0 * MHZ));
        assert!(!Generation::Wsa5000.profile().contains(-1.0));
    }

    #[test]
    fn only_the_newer_generation_resets_on_panel_build() {
        assert!(!Generation::Wsa4000.profile().reset_on_panel_build);
        assert!(Generation::Wsa5000.profile().reset_on_panel_build);
    }

    #[test]
    fn control_sets_do_not_overlap() {
        let a = Generation::Wsa4000.profile().controls;
        let b = Generation::Wsa5000.profile().controls;
        assert!(a.iter().all(|id| !b.contains(id)));
    }
}
