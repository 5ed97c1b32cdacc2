use std::fmt;

use crate::bindings::{
    ControlId, ControlValue, ANTENNA_PORTS, IF_GAIN_MAX_DB, IF_GAIN_MIN_DB,
};
use crate::error::{DeviceError, DeviceResult};

/// RF gain stages of the older receiver front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfGain {
    High,
    Med,
    Low,
    VLow,
}

impl RfGain {
    pub const ALL: [RfGain; 4] = [RfGain::High, RfGain::Med, RfGain::Low, RfGain::VLow];

    pub fn label(self) -> &'static str {
        match self {
            RfGain::High => "High",
            RfGain::Med => "Med",
            RfGain::Low => "Low",
            RfGain::VLow => "VLow",
        }
    }

    /// Name understood by the device, always lowercase
    pub fn name(self) -> &'static str {
        match self {
            RfGain::High => "high",
            RfGain::Med => "med",
            RfGain::Low => "low",
            RfGain::VLow => "vlow",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|g| g.name() == name)
    }
}

/// Where the downconverted signal goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IqPath {
    Digitizer,
    Connector,
}

impl IqPath {
    pub const ALL: [IqPath; 2] = [IqPath::Digitizer, IqPath::Connector];

    pub fn label(self) -> &'static str {
        match self {
            IqPath::Digitizer => "Digitizer",
            IqPath::Connector => "Connector",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            IqPath::Digitizer => "DIGITIZER",
            IqPath::Connector => "CONNECTOR",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

/// Receiver front-end operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfeMode {
    /// Zero-IF
    Zif,
    /// Super-heterodyne
    Sh,
    /// High dynamic range
    Hdr,
}

impl RfeMode {
    pub const ALL: [RfeMode; 3] = [RfeMode::Zif, RfeMode::Sh, RfeMode::Hdr];

    pub fn token(self) -> &'static str {
        match self {
            RfeMode::Zif => "ZIF",
            RfeMode::Sh => "SH",
            RfeMode::Hdr => "HDR",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|m| m.token() == token)
    }
}

/// A single write issued to the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Reset,
    SetAntenna(u8),
    SetPreselectFilter(bool),
    SetRfGain(RfGain),
    SetIfGain(i32),
    SetCenterFrequency(f64),
    /// Parameter-set string sent verbatim
    Raw(String),
}

impl DeviceCommand {
    pub fn attenuator(on: bool) -> Self {
        DeviceCommand::Raw(format!(":INPUT:ATTENUATOR {}", u8::from(on)))
    }

    pub fn iq_output_path(path: IqPath) -> Self {
        DeviceCommand::Raw(format!("OUTPUT:IQ:MODE {}", path.token()))
    }

    pub fn rfe_mode(mode: RfeMode) -> Self {
        DeviceCommand::Raw(format!("INPUT:MODE: {}", mode.token()))
    }

    pub fn to_scpi(&self) -> String {
        match self {
            DeviceCommand::Reset => "*RST".to_string(),
            DeviceCommand::SetAntenna(port) => format!(":INPUT:ANTENNA {}", port),
            DeviceCommand::SetPreselectFilter(on) => {
                format!(":INPUT:FILTER:PRESELECT {}", u8::from(*on))
            }
            DeviceCommand::SetRfGain(gain) => format!(":INPUT:GAIN:RF {}", gain.name()),
            DeviceCommand::SetIfGain(db) => format!(":INPUT:GAIN:IF {}", db),
            DeviceCommand::SetCenterFrequency(hz) => format!(":FREQ:CENTER {:.0} Hz", hz),
            DeviceCommand::Raw(line) => line.clone(),
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_scpi())
    }
}

/// Read-side accessor used to seed a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Control(ControlId),
    CenterFrequency,
}

/// Parsed answer to a [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Control(ControlValue),
    CenterFrequency(f64),
}

impl Query {
    pub fn to_scpi(self) -> &'static str {
        match self {
            Query::Control(ControlId::Antenna) => ":INPUT:ANTENNA?",
            Query::Control(ControlId::PreselectFilter) => ":INPUT:FILTER:PRESELECT?",
            Query::Control(ControlId::RfGain) => ":INPUT:GAIN:RF?",
            Query::Control(ControlId::IfGain) => ":INPUT:GAIN:IF?",
            Query::Control(ControlId::Attenuator) => ":INPUT:ATTENUATOR?",
            Query::Control(ControlId::IqOutputPath) => "OUTPUT:IQ:MODE?",
            Query::Control(ControlId::RfeMode) => "INPUT:MODE?",
            Query::CenterFrequency => ":FREQ:CENTER?",
        }
    }

    pub fn parse(self, response: &str) -> DeviceResult<Reading> {
        let token = response.split_whitespace().next().unwrap_or("");
        let value = match self {
            Query::CenterFrequency => token.parse::<f64>().ok().map(Reading::CenterFrequency),
            Query::Control(ControlId::Antenna) => token
                .parse::<u8>()
                .ok()
                .filter(|port| ANTENNA_PORTS.contains(port))
                .map(|port| Reading::Control(ControlValue::Antenna(port))),
            Query::Control(ControlId::PreselectFilter) => {
                parse_flag(token).map(|on| Reading::Control(ControlValue::PreselectFilter(on)))
            }
            Query::Control(ControlId::RfGain) => {
                RfGain::from_name(token).map(|g| Reading::Control(ControlValue::RfGain(g)))
            }
            Query::Control(ControlId::IfGain) => token
                .parse::<i32>()
                .ok()
                .filter(|db| (IF_GAIN_MIN_DB..=IF_GAIN_MAX_DB).contains(db))
                .map(|db| Reading::Control(ControlValue::IfGain(db))),
            Query::Control(ControlId::Attenuator) => {
                parse_flag(token).map(|on| Reading::Control(ControlValue::Attenuator(on)))
            }
            Query::Control(ControlId::IqOutputPath) => {
                IqPath::from_token(token).map(|p| Reading::Control(ControlValue::IqOutputPath(p)))
            }
            Query::Control(ControlId::RfeMode) => {
                RfeMode::from_token(token).map(|m| Reading::Control(ControlValue::RfeMode(m)))
            }
        };
        value.ok_or_else(|| DeviceError::Protocol {
            query: self.to_scpi().to_string(),
            response: response.trim().to_string(),
        })
    }
}

fn parse_flag(token: &str) -> Option<bool> {
    match token.to_ascii_uppercase().as_str() {
        "1" | "ON" => Some(true),
        "0" | "OFF" => Some(false),
        _ => None,
    }
}
