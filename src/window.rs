//! Connection bookkeeping behind the application window.
//!
//! [`Session`] owns the receiver link and the connection state. It decides
//! what the window shows after a connection attempt resolves or the connect
//! dialog is cancelled; the egui side only renders the result.

use crate::commands::DeviceCommand;
use crate::connection::ConnectionState;
use crate::control_panel::ControlPanel;
use crate::error::DeviceResult;
use crate::hardware::HardwareProfile;
use crate::worker_interface::ReceiverLink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// A state was already resolved; rebuild the panel as it was
    KeepCurrent,
    /// Nothing to fall back on; demo mode forced
    ForcedDemo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(String),
    /// Carries the reason the connection failed
    FellBackToDemo(String),
}

pub struct Session {
    profile: &'static HardwareProfile,
    state: ConnectionState,
    link: Option<ReceiverLink>,
}

impl Session {
    pub fn new(profile: &'static HardwareProfile) -> Self {
        Self {
            profile,
            state: ConnectionState::Disconnected,
            link: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn link(&self) -> Option<&ReceiverLink> {
        self.link.as_ref()
    }

    pub fn link_mut(&mut self) -> Option<&mut ReceiverLink> {
        self.link.as_mut()
    }

    pub fn title(&self) -> String {
        match self.state {
            ConnectionState::Demo => format!("{} (Demo Mode)", self.profile.base_title()),
            ConnectionState::Connected | ConnectionState::Disconnected => {
                self.profile.base_title()
            }
        }
    }

    pub fn demo_notice(&self) -> String {
        format!(
            "Failed to connect to {}, Initiating demo mode",
            self.profile.model_name
        )
    }

    /// The connect dialog was dismissed without an address.
    pub fn cancel_dialog(&mut self) -> CancelOutcome {
        if self.state.is_resolved() {
            return CancelOutcome::KeepCurrent;
        }
        tracing::info!("Connect dialog cancelled, entering demo mode");
        self.replace_link(None);
        self.state = ConnectionState::Demo;
        CancelOutcome::ForcedDemo
    }

    /// Fold the result of a connection attempt into the session. Only
    /// network-level failures are absorbed; anything else is returned.
    pub fn resolve(&mut self, result: DeviceResult<ReceiverLink>) -> DeviceResult<ConnectOutcome> {
        match result {
            Ok(link) => {
                let address = link.address.clone();
                self.replace_link(Some(link));
                self.state = ConnectionState::Connected;
                Ok(ConnectOutcome::Connected(address))
            }
            Err(e) if e.is_connection() => {
                tracing::warn!("Connection failed: {}", e);
                self.replace_link(None);
                self.state = ConnectionState::Demo;
                Ok(ConnectOutcome::FellBackToDemo(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn build_panel(&self) -> DeviceResult<ControlPanel> {
        ControlPanel::new(self.profile, self.state, self.link.as_ref())
    }

    /// Hand a panel write to the receiver, if there is one.
    pub fn dispatch(&self, command: DeviceCommand) -> DeviceResult<()> {
        match &self.link {
            Some(link) => link.send(command),
            None => {
                tracing::warn!("No receiver attached, dropping '{}'", command);
                Ok(())
            }
        }
    }

    pub fn close(&mut self) {
        self.replace_link(None);
    }

    fn replace_link(&mut self, link: Option<ReceiverLink>) {
        if let Some(old) = std::mem::replace(&mut self.link, link) {
            old.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{ControlId, ControlValue};
    use crate::commands::RfeMode;
    use crate::device::fake::FakeReceiver;
    use crate::error::DeviceError;
    use crate::hardware::Generation;
    use std::io;

    fn refused() -> DeviceResult<ReceiverLink> {
        Err(io::Error::from(io::ErrorKind::ConnectionRefused).into())
    }

    #[test]
    fn starts_disconnected_with_plain_title() {
        let session = Session::new(Generation::Wsa4000.profile());
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(session.title(), "WSA4000 Receiver Controller");
    }

    #[test]
    fn cancelling_with_no_state_forces_demo() {
        let mut session = Session::new(Generation::Wsa4000.profile());
        assert_eq!(session.cancel_dialog(), CancelOutcome::ForcedDemo);
        assert_eq!(session.state(), ConnectionState::Demo);
        assert_eq!(session.title(), "WSA4000 Receiver Controller (Demo Mode)");
        assert!(session.link().is_none());
    }

    #[test]
    fn cancelling_with_a_state_keeps_it() {
        let mut session = Session::new(Generation::Wsa4000.profile());
        session.resolve(refused()).unwrap();
        assert_eq!(session.cancel_dialog(), CancelOutcome::KeepCurrent);
        assert_eq!(session.state(), ConnectionState::Demo);
    }

    #[test]
    fn socket_error_falls_back_to_demo() {
        let mut session = Session::new(Generation::Wsa4000.profile());
        let outcome = session.resolve(refused()).unwrap();
        assert!(matches!(outcome, ConnectOutcome::FellBackToDemo(_)));
        assert_eq!(session.state(), ConnectionState::Demo);
        assert!(session.title().ends_with("(Demo Mode)"));
        assert_eq!(
            session.demo_notice(),
            "Failed to connect to WSA4000, Initiating demo mode"
        );

        let mut panel = session.build_panel().unwrap();
        assert_eq!(
            panel.value(ControlId::Antenna).map(|v| v.label()),
            Some("Antenna 1".to_string())
        );
        assert_eq!(panel.apply_change(ControlValue::Antenna(2)), None);
    }

    #[test]
    fn other_failures_are_not_absorbed() {
        let mut session = Session::new(Generation::Wsa4000.profile());
        let result = session.resolve(Err(DeviceError::Closed));
        assert!(matches!(result, Err(DeviceError::Closed)));
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn successful_connect_stores_the_link() {
        let (stream, _fake) = FakeReceiver::spawn(&[]);
        let link = ReceiverLink::attach(stream, "wsa-lab:37001".into(), false)
            .await
            .unwrap();

        let mut session = Session::new(Generation::Wsa4000.profile());
        let outcome = session.resolve(Ok(link)).unwrap();
        assert_eq!(outcome, ConnectOutcome::Connected("wsa-lab:37001".into()));
        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(session.title(), "WSA4000 Receiver Controller");
        assert!(session.link().is_some());

        // A later failed attempt drops the old link
        session.resolve(refused()).unwrap();
        assert!(session.link().is_none());
        assert_eq!(session.state(), ConnectionState::Demo);
    }

    #[tokio::test]
    async fn dispatch_reaches_the_receiver() {
        let (stream, mut fake) = FakeReceiver::spawn(&[]);
        let link = ReceiverLink::attach(stream, "fake".into(), false).await.unwrap();
        let mut session = Session::new(Generation::Wsa5000.profile());
        session.resolve(Ok(link)).unwrap();

        session
            .dispatch(DeviceCommand::rfe_mode(RfeMode::Hdr))
            .unwrap();
        assert_eq!(fake.next_line().await.as_deref(), Some("INPUT:MODE: HDR"));
    }

    #[test]
    fn dispatch_without_receiver_is_dropped() {
        let session = Session::new(Generation::Wsa5000.profile());
        assert!(session
            .dispatch(DeviceCommand::rfe_mode(RfeMode::Hdr))
            .is_ok());
    }
}
