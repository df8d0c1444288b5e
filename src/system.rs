// src/system.rs

//! Host state the removal policy depends on: System Integrity Protection
//! and the privilege level of the running process.

use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Marker the first line of `csrutil status` must start with
const SIP_STATUS_PREFIX: &str = "System Integrity Protection";
const SIP_ENABLED_MARKER: &str = "status: enabled";

/// System Integrity Protection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SipState {
    Enabled,
    Disabled,
}

impl SipState {
    pub fn is_enabled(self) -> bool {
        self == SipState::Enabled
    }
}

/// Parse the output of `csrutil status`
///
/// Anything other than a first line carrying the known prefix and the
/// enabled marker counts as disabled.
pub fn parse_sip_status(output: &str) -> SipState {
    match output.lines().next() {
        Some(line) if line.starts_with(SIP_STATUS_PREFIX) && line.contains(SIP_ENABLED_MARKER) => {
            SipState::Enabled
        }
        _ => SipState::Disabled,
    }
}

/// Source of the SIP state
pub trait SystemIntegrity {
    fn sip_state(&self) -> SipState;
}

/// [`SystemIntegrity`] backed by `csrutil status`
#[derive(Debug, Clone)]
pub struct Csrutil {
    program: PathBuf,
}

impl Csrutil {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SystemIntegrity for Csrutil {
    fn sip_state(&self) -> SipState {
        match Command::new(&self.program).arg("status").output() {
            Ok(output) => {
                let state = parse_sip_status(&String::from_utf8_lossy(&output.stdout));
                debug!("SIP state: {:?}", state);
                state
            }
            Err(e) => {
                warn!("Failed to run {}: {}", self.program.display(), e);
                SipState::Disabled
            }
        }
    }
}

/// Privilege level of the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    Root,
    User,
}

impl PrivilegeLevel {
    /// Root if either the real or the effective user id is 0
    pub fn current() -> Self {
        // SAFETY: getuid and geteuid have no preconditions and cannot fail
        let (uid, euid) = unsafe { (libc::getuid(), libc::geteuid()) };
        Self::from_ids(uid, euid)
    }

    pub fn from_ids(uid: libc::uid_t, euid: libc::uid_t) -> Self {
        if uid == 0 || euid == 0 {
            PrivilegeLevel::Root
        } else {
            PrivilegeLevel::User
        }
    }

    pub fn is_root(self) -> bool {
        self == PrivilegeLevel::Root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sip_enabled() {
        let output = "System Integrity Protection status: enabled.\n";
        assert_eq!(parse_sip_status(output), SipState::Enabled);
    }

    #[test]
    fn test_parse_sip_disabled() {
        let output = "System Integrity Protection status: disabled.\n";
        assert_eq!(parse_sip_status(output), SipState::Disabled);
    }

    #[test]
    fn test_parse_sip_custom_configuration() {
        let output = "System Integrity Protection status: unknown (Custom Configuration).\n\n\
                      Configuration:\n\tApple Internal: disabled\n";
        assert_eq!(parse_sip_status(output), SipState::Disabled);
    }

    #[test]
    fn test_parse_sip_marker_missing() {
        assert_eq!(parse_sip_status(""), SipState::Disabled);
        assert_eq!(parse_sip_status("csrutil: command not found"), SipState::Disabled);
        assert_eq!(
            parse_sip_status("\nSystem Integrity Protection status: enabled."),
            SipState::Disabled
        );
    }

    #[test]
    fn test_missing_csrutil_is_disabled() {
        let csrutil = Csrutil::new("/nonexistent/csrutil");
        assert_eq!(csrutil.sip_state(), SipState::Disabled);
    }

    #[test]
    fn test_privilege_from_ids() {
        assert_eq!(PrivilegeLevel::from_ids(0, 0), PrivilegeLevel::Root);
        assert_eq!(PrivilegeLevel::from_ids(501, 0), PrivilegeLevel::Root);
        assert_eq!(PrivilegeLevel::from_ids(0, 501), PrivilegeLevel::Root);
        assert!(!PrivilegeLevel::from_ids(501, 501).is_root());
    }
}
