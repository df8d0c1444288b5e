// src/policy.rs

//! Removal admissibility
//!
//! Decides per package, before anything touches the filesystem, whether
//! removal may go ahead. Two identifier prefixes are in play and they gate
//! different entry points:
//!
//! - batch removal refuses `com.apple.pkg.` packages without force while
//!   SIP is disabled (with SIP enabled the OS protects what matters, so
//!   force is implied);
//! - interactive removal refuses every `com.apple.` package without force
//!   and asks for confirmation with it.

use crate::system::SipState;
use std::fmt;

/// Vendor provenance prefix
pub const APPLE_PREFIX: &str = "com.apple.";
/// Vendor installer prefix
pub const APPLE_INSTALLER_PREFIX: &str = "com.apple.pkg.";

fn has_prefix_ignore_case(id: &str, prefix: &str) -> bool {
    id.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Whether `id` was supplied by the OS vendor
pub fn is_apple_package(id: &str) -> bool {
    has_prefix_ignore_case(id, APPLE_PREFIX)
}

/// Whether `id` came from the OS vendor's installer
pub fn is_apple_installer_package(id: &str) -> bool {
    has_prefix_ignore_case(id, APPLE_INSTALLER_PREFIX)
}

/// Entry point the gate is evaluated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Batch { sip: SipState },
    Interactive,
}

/// Why a package was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// `com.apple.pkg.` package, SIP disabled, no force
    AppleInstallerWithoutForce,
    /// `com.apple.` package in interactive mode, no force
    AppleProvidedWithoutForce,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::AppleInstallerWithoutForce => write!(
                f,
                "This package was added by Apple or macOS installer. \
                 With SIP disabled, you must remove it with 'force' flag."
            ),
            DenialReason::AppleProvidedWithoutForce => write!(
                f,
                "You cannot remove Apple-provided packages without 'force' flag."
            ),
        }
    }
}

/// Gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Admitted only after the user confirms
    ConfirmFirst,
    Denied(DenialReason),
}

/// Decide whether `id` may be removed
pub fn admit(id: &str, force: bool, mode: GateMode) -> Admission {
    match mode {
        GateMode::Batch { sip } => {
            let force = force || sip.is_enabled();
            if is_apple_installer_package(id) && !force {
                Admission::Denied(DenialReason::AppleInstallerWithoutForce)
            } else {
                Admission::Admitted
            }
        }
        GateMode::Interactive => {
            if !is_apple_package(id) {
                Admission::Admitted
            } else if force {
                Admission::ConfirmFirst
            } else {
                Admission::Denied(DenialReason::AppleProvidedWithoutForce)
            }
        }
    }
}
