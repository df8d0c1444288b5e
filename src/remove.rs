// src/remove.rs

//! Package removal
//!
//! Composes the policy gate, inspection, relocation, pruning and receipt
//! deregistration into the single-package protocol, and runs that
//! protocol over a selection of packages for batch removal.
//!
//! Per package the flow is:
//!
//! ```text
//! Gated -> Inspecting -> AwaitingFileConfirmation -> Relocating
//!       -> AwaitingDirConfirmation -> Pruning -> Deregistering -> Done
//! ```
//!
//! A refusal at the gate or a declined confirmation ends the package as
//! skipped; an error while relocating ends it as failed. Neither stops a
//! batch.

use crate::error::{Error, Result};
use crate::filter::PackageSelector;
use crate::inspect::inspect_package;
use crate::interaction::{Interaction, Tone};
use crate::pkgdb::{PackageDatabase, list_installed};
use crate::policy::{Admission, DenialReason, GateMode, admit};
use crate::prune::prune_directories;
use crate::relocate::{FileMover, FsMover, Relocator};
use crate::system::{PrivilegeLevel, SipState};
use crate::volume::Volume;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};

/// Per-operation configuration, built once and passed down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOptions {
    pub volume: Volume,
    /// Allow removing vendor packages the gate would otherwise refuse
    pub force: bool,
    /// Skip all confirmations
    pub quiet: bool,
}

impl RemovalOptions {
    pub fn new(volume: Volume) -> Self {
        Self {
            volume,
            force: false,
            quiet: false,
        }
    }
}

/// States of the single-package protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Gated,
    Inspecting,
    AwaitingFileConfirmation,
    Relocating,
    AwaitingDirConfirmation,
    Pruning,
    Deregistering,
    Done,
}

/// Why a package was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PolicyDenied(DenialReason),
    UserDeclined,
}

/// What a completed removal did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub files_removed: usize,
    pub directories_removed: Vec<PathBuf>,
    /// Directories still in place, most likely shared with other packages
    pub directories_retained: Vec<PathBuf>,
    pub receipt_forgotten: bool,
}

#[derive(Debug)]
pub enum RemovalOutcome {
    Removed(RemovalReport),
    Skipped(SkipReason),
    Failed(Error),
}

impl RemovalOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, RemovalOutcome::Removed(_))
    }
}

/// Outcomes of a batch, in processing order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, RemovalOutcome)>,
    /// The user declined the batch as a whole
    pub cancelled: bool,
}

impl BatchReport {
    pub fn removed_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_removed()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            RemovalOutcome::Failed(e) => Some((id.as_str(), e)),
            _ => None,
        })
    }
}

fn path_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs removals against one receipt database and one user
pub struct Remover<'a, M = FsMover> {
    pub(crate) db: &'a dyn PackageDatabase,
    pub(crate) ui: &'a dyn Interaction,
    relocator: Relocator<M>,
}

impl<'a> Remover<'a> {
    pub fn new(db: &'a dyn PackageDatabase, ui: &'a dyn Interaction, staging_root: impl Into<PathBuf>) -> Self {
        Self::with_relocator(db, ui, Relocator::new(staging_root))
    }
}

impl<'a, M: FileMover> Remover<'a, M> {
    pub fn with_relocator(db: &'a dyn PackageDatabase, ui: &'a dyn Interaction, relocator: Relocator<M>) -> Self {
        Self { db, ui, relocator }
    }

    fn enter(&self, id: &str, stage: Stage) {
        debug!("{}: {:?}", id, stage);
    }

    /// Ask to continue unless quiet
    fn confirmed(&self, options: &RemovalOptions) -> Result<bool> {
        if options.quiet {
            return Ok(true);
        }
        self.ui.confirm("Continue?", false)
    }

    /// Remove one package
    ///
    /// Never returns an error: every failure is folded into the outcome so
    /// a batch can move on to the next package.
    pub fn remove_package(&self, id: &str, options: &RemovalOptions, mode: GateMode) -> RemovalOutcome {
        let _span = info_span!("remove", package = %id).entered();
        self.enter(id, Stage::Gated);

        match admit(id, options.force, mode) {
            Admission::Denied(reason) => {
                info!("Refused {}: {:?}", id, reason);
                self.ui.notice(Tone::Alert, &reason.to_string());
                return RemovalOutcome::Skipped(SkipReason::PolicyDenied(reason));
            }
            Admission::ConfirmFirst => {
                self.ui.notice(
                    Tone::Caution,
                    "Double check that you want to remove an Apple-provided package.\n\
                     This package may be required by macOS.",
                );
                match self.ui.confirm("Continue?", false) {
                    Ok(true) => {}
                    Ok(false) => return RemovalOutcome::Skipped(SkipReason::UserDeclined),
                    Err(e) => return RemovalOutcome::Failed(e),
                }
            }
            Admission::Admitted => {}
        }

        match self.run_admitted(id, options) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Removal of {} failed: {}", id, e);
                RemovalOutcome::Failed(e)
            }
        }
    }

    fn run_admitted(&self, id: &str, options: &RemovalOptions) -> Result<RemovalOutcome> {
        self.ui.notice(Tone::Plain, &format!("Removing package '{}'...", id));

        self.enter(id, Stage::Inspecting);
        let contents = inspect_package(self.db, &options.volume, id)?;
        let mut report = RemovalReport::default();

        if !contents.files.is_empty() {
            self.enter(id, Stage::AwaitingFileConfirmation);
            self.ui.notice(Tone::Plain, &path_list(&contents.files));
            self.ui.notice(
                Tone::Alert,
                &format!("{} file(s) will be permanently deleted!", contents.files.len()),
            );
            if !self.confirmed(options)? {
                return Ok(RemovalOutcome::Skipped(SkipReason::UserDeclined));
            }

            self.enter(id, Stage::Relocating);
            report.files_removed = self
                .relocator
                .relocate(id, &contents.files)
                .inspect_err(|e| self.explain_relocation_failure(e))?;
        }

        if !contents.directories.is_empty() {
            self.enter(id, Stage::AwaitingDirConfirmation);
            self.ui.notice(Tone::Plain, &path_list(&contents.directories));
            self.ui.notice(
                Tone::Alert,
                &format!(
                    "{} folder(s) will be permanently deleted when empty!",
                    contents.directories.len()
                ),
            );
            if !self.confirmed(options)? {
                return Ok(RemovalOutcome::Skipped(SkipReason::UserDeclined));
            }

            self.enter(id, Stage::Pruning);
            let pruned = prune_directories(&contents.directories);
            report.directories_retained = pruned.retained_paths().cloned().collect();
            report.directories_removed = pruned.removed;

            if !report.directories_retained.is_empty() {
                self.ui.notice(Tone::Plain, "These directories are not removed:");
                self.ui.notice(Tone::Caution, &path_list(&report.directories_retained));
                self.ui.notice(
                    Tone::Plain,
                    "This is not an error because they may be used by other packages.",
                );
            }
        }

        self.enter(id, Stage::Deregistering);
        report.receipt_forgotten = self.forget_receipt(id, &options.volume);

        self.enter(id, Stage::Done);
        info!(
            "Removed {}: {} file(s), {} dir(s), {} dir(s) kept",
            id,
            report.files_removed,
            report.directories_removed.len(),
            report.directories_retained.len()
        );
        Ok(RemovalOutcome::Removed(report))
    }

    /// Deregister the receipt; failure only warns
    fn forget_receipt(&self, id: &str, volume: &Volume) -> bool {
        let forgotten = match self.db.forget(volume, id) {
            Ok(forgotten) => forgotten,
            Err(e) => {
                warn!("Failed to forget receipt for {}: {}", id, e);
                false
            }
        };

        if !forgotten {
            self.ui.notice(
                Tone::Caution,
                &format!("Cannot unregister receipt for '{}'.", id),
            );
            self.ui
                .notice(Tone::Plain, "All files installed by this package are deleted.");
        }
        forgotten
    }

    fn explain_relocation_failure(&self, err: &Error) {
        self.ui.notice(Tone::Alert, &err.to_string());

        // A partial restore already names the stranded count and backup path
        if !matches!(err, Error::PartialRestore { .. }) {
            self.ui
                .notice(Tone::Caution, "Error encountered, moved files were restored.");
        }

        if err.is_permission_denied() {
            self.ui
                .notice(Tone::Alert, "You must be root to remove this package!");
        }
    }

    /// Remove every installed package `selector` picks
    ///
    /// Errors only when the installed list itself cannot be read; per
    /// package failures are collected in the report.
    pub fn remove_packages(
        &self,
        selector: &PackageSelector,
        options: &RemovalOptions,
        sip: SipState,
    ) -> Result<BatchReport> {
        let installed = list_installed(self.db, &options.volume)?;
        let selected = selector.filter(&installed);
        let mut report = BatchReport::default();

        if selected.is_empty() {
            self.ui
                .notice(Tone::Caution, "No packages found matching given conditions.");
            return Ok(report);
        }

        self.ui.notice(Tone::Plain, &selected.join("\n"));
        self.ui.notice(
            Tone::Caution,
            &format!("{} package(s) will be removed.", selected.len()),
        );
        if !options.quiet && !self.ui.confirm("Continue?", true)? {
            self.ui.notice(Tone::Plain, "User cancelled removal operation.");
            report.cancelled = true;
            return Ok(report);
        }

        let mode = GateMode::Batch { sip };
        for id in selected {
            let outcome = self.remove_package(&id, options, mode);
            if outcome.is_removed() {
                self.ui
                    .notice(Tone::Success, &format!("Package '{}' was removed!", id));
            } else {
                self.ui
                    .notice(Tone::Alert, &format!("Package '{}' was not removed!", id));
            }
            report.outcomes.push((id, outcome));
        }

        Ok(report)
    }

    /// Batch removal as a top-level operation
    ///
    /// Reports the privilege level and SIP state once, then removes the
    /// selection. With SIP enabled, force is implied for every package.
    pub fn run_batch(
        &self,
        selector: &PackageSelector,
        options: &RemovalOptions,
        privilege: PrivilegeLevel,
        sip: SipState,
    ) -> Result<BatchReport> {
        if !privilege.is_root() {
            self.ui
                .notice(Tone::Alert, "It is recommended to run this tool as root!");
        }

        match sip {
            SipState::Enabled => {
                self.ui
                    .notice(Tone::Success, "System Integrity Protection is enabled.");
                self.ui.notice(
                    Tone::Plain,
                    "Critical packages bundled with macOS cannot be removed.\n\
                     You may remove Apple-provided packages without using 'force' flag.",
                );
            }
            SipState::Disabled => {
                self.ui
                    .notice(Tone::Alert, "System Integrity Protection is disabled.");
                self.ui.notice(
                    Tone::Plain,
                    "Critical packages bundled with macOS can now be removed.\n\
                     You must supply 'force' flag to remove Apple-provided packages.",
                );
            }
        }

        self.remove_packages(selector, options, sip)
    }
}
