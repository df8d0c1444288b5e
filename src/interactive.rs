// src/interactive.rs

//! Keyboard-driven removal
//!
//! Pick a volume, pick a package, remove it, repeat. Vendor packages need
//! the force flag and an extra confirmation here.

use crate::error::Result;
use crate::interaction::Tone;
use crate::pkgdb::list_installed;
use crate::policy::GateMode;
use crate::relocate::FileMover;
use crate::remove::{RemovalOptions, RemovalOutcome, Remover};
use crate::system::PrivilegeLevel;
use crate::volume::{Volume, mounted_volumes};
use std::path::Path;
use tracing::debug;

pub const CHANGE_VOLUME: &str = "1. Change volume to operate on.";
pub const REMOVE_ANOTHER: &str = "2. Remove another package.";
pub const EXIT: &str = "3. Exit";

const NAVIGATION_HINT: &str = "↑/↓ change selection | ⏎ confirm";

impl<'a, M: FileMover> Remover<'a, M> {
    fn prompt_for_volume(&self, volumes_dir: &Path) -> Result<Volume> {
        let volumes: Vec<String> = mounted_volumes(volumes_dir)?
            .into_iter()
            .map(|p| p.display().to_string())
            .collect();

        match volumes.as_slice() {
            [] => Ok(Volume::root()),
            [only] => Volume::resolve_in(only, volumes_dir),
            _ => {
                self.ui.notice(Tone::Plain, NAVIGATION_HINT);
                let chosen = self.ui.select("Start by choosing a volume", &volumes)?;
                Volume::resolve_in(&chosen, volumes_dir)
            }
        }
    }

    /// One round: choose and remove a package on `volume`
    ///
    /// Returns `None` when the volume has nothing installed.
    fn prompt_for_package(&self, volume: &Volume, force: bool) -> Result<Option<(String, RemovalOutcome)>> {
        let packages = list_installed(self.db, volume)?;
        if packages.is_empty() {
            self.ui
                .notice(Tone::Alert, "No packages found on specified volume.");
            return Ok(None);
        }

        self.ui.notice(Tone::Plain, NAVIGATION_HINT);
        let package = self.ui.select("Choose a package to remove", &packages)?;
        debug!("Selected {} on {}", package, volume);

        let options = RemovalOptions {
            volume: volume.clone(),
            force,
            quiet: false,
        };
        let outcome = self.remove_package(&package, &options, GateMode::Interactive);
        if outcome.is_removed() {
            self.ui
                .notice(Tone::Success, &format!("Package '{}' was removed!", package));
        } else {
            self.ui
                .notice(Tone::Alert, &format!("Package '{}' was not removed!", package));
        }

        Ok(Some((package, outcome)))
    }

    /// Run the interactive loop until the user exits
    ///
    /// Refuses to start without root. Returns the outcome of every package
    /// the user picked.
    pub fn run_interactive(
        &self,
        privilege: PrivilegeLevel,
        volumes_dir: &Path,
        force: bool,
    ) -> Result<Vec<(String, RemovalOutcome)>> {
        let mut outcomes = Vec::new();
        if !privilege.is_root() {
            self.ui
                .notice(Tone::Alert, "Interactive mode must be started as root.");
            return Ok(outcomes);
        }

        let mut volume = self.prompt_for_volume(volumes_dir)?;
        let next_steps = [CHANGE_VOLUME, REMOVE_ANOTHER, EXIT].map(String::from);

        loop {
            if let Some(result) = self.prompt_for_package(&volume, force)? {
                outcomes.push(result);
            }

            let next = self.ui.select("What would you like to do next", &next_steps)?;
            match next.chars().next() {
                Some('1') => volume = self.prompt_for_volume(volumes_dir)?,
                Some('2') => continue,
                _ => break,
            }
        }

        Ok(outcomes)
    }
}
