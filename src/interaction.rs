// src/interaction.rs

//! User-facing output and prompts
//!
//! The removal flow talks to the user only through [`Interaction`], so it
//! can run against a terminal or a scripted stand-in.

use crate::error::{Error, Result};
use console::{Style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};

/// Severity of a message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    /// Something worked
    Success,
    /// Worth attention, not a failure
    Caution,
    /// Something was refused or failed
    Alert,
}

pub trait Interaction {
    /// Show one message (may span lines)
    fn notice(&self, tone: Tone, message: &str);

    /// Yes/no question with a default answer
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Pick one of `items`, returned verbatim
    fn select(&self, prompt: &str, items: &[String]) -> Result<String>;
}

/// Rows visible at once in selection menus
const PAGE_SIZE: usize = 10;

/// [`Interaction`] on the controlling terminal
///
/// Messages go to stdout, prompts to stderr.
#[derive(Debug, Clone)]
pub struct TerminalInteraction {
    term: Term,
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self::default()
    }
}

fn style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::new(),
        Tone::Success => Style::new().green(),
        Tone::Caution => Style::new().yellow(),
        Tone::Alert => Style::new().red().bold(),
    }
}

impl Interaction for TerminalInteraction {
    fn notice(&self, tone: Tone, message: &str) {
        let style = style(tone);
        for line in message.lines() {
            // stdout going away is not worth failing a removal over
            let _ = self.term.write_line(&style.apply_to(line).to_string());
        }
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| Error::Prompt(e.to_string()))
    }

    fn select(&self, prompt: &str, items: &[String]) -> Result<String> {
        let index = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .max_length(PAGE_SIZE)
            .interact()
            .map_err(|e| Error::Prompt(e.to_string()))?;

        items
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Prompt(format!("selection {} out of range", index)))
    }
}
