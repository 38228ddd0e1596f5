use dialoguer::{theme::ColorfulTheme, Select};

use crate::types::Role;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Role selection cancelled")]
    Cancelled,
    #[error("Multiple roles available, pick one with --role-arn: {}", .0.join(", "))]
    SelectionRequired(Vec<String>),
    #[error("Role selection prompt failed: {0}")]
    Terminal(#[from] dialoguer::Error),
}

/// Lets the user disambiguate when more than one role is available.
pub trait SelectRole {
    /// Returns the role ARN of the chosen entry.
    fn select_one(&self, roles: &[Role]) -> Result<String, Error>;
}

pub struct TerminalSelector {
    theme: ColorfulTheme,
}

impl TerminalSelector {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectRole for TerminalSelector {
    fn select_one(&self, roles: &[Role]) -> Result<String, Error> {
        let selected = Select::with_theme(&self.theme)
            .with_prompt("Select a role")
            .items(roles)
            .default(0)
            .max_length(roles.len())
            .report(true)
            .interact_opt()?
            .ok_or(Error::Cancelled)?;
        Ok(roles[selected].role_arn.clone())
    }
}

/// Selector for headless runs: ambiguity is always an error.
pub struct NonInteractiveSelector;

impl SelectRole for NonInteractiveSelector {
    fn select_one(&self, roles: &[Role]) -> Result<String, Error> {
        Err(Error::SelectionRequired(
            roles.iter().map(|role| role.role_arn.clone()).collect(),
        ))
    }
}
