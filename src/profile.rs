use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::host::string_field;

/// A git identity plus an optional working directory to open a shell in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TerminalProfile {
    pub name: String,
    pub git_username: String,
    pub git_email: String,
    pub ssh_key_path: String,
    pub working_dir: String,
}

impl TerminalProfile {
    pub fn new(
        name: impl Into<String>,
        git_username: impl Into<String>,
        git_email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            git_username: git_username.into(),
            git_email: git_email.into(),
            ..Default::default()
        }
    }

    /// Decodes a stored profile object; every missing field is an empty string.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            name: string_field(object.get("name")),
            git_username: string_field(object.get("git_username")),
            git_email: string_field(object.get("git_email")),
            ssh_key_path: string_field(object.get("ssh_key_path")),
            working_dir: string_field(object.get("working_dir")),
        })
    }

    pub fn display_text(&self) -> String {
        format!("{} - {} <{}>", self.name, self.git_username, self.git_email)
    }

    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        [&self.name, &self.git_username, &self.git_email]
            .iter()
            .any(|field| field.to_lowercase().contains(&filter))
    }

    pub fn duplicate(&self) -> Self {
        Self {
            name: format!("{} (copy)", self.name),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub git_username: String,
    pub git_email: String,
    pub ssh_key_path: String,
    pub working_dir: String,
}

impl ProfileForm {
    pub fn from_record(profile: &TerminalProfile) -> Self {
        Self {
            name: profile.name.clone(),
            git_username: profile.git_username.clone(),
            git_email: profile.git_email.clone(),
            ssh_key_path: profile.ssh_key_path.clone(),
            working_dir: profile.working_dir.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::ProfileNameRequired);
        }
        if self.git_username.trim().is_empty() {
            return Err(ValidationError::GitUsernameRequired);
        }
        let email = self.git_email.trim();
        if email.is_empty() {
            return Err(ValidationError::GitEmailRequired);
        }
        if !email.contains('@') {
            return Err(ValidationError::GitEmailInvalid);
        }
        Ok(())
    }

    pub fn into_record(self) -> Option<TerminalProfile> {
        let profile = TerminalProfile {
            name: self.name.trim().to_string(),
            git_username: self.git_username.trim().to_string(),
            git_email: self.git_email.trim().to_string(),
            ssh_key_path: self.ssh_key_path.trim().to_string(),
            working_dir: self.working_dir.trim().to_string(),
        };
        if profile.name.is_empty() || profile.git_username.is_empty() || profile.git_email.is_empty()
        {
            return None;
        }
        Some(profile)
    }
}
