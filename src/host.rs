use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// A named URL attached to a host. Only used for navigation, never passed to ssh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}

/// One stored SSH destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub name: String,
    pub ip: String,
    pub username: String,
    pub port: u16,
    pub certificate: String,
    pub links: Vec<Link>,
}

impl Default for HostRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            ip: String::new(),
            username: String::new(),
            port: DEFAULT_SSH_PORT,
            certificate: String::new(),
            links: Vec::new(),
        }
    }
}

impl HostRecord {
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            ..Default::default()
        }
    }

    /// Decodes a stored host object.
    ///
    /// Missing or mistyped fields take their defaults: empty strings, port 22,
    /// no links. Unknown keys are ignored. Returns `None` when `value` is not
    /// an object at all.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let links = object
            .get("links")
            .and_then(Value::as_array)
            .map(|links| {
                links
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|link| Link {
                        name: string_field(link.get("name")),
                        url: string_field(link.get("url")),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            name: string_field(object.get("name")),
            ip: string_field(object.get("ip")),
            username: string_field(object.get("username")),
            port: object.get("port").map_or(DEFAULT_SSH_PORT, decode_port),
            certificate: string_field(object.get("certificate")),
            links,
        })
    }

    /// `user@ip`, or just `ip` when no user is set.
    pub fn target(&self) -> String {
        if self.username.is_empty() {
            self.ip.clone()
        } else {
            format!("{}@{}", self.username, self.ip)
        }
    }

    pub fn display_text(&self) -> String {
        let mut host = self.target();
        if self.port != DEFAULT_SSH_PORT {
            host.push_str(&format!(":{}", self.port));
        }
        format!("{} - {}", self.name, host)
    }

    pub fn links_text(&self) -> String {
        self.links
            .iter()
            .map(|link| link.name.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Case-insensitive substring match on name or address.
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.name.to_lowercase().contains(&filter) || self.ip.to_lowercase().contains(&filter)
    }

    pub fn duplicate(&self) -> Self {
        Self {
            name: format!("{} (copy)", self.name),
            ..self.clone()
        }
    }
}

pub(crate) fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

// Stored ports may be numbers or numeric strings; anything unusable becomes 22.
fn decode_port(value: &Value) -> u16 {
    let port = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    port.and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .unwrap_or(DEFAULT_SSH_PORT)
}

/// Strict port check used while the user is typing into the form.
///
/// Empty input is accepted and means "use the default".
pub fn validate_port_input(text: &str) -> Result<Option<u16>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let port: i64 = text.parse().map_err(|_| ValidationError::PortNotANumber)?;
    if !(1..=65535).contains(&port) {
        return Err(ValidationError::PortOutOfRange);
    }
    Ok(Some(port as u16))
}

/// Lenient port conversion used when a form is turned into a record.
pub fn port_or_default(text: &str) -> u16 {
    validate_port_input(text)
        .ok()
        .flatten()
        .unwrap_or(DEFAULT_SSH_PORT)
}

/// Raw, untrimmed contents of the host editor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostForm {
    pub name: String,
    pub ip: String,
    pub username: String,
    pub port: String,
    pub certificate: String,
    pub links: Vec<Link>,
}

impl HostForm {
    pub fn from_record(host: &HostRecord) -> Self {
        Self {
            name: host.name.clone(),
            ip: host.ip.clone(),
            username: host.username.clone(),
            port: host.port.to_string(),
            certificate: host.certificate.clone(),
            links: host.links.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::HostNameRequired);
        }
        if self.ip.trim().is_empty() {
            return Err(ValidationError::HostIpRequired);
        }
        validate_port_input(&self.port)?;
        Ok(())
    }

    /// Builds the record to store. Bad ports fall back to 22 here instead of
    /// being rejected, and half-filled links are dropped.
    pub fn into_record(self) -> Option<HostRecord> {
        let name = self.name.trim().to_string();
        let ip = self.ip.trim().to_string();
        if name.is_empty() || ip.is_empty() {
            return None;
        }

        let links = self
            .links
            .into_iter()
            .map(|link| Link {
                name: link.name.trim().to_string(),
                url: link.url.trim().to_string(),
            })
            .filter(|link| !link.name.is_empty() && !link.url.is_empty())
            .collect();

        Some(HostRecord {
            name,
            ip,
            username: self.username.trim().to_string(),
            port: port_or_default(&self.port),
            certificate: self.certificate.trim().to_string(),
            links,
        })
    }
}
