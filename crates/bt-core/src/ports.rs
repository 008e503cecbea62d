//! Node input ports.
//!
//! A node declares the ports it understands (`PortsList`) and the tree author supplies values
//! (`Ports`). Reading goes through [`NodeConfig::get_input`], which applies declared defaults.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BtError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: &'static str,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

impl PortInfo {
    pub const fn input(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            default: None,
            description,
        }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

pub type PortsList = Vec<PortInfo>;

/// Port values as written by the tree author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ports {
    values: BTreeMap<String, String>,
}

impl Ports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.values.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Parse a flat YAML mapping of port values. Scalars of any kind are accepted
    /// (`server_timeout: 250` and `server_timeout: "250"` are equivalent).
    pub fn from_yaml(src: &str) -> Result<Self, BtError> {
        let raw: BTreeMap<String, serde_yaml::Value> =
            serde_yaml::from_str(src).map_err(|e| BtError::PortsParse(e.to_string()))?;

        let mut ports = Ports::new();
        for (name, value) in raw {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(BtError::PortsParse(format!(
                        "port `{name}` must be a scalar, got {other:?}"
                    )))
                }
            };
            ports.values.insert(name, text);
        }
        Ok(ports)
    }
}

/// Declared ports plus supplied values for one node instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeConfig {
    pub ports: Ports,
    pub declared: PortsList,
}

impl NodeConfig {
    pub fn new(declared: PortsList, ports: Ports) -> Self {
        Self { ports, declared }
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declared.iter().any(|p| p.name == name)
    }

    pub fn get_input<T>(&self, name: &str) -> Result<T, BtError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(info) = self.declared.iter().find(|p| p.name == name) else {
            return Err(BtError::PortNotDeclared {
                port: name.to_string(),
            });
        };

        let raw = match self.ports.get(name).or(info.default) {
            Some(raw) => raw,
            None => {
                return Err(BtError::MissingPort {
                    port: name.to_string(),
                })
            }
        };

        raw.trim().parse::<T>().map_err(|e| BtError::InvalidPort {
            port: name.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }
}
