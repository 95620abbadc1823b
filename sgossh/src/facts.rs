//! Device facts: identity, version and hardware details.
//!
//! Facts are gathered by named collectors, each owning the commands it runs
//! and the fields it extracts:
//!
//! | subset     | commands                                                  | facts                                 |
//! |------------|-----------------------------------------------------------|---------------------------------------|
//! | `default`  | `show version`, `show appliance-name`, hardware info URL  | version, serialnum, hostname, model   |
//! | `hardware` | `show status`                                             | memtotal_mb, memfree_mb               |
//!
//! `default` always runs.

use std::sync::LazyLock;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::driver::{Directive, Response, SgosDriver};
use crate::error::{DriverError, Result};
use crate::transport::Transport;

const SHOW_VERSION: &str = "show version";
const SHOW_APPLIANCE_NAME: &str = "show appliance-name";
const SHOW_HARDWARE_INFO: &str = "show advanced-url /Diagnostics/Hardware/Info";
const SHOW_STATUS: &str = "show status";

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Version:\s+([ \S]+)").expect("valid regex"));
static SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Serial number:\s*(\S+)").expect("valid regex"));
static MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Model:\s+(\S+)").expect("valid regex"));
static HOSTNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Appliance name\s+:\s+(\S+)").expect("valid regex"));
static MEM_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Memory installed:\s+(\d+)").expect("valid regex"));
static MEM_FREE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Memory available:\s+(\d+)").expect("valid regex"));

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end().to_string())
}

/// Identity of the connected appliance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Always `"sgos"`.
    pub os: String,
    pub version: Option<String>,
    pub model: Option<String>,
    pub hostname: Option<String>,
}

/// What the driver offers, for callers that negotiate features.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub network_api: String,
    pub rpc: Vec<String>,
    pub device_info: DeviceInfo,
}

/// Operations listed in [`Capabilities::rpc`].
pub const RPC: &[&str] = &[
    "send",
    "run_command",
    "run_commands",
    "apply_config",
    "poll_until",
    "device_info",
    "gather_facts",
    "capabilities",
    "enable_response_logging",
    "disable_response_logging",
];

/// A single fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    Text(String),
    Number(u64),
    List(Vec<String>),
}

/// Facts in collection order.
pub type Facts = IndexMap<String, FactValue>;

/// A named group of facts and the commands that produce them.
pub trait FactCollector: Send + Sync {
    /// Subset name used in `gather_facts`.
    fn name(&self) -> &'static str;

    /// Commands to run, in order.
    fn commands(&self) -> &'static [&'static str];

    /// Extract facts from one response per command.
    fn populate(&self, responses: &[Response], facts: &mut Facts);
}

struct DefaultFacts;

impl FactCollector for DefaultFacts {
    fn name(&self) -> &'static str {
        "default"
    }

    fn commands(&self) -> &'static [&'static str] {
        &[SHOW_VERSION, SHOW_APPLIANCE_NAME, SHOW_HARDWARE_INFO]
    }

    fn populate(&self, responses: &[Response], facts: &mut Facts) {
        let output = |i: usize| responses.get(i).map(|r| r.result.as_str()).unwrap_or("");

        let fields = [
            ("version", capture(&VERSION, output(0))),
            ("serialnum", capture(&SERIAL, output(0))),
            ("hostname", capture(&HOSTNAME, output(1))),
            ("model", capture(&MODEL, output(2))),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                facts.insert(name.to_string(), FactValue::Text(value));
            }
        }
    }
}

struct HardwareFacts;

impl FactCollector for HardwareFacts {
    fn name(&self) -> &'static str {
        "hardware"
    }

    fn commands(&self) -> &'static [&'static str] {
        &[SHOW_STATUS]
    }

    fn populate(&self, responses: &[Response], facts: &mut Facts) {
        let Some(status) = responses.first() else {
            return;
        };

        for (name, re) in [("memtotal_mb", &*MEM_TOTAL), ("memfree_mb", &*MEM_FREE)] {
            if let Some(value) = capture(re, &status.result).and_then(|v| v.parse().ok()) {
                facts.insert(name.to_string(), FactValue::Number(value));
            }
        }
    }
}

static COLLECTORS: &[&dyn FactCollector] = &[&DefaultFacts, &HardwareFacts];

/// Names of every known fact subset.
pub fn subset_names() -> Vec<&'static str> {
    COLLECTORS.iter().map(|c| c.name()).collect()
}

/// Turn a `gather_subset` list into collectors, in registry order.
///
/// - `all` selects every subset, `!all` excludes every subset.
/// - `!name` excludes one subset.
/// - An empty selection means all; `default` is always included.
pub fn resolve_subsets<S: AsRef<str>>(subsets: &[S]) -> Result<Vec<&'static dyn FactCollector>> {
    let known = subset_names();
    let mut include: Vec<&str> = Vec::new();
    let mut exclude: Vec<&str> = Vec::new();

    for subset in subsets {
        let subset = subset.as_ref().trim();
        let (excluded, name) = match subset.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, subset),
        };

        let names: Vec<&str> = if name == "all" {
            known.clone()
        } else if let Some(found) = known.iter().find(|k| **k == name) {
            vec![*found]
        } else {
            return Err(DriverError::InvalidConfig {
                message: format!("unknown fact subset '{name}'; expected one of {known:?}"),
            }
            .into());
        };

        if excluded {
            exclude.extend(names);
        } else {
            include.extend(names);
        }
    }

    if include.is_empty() {
        include = known.clone();
    }

    Ok(COLLECTORS
        .iter()
        .copied()
        .filter(|c| c.name() == "default" || (include.contains(&c.name()) && !exclude.contains(&c.name())))
        .collect())
}

fn parse_device_info(version: &str, hardware: &str, appliance: &str) -> DeviceInfo {
    DeviceInfo {
        os: "sgos".to_string(),
        version: capture(&VERSION, version),
        model: capture(&MODEL, hardware),
        hostname: capture(&HOSTNAME, appliance),
    }
}

impl<T: Transport> SgosDriver<T> {
    /// Read version, model and appliance name.
    pub async fn device_info(&mut self) -> Result<DeviceInfo> {
        let commands = [SHOW_VERSION, SHOW_HARDWARE_INFO, SHOW_APPLIANCE_NAME].map(Directive::new);
        let responses = self.run_commands(&commands).await?;
        let output = |i: usize| responses[i].result.as_str();

        Ok(parse_device_info(output(0), output(1), output(2)))
    }

    /// Describe what this driver supports, including the device identity.
    pub async fn capabilities(&mut self) -> Result<Capabilities> {
        Ok(Capabilities {
            network_api: "cliconf".to_string(),
            rpc: RPC.iter().map(|s| s.to_string()).collect(),
            device_info: self.device_info().await?,
        })
    }

    /// Collect the requested fact subsets.
    ///
    /// The resolved subset names are recorded under `gather_subset`.
    pub async fn gather_facts<S: AsRef<str>>(&mut self, subsets: &[S]) -> Result<Facts> {
        let collectors = resolve_subsets(subsets)?;

        let mut facts = Facts::new();
        facts.insert(
            "gather_subset".to_string(),
            FactValue::List(collectors.iter().map(|c| c.name().to_string()).collect()),
        );

        for collector in collectors {
            debug!("gathering {} facts", collector.name());
            let commands: Vec<Directive> =
                collector.commands().iter().map(|c| Directive::new(*c)).collect();
            let responses = self.run_commands(&commands).await?;
            collector.populate(&responses, &mut facts);
        }

        Ok(facts)
    }
}
