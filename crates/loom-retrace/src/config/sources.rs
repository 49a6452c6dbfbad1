// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, environment variables and
//! command-line overrides.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use super::layer::RetraceConfigLayer;
use crate::error::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	Cli = 90,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<RetraceConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
		Ok(RetraceConfigLayer::default())
	}
}

/// TOML file source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `$XDG_CONFIG_HOME/loom/retrace.toml`, when a config directory exists.
	pub fn user() -> Option<Self> {
		let config_home = std::env::var_os("XDG_CONFIG_HOME")
			.map(PathBuf::from)
			.or_else(dirs::config_dir)?;
		Some(Self::new(config_home.join("loom").join("retrace.toml")))
	}

	pub fn path(&self) -> &PathBuf {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(RetraceConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: RetraceConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: LOOM_RETRACE_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_from_env(|name| std::env::var(name).ok())
	}
}

/// Overrides given on the command line.
pub struct CliSource(pub RetraceConfigLayer);

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
		Ok(self.0.clone())
	}
}

fn load_from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<RetraceConfigLayer, ConfigError> {
	let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
	let flag = |name: &str| var(name).map(|value| value.eq_ignore_ascii_case("true") || value == "1");
	Ok(RetraceConfigLayer {
		verbose: flag("LOOM_RETRACE_VERBOSE"),
		regex: var("LOOM_RETRACE_REGEX"),
		buffer_size: parse("LOOM_RETRACE_BUFFER_SIZE", var("LOOM_RETRACE_BUFFER_SIZE"))?,
		use_mmap: flag("LOOM_RETRACE_USE_MMAP"),
		load_all_definitions: flag("LOOM_RETRACE_LOAD_ALL_DEFINITIONS"),
		allow_experimental: flag("LOOM_RETRACE_ALLOW_EXPERIMENTAL"),
	})
}

fn parse<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
	match value {
		Some(v) => v
			.parse()
			.map(Some)
			.map_err(|_| ConfigError::invalid_value(name, format!("invalid value '{v}'"))),
		None => Ok(None),
	}
}
