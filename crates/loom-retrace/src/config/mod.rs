// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered retrace configuration.
//!
//! Precedence (highest to lowest):
//! 1. Command-line overrides
//! 2. Environment variables (`LOOM_RETRACE_*`)
//! 3. Config file (`$XDG_CONFIG_HOME/loom/retrace.toml` or an explicit path)
//! 4. Built-in defaults

mod layer;
mod sources;

use std::path::{Path, PathBuf};

use loom_retrace_core::line_reader::DEFAULT_BUFFER_SIZE;
use loom_retrace_core::ParseOptions;
use tracing::{debug, info};

pub use layer::RetraceConfigLayer;
pub use sources::{CliSource, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use crate::error::ConfigError;
use crate::supplier::MappingSource;
use crate::template::StackTraceLineParser;

/// Fully resolved retrace configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetraceConfig {
	pub verbose: bool,
	/// Line template; `None` selects the default template.
	pub regex: Option<String>,
	pub buffer_size: usize,
	pub use_mmap: bool,
	pub load_all_definitions: bool,
	pub allow_experimental: bool,
}

impl Default for RetraceConfig {
	fn default() -> Self {
		Self {
			verbose: false,
			regex: None,
			buffer_size: DEFAULT_BUFFER_SIZE,
			use_mmap: true,
			load_all_definitions: true,
			allow_experimental: false,
		}
	}
}

impl RetraceConfig {
	/// Fills defaults and validates.
	pub fn from_layer(layer: RetraceConfigLayer) -> Result<Self, ConfigError> {
		let defaults = Self::default();
		let config = Self {
			verbose: layer.verbose.unwrap_or(defaults.verbose),
			regex: layer.regex,
			buffer_size: layer.buffer_size.unwrap_or(defaults.buffer_size),
			use_mmap: layer.use_mmap.unwrap_or(defaults.use_mmap),
			load_all_definitions: layer.load_all_definitions.unwrap_or(defaults.load_all_definitions),
			allow_experimental: layer.allow_experimental.unwrap_or(defaults.allow_experimental),
		};
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.buffer_size == 0 {
			return Err(ConfigError::invalid_value("buffer_size", "must be greater than zero"));
		}
		StackTraceLineParser::compile(self.regex.as_deref())
			.map_err(|e| ConfigError::invalid_value("regex", e.to_string()))?;
		Ok(())
	}

	pub fn parser(&self) -> crate::Result<StackTraceLineParser> {
		StackTraceLineParser::compile(self.regex.as_deref())
	}

	pub fn parse_options(&self) -> ParseOptions {
		ParseOptions {
			allow_experimental: self.allow_experimental,
			..ParseOptions::default()
		}
	}

	/// A mapping file source honouring the reader settings.
	pub fn mapping_source(&self, path: impl Into<PathBuf>) -> MappingSource {
		MappingSource::Path {
			path: path.into(),
			use_mmap: self.use_mmap,
			buffer_size: self.buffer_size,
		}
	}
}

/// Loads configuration from the user config file, the environment and
/// `overrides`.
pub fn load_config(overrides: RetraceConfigLayer) -> Result<RetraceConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource), Box::new(EnvSource)];
	if let Some(user) = TomlSource::user() {
		sources.push(Box::new(user));
	}
	sources.push(Box::new(CliSource(overrides)));
	load_from_sources(sources)
}

/// Like [`load_config`] with an explicit config file instead of the user one.
pub fn load_config_with_file(
	config_path: impl AsRef<Path>,
	overrides: RetraceConfigLayer,
) -> Result<RetraceConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path.as_ref())),
		Box::new(EnvSource),
		Box::new(CliSource(overrides)),
	];
	load_from_sources(sources)
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<RetraceConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = RetraceConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	let config = RetraceConfig::from_layer(merged)?;
	info!(
		verbose = config.verbose,
		custom_regex = config.regex.is_some(),
		buffer_size = config.buffer_size,
		use_mmap = config.use_mmap,
		load_all_definitions = config.load_all_definitions,
		"Retrace configuration loaded"
	);
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = RetraceConfig::from_layer(RetraceConfigLayer::default()).unwrap();
		assert_eq!(config, RetraceConfig::default());
		assert_eq!(config.buffer_size, 8192);
		assert!(config.use_mmap);
		assert!(config.load_all_definitions);
	}

	#[test]
	fn test_zero_buffer_is_rejected() {
		let layer = RetraceConfigLayer {
			buffer_size: Some(0),
			..Default::default()
		};
		let error = RetraceConfig::from_layer(layer).unwrap_err();
		assert!(error.to_string().contains("buffer_size"));
	}

	#[test]
	fn test_invalid_template_is_rejected() {
		let layer = RetraceConfigLayer {
			regex: Some("at %q".into()),
			..Default::default()
		};
		assert!(matches!(
			RetraceConfig::from_layer(layer),
			Err(ConfigError::InvalidValue { ref key, .. }) if key == "regex"
		));
	}

	#[test]
	fn test_cli_overrides_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		std::io::Write::write_all(&mut file, b"verbose = true\nbuffer_size = 1024\n").unwrap();
		let config = load_from_sources(vec![
			Box::new(CliSource(RetraceConfigLayer {
				buffer_size: Some(2048),
				..Default::default()
			})),
			Box::new(TomlSource::new(file.path())),
			Box::new(DefaultsSource),
		])
		.unwrap();
		assert!(config.verbose);
		assert_eq!(config.buffer_size, 2048);
	}

	#[test]
	fn test_mapping_source_uses_reader_settings() {
		let config = RetraceConfig {
			use_mmap: false,
			buffer_size: 64,
			..Default::default()
		};
		assert!(matches!(
			config.mapping_source("map.txt"),
			MappingSource::Path { use_mmap: false, buffer_size: 64, .. }
		));
	}
}
