// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeSet, HashSet};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use loom_retrace_core::line_reader::{ChunkSource, DEFAULT_BUFFER_SIZE};
use loom_retrace_core::{
	ClassNameMapper, ClassReference, DiagnosticsHandler, LineReader, MapLineReader, MapVersionInfo, ParseOptions,
};
use tracing::{debug, info, instrument};

use super::MappingSupplier;
use crate::error::Result;
use crate::retracer::Retracer;

/// Where an eager supplier reads its mapping from.
#[derive(Debug, Clone)]
pub enum MappingSource {
	Path {
		path: PathBuf,
		use_mmap: bool,
		buffer_size: usize,
	},
	Bytes(Arc<[u8]>),
}

impl MappingSource {
	pub fn path(path: impl Into<PathBuf>) -> Self {
		Self::Path {
			path: path.into(),
			use_mmap: true,
			buffer_size: DEFAULT_BUFFER_SIZE,
		}
	}

	pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
		Self::Bytes(bytes.into())
	}

	fn open(&self, filter: Option<(HashSet<String>, bool)>) -> Result<Box<dyn LineReader>> {
		Ok(match self {
			Self::Path {
				path, use_mmap: true, ..
			} => filtered(MapLineReader::mapped(path)?, filter),
			Self::Path { path, buffer_size, .. } => filtered(MapLineReader::open(path, *buffer_size)?, filter),
			Self::Bytes(bytes) => filtered(
				MapLineReader::stream_with_capacity(Cursor::new(Arc::clone(bytes)), DEFAULT_BUFFER_SIZE),
				filter,
			),
		})
	}
}

fn filtered<S: ChunkSource + 'static>(
	reader: MapLineReader<S>,
	filter: Option<(HashSet<String>, bool)>,
) -> Box<dyn LineReader> {
	match filter {
		Some((classes, read_preamble)) => Box::new(reader.with_class_filter(classes, read_preamble)),
		None => Box::new(reader),
	}
}

/// Reads the mapping text directly.
///
/// With `load_all_definitions` the whole mapping is parsed on the first
/// [`MappingSupplier::create_retracer`] call and the source is released.
/// Otherwise every call re-reads the source filtered to the classes
/// registered since the last call.
#[derive(Debug)]
pub struct EagerMappingSupplier {
	source: Option<MappingSource>,
	load_all_definitions: bool,
	parse_options: ParseOptions,
	mapper: Option<Arc<ClassNameMapper>>,
	pending: HashSet<String>,
	built: HashSet<String>,
}

impl EagerMappingSupplier {
	pub fn new(source: MappingSource) -> Self {
		Self {
			source: Some(source),
			load_all_definitions: true,
			parse_options: ParseOptions::default(),
			mapper: None,
			pending: HashSet::new(),
			built: HashSet::new(),
		}
	}

	pub fn with_load_all_definitions(mut self, load_all_definitions: bool) -> Self {
		self.load_all_definitions = load_all_definitions;
		self
	}

	pub fn with_parse_options(mut self, parse_options: ParseOptions) -> Self {
		self.parse_options = parse_options;
		self
	}

	/// Class names registered but not yet loaded.
	pub fn pending_classes(&self) -> impl Iterator<Item = &str> {
		self.pending.iter().map(String::as_str)
	}

	fn needs_load(&self) -> bool {
		self.mapper.is_none() || (!self.pending.is_empty() && self.source.is_some())
	}

	#[instrument(skip_all, fields(pending = self.pending.len()))]
	fn load(&mut self, diagnostics: &dyn DiagnosticsHandler) -> Result<Arc<ClassNameMapper>> {
		if !self.needs_load() {
			self.built.extend(self.pending.drain());
			return Ok(self.current_mapper());
		}
		let Some(source) = &self.source else {
			return Ok(self.current_mapper());
		};
		let filter = (!self.load_all_definitions).then(|| (self.pending.clone(), self.mapper.is_none()));
		// Filtered re-reads skip the preamble that declares the version.
		let mut options = self.parse_options;
		if let Some(info) = self.mapper.as_ref().and_then(|mapper| mapper.first_map_version()) {
			options.map_version = info.version;
		}
		let mut reader = source.open(filter)?;
		let parsed = ClassNameMapper::from_line_reader(reader.as_mut(), options);
		reader.close()?;
		let parsed = parsed.inspect_err(|error| diagnostics.error(&error.to_string()))?;

		// Freshly read classes replace the header-only entries of earlier
		// filtered reads.
		let mapper = match self.mapper.take() {
			None => parsed,
			Some(previous) => {
				let mut fresh = parsed;
				fresh.combine(Arc::unwrap_or_clone(previous));
				fresh
			}
		};
		let loaded = self.pending.len();
		self.built.extend(self.pending.drain());
		if self.load_all_definitions {
			self.source = None;
			info!(classes = mapper.len(), "Loaded complete mapping");
		} else {
			debug!(classes = loaded, "Loaded requested classes");
		}
		let mapper = Arc::new(mapper);
		self.mapper = Some(Arc::clone(&mapper));
		Ok(mapper)
	}

	fn current_mapper(&self) -> Arc<ClassNameMapper> {
		self.mapper.clone().unwrap_or_default()
	}
}

impl MappingSupplier for EagerMappingSupplier {
	fn register_class_use(&mut self, class: &ClassReference) {
		let name = class.type_name();
		if !self.built.contains(name) && !self.pending.contains(name) {
			self.pending.insert(name.to_string());
		}
	}

	fn create_retracer(&mut self, diagnostics: Arc<dyn DiagnosticsHandler>) -> Result<Retracer> {
		let mapper = self.load(diagnostics.as_ref())?;
		Ok(Retracer::new(mapper, diagnostics))
	}

	fn map_versions(&mut self, diagnostics: Arc<dyn DiagnosticsHandler>) -> Result<BTreeSet<MapVersionInfo>> {
		let mapper = self.load(diagnostics.as_ref())?;
		Ok(mapper.map_versions().clone())
	}
}
