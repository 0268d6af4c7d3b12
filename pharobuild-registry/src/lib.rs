use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use pharobuild_api::config::{Config, ConfigCapsule};
use pharobuild_api::vm::{VmDescriptor, VmName};

mod errors;
mod validate;

pub use errors::{Error, Result};
pub use validate::{validate_default_image, validate_executable, validate_name};

/// The set of virtual machines a build may refer to.
///
/// Constructed explicitly (usually from a registry file) and handed to whoever needs it.
/// Membership is decided by configuration; builds only read from it.
#[derive(Clone, Debug, Default)]
pub struct Registry {
	vms: IndexMap<VmName, VmDescriptor>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_config(config: impl Into<Config>) -> Self {
		Registry {
			vms: config.into().vms,
		}
	}

	/// Reads and parses a registry file.
	///
	/// A file that doesn't parse comes back as [Error::ConfigFileInvalid], with the text read.
	/// No validation of the descriptors happens here; see [Registry::check].
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let text = fs::read_to_string(path).map_err(|cause| Error::ConfigRead {
			path: path.to_owned(),
			cause,
		})?;
		match serde_json::from_str::<ConfigCapsule>(&text) {
			Ok(capsule) => Ok(Self::from_config(capsule)),
			Err(cause) => Err(Error::ConfigFileInvalid {
				path: path.to_owned(),
				text,
				cause,
			}),
		}
	}

	pub fn parse(source: &str) -> Result<Self> {
		let capsule: ConfigCapsule =
			serde_json::from_str(source).map_err(|cause| Error::ConfigParse { cause })?;
		Ok(Self::from_config(capsule))
	}

	/// Adds or replaces a descriptor, returning the one it replaced.
	pub fn insert(&mut self, name: VmName, vm: VmDescriptor) -> Option<VmDescriptor> {
		self.vms.insert(name, vm)
	}

	pub fn lookup(&self, name: &VmName) -> Result<&VmDescriptor> {
		self.vms.get(name).ok_or_else(|| Error::VmNotFound {
			name: name.clone(),
		})
	}

	pub fn iter(&self) -> impl Iterator<Item = (&VmName, &VmDescriptor)> {
		self.vms.iter()
	}

	pub fn len(&self) -> usize {
		self.vms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vms.is_empty()
	}

	/// Runs every validation against every descriptor and collects all the problems found.
	/// Relative default image names are resolved against `image_dir`.
	///
	/// An empty result means the registry is usable as far as we can tell from here;
	/// files can of course still disappear before a build gets to them.
	pub fn check(&self, image_dir: &Path) -> Vec<(VmName, Error)> {
		let mut problems = Vec::new();
		for (name, vm) in &self.vms {
			let results = [
				validate_name(name),
				validate_executable(&vm.executable),
				validate_default_image(image_dir, &vm.default_image),
			];
			problems.extend(
				results
					.into_iter()
					.filter_map(|result| result.err())
					.map(|err| (name.clone(), err)),
			);
		}
		problems
	}
}
