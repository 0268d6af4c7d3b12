use std::path::PathBuf;

use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::build::ImageName;

/// Name a virtual machine is registered under.  Matched exactly, no normalization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, FromStr, Display)]
pub struct VmName(pub String);

impl From<&str> for VmName {
	fn from(name: &str) -> Self {
		VmName(name.to_owned())
	}
}

/// A configured Squeak/Pharo virtual machine.
///
/// The name is not part of this struct: descriptors live in a map keyed by [VmName],
/// so that uniqueness of names falls out of the data structure rather than needing a check.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VmDescriptor {
	/// Path to the VM binary.
	pub executable: PathBuf,

	/// Image used when a build request doesn't name a start image.
	pub default_image: ImageName,

	/// Code run before the build specific script.  Empty if unset.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub before_code: String,

	/// Code run after the build specific script.  Empty if unset.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub after_code: String,
}

impl VmDescriptor {
	pub fn new(executable: impl Into<PathBuf>, default_image: impl Into<ImageName>) -> Self {
		VmDescriptor {
			executable: executable.into(),
			default_image: default_image.into(),
			before_code: String::new(),
			after_code: String::new(),
		}
	}

	pub fn with_before_code(mut self, code: impl Into<String>) -> Self {
		self.before_code = code.into();
		self
	}

	pub fn with_after_code(mut self, code: impl Into<String>) -> Self {
		self.after_code = code.into();
		self
	}
}
