use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::constants::{CHANGES_EXTENSION, IMAGE_EXTENSION};
use crate::vm::{VmDescriptor, VmName};

/// Base name of an image, without extension.
///
/// An image is always a pair of files: `{name}.image` holds the object memory,
/// `{name}.changes` the source log that goes with it.  Both travel together.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, FromStr, Display)]
pub struct ImageName(pub String);

impl ImageName {
	pub fn image_file(&self) -> String {
		format!("{}.{IMAGE_EXTENSION}", self.0)
	}

	pub fn changes_file(&self) -> String {
		format!("{}.{CHANGES_EXTENSION}", self.0)
	}

	/// True if the name is empty or only whitespace, which we treat as "not given".
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl From<&str> for ImageName {
	fn from(name: &str) -> Self {
		ImageName(name.to_owned())
	}
}

/// One invocation of the build step.  Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
	#[serde(rename = "virtualMachineName")]
	pub vm: VmName,

	/// Image to start from.  Falls back to the VM's default image when absent or blank.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_image_name: Option<ImageName>,

	#[serde(rename = "resultingImageName")]
	pub result_image_name: ImageName,

	#[serde(rename = "executeCode")]
	pub script: String,

	/// Extra VM flags, handed over verbatim as a single argument.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub parameters: String,
}

impl BuildRequest {
	pub fn new(
		vm: impl Into<VmName>,
		result_image_name: impl Into<ImageName>,
		script: impl Into<String>,
	) -> Self {
		BuildRequest {
			vm: vm.into(),
			start_image_name: None,
			result_image_name: result_image_name.into(),
			script: script.into(),
			parameters: String::new(),
		}
	}

	pub fn with_start_image(mut self, name: impl Into<ImageName>) -> Self {
		self.start_image_name = Some(name.into());
		self
	}

	pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
		self.parameters = parameters.into();
		self
	}

	/// The image the build actually starts from.
	pub fn effective_start_image<'a>(&'a self, vm: &'a VmDescriptor) -> &'a ImageName {
		match &self.start_image_name {
			Some(name) if !name.is_blank() => name,
			_ => &vm.default_image,
		}
	}

	/// The parameter string to pass to the VM, if any is left after trimming.
	pub fn trimmed_parameters(&self) -> Option<&str> {
		let trimmed = self.parameters.trim();
		(!trimmed.is_empty()).then_some(trimmed)
	}
}
