use std::path::PathBuf;

use pharobuild_api::vm::VmName;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// Lookups are exact: no fallback to a default VM, no prefix matching.
	#[error("no virtual machine named '{name}' is configured")]
	VmNotFound { name: VmName },

	#[error("invalid virtual machine name '{name}': {msg}")]
	InvalidName { name: VmName, msg: String },

	#[error("executable {} does not exist", .path.display())]
	ExecutableMissing { path: PathBuf },

	#[error("executable {} is not a file", .path.display())]
	ExecutableNotAFile { path: PathBuf },

	#[error("image file {} does not exist", .path.display())]
	ImageMissing { path: PathBuf },

	#[error("changes file {} does not exist", .path.display())]
	ChangesMissing { path: PathBuf },

	#[error("couldn't read registry file {}: {cause}", .path.display())]
	ConfigRead {
		path: PathBuf,
		cause: std::io::Error,
	},

	/// The serde error is kept as-is so callers can point at the offending line and column.
	#[error("invalid registry file: {cause}")]
	ConfigParse { cause: serde_json::Error },

	/// Like [Error::ConfigParse], for a file: also carries the path and the text that was read,
	/// which is what a report quoting the offending line needs.
	#[error("invalid registry file {}: {cause}", .path.display())]
	ConfigFileInvalid {
		path: PathBuf,
		text: String,
		cause: serde_json::Error,
	},
}
