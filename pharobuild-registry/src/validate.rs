use std::path::Path;

use pharobuild_api::build::ImageName;
use pharobuild_api::vm::VmName;

use crate::{Error, Result};

pub fn validate_name(name: &VmName) -> Result<()> {
	if name.0.trim().is_empty() {
		return Err(Error::InvalidName {
			name: name.clone(),
			msg: "name is required".into(),
		});
	}
	Ok(())
}

pub fn validate_executable(path: &Path) -> Result<()> {
	if !path.exists() {
		return Err(Error::ExecutableMissing {
			path: path.to_owned(),
		});
	}
	if !path.is_file() {
		return Err(Error::ExecutableNotAFile {
			path: path.to_owned(),
		});
	}
	Ok(())
}

/// Checks that both halves of the image pair are present.
/// A relative `name` is resolved against `dir`.
pub fn validate_default_image(dir: &Path, name: &ImageName) -> Result<()> {
	let image = dir.join(name.image_file());
	if !image.is_file() {
		return Err(Error::ImageMissing { path: image });
	}
	let changes = dir.join(name.changes_file());
	if !changes.is_file() {
		return Err(Error::ChangesMissing { path: changes });
	}
	Ok(())
}
