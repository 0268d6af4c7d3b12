use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pharobuild_api::build::ImageName;
use pharobuild_api::constants::{SCRIPT_EXTENSION, STAGING_IMAGE_NAME};
use tempfile::{NamedTempFile, TempDir};

use crate::{Error, Result};

/// Base name a replaced result pair is kept under while a commit is in progress.
/// Lives in the staging directory, so it goes away with it.
const SUPERSEDED_IMAGE_NAME: &str = "superseded";

/// Paths of a committed image and its changes file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePair {
	pub image: PathBuf,
	pub changes: PathBuf,
}

/// The private working area of one build.
///
/// A uniquely named directory inside the workspace holds the copy of the start image the VM
/// runs against, plus the generated script.  Being inside the workspace keeps the final rename
/// on one filesystem.  Being unique keeps concurrent builds in the same workspace out of each
/// other's way.
///
/// Dropping a `Staging` removes the directory and everything still in it.
pub(crate) struct Staging {
	dir: TempDir,
	image: PathBuf,
	changes: PathBuf,
	script: NamedTempFile,
}

impl Staging {
	/// Creates the staging directory and copies the `start` image pair into it.
	///
	/// Both source files are checked before anything is created,
	/// so a missing pair leaves no trace in the workspace.
	pub(crate) fn prepare(workspace: &Path, start: &ImageName) -> Result<Self> {
		let sources = [
			workspace.join(start.image_file()),
			workspace.join(start.changes_file()),
		];
		for source in &sources {
			if !source.is_file() {
				return Err(Error::Staging {
					msg: format!("cannot stage start image '{start}'"),
					cause: format!("{} does not exist", source.display()).into(),
				});
			}
		}

		let dir = tempfile::Builder::new()
			.prefix(".pharobuild-")
			.tempdir_in(workspace)
			.map_err(|e| Error::Staging {
				msg: "failed to create staging directory".into(),
				cause: Box::new(e),
			})?;
		let script = tempfile::Builder::new()
			.prefix("builder")
			.suffix(&format!(".{SCRIPT_EXTENSION}"))
			.tempfile_in(dir.path())
			.map_err(|e| Error::Staging {
				msg: "failed to create script file".into(),
				cause: Box::new(e),
			})?;

		let staged = ImageName(STAGING_IMAGE_NAME.into());
		let image = dir.path().join(staged.image_file());
		let changes = dir.path().join(staged.changes_file());
		for (source, dest) in sources.iter().zip([&image, &changes]) {
			fs::copy(source, dest).map_err(|e| Error::Staging {
				msg: format!("failed to copy {}", source.display()),
				cause: Box::new(e),
			})?;
		}

		Ok(Staging {
			dir,
			image,
			changes,
			script,
		})
	}

	pub(crate) fn dir(&self) -> &Path {
		self.dir.path()
	}

	pub(crate) fn image(&self) -> &Path {
		&self.image
	}

	pub(crate) fn script(&self) -> &Path {
		self.script.path()
	}

	pub(crate) fn write_script(&mut self, contents: &str) -> Result<()> {
		let file = self.script.as_file_mut();
		file.write_all(contents.as_bytes())
			.and_then(|()| file.flush())
			.map_err(|e| Error::Staging {
				msg: "failed to write script file".into(),
				cause: Box::new(e),
			})
	}

	/// Moves the staged pair to `{result}.image` and `{result}.changes` in the workspace.
	///
	/// A pair already under the result name is replaced.  It's first set aside in the staging
	/// directory, and put back if the commit fails: a failed commit leaves the workspace as it
	/// found it, or says in the error what it couldn't restore.
	pub(crate) fn commit(&self, workspace: &Path, result: &ImageName) -> Result<ImagePair> {
		let pair = ImagePair {
			image: workspace.join(result.image_file()),
			changes: workspace.join(result.changes_file()),
		};
		for dest in [&pair.image, &pair.changes] {
			if dest.exists() && !dest.is_file() {
				return Err(Error::Commit {
					msg: format!("cannot replace {}", dest.display()),
					cause: "not a regular file".into(),
				});
			}
		}

		let superseded = ImageName(SUPERSEDED_IMAGE_NAME.into());
		let aside = [
			self.dir().join(superseded.image_file()),
			self.dir().join(superseded.changes_file()),
		];
		let mut moves: Vec<(&Path, &Path)> = [&pair.image, &pair.changes]
			.into_iter()
			.zip(&aside)
			.filter(|(dest, _)| dest.exists())
			.map(|(dest, aside)| (dest.as_path(), aside.as_path()))
			.collect();
		moves.push((self.image.as_path(), pair.image.as_path()));
		moves.push((self.changes.as_path(), pair.changes.as_path()));

		let mut done = Vec::with_capacity(moves.len());
		for (from, to) in moves {
			if let Err(e) = fs::rename(from, to) {
				return Err(Error::Commit {
					msg: format!("failed to move {} to {}", from.display(), to.display()),
					cause: roll_back(&done, e),
				});
			}
			done.push((from, to));
		}

		Ok(pair)
	}

	/// Removes the staging directory, reporting failure instead of swallowing it like drop does.
	pub(crate) fn close(self) -> std::io::Result<()> {
		let Staging { dir, script, .. } = self;
		script.close()?;
		dir.close()
	}
}

/// Undoes completed renames, newest first.  The cause mentions anything that couldn't be undone.
fn roll_back(
	done: &[(&Path, &Path)],
	err: std::io::Error,
) -> Box<dyn std::error::Error + Send + Sync> {
	let stuck: Vec<_> = done
		.iter()
		.rev()
		.filter_map(|(from, to)| {
			fs::rename(to, from).err().map(|e| {
				format!(
					"{} could not be moved back to {}: {e}",
					to.display(),
					from.display()
				)
			})
		})
		.collect();
	if stuck.is_empty() {
		Box::new(err)
	} else {
		format!("{err}; rollback incomplete: {}", stuck.join("; ")).into()
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;

	fn workspace_with(name: &str) -> TempDir {
		let workspace = TempDir::new().unwrap();
		fs::write(workspace.path().join(format!("{name}.image")), "image bytes").unwrap();
		fs::write(workspace.path().join(format!("{name}.changes")), "changes bytes").unwrap();
		workspace
	}

	fn entries(dir: &Path) -> Vec<String> {
		let mut names: Vec<_> = fs::read_dir(dir)
			.unwrap()
			.map(|entry| entry.unwrap().file_name().into_string().unwrap())
			.collect();
		names.sort();
		names
	}

	#[test]
	fn prepare_copies_pair_into_unique_dir() {
		let workspace = workspace_with("base");
		let first = Staging::prepare(workspace.path(), &"base".into()).unwrap();
		let second = Staging::prepare(workspace.path(), &"base".into()).unwrap();

		assert_ne!(first.dir(), second.dir());
		assert_eq!(fs::read_to_string(first.image()).unwrap(), "image bytes");
		assert_eq!(
			fs::read_to_string(first.dir().join("temp.changes")).unwrap(),
			"changes bytes"
		);
		assert_eq!(first.script().extension().unwrap(), "st");
		assert!(first
			.script()
			.file_name()
			.unwrap()
			.to_str()
			.unwrap()
			.starts_with("builder"));
	}

	#[test]
	fn prepare_leaves_nothing_when_source_missing() {
		let workspace = TempDir::new().unwrap();
		fs::write(workspace.path().join("base.image"), "image bytes").unwrap();

		let err = Staging::prepare(workspace.path(), &"base".into()).err().unwrap();
		assert!(matches!(err, Error::Staging { .. }));
		assert!(err.to_string().contains("base.changes does not exist"));
		assert_eq!(entries(workspace.path()), ["base.image"]);
	}

	#[test]
	fn close_removes_everything() {
		let workspace = workspace_with("base");
		let mut staging = Staging::prepare(workspace.path(), &"base".into()).unwrap();
		staging.write_script("\nS\n\n").unwrap();
		assert_eq!(fs::read_to_string(staging.script()).unwrap(), "\nS\n\n");

		staging.close().unwrap();
		assert_eq!(entries(workspace.path()), ["base.changes", "base.image"]);
	}

	#[test]
	fn commit_moves_pair() {
		let workspace = workspace_with("base");
		let staging = Staging::prepare(workspace.path(), &"base".into()).unwrap();

		let pair = staging.commit(workspace.path(), &"out".into()).unwrap();
		assert_eq!(pair.image, workspace.path().join("out.image"));
		assert_eq!(fs::read_to_string(&pair.changes).unwrap(), "changes bytes");
		assert!(!staging.image().exists());

		staging.close().unwrap();
		assert_eq!(
			entries(workspace.path()),
			["base.changes", "base.image", "out.changes", "out.image"]
		);
	}

	fn write_old_result(workspace: &TempDir) {
		fs::write(workspace.path().join("out.image"), "OLD image").unwrap();
		fs::write(workspace.path().join("out.changes"), "OLD changes").unwrap();
	}

	#[test]
	fn commit_replaces_existing_result() {
		let workspace = workspace_with("base");
		write_old_result(&workspace);
		let staging = Staging::prepare(workspace.path(), &"base".into()).unwrap();

		let pair = staging.commit(workspace.path(), &"out".into()).unwrap();
		assert_eq!(fs::read_to_string(&pair.image).unwrap(), "image bytes");
		assert_eq!(fs::read_to_string(&pair.changes).unwrap(), "changes bytes");

		staging.close().unwrap();
		assert_eq!(
			entries(workspace.path()),
			["base.changes", "base.image", "out.changes", "out.image"]
		);
	}

	#[test]
	fn failed_commit_restores_previous_result() {
		let workspace = workspace_with("base");
		write_old_result(&workspace);
		let staging = Staging::prepare(workspace.path(), &"base".into()).unwrap();
		// With the staged changes file gone, the last rename of the commit fails.
		fs::remove_file(&staging.changes).unwrap();

		let err = staging.commit(workspace.path(), &"out".into()).unwrap_err();
		assert!(matches!(err, Error::Commit { .. }));
		assert!(!err.to_string().contains("rollback incomplete"), "{err}");
		assert_eq!(
			fs::read_to_string(workspace.path().join("out.image")).unwrap(),
			"OLD image"
		);
		assert_eq!(
			fs::read_to_string(workspace.path().join("out.changes")).unwrap(),
			"OLD changes"
		);
		assert_eq!(fs::read_to_string(staging.image()).unwrap(), "image bytes");
	}

	#[test]
	fn failed_commit_without_previous_result_leaves_nothing() {
		let workspace = workspace_with("base");
		let staging = Staging::prepare(workspace.path(), &"base".into()).unwrap();
		fs::remove_file(&staging.changes).unwrap();

		let err = staging.commit(workspace.path(), &"out".into()).unwrap_err();
		assert!(matches!(err, Error::Commit { .. }));
		assert!(staging.image().exists());

		staging.close().unwrap();
		assert_eq!(entries(workspace.path()), ["base.changes", "base.image"]);
	}

	#[test]
	fn commit_refuses_to_replace_a_directory() {
		let workspace = workspace_with("base");
		fs::write(workspace.path().join("out.image"), "OLD image").unwrap();
		fs::create_dir(workspace.path().join("out.changes")).unwrap();
		fs::write(workspace.path().join("out.changes").join("occupied"), "").unwrap();
		let staging = Staging::prepare(workspace.path(), &"base".into()).unwrap();

		let err = staging.commit(workspace.path(), &"out".into()).unwrap_err();
		assert!(matches!(err, Error::Commit { .. }));
		assert!(err.to_string().contains("not a regular file"), "{err}");
		assert_eq!(
			fs::read_to_string(workspace.path().join("out.image")).unwrap(),
			"OLD image"
		);
		assert!(staging.image().exists());
	}
}
