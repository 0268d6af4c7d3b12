use std::path::Path;

use crossbeam_channel::Sender;
use pharobuild_api::build::{BuildRequest, ImageName};
use pharobuild_api::vm::VmDescriptor;
use pharobuild_registry::Registry;

use crate::execute::{Invocation, Launcher};
use crate::script::assemble_script;
use crate::staging::{ImagePair, Staging};
use crate::{Error, Event, Outbox, Result};

/// What to make of the VM's exit status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExitPolicy {
	/// Only a zero exit code counts as success; anything else fails the build before commit.
	#[default]
	RequireSuccess,

	/// Any exit counts as success and the image is committed regardless.
	/// Some images quit with odd codes after a perfectly good snapshot.
	Ignore,
}

#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
	pub exit_policy: ExitPolicy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOutput {
	pub start_image: ImageName,
	pub result_image: ImageName,
	pub files: ImagePair,
	pub exit_code: Option<i32>,
}

/// Runs build requests against the VMs of one registry.
pub struct Executor<'a, L> {
	registry: &'a Registry,
	launcher: L,
	options: BuildOptions,
}

impl<'a, L: Launcher> Executor<'a, L> {
	pub fn new(registry: &'a Registry, launcher: L) -> Self {
		Executor {
			registry,
			launcher,
			options: BuildOptions::default(),
		}
	}

	pub fn with_options(mut self, options: BuildOptions) -> Self {
		self.options = options;
		self
	}

	/// Runs one build to completion.
	///
	/// Steps happen strictly in order: resolve the VM and start image, stage a copy of the
	/// start image, write the script, run the VM, commit the copy under the result name.
	/// Whatever happens, the staging area is removed before returning,
	/// and the start image is never touched.
	///
	/// The last event sent is a status line saying how the build ended.
	pub fn run(
		&self,
		request: &BuildRequest,
		workspace: &Path,
		outbox: Sender<Event>,
	) -> Result<BuildOutput> {
		let outbox = Outbox::new(request.result_image_name.to_string(), outbox);
		outbox.log("Running Pharo/Squeak image");

		let result = self.build(request, workspace, &outbox);
		match &result {
			Ok(_) => outbox.log("Pharo/Squeak image returned"),
			Err(err) => outbox.log(format!("Build failed: {err}")),
		}
		result
	}

	fn build(
		&self,
		request: &BuildRequest,
		workspace: &Path,
		outbox: &Outbox,
	) -> Result<BuildOutput> {
		let vm = self
			.registry
			.lookup(&request.vm)
			.map_err(|cause| Error::Configuration { cause })?;
		let start = request.effective_start_image(vm);
		check_image_names(start, &request.result_image_name)?;

		// The VM runs in the workspace, so every path handed to it must be absolute.
		let workspace = workspace.canonicalize().map_err(|e| Error::Staging {
			msg: format!("cannot use workspace {}", workspace.display()),
			cause: Box::new(e),
		})?;

		let mut staging = Staging::prepare(&workspace, start)?;
		outbox.log(format!(
			"Staged {} in {}",
			start.image_file(),
			staging.dir().display()
		));

		let result = self.run_staged(&mut staging, vm, request, &workspace, outbox);

		if let Err(err) = staging.close() {
			outbox.log(format!("warning: failed to remove staging directory: {err}"));
		}

		let (files, exit_code) = result?;
		Ok(BuildOutput {
			start_image: start.clone(),
			result_image: request.result_image_name.clone(),
			files,
			exit_code,
		})
	}

	fn run_staged(
		&self,
		staging: &mut Staging,
		vm: &VmDescriptor,
		request: &BuildRequest,
		workspace: &Path,
		outbox: &Outbox,
	) -> Result<(ImagePair, Option<i32>)> {
		staging.write_script(&assemble_script(vm, &request.script))?;

		let invocation = Invocation::vm_run(
			&vm.executable,
			request.trimmed_parameters(),
			staging.image(),
			staging.script(),
			workspace,
		);
		let exit_code = self.launcher.launch(&invocation, outbox)?;

		if self.options.exit_policy == ExitPolicy::RequireSuccess && exit_code != Some(0) {
			return Err(Error::ProcessFailed { code: exit_code });
		}

		let files = staging.commit(workspace, &request.result_image_name)?;
		outbox.log(format!(
			"Renamed image to {}",
			request.result_image_name.image_file()
		));
		Ok((files, exit_code))
	}

	/// Like [Executor::run], but only says whether the build succeeded.
	/// The details are in the status line sent to `outbox`.
	pub fn execute(&self, request: &BuildRequest, workspace: &Path, outbox: Sender<Event>) -> bool {
		self.run(request, workspace, outbox).is_ok()
	}
}

fn check_image_names(start: &ImageName, result: &ImageName) -> Result<()> {
	if result.is_blank() {
		return Err(Error::InvalidRequest {
			msg: "resulting image name is required".into(),
		});
	}
	// The start pair is never a commit target.
	if result.0.trim() == start.0.trim() {
		return Err(Error::InvalidRequest {
			msg: format!("resulting image '{result}' must differ from the start image"),
		});
	}
	Ok(())
}
