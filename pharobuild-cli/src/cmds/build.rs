use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use pharobuild_api::build::{BuildRequest, ImageName};
use pharobuild_api::vm::VmName;
use pharobuild_executors::execute::ProcessLauncher;
use pharobuild_executors::{BuildOptions, Event, EventBody, Executor, ExitPolicy};
use pharobuild_terminal::{logln, Logger};

use crate::{cmds::Root, Error};

#[derive(clap::Args, Debug)]
pub struct Cmd {
	/// Name of the configured virtual machine to run.
	#[arg(long, value_parser = VmName::from_str)]
	pub vm: VmName,

	/// Image to start from, without extension.  Defaults to the VM's default image.
	#[arg(long, value_parser = ImageName::from_str)]
	pub start: Option<ImageName>,

	/// Name to save the resulting image under, without extension.
	#[arg(long, value_parser = ImageName::from_str)]
	pub result: ImageName,

	/// Smalltalk code to run against the image.
	#[arg(long, conflicts_with = "script_file", required_unless_present = "script_file")]
	pub script: Option<String>,

	/// Read the Smalltalk code to run from this file instead.
	#[arg(long, value_name = "FILE")]
	pub script_file: Option<PathBuf>,

	/// Extra flags for the VM, passed as one single argument (e.g. "-headless").
	#[arg(long, default_value = "", allow_hyphen_values = true)]
	pub parameters: String,

	/// Directory holding the images.  The VM runs here too.
	#[arg(long, default_value = ".")]
	pub workspace: PathBuf,

	/// Save the resulting image even if the VM exits with a nonzero code.
	#[arg(long)]
	pub ignore_exit_code: bool,

	/// Kill the VM if it's still running after this many seconds.
	#[arg(long, value_name = "SECS")]
	pub timeout: Option<u64>,
}

pub fn execute(cli: &Root, cmd: &Cmd) -> Result<(), Error> {
	let registry = cli.load_registry()?;
	let request = build_request(cmd)?;

	let launcher = ProcessLauncher {
		timeout: cmd.timeout.map(Duration::from_secs),
	};
	let options = BuildOptions {
		exit_policy: if cmd.ignore_exit_code {
			ExitPolicy::Ignore
		} else {
			ExitPolicy::RequireSuccess
		},
	};
	let executor = Executor::new(&registry, launcher).with_options(options);

	let (gather_chan, gather_chan_recv) = crossbeam_channel::bounded::<Event>(32);
	let verbosity = cli.verbosity;
	let gather_handle = thread::spawn(move || relay_events(gather_chan_recv, verbosity));

	set_status(format!("building {} with {}", request.result_image_name, request.vm));
	let result = executor.run(&request, &cmd.workspace, gather_chan);
	// Nothing holds a sender once the build has returned, so the relay is about to finish.
	if gather_handle.join().is_err() {
		logln!("warning: lost some output from the build");
	}
	clear_status();

	let output = result.map_err(|cause| Error::BuildFailed { cause })?;
	if verbosity >= 1 {
		logln!(
			"built {} from {} (exit code {:?})",
			output.files.image.display(),
			output.start_image.image_file(),
			output.exit_code
		);
	}
	Ok(())
}

fn build_request(cmd: &Cmd) -> Result<BuildRequest, Error> {
	let script = match (&cmd.script, &cmd.script_file) {
		(Some(script), _) => script.clone(),
		(None, Some(path)) => read_script(path)?,
		(None, None) => {
			return Err(Error::InvalidArguments {
				cause: "one of --script or --script-file is required".into(),
			})
		}
	};

	let mut request = BuildRequest::new(cmd.vm.clone(), cmd.result.clone(), script)
		.with_parameters(cmd.parameters.clone());
	if let Some(start) = &cmd.start {
		request = request.with_start_image(start.clone());
	}
	Ok(request)
}

fn read_script(path: &Path) -> Result<String, Error> {
	fs::read_to_string(path).map_err(|e| Error::InvalidArguments {
		cause: format!("cannot read script file {}: {e}", path.display()).into(),
	})
}

/// Prints build events until the executor hangs up.
fn relay_events(events: Receiver<Event>, verbosity: u8) {
	for event in events {
		match event.body {
			EventBody::Log(line) => logln!("[{}] {line}", event.topic),
			EventBody::Output { channel: 2, val } => logln!("[vm:err] {val}"),
			EventBody::Output { val, .. } => logln!("[vm] {val}"),
			EventBody::ExitCode(code) if verbosity >= 1 => match code {
				Some(code) => logln!("[{}] virtual machine exited with code {code}", event.topic),
				None => logln!("[{}] virtual machine was terminated by a signal", event.topic),
			},
			EventBody::ExitCode(_) => {}
		}
	}
}

fn set_status(status: String) {
	if let Some(logger) = Logger::get_global() {
		let _ = logger.set_status(status);
	}
}

fn clear_status() {
	if let Some(logger) = Logger::get_global() {
		let _ = logger.clear_status();
	}
}
