//! Builds against a real process.
//!
//! `/bin/sh` stands in for the VM: given `{image} {script}` it runs the staged image as a
//! shell script with `$0` set to the image and `$1` to the build script.  So the "image"
//! decides what the VM does, and can "snapshot" itself by appending to `$0`.

use std::fs;
use std::time::Duration;

use pharobuild_api::build::BuildRequest;
use pharobuild_api::vm::VmDescriptor;

use super::*;
use crate::execute::ProcessLauncher;
use crate::{Error, EventBody, Executor};

fn sh_workspace(image: &str) -> TempDir {
	let workspace = TempDir::new().unwrap();
	fs::write(workspace.path().join("base.image"), image).unwrap();
	fs::write(workspace.path().join("base.changes"), BASE_CHANGES).unwrap();
	workspace
}

fn sh_registry() -> Registry {
	registry_with(
		VmDescriptor::new("/bin/sh", "base")
			.with_before_code("before")
			.with_after_code("after"),
	)
}

fn outputs(events: &[Event]) -> Vec<(i32, &str)> {
	events
		.iter()
		.filter_map(|event| match &event.body {
			EventBody::Output { channel, val } => Some((*channel, val.as_str())),
			_ => None,
		})
		.collect()
}

#[test]
fn runs_script_against_staged_image() {
	let image = "cat \"$1\"\necho complaint >&2\necho '# snapshot' >> \"$0\"\nexit 0\n";
	let workspace = sh_workspace(image);
	let registry = sh_registry();
	let executor = Executor::new(&registry, ProcessLauncher::default());

	let (result, events) = run_collecting(
		&executor,
		&BuildRequest::new("pharo", "out", "body"),
		workspace.path(),
	);
	let output = result.unwrap();

	assert_eq!(output.exit_code, Some(0));
	let mut relayed = outputs(&events);
	relayed.sort();
	assert_eq!(
		relayed,
		[(1, "after"), (1, "before"), (1, "body"), (2, "complaint")]
	);
	assert!(events.contains(&Event {
		topic: "out".into(),
		body: EventBody::ExitCode(Some(0)),
	}));

	let saved = fs::read_to_string(workspace.path().join("out.image")).unwrap();
	assert_eq!(saved, format!("{image}# snapshot\n"));
	assert_eq!(fs::read_to_string(workspace.path().join("base.image")).unwrap(), image);
	assert_eq!(
		sorted_entries(workspace.path()),
		["base.changes", "base.image", "out.changes", "out.image"]
	);
}

#[test]
fn runs_in_workspace() {
	let workspace = sh_workspace("pwd\n");
	let registry = sh_registry();
	let executor = Executor::new(&registry, ProcessLauncher::default());

	let (result, events) = run_collecting(
		&executor,
		&BuildRequest::new("pharo", "out", "body"),
		workspace.path(),
	);
	result.unwrap();

	let canonical = workspace.path().canonicalize().unwrap();
	assert_eq!(outputs(&events), [(1, canonical.to_str().unwrap())]);
}

#[test]
fn failing_vm_leaves_no_result() {
	let workspace = sh_workspace("exit 7\n");
	let registry = sh_registry();
	let executor = Executor::new(&registry, ProcessLauncher::default());

	let (result, _) = run_collecting(
		&executor,
		&BuildRequest::new("pharo", "out", "body"),
		workspace.path(),
	);

	assert!(matches!(result, Err(Error::ProcessFailed { code: Some(7) })));
	assert_eq!(sorted_entries(workspace.path()), ["base.changes", "base.image"]);
}

#[test]
fn missing_executable_is_a_launch_error() {
	let workspace = sh_workspace("exit 0\n");
	let registry = registry_with(VmDescriptor::new("/nonexistent/pharo", "base"));
	let executor = Executor::new(&registry, ProcessLauncher::default());

	let (result, _) = run_collecting(
		&executor,
		&BuildRequest::new("pharo", "out", "body"),
		workspace.path(),
	);

	assert!(matches!(result, Err(Error::Launch { .. })));
	assert_eq!(sorted_entries(workspace.path()), ["base.changes", "base.image"]);
}

#[test]
fn hung_vm_is_killed_after_timeout() {
	let workspace = sh_workspace("exec sleep 30\n");
	let registry = sh_registry();
	let launcher = ProcessLauncher {
		timeout: Some(Duration::from_millis(200)),
	};
	let executor = Executor::new(&registry, launcher);

	let (result, _) = run_collecting(
		&executor,
		&BuildRequest::new("pharo", "out", "body"),
		workspace.path(),
	);

	assert!(matches!(result, Err(Error::Timeout { .. })));
	assert_eq!(sorted_entries(workspace.path()), ["base.changes", "base.image"]);
}

#[test]
fn timeout_holds_even_if_vm_children_keep_the_pipes() {
	// The background sleep inherits stdout and outlives the killed shell.
	let workspace = sh_workspace("echo started\nsleep 5 &\nexec sleep 60\n");
	let registry = sh_registry();
	let launcher = ProcessLauncher {
		timeout: Some(Duration::from_millis(300)),
	};
	let executor = Executor::new(&registry, launcher);

	let (gather_chan, gather_chan_recv) = crossbeam_channel::unbounded::<Event>();
	let started = std::time::Instant::now();
	let result = executor.run(
		&BuildRequest::new("pharo", "out", "body"),
		workspace.path(),
		gather_chan,
	);
	assert!(matches!(result, Err(Error::Timeout { .. })));

	// Every sender is gone once the build returns, so listeners finish too.
	let events: Vec<_> = gather_chan_recv.iter().collect();
	assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
	assert_eq!(outputs(&events), [(1, "started")]);
	assert_eq!(sorted_entries(workspace.path()), ["base.changes", "base.image"]);
}
