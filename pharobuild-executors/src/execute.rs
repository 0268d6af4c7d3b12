use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::events::{EventBody, Outbox};
use crate::{Error, Result};

/// How often a running VM is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything needed to start one process: what to run, with which arguments, and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
	pub program: PathBuf,
	pub args: Vec<OsString>,
	pub working_dir: PathBuf,
}

impl Invocation {
	/// The argument list a Squeak/Pharo VM expects for running a script against an image:
	/// `{executable} [parameters] {image} {script}`.
	///
	/// `parameters` is passed as one single argument, never split on whitespace.
	pub fn vm_run(
		executable: &Path,
		parameters: Option<&str>,
		image: &Path,
		script: &Path,
		working_dir: &Path,
	) -> Self {
		let mut args = Vec::with_capacity(3);
		if let Some(parameters) = parameters {
			args.push(parameters.into());
		}
		args.push(image.into());
		args.push(script.into());
		Invocation {
			program: executable.to_owned(),
			args,
			working_dir: working_dir.to_owned(),
		}
	}

	/// The program followed by its arguments.
	pub fn command_line(&self) -> Vec<OsString> {
		let mut line = Vec::with_capacity(self.args.len() + 1);
		line.push(self.program.clone().into_os_string());
		line.extend(self.args.iter().cloned());
		line
	}
}

/// Starts processes and waits for them.
///
/// This is the seam between the build logic and the operating system;
/// tests swap in launchers that don't spawn anything.
pub trait Launcher {
	/// Runs `invocation` to completion, relaying its output into `outbox`.
	///
	/// Returns the exit code, or `None` if the process was terminated by a signal.
	fn launch(&self, invocation: &Invocation, outbox: &Outbox) -> Result<Option<i32>>;
}

impl<L: Launcher + ?Sized> Launcher for &L {
	fn launch(&self, invocation: &Invocation, outbox: &Outbox) -> Result<Option<i32>> {
		(**self).launch(invocation, outbox)
	}
}

/// Launches real processes.
#[derive(Clone, Debug, Default)]
pub struct ProcessLauncher {
	/// Kill the process if it hasn't exited after this long.  `None` waits forever.
	pub timeout: Option<Duration>,
}

impl Launcher for ProcessLauncher {
	fn launch(&self, invocation: &Invocation, outbox: &Outbox) -> Result<Option<i32>> {
		let mut cmd = Command::new(&invocation.program);
		cmd.args(&invocation.args);
		cmd.current_dir(&invocation.working_dir);

		cmd.stdin(Stdio::null());
		cmd.stdout(Stdio::piped());
		cmd.stderr(Stdio::piped());

		let mut child = cmd.spawn().map_err(|e| Error::Launch {
			msg: format!(
				"failed to spawn virtual machine {}",
				invocation.program.display()
			),
			cause: Box::new(e),
		})?;

		// Take handles to the IO before waiting; both pipes are drained on their own threads
		// so a chatty VM can't block on a full pipe while we wait for it.
		// The relays only ever see our private channel, never the caller's outbox:
		// anything the VM left behind holding the pipes can't keep the caller's channel open.
		let stdout = child
			.stdout
			.take()
			.expect("child did not have a handle to stdout");
		let stderr = child
			.stderr
			.take()
			.expect("child did not have a handle to stderr");
		let (relay_chan, relayed) = crossbeam_channel::unbounded();
		let stdout_handle = spawn_relay(&relay_chan, 1, stdout);
		let stderr_handle = spawn_relay(&relay_chan, 2, stderr);
		drop(relay_chan);

		let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
		let status = self.wait(&mut child, deadline, &relayed, outbox)?;
		self.drain(deadline, &relayed, outbox)?;

		for (name, handle) in [("stdout", stdout_handle), ("stderr", stderr_handle)] {
			handle
				.join()
				.map_err(|_| Error::SystemRuntimeError {
					msg: format!("failed to relay {name} from virtual machine"),
					cause: "output relay thread panicked".into(),
				})?
				.map_err(|e| Error::SystemRuntimeError {
					msg: format!("failed to read {name} from virtual machine"),
					cause: Box::new(e),
				})?;
		}

		let code = status.code();
		outbox.send(EventBody::ExitCode(code));
		Ok(code)
	}
}

impl ProcessLauncher {
	/// Forwards output while waiting for the child to exit, killing it at the deadline.
	fn wait(
		&self,
		child: &mut Child,
		deadline: Option<Instant>,
		relayed: &Receiver<EventBody>,
		outbox: &Outbox,
	) -> Result<ExitStatus> {
		loop {
			match relayed.recv_timeout(POLL_INTERVAL) {
				Ok(body) => outbox.send(body),
				Err(RecvTimeoutError::Timeout) => {}
				// Both pipes are closed but the process is still around.
				Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
			}

			let status = child.try_wait().map_err(|e| Error::SystemRuntimeError {
				msg: "failed to get virtual machine exit code".into(),
				cause: Box::new(e),
			})?;
			if let Some(status) = status {
				return Ok(status);
			}
			if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
				// Either of these failing means the process is already gone.
				let _ = child.kill();
				let _ = child.wait();
				return Err(self.timed_out(relayed, outbox));
			}
		}
	}

	/// Forwards what's left of the output once the child has exited.
	///
	/// Processes the VM started may still hold the pipes; with a deadline, they're given
	/// until then to let go.
	fn drain(
		&self,
		deadline: Option<Instant>,
		relayed: &Receiver<EventBody>,
		outbox: &Outbox,
	) -> Result<()> {
		let Some(deadline) = deadline else {
			relayed.iter().for_each(|body| outbox.send(body));
			return Ok(());
		};
		loop {
			match relayed.recv_deadline(deadline) {
				Ok(body) => outbox.send(body),
				Err(RecvTimeoutError::Disconnected) => return Ok(()),
				Err(RecvTimeoutError::Timeout) => return Err(self.timed_out(relayed, outbox)),
			}
		}
	}

	/// Passes on whatever output already arrived, then gives up on the rest.
	fn timed_out(&self, relayed: &Receiver<EventBody>, outbox: &Outbox) -> Error {
		relayed.try_iter().for_each(|body| outbox.send(body));
		Error::Timeout {
			after: self.timeout.unwrap_or_default(),
		}
	}
}

fn spawn_relay<R: Read + Send + 'static>(
	relay_chan: &Sender<EventBody>,
	channel: i32,
	stream: R,
) -> JoinHandle<std::io::Result<()>> {
	let relay_chan = relay_chan.clone();
	thread::spawn(move || relay_output(&relay_chan, channel, BufReader::new(stream)))
}

/// Forwards `reader` line by line until EOF.  Stops early if nobody is listening anymore.
fn relay_output<T: BufRead>(
	relay_chan: &Sender<EventBody>,
	channel: i32,
	mut reader: T,
) -> std::io::Result<()> {
	let mut buf = Vec::new();
	loop {
		buf.clear();
		if reader.read_until(b'\n', &mut buf)? == 0 {
			return Ok(());
		}
		let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
		let line = line.strip_suffix(b"\r").unwrap_or(line);
		let body = EventBody::Output {
			channel,
			val: String::from_utf8_lossy(line).into_owned(),
		};
		if relay_chan.send(body).is_err() {
			return Ok(());
		}
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;

	#[test]
	fn vm_run_argument_order() {
		let invocation = Invocation::vm_run(
			Path::new("/usr/bin/pharo"),
			Some("-headless"),
			Path::new("/ws/stage/temp.image"),
			Path::new("/ws/stage/builder1.st"),
			Path::new("/ws"),
		);
		let line: Vec<_> = invocation
			.command_line()
			.into_iter()
			.map(|arg| arg.into_string().unwrap())
			.collect();
		assert_eq!(
			line,
			[
				"/usr/bin/pharo",
				"-headless",
				"/ws/stage/temp.image",
				"/ws/stage/builder1.st"
			]
		);
		assert_eq!(invocation.working_dir, Path::new("/ws"));
	}

	#[test]
	fn vm_run_without_parameters() {
		let invocation = Invocation::vm_run(
			Path::new("pharo"),
			None,
			Path::new("temp.image"),
			Path::new("builder.st"),
			Path::new("."),
		);
		assert_eq!(invocation.args, [OsString::from("temp.image"), "builder.st".into()]);
	}

	#[test]
	fn parameters_stay_one_argument() {
		let invocation = Invocation::vm_run(
			Path::new("pharo"),
			Some("-headless -memory 512m"),
			Path::new("temp.image"),
			Path::new("builder.st"),
			Path::new("."),
		);
		assert_eq!(invocation.args.len(), 3);
		assert_eq!(invocation.args[0], "-headless -memory 512m");
	}

	#[test]
	fn relay_splits_lines_and_tolerates_bad_utf8() {
		let (sender, receiver) = crossbeam_channel::unbounded();
		let input = b"first\r\nsecond \xff\nno newline at end".to_vec();

		relay_output(&sender, 2, Cursor::new(input)).unwrap();
		drop(sender);

		let lines: Vec<_> = receiver
			.iter()
			.map(|body| match body {
				EventBody::Output { channel: 2, val } => val,
				other => panic!("unexpected event {other:?}"),
			})
			.collect();
		assert_eq!(lines, ["first", "second \u{FFFD}", "no newline at end"]);
	}

	#[test]
	fn relay_stops_when_nobody_listens() {
		let (sender, receiver) = crossbeam_channel::unbounded();
		drop(receiver);

		relay_output(&sender, 1, Cursor::new(b"one\ntwo\n".to_vec())).unwrap();
	}
}
