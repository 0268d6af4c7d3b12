use std::time::Duration;

type ErrorCause = Box<dyn ::std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// The request refers to something the registry can't provide, e.g. an unknown VM name.
	#[error("configuration error: {cause}")]
	Configuration { cause: pharobuild_registry::Error },

	#[error("invalid build request: {msg}")]
	InvalidRequest { msg: String },

	/// Something went wrong while preparing the staging area:
	/// missing source images, failed copies, failure to create temp files.
	#[error("{msg}: {cause}")]
	Staging { msg: String, cause: ErrorCause },

	#[error("{msg}: {cause}")]
	Launch { msg: String, cause: ErrorCause },

	/// The VM ran but didn't exit cleanly.  `None` means it was killed by a signal.
	#[error("virtual machine {}", describe_exit(.code))]
	ProcessFailed { code: Option<i32> },

	#[error("virtual machine did not exit within {:?} and was killed", .after)]
	Timeout { after: Duration },

	/// Renaming the staged image to its result name failed.
	/// The VM did run, but its work is lost.
	#[error("{msg}: {cause}")]
	Commit { msg: String, cause: ErrorCause },

	#[error("{msg}: {cause}")]
	SystemRuntimeError { msg: String, cause: ErrorCause },
}

fn describe_exit(code: &Option<i32>) -> String {
	match code {
		Some(code) => format!("exited with code {code}"),
		None => "was terminated by a signal".to_owned(),
	}
}
