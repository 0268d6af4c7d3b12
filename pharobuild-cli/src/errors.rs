type ErrorCause = Box<dyn ::std::error::Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	// InvalidArguments is for CLI level parse errors.  Don't use it any deeper inside.
	#[error("invalid arguments: {cause}")]
	InvalidArguments { cause: ErrorCause },

	/// BizarreEnvironment is a bit of a catch-all to describe...
	///   - missing environment variables that are VERY weird (like missing $HOME)
	///   - ... anything we haven't figured out how to describe better yet.
	///
	/// In general it means "human intervention required".
	#[error("halting due to strange environment: {cause}")]
	BizarreEnvironment { cause: ErrorCause },

	/// The registry file couldn't be read, or names a VM that isn't there.
	#[error("error accessing registry: {cause}")]
	RegistryAccess { cause: ErrorCause },

	/// The registry file isn't valid.  The report is already rendered, pointing at the problem.
	#[error("invalid registry file:\n{report}")]
	RegistryInvalid { report: String },

	#[error("{count} problem(s) found with configured virtual machines")]
	VmCheckFailed { count: usize },

	#[error("build failed: {cause}")]
	BuildFailed { cause: pharobuild_executors::Error },
}

impl Error {
	pub fn code(&self) -> i32 {
		use pharobuild_executors::Error as BuildError;
		match self {
			Error::InvalidArguments { .. } => 1,
			Error::BizarreEnvironment { .. } => 4,
			Error::RegistryAccess { .. } => 5,
			Error::RegistryInvalid { .. } => 6,
			Error::VmCheckFailed { .. } => 8,
			Error::BuildFailed { cause } => match cause {
				BuildError::Configuration { .. } | BuildError::InvalidRequest { .. } => 10,
				BuildError::Staging { .. } => 11,
				BuildError::Launch { .. } => 12,
				BuildError::ProcessFailed { .. } | BuildError::Timeout { .. } => 13,
				BuildError::Commit { .. } => 14,
				BuildError::SystemRuntimeError { .. } => 15,
			},
		}
	}
}
