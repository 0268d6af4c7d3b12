use clap::error::ErrorKind;
use clap::Parser;

use pharobuild_terminal::logln;
use pharobuild_terminal::Logger;

mod cmds;
mod errors;
mod report;

use errors::*;

fn main() {
	if let Err(e) = Logger::set_global(Logger::new_local()) {
		eprintln!("cannot set up terminal output: {e}");
		std::process::exit(4);
	}

	let result = main2();
	if let Err(e) = &result {
		logln!("{}", e);
	}

	// Wait for all messages to be printed to stdout.
	if let Some(logger) = Logger::get_global() {
		let _ = logger.close();
	}

	if let Err(e) = &result {
		std::process::exit(e.code());
	}
}

fn main2() -> Result<(), Error> {
	let cli = match cmds::Root::try_parse() {
		Ok(arguments) => arguments,
		Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
			logln!("{e}");
			return Ok(());
		}
		Err(e) => return Err(Error::InvalidArguments { cause: Box::new(e) }),
	};

	if cli.verbosity >= 2 {
		logln!("args: {cli:?}");
	}

	match &cli.subcommand {
		Some(cmds::Subcommands::Build(cmd)) => cmds::build::execute(&cli, cmd),
		Some(cmds::Subcommands::Vm(cmd)) => cmds::vm::execute(&cli, cmd),
		None => {
			logln!("command used with no args.  try 'pharobuild --help'.");
			Ok(())
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verify_cli() {
		use clap::CommandFactory;
		cmds::Root::command().debug_assert()
	}

	#[test]
	fn exit_codes_are_distinct_per_kind() {
		let codes = [
			Error::InvalidArguments { cause: "x".into() }.code(),
			Error::BizarreEnvironment { cause: "x".into() }.code(),
			Error::RegistryAccess { cause: "x".into() }.code(),
			Error::RegistryInvalid { report: String::new() }.code(),
			Error::VmCheckFailed { count: 1 }.code(),
			Error::BuildFailed {
				cause: pharobuild_executors::Error::ProcessFailed { code: Some(1) },
			}
			.code(),
		];
		let mut deduped = codes.to_vec();
		deduped.sort();
		deduped.dedup();
		assert_eq!(deduped.len(), codes.len());
		assert!(codes.iter().all(|code| *code != 0));
	}
}
