use std::path::PathBuf;
use std::str::FromStr;

use pharobuild_api::vm::VmName;
use pharobuild_registry::Registry;
use pharobuild_terminal::logln;

use crate::{cmds::Root, Error};

#[derive(clap::Args, Debug)]
pub struct Cmd {
	#[command(subcommand)]
	pub subcommand: Subcommands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommands {
	/// list the configured virtual machines.
	List,

	/// check that configured virtual machines are usable: names, executables, default images.
	Check(CheckCmdArgs),
}

#[derive(clap::Args, Debug)]
pub struct CheckCmdArgs {
	/// Only check this virtual machine.
	#[arg(value_parser = VmName::from_str)]
	pub vm: Option<VmName>,

	/// Directory the default images are looked up in.
	#[arg(long, default_value = ".")]
	pub workspace: PathBuf,
}

pub fn execute(cli: &Root, cmd: &Cmd) -> Result<(), Error> {
	let registry = cli.load_registry()?;
	match &cmd.subcommand {
		Subcommands::List => {
			for line in list_lines(&registry) {
				logln!("{line}");
			}
			if registry.is_empty() {
				logln!("no virtual machines configured.");
			}
			Ok(())
		}
		Subcommands::Check(args) => check(&registry, args),
	}
}

fn list_lines(registry: &Registry) -> Vec<String> {
	registry
		.iter()
		.map(|(name, vm)| {
			format!(
				"{name}\t{}\tdefault image: {}",
				vm.executable.display(),
				vm.default_image
			)
		})
		.collect()
}

fn check(registry: &Registry, args: &CheckCmdArgs) -> Result<(), Error> {
	if let Some(name) = &args.vm {
		registry
			.lookup(name)
			.map_err(|e| Error::RegistryAccess { cause: Box::new(e) })?;
	}

	let problems: Vec<_> = registry
		.check(&args.workspace)
		.into_iter()
		.filter(|(name, _)| args.vm.as_ref().map_or(true, |only| only == name))
		.collect();
	for (name, problem) in &problems {
		logln!("{name}: {problem}");
	}

	if problems.is_empty() {
		let checked = if args.vm.is_some() { 1 } else { registry.len() };
		logln!("{checked} virtual machine(s) ok.");
		Ok(())
	} else {
		Err(Error::VmCheckFailed {
			count: problems.len(),
		})
	}
}
