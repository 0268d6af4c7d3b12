pub mod build;
pub mod vm;

use std::path::PathBuf;

use pharobuild_registry::Registry;

use crate::report::render_parse_error;
use crate::Error;

#[derive(clap::Parser, Debug)]
#[command(name = "pharobuild", version)]
pub struct Root {
	#[command(subcommand)]
	pub subcommand: Option<Subcommands>,

	/// Raise verbosity by specifying this flag repeatedly.
	#[arg(short, action = clap::ArgAction::Count)]
	pub verbosity: u8,

	/// Registry file listing the configured virtual machines.
	///
	/// Defaults to $PHAROBUILD_CONFIG, or else "pharobuild/vms.json" in the XDG config dir.
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommands {
	/// run a script against a Squeak/Pharo image and save the result under a new name.
	Build(build::Cmd),

	/// subcommands for inspecting the configured virtual machines.
	Vm(vm::Cmd),
}

impl Root {
	pub fn registry_file(&self) -> Result<PathBuf, Error> {
		match &self.config {
			Some(path) => Ok(path.clone()),
			None => pharobuild_cfg::get_registry_file()
				.map_err(|e| Error::BizarreEnvironment { cause: Box::new(e) }),
		}
	}

	/// Reads the registry file.  Parse errors come back as a rendered report pointing into the file.
	pub fn load_registry(&self) -> Result<Registry, Error> {
		let path = self.registry_file()?;
		Registry::load(&path).map_err(|e| match e {
			pharobuild_registry::Error::ConfigFileInvalid { path, text, cause } => {
				Error::RegistryInvalid {
					report: render_parse_error(&path, &text, &cause),
				}
			}
			other => Error::RegistryAccess {
				cause: Box::new(other),
			},
		})
	}
}
