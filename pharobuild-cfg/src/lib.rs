use std::env;
use std::path::PathBuf;

/// Environment variable that, when set, names the registry file to use.
pub const REGISTRY_FILE_ENV: &str = "PHAROBUILD_CONFIG";

/// File name of the registry file inside the config directory.
pub const REGISTRY_FILE_NAME: &str = "vms.json";

/// Returns the path of the registry file: the file that lists configured virtual machines.
///
/// `$PHAROBUILD_CONFIG` wins if set and non-empty.  Otherwise the file lives in the user's
/// XDG config dir, typically coming out to something like "~/.config/pharobuild/vms.json".
/// (Config rather than data or state: the file is written by hand, and worth keeping in
/// version control alongside dotfiles.)
///
/// The file is not required to exist.
pub fn get_registry_file() -> Result<PathBuf, xdg::BaseDirectoriesError> {
	if let Some(path) = env::var_os(REGISTRY_FILE_ENV).filter(|path| !path.is_empty()) {
		return Ok(PathBuf::from(path));
	}
	let dirs = xdg::BaseDirectories::with_prefix("pharobuild")?;
	Ok(dirs.get_config_file(REGISTRY_FILE_NAME))
}
