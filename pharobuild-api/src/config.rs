use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vm::{VmDescriptor, VmName};

/// Top level of a registry file.  The capsule tag versions the format.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum ConfigCapsule {
	#[serde(rename = "pharobuild.v1")]
	V1(Config),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
	/// Configured virtual machines, keyed by name.
	#[serde(default)]
	pub vms: IndexMap<VmName, VmDescriptor>,
}

impl From<ConfigCapsule> for Config {
	fn from(capsule: ConfigCapsule) -> Self {
		let ConfigCapsule::V1(config) = capsule;
		config
	}
}
