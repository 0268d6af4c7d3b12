/// Extension of a Smalltalk image file (the object memory snapshot).
pub const IMAGE_EXTENSION: &str = "image";

/// Extension of the changes log that accompanies every image.
pub const CHANGES_EXTENSION: &str = "changes";

/// Extension of the generated build scripts handed to the VM.
pub const SCRIPT_EXTENSION: &str = "st";

/// Base name of the staged copy the VM actually runs against.
/// Lives inside a per-build staging directory, never directly in the workspace root.
pub const STAGING_IMAGE_NAME: &str = "temp";
