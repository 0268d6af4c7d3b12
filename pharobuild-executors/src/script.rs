use pharobuild_api::vm::VmDescriptor;

/// Wraps a build script between the VM's before and after blocks.
///
/// The result is always exactly three newline terminated lines' worth of blocks, in order:
/// before, body, after.  An empty block still yields its (blank) line.
/// Blocks containing newlines of their own are written as they are.
pub fn assemble_script(vm: &VmDescriptor, body: &str) -> String {
	let blocks = [vm.before_code.as_str(), body, vm.after_code.as_str()];
	let mut script = String::with_capacity(blocks.iter().map(|b| b.len() + 1).sum());
	for block in blocks {
		script.push_str(block);
		script.push('\n');
	}
	script
}
