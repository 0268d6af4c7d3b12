//! Terminal output for humans.
//!
//! Everything goes through a [Logger], which hands messages to a renderer thread.
//! The renderer interleaves plain log lines with a status spinner at the bottom of the terminal,
//! so progress and output don't trample each other.

mod errors;
mod macros;
mod render;

use std::sync::OnceLock;

use crossbeam_channel::Sender;

pub use crate::errors::Error;
use crate::errors::Result;
pub use crate::macros::log_global;
use crate::render::TerminalRenderer;

static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

#[derive(Clone)]
pub struct Logger {
	channel: Sender<Message>,
}

#[derive(Debug)]
pub(crate) enum Message {
	Log(String),
	SetStatus(String),
	ClearStatus,
	/// Stops the renderer.  The sender is notified once everything before it is printed.
	Close(Sender<()>),
}

impl Logger {
	/// Creates a logger rendering to this process's terminal.
	pub fn new_local() -> Self {
		let (sender, receiver) = crossbeam_channel::bounded(32);
		TerminalRenderer::start(receiver);
		Self { channel: sender }
	}

	/// Installs the logger used by the [`log!`] and [`logln!`] macros.  Can only happen once.
	pub fn set_global(logger: Logger) -> Result<()> {
		GLOBAL_LOGGER
			.set(logger)
			.map_err(|_| Error::GlobalLoggerAlreadySet)
	}

	pub fn get_global() -> Option<&'static Logger> {
		GLOBAL_LOGGER.get()
	}

	pub fn log(&self, message: impl Into<String>) -> Result<()> {
		self.send(Message::Log(message.into()))
	}

	/// Shows `status` next to a spinner until it's replaced or cleared.
	pub fn set_status(&self, status: impl Into<String>) -> Result<()> {
		self.send(Message::SetStatus(status.into()))
	}

	pub fn clear_status(&self) -> Result<()> {
		self.send(Message::ClearStatus)
	}

	/// Stops the renderer and blocks until all pending messages are printed.
	///
	/// Logging after this fails with [Error::ChannelInternal].
	pub fn close(&self) -> Result<()> {
		let (notify, done) = crossbeam_channel::bounded(1);
		self.send(Message::Close(notify))?;
		done.recv().map_err(|_| Error::ChannelInternal)
	}

	fn send(&self, message: Message) -> Result<()> {
		self.channel
			.send(message)
			.map_err(|_| Error::ChannelInternal)
	}
}
