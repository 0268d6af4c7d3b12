use std::{thread, time::Duration};

use crossbeam_channel::{Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};

use crate::Message;

pub(crate) struct TerminalRenderer {
	status_bar: Option<ProgressBar>,

	channel: Receiver<Message>,
}

impl TerminalRenderer {
	pub(crate) fn start(channel: Receiver<Message>) {
		thread::spawn(move || {
			let renderer = Self {
				status_bar: None,
				channel,
			};
			// The renderer (and with it the receiving end) is gone by the time anyone is notified.
			if let Some(notify) = renderer.run() {
				let _ = notify.send(()); // Ignore if no notification could be sent.
			}
		});
	}

	#[inline]
	fn style() -> ProgressStyle {
		ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
			.expect("invalid indicatif template")
	}

	fn run(mut self) -> Option<Sender<()>> {
		loop {
			let timeout = Duration::from_millis(100);
			let message = match self.channel.recv_timeout(timeout) {
				Ok(message) => message,
				Err(err) => {
					if err.is_timeout() {
						// Keep the spinner spinning while a long step runs silently.
						if let Some(status_bar) = &self.status_bar {
							status_bar.tick();
						}
						continue;
					} else {
						debug_assert!(err.is_disconnected());
						self.clear_status();
						return None;
					}
				}
			};

			match message {
				Message::Close(notify) => {
					self.clear_status();
					return Some(notify);
				}
				Message::Log(message) => match &self.status_bar {
					Some(status_bar) => status_bar.suspend(|| print!("{message}")),
					None => print!("{message}"),
				},
				Message::SetStatus(status) => {
					let status_bar = self.status_bar.get_or_insert_with(|| {
						ProgressBar::new_spinner().with_style(Self::style())
					});
					status_bar.set_message(status);
					status_bar.tick();
				}
				Message::ClearStatus => self.clear_status(),
			}
		}
	}

	fn clear_status(&mut self) {
		if let Some(status_bar) = self.status_bar.take() {
			status_bar.finish_and_clear();
		}
	}
}
