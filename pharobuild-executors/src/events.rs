/// Event is the type used to shuttle information out of a build: our own progress lines,
/// output produced by the VM, and finally its exit code.
///
/// Output is buffered to a full line before sending an event; the linebreak is stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
	/// Generally, the name of the image being built.
	pub topic: String,
	pub body: EventBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventBody {
	/// A progress or diagnostic line from the executor itself.
	Log(String),
	Output {
		/// Follows the convention of unix fd's: 1 is stdout, 2 is stderr.
		channel: i32,
		/// Bytes that aren't valid UTF-8 are replaced, VMs print whatever they like.
		val: String,
	},
	ExitCode(Option<i32>),
}

/// Sending half of the log sink, tagged with the topic every event gets.
///
/// Sends never fail from the caller's point of view: if nobody is listening anymore,
/// the build goes on regardless.
#[derive(Clone, Debug)]
pub struct Outbox {
	topic: String,
	sender: crossbeam_channel::Sender<Event>,
}

impl Outbox {
	pub fn new(topic: impl Into<String>, sender: crossbeam_channel::Sender<Event>) -> Self {
		Outbox {
			topic: topic.into(),
			sender,
		}
	}

	pub fn send(&self, body: EventBody) {
		let _ = self.sender.send(Event {
			topic: self.topic.clone(),
			body,
		});
	}

	pub fn log(&self, line: impl Into<String>) {
		self.send(EventBody::Log(line.into()));
	}
}
