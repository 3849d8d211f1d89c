//! The request/response capability the protocol core needs from a connection.

use crate::error::Error;

/// A serially used, line oriented request/response channel to a controller.
///
/// At most one exchange is outstanding at any time. Implementations add the
/// end-of-message delimiter to outgoing commands and strip it from replies.
///
/// [`Port`](crate::port::Port) implements this for every
/// [`Backend`](crate::backend::Backend).
pub trait Transport {
	/// Write a command that produces no reply.
	fn command(&mut self, command: &str) -> Result<(), Error>;

	/// Write a command and block until its delimited reply has been read.
	///
	/// The returned text does not include the delimiter.
	fn command_reply(&mut self, command: &str) -> Result<String, Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
	fn command(&mut self, command: &str) -> Result<(), Error> {
		(**self).command(command)
	}
	fn command_reply(&mut self, command: &str) -> Result<String, Error> {
		(**self).command_reply(command)
	}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
	fn command(&mut self, command: &str) -> Result<(), Error> {
		(**self).command(command)
	}
	fn command_reply(&mut self, command: &str) -> Result<String, Error> {
		(**self).command_reply(command)
	}
}
