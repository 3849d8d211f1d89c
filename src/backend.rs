//! Byte streams a [`Port`](crate::port::Port) can be built on.
//!
//! The read timeout of a backend is fixed when it is opened, see
//! [`OpenSerialOptions`](crate::port::OpenSerialOptions) and
//! [`OpenTcpOptions`](crate::port::OpenTcpOptions).

use std::io;

use serialport as sp;

#[cfg(windows)]
use sp::COMPort as ExternSerial;
use sp::SerialPort;
#[cfg(unix)]
use sp::TTYPort as ExternSerial;

/// The placeholder name for a backend that doesn't have a name.
pub(crate) const UNKNOWN_BACKEND_NAME: &str = "<unknown backend>";

/// A byte stream connected to a controller.
pub trait Backend: io::Read + io::Write + private::Sealed {
	/// A name identifying the connection in log output, such as the device path.
	fn name(&self) -> Option<String>;
}

impl<C: Backend + ?Sized> Backend for Box<C> {
	fn name(&self) -> Option<String> {
		(**self).name()
	}
}

impl Backend for std::net::TcpStream {
	fn name(&self) -> Option<String> {
		self.peer_addr().map(|addr| format!("{addr}")).ok()
	}
}

/// A serial port, using the native port type of the platform.
#[derive(Debug)]
pub struct Serial(pub(crate) ExternSerial);

impl io::Read for Serial {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		io::Read::read(&mut self.0, buf)
	}
}

impl io::Write for Serial {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		io::Write::write(&mut self.0, buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		io::Write::flush(&mut self.0)
	}
}

impl Backend for Serial {
	fn name(&self) -> Option<String> {
		self.0.name()
	}
}

/// An in-memory backend for tests.
///
/// Replies are queued with [`Mock::push_reply`] and every byte written is
/// recorded, see [`Mock::sent_lines`]. Reading once the queue is exhausted
/// fails with a timeout, like a controller that never answers.
///
/// Enable the `mock` feature to use it outside of this crate's tests.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct Mock {
	/// Queued reply bytes.
	replies: io::Cursor<Vec<u8>>,
	/// Everything written so far.
	written: Vec<u8>,
	/// Surfaced by the next read, once.
	read_error: Option<io::Error>,
	/// Surfaced by the next write, once.
	write_error: Option<io::Error>,
}

#[cfg(any(test, feature = "mock"))]
impl Mock {
	/// Create an empty mock.
	pub fn new() -> Self {
		Mock::default()
	}

	/// Queue raw bytes for reading.
	pub fn append_data<T: AsRef<[u8]>>(&mut self, bytes: T) {
		self.replies.get_mut().extend_from_slice(bytes.as_ref());
	}

	/// Queue a reply followed by a carriage return.
	pub fn push_reply<T: AsRef<str>>(&mut self, reply: T) {
		self.append_data(reply.as_ref());
		self.append_data(b"\r");
	}

	/// Whether every queued byte has been read.
	pub fn is_empty(&self) -> bool {
		match usize::try_from(self.replies.position()) {
			Ok(position) => position >= self.replies.get_ref().len(),
			Err(_) => true,
		}
	}

	/// All bytes written so far.
	pub fn written(&self) -> &[u8] {
		&self.written
	}

	/// The carriage return terminated lines written so far, without their
	/// terminators.
	pub fn sent_lines(&self) -> Vec<String> {
		self.written
			.split(|&b| b == b'\r')
			.filter(|line| !line.is_empty())
			.map(|line| String::from_utf8_lossy(line).into_owned())
			.collect()
	}

	/// Like [`Mock::sent_lines`], but forget the lines afterwards.
	pub fn take_sent_lines(&mut self) -> Vec<String> {
		let lines = self.sent_lines();
		self.written.clear();
		lines
	}

	/// Fail the next `read` with `err`.
	pub fn read_error(&mut self, err: Option<io::Error>) {
		self.read_error = err;
	}

	/// Fail the next `write` with `err`.
	pub fn write_error(&mut self, err: Option<io::Error>) {
		self.write_error = err;
	}
}

#[cfg(any(test, feature = "mock"))]
impl Backend for Mock {
	fn name(&self) -> Option<String> {
		Some(format!("<mock 0x{:x}>", std::ptr::from_ref(self) as usize))
	}
}

#[cfg(any(test, feature = "mock"))]
impl io::Read for Mock {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if let Some(err) = self.read_error.take() {
			Err(err)
		} else if self.is_empty() {
			Err(io::Error::new(
				io::ErrorKind::TimedOut,
				"no reply queued in the mock",
			))
		} else {
			io::Read::read(&mut self.replies, buf)
		}
	}
}

#[cfg(any(test, feature = "mock"))]
impl io::Write for Mock {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		if let Some(err) = self.write_error.take() {
			Err(err)
		} else {
			self.written.extend_from_slice(buf);
			Ok(buf.len())
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

mod private {
	pub trait Sealed {}

	impl Sealed for super::Serial {}
	impl Sealed for std::net::TcpStream {}
	#[cfg(any(test, feature = "mock"))]
	impl Sealed for super::Mock {}
	impl<C: super::Backend + ?Sized> Sealed for Box<C> {}
}
