//! Types for opening and using a line oriented connection to a controller.
//!
//! Commands and replies are ASCII text terminated by a single delimiter byte,
//! a carriage return unless configured otherwise when the port is opened.
//!
//! ```rust
//! # use owisps::{port::Port, transport::Transport};
//! # fn wrapper() -> Result<(), owisps::error::Error> {
//! let mut port = Port::open_serial("/dev/ttyUSB0")?;
//! let version = port.command_reply("?VERSION")?;
//! println!("firmware: {version}");
//! # Ok(())
//! # }
//! ```

mod options;

use crate::backend::{Backend, Serial, UNKNOWN_BACKEND_NAME};
use crate::error::Error;
use crate::transport::Transport;
pub use options::*;
use std::{
	io,
	net::{TcpStream, ToSocketAddrs},
};

/// The default end-of-message delimiter: a carriage return.
pub const DEFAULT_TERMINATOR: u8 = b'\r';

/// A line feed, which some firmware emits after the delimiter.
const LINE_FEED: u8 = b'\n';

/// A connection to a controller.
///
/// A port is parameterized by the type of [`Backend`] used to send/receive
/// bytes. Use the convenience methods [`open_serial`] and [`open_tcp`] to
/// construct a serial port (`Port<Serial>`) or a TCP port (`Port<TcpStream>`).
/// To customize the construction of these types, or to construct a port with
/// a dynamic backend, use the [`OpenSerialOptions`] and [`OpenTcpOptions`]
/// builder types.
///
/// [`open_serial`]: Port::open_serial
/// [`open_tcp`]: Port::open_tcp
pub struct Port<B> {
	/// The underlying backend
	backend: B,
	/// The end-of-message delimiter.
	terminator: u8,
}

impl<B: Backend> std::fmt::Debug for Port<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Port")
			.field("name", &self.backend.name())
			.field("terminator", &self.terminator)
			.finish_non_exhaustive()
	}
}

impl Port<Serial> {
	/// Open the serial port at the specified path using the default options.
	///
	/// Alternatively, use [`Port::open_serial_options`] to customize how the port is opened.
	pub fn open_serial(path: &str) -> Result<Port<Serial>, Error> {
		OpenSerialOptions::new().open(path)
	}

	/// Get an [`OpenSerialOptions`] to customize how a serial port is opened.
	pub fn open_serial_options() -> OpenSerialOptions {
		OpenSerialOptions::default()
	}
}

impl Port<TcpStream> {
	/// Open the TCP port at the specified address using the default options.
	///
	/// Alternatively, use [`Port::open_tcp_options`] to customize how the port is opened.
	pub fn open_tcp<A: ToSocketAddrs>(address: A) -> Result<Port<TcpStream>, io::Error> {
		OpenTcpOptions::default().open(address)
	}

	/// Get an [`OpenTcpOptions`] to customize how a TCP port is opened.
	pub fn open_tcp_options() -> OpenTcpOptions {
		OpenTcpOptions::default()
	}
}

#[cfg(any(test, feature = "mock"))]
impl Port<crate::backend::Mock> {
	/// Open a port backed by a [`Mock`](crate::backend::Mock), delimited by a carriage return.
	pub fn open_mock() -> Port<crate::backend::Mock> {
		Port::from_backend(crate::backend::Mock::new(), DEFAULT_TERMINATOR)
	}
}

impl<B: Backend> Port<B> {
	/// Create a `Port` from a [`Backend`] type.
	pub fn from_backend(backend: B, terminator: u8) -> Self {
		Port {
			backend,
			terminator,
		}
	}

	fn backend_name(&self) -> String {
		self.backend
			.name()
			.unwrap_or_else(|| UNKNOWN_BACKEND_NAME.to_string())
	}

	/// Write one delimited line.
	fn write_line(&mut self, line: &str) -> Result<(), Error> {
		log::debug!("{} TX:   {}", self.backend_name(), line);
		let mut buffer = Vec::with_capacity(line.len() + 1);
		buffer.extend_from_slice(line.as_bytes());
		buffer.push(self.terminator);
		self.backend.write_all(&buffer)?;
		self.backend.flush()?;
		Ok(())
	}

	/// Read bytes up to and including the delimiter, returning the text before it.
	///
	/// Line feeds are dropped.
	fn read_line(&mut self) -> Result<String, Error> {
		let mut buf = Vec::with_capacity(32);
		let mut byte = [0u8];
		loop {
			self.backend.read_exact(&mut byte)?;
			match byte[0] {
				end if end == self.terminator => break,
				LINE_FEED => {}
				other => buf.push(other),
			}
		}
		let reply = String::from_utf8_lossy(&buf).into_owned();
		log::debug!("{} RECV: {}", self.backend_name(), reply);
		Ok(reply)
	}

	/// Get the end-of-message delimiter.
	pub fn terminator(&self) -> u8 {
		self.terminator
	}

	/// Get the "name" of the port's backend.
	///
	/// This is often the "name" passed to [`Port::open_serial`] or [`Port::open_tcp`].
	pub fn name(&self) -> Option<String> {
		self.backend.name()
	}

	/// Get a referenced to the backend.
	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// Get a mutable reference to the backend.
	pub fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	/// Consume the port and return the underlying backend.
	pub fn into_backend(self) -> B {
		self.backend
	}
}

impl<B: Backend> Transport for Port<B> {
	fn command(&mut self, command: &str) -> Result<(), Error> {
		self.write_line(command)
	}

	fn command_reply(&mut self, command: &str) -> Result<String, Error> {
		self.write_line(command)?;
		self.read_line()
	}
}
