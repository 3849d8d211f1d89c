//! Types defining the different options when opening a port.

use super::{Port, DEFAULT_TERMINATOR};
use crate::{
    backend::{Backend, Serial},
    error::Error,
};
use serialport as sp;
use std::{
    io,
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

/// Options for configuring and opening a serial port.
///
/// ## Example
///
/// ```rust
/// # use owisps::port::OpenSerialOptions;
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut port = OpenSerialOptions::new()
///     .baud_rate(57_600)
///     .timeout(Some(Duration::from_millis(500)))
///     .open("/dev/ttyUSB0")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenSerialOptions {
    /// The custom baud rate
    baud_rate: u32,
    /// The custom timeout
    timeout: Option<Duration>,
    /// The end-of-message delimiter
    terminator: u8,
}

impl OpenSerialOptions {
    /// The default baud rate of the controller's serial interface: 9,600.
    pub const DEFAULT_BAUD_RATE: u32 = 9_600;

    /// Create a blank set of options ready for configuration.
    ///
    /// The default baud rate, read timeout and delimiter are 9,600, 3 seconds
    /// and a carriage return, respectively.
    ///
    /// Equivalent to [`default`](OpenSerialOptions::default).
    pub fn new() -> Self {
        OpenSerialOptions {
            baud_rate: OpenSerialOptions::DEFAULT_BAUD_RATE,
            timeout: Some(Duration::from_secs(3)),
            terminator: DEFAULT_TERMINATOR,
        }
    }

    /// Set a custom baud rate.
    ///
    /// The default is 9,600.
    pub fn baud_rate(&mut self, baud_rate: u32) -> &mut Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set a custom read timeout.
    ///
    /// If duration is `None`, reads will block indefinitely. The default is 3 seconds.
    pub fn timeout(&mut self, duration: Option<Duration>) -> &mut Self {
        self.timeout = duration;
        self
    }

    /// Set the end-of-message delimiter.
    ///
    /// The default is a carriage return.
    pub fn terminator(&mut self, terminator: u8) -> &mut Self {
        self.terminator = terminator;
        self
    }

    /// Open a [`Serial`] port at the specified path.
    fn open_serial_port(&self, path: &str) -> Result<Serial, Error> {
        // The baud rate passed to new is ignored by some platforms. It must be
        // defined using the baud_rate method below.
        sp::new(path, OpenSerialOptions::DEFAULT_BAUD_RATE)
            .data_bits(sp::DataBits::Eight)
            .parity(sp::Parity::None)
            .flow_control(sp::FlowControl::None)
            .stop_bits(sp::StopBits::One)
            // The serialport API does not support infinite timeouts, so simply
            // set the timeout to the largest possible duration if `timeout` is
            // `None`, which is practically infinite.
            .timeout(self.timeout.unwrap_or(Duration::MAX))
            .baud_rate(self.baud_rate)
            .open_native()
            .map(Serial)
            .map_err(Into::into)
    }

    /// Open the port at the specified path with the custom options.
    pub fn open(&self, path: &str) -> Result<Port<Serial>, Error> {
        Ok(Port::from_backend(
            self.open_serial_port(path)?,
            self.terminator,
        ))
    }

    /// Open the port at the specified path with the custom options.
    ///
    /// The type of the underlying backend is erased via dynamic dispatch,
    /// which does have runtime overhead. [`OpenSerialOptions::open`] should
    /// generally be used instead, except when the type of the underlying
    /// backend may not be known at compile time.
    pub fn open_dyn(&self, path: &str) -> Result<Port<Box<dyn Backend>>, Error> {
        Ok(Port::from_backend(
            Box::new(self.open_serial_port(path)?),
            self.terminator,
        ))
    }
}

impl Default for OpenSerialOptions {
    fn default() -> Self {
        OpenSerialOptions::new()
    }
}

/// Options for configuring and opening a TCP port.
///
/// Controllers on a network are typically reached through a serial device
/// server, which forwards the raw byte stream.
///
/// ## Example
///
/// ```rust
/// # use owisps::port::OpenTcpOptions;
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut port = OpenTcpOptions::new()
///     .timeout(Some(Duration::from_millis(500)))
///     .open("192.168.0.1:4001")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenTcpOptions {
    /// The custom timeout
    timeout: Option<Duration>,
    /// The end-of-message delimiter
    terminator: u8,
}

impl OpenTcpOptions {
    /// Create a blank set of options ready for configuration.
    ///
    /// The default read timeout is 3 seconds and the delimiter a carriage return.
    ///
    /// Equivalent to [`default`](OpenTcpOptions::default).
    pub fn new() -> Self {
        OpenTcpOptions {
            timeout: Some(Duration::from_secs(3)),
            terminator: DEFAULT_TERMINATOR,
        }
    }

    /// Set a custom read timeout.
    ///
    /// If duration is `None`, reads will block indefinitely. The default is 3 seconds.
    pub fn timeout(&mut self, duration: Option<Duration>) -> &mut Self {
        self.timeout = duration;
        self
    }

    /// Set the end-of-message delimiter.
    ///
    /// The default is a carriage return.
    pub fn terminator(&mut self, terminator: u8) -> &mut Self {
        self.terminator = terminator;
        self
    }

    /// Open a [`TcpStream`] at the specified address.
    fn open_tcp_stream<A: ToSocketAddrs>(&self, address: A) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(address)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Open the port at the specified address with the custom options.
    pub fn open<A: ToSocketAddrs>(&self, address: A) -> io::Result<Port<TcpStream>> {
        Ok(Port::from_backend(
            self.open_tcp_stream(address)?,
            self.terminator,
        ))
    }

    /// Open the port at the specified address with the custom options.
    ///
    /// The type of the underlying backend is erased via dynamic dispatch,
    /// which does have runtime overhead. [`OpenTcpOptions::open`] should
    /// generally be used instead, except when the type of the underlying
    /// backend may not be known at compile time.
    pub fn open_dyn<A: ToSocketAddrs>(&self, address: A) -> io::Result<Port<Box<dyn Backend>>> {
        Ok(Port::from_backend(
            Box::new(self.open_tcp_stream(address)?),
            self.terminator,
        ))
    }
}

impl Default for OpenTcpOptions {
    fn default() -> Self {
        OpenTcpOptions::new()
    }
}
