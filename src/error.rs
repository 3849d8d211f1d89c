//! Error types.
//!
//! Each error is represented by a unique type that implements [`std::error::Error`].
//! However, most APIs can fail in more than one way and so return the
//! higher level [`Error`] enum. The individual error types are convertible to
//! [`Error`], allowing them to be used with `?`:
//!
//! ```
//! use owisps::error::{Error, MalformedReplyError};
//!
//! fn foo() -> Result<i32, MalformedReplyError> {
//!     // ...
//! # unimplemented!();
//! }
//!
//! fn bar() -> Result<(), Error> {
//!     let _value = foo()?;
//!     // ...
//! # Ok(())
//! }
//! ```
//!
//! Transport failures (the write or the read did not complete) surface as
//! [`Error::Io`] or [`Error::SerialDeviceInUseOrDisconnected`]. Use
//! [`Error::is_transport`] or [`Error::is_timeout`] to classify them.

use crate::axis::{AxisType, StatusCode};

/// Implement the `Error` and `Display` traits for the specified type.
///
/// After the type define the format string and any arguments it should
/// reference after `self =>` (to abide by macro hygiene rules).
macro_rules! impl_error_display {
    (
        $name:path,
        $self:ident =>
        $display:literal
        $(,
            $($arg:expr),+
        )?
    ) => {
        impl std::error::Error for $name {}

        impl std::fmt::Display for $name {
            fn fmt(&$self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(
                    f,
                    $display
                    $(,
                        $($arg),+
                    )?
                )
            }
        }
    };
}

/// Define error enums that contain concrete error types (not other error enums).
///
/// `From` and `TryFrom` traits will be implemented for the enum and it's underlying
/// errors. The enum's `Display` implementation will defer to the underlying errors'
/// `Display` implementations.
///
/// Simple implementations of `From` with other error enums can be added by
/// appending a succinct impl block, which assumes that each variant has a
/// single tuple value that can be converted to the value in this enum with its
/// own From implementation.
macro_rules! error_enum {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $(
                $variant:ident($inner:path)
            ),+
            $(,)?
        }
        $(
            impl From<$from_t:ident>
            {
                $($from_variant:ident => $to_variant:ident),+
                $(,)?
            }
        )*
    ) => {
        $(
            #[$attr]
        )*
        #[allow(missing_docs)]
        pub enum $name {
            $(
                $variant($inner)
            ),+
        }

        impl std::error::Error for $name {}

        // Defer the display to the inner error type
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$variant(e) => std::fmt::Display::fmt(e, f)
                    ),+
                }
            }
        }

        $(
            impl From<$inner> for $name {
                fn from(other: $inner) -> Self {
                    $name::$variant(other)
                }
            }

            impl TryFrom<$name> for $inner {
                type Error = $name;
                fn try_from(other: $name) -> Result<Self, Self::Error> {
                    match other {
                        $name::$variant(value) => Ok(value),
                        #[allow(unreachable_patterns)]
                        value => Err(value)
                    }
                }
            }
        )+

        $(
            impl From<$from_t> for $name {
                fn from(other: $from_t) -> Self {
                    match other {
                        $($from_t::$from_variant(e) => $name::$to_variant(From::from(e))),+
                    }
                }
            }
        )*
    };
}

/// The specified device is either disconnected or already in use by another process.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SerialDeviceInUseOrDisconnectedError(Box<str>);

impl_error_display! {
    SerialDeviceInUseOrDisconnectedError,
    self =>
    "the specified device is either disconnected or already in use by another process: {}", self.0
}

/// The text of a reply did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MalformedReplyError(Box<str>);

impl MalformedReplyError {
    pub(crate) fn new<S: AsRef<str>>(reply: S) -> Self {
        MalformedReplyError(Box::from(reply.as_ref()))
    }

    /// Get the text of the offending reply.
    pub fn reply(&self) -> &str {
        &self.0
    }
}

impl_error_display! {
    MalformedReplyError,
    self => "malformed reply: {:?}", self.0
}

/// A reply parsed to a number, but the number does not name any known value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutOfRangeError {
    what: &'static str,
    value: i64,
}

impl OutOfRangeError {
    pub(crate) fn new(what: &'static str, value: i64) -> Self {
        OutOfRangeError { what, value }
    }

    /// The kind of value that was being decoded, e.g. `"axis type"`.
    pub fn what(&self) -> &'static str {
        self.what
    }

    /// The out of range value.
    pub fn value(&self) -> i64 {
        self.value
    }
}

impl_error_display! {
    OutOfRangeError,
    self => "{} out of range: {}", self.what, self.value
}

/// The requested operation is not supported by the type of motor on the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnsupportedOperationError {
    axis: usize,
    axis_type: AxisType,
}

impl UnsupportedOperationError {
    pub(crate) fn new(axis: usize, axis_type: AxisType) -> Self {
        UnsupportedOperationError { axis, axis_type }
    }

    /// The 0-based index of the axis.
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// The type of the axis that refused the operation.
    pub fn axis_type(&self) -> AxisType {
        self.axis_type
    }
}

impl_error_display! {
    UnsupportedOperationError,
    self => "operation not supported on axis {} ({:?})", self.axis, self.axis_type
}

/// Motion was requested while the axis was not enabled and no pre-motion
/// command is configured to enable it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisNotReadyError {
    axis: usize,
    status: StatusCode,
}

impl AxisNotReadyError {
    pub(crate) fn new(axis: usize, status: StatusCode) -> Self {
        AxisNotReadyError { axis, status }
    }

    /// The 0-based index of the axis.
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// The last status reported for the axis.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl_error_display! {
    AxisNotReadyError,
    self => "axis {} is not ready (status {:?}) and no pre-motion command is configured", self.axis, self.status
}

/// A command could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidCommandError(Box<str>);

impl InvalidCommandError {
    pub(crate) fn new<S: AsRef<str>>(reason: S) -> Self {
        InvalidCommandError(Box::from(reason.as_ref()))
    }
}

impl_error_display! {
    InvalidCommandError,
    self => "invalid command: {}", self.0
}

/// The axis index does not exist on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoSuchAxisError {
    axis: usize,
    count: usize,
}

impl NoSuchAxisError {
    pub(crate) fn new(axis: usize, count: usize) -> Self {
        NoSuchAxisError { axis, count }
    }

    /// The requested axis index.
    pub fn axis(&self) -> usize {
        self.axis
    }
}

impl_error_display! {
    NoSuchAxisError,
    self => "axis {} does not exist (the controller has {} axes)", self.axis, self.count
}

/// The controller reported a power stage error (or a disconnected motor) for an axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PowerStageError {
    axis: usize,
}

impl PowerStageError {
    pub(crate) fn new(axis: usize) -> Self {
        PowerStageError { axis }
    }

    /// The 0-based index of the axis.
    pub fn axis(&self) -> usize {
        self.axis
    }
}

impl_error_display! {
    PowerStageError,
    self => "power stage error or disconnected motor on axis {}", self.axis
}

/// A shared resource could not be locked because its lock was poisoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockPoisonedError;

impl_error_display! {
    LockPoisonedError,
    self => "the lock was poisoned"
}

/// A shared resource could not be locked because it is already in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockUnavailableError;

impl_error_display! {
    LockUnavailableError,
    self => "the lock is held elsewhere"
}

error_enum! {
    /// A shared resource could not be locked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[non_exhaustive]
    pub enum LockError {
        Poisoned(LockPoisonedError),
        Unavailable(LockUnavailableError),
    }
}

error_enum! {
    /// Any error returned by this library.
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum Error {
        SerialDeviceInUseOrDisconnected(SerialDeviceInUseOrDisconnectedError),
        Io(std::io::Error),
        MalformedReply(MalformedReplyError),
        OutOfRange(OutOfRangeError),
        UnsupportedOperation(UnsupportedOperationError),
        AxisNotReady(AxisNotReadyError),
        InvalidCommand(InvalidCommandError),
        NoSuchAxis(NoSuchAxisError),
        PowerStage(PowerStageError),
        LockPoisoned(LockPoisonedError),
        LockUnavailable(LockUnavailableError),
    }

    impl From<LockError> {
        Poisoned => LockPoisoned,
        Unavailable => LockUnavailable,
    }
}

impl Error {
    /// A convenience function for determining if the error is due to the
    /// port timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }

    /// Whether the error means the exchange with the controller did not
    /// complete (the write or the read failed).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::SerialDeviceInUseOrDisconnected(_))
    }
}

impl From<serialport::Error> for Error {
    fn from(other: serialport::Error) -> Self {
        use std::io;

        match other.kind() {
            serialport::ErrorKind::NoDevice => Error::SerialDeviceInUseOrDisconnected(
                SerialDeviceInUseOrDisconnectedError(other.description.into_boxed_str()),
            ),
            serialport::ErrorKind::InvalidInput => Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                other.description,
            )),
            serialport::ErrorKind::Unknown => Error::Io(io::Error::other(other.description)),
            serialport::ErrorKind::Io(kind) => Error::Io(io::Error::new(kind, other.description)),
        }
    }
}
