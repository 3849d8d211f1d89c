//! Decoding the controller's replies.
//!
//! Every parser takes the outcome of the exchange that produced the reply. A
//! failed exchange is returned as-is before the text is inspected, so callers
//! can pass the result of [`Transport::command_reply`](crate::transport::Transport::command_reply)
//! straight through:
//!
//! ```rust
//! # use owisps::{reply::parse_readback_position, transport::Transport};
//! # fn wrapper<T: Transport>(port: &mut T) -> Result<(), owisps::error::Error> {
//! let position = parse_readback_position(port.command_reply("?CNT1"))?;
//! # Ok(())
//! # }
//! ```
//!
//! Numbers must be a signed decimal integer, optionally surrounded by
//! whitespace. Anything else is a [`MalformedReplyError`].

use crate::{
    axis::AxisType,
    error::{Error, MalformedReplyError},
};

/// The limit switch and power stage bits reported for an axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LimitStatus(u32);

impl LimitStatus {
    /// The low limit switch requested a stop.
    pub const LOW_LIMIT_STOP: LimitStatus = LimitStatus(1);
    /// The low limit switch requested a deceleration.
    pub const LOW_LIMIT_DECEL: LimitStatus = LimitStatus(2);
    /// The high limit switch requested a deceleration.
    pub const HIGH_LIMIT_DECEL: LimitStatus = LimitStatus(4);
    /// The high limit switch requested a stop.
    pub const HIGH_LIMIT_STOP: LimitStatus = LimitStatus(8);
    /// The power stage reported an error, or the motor is disconnected.
    pub const POWER_STAGE_ERROR: LimitStatus = LimitStatus(16);

    /// Create a status from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        LimitStatus(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether all the bits in `other` are set.
    pub const fn contains(self, other: LimitStatus) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the axis is at its low limit.
    pub const fn low_limit(self) -> bool {
        self.contains(LimitStatus::LOW_LIMIT_DECEL)
    }

    /// Whether the axis is at its high limit.
    pub const fn high_limit(self) -> bool {
        self.contains(LimitStatus::HIGH_LIMIT_DECEL)
    }

    /// Whether the power stage reported an error.
    pub const fn power_stage_error(self) -> bool {
        self.contains(LimitStatus::POWER_STAGE_ERROR)
    }
}

impl std::ops::BitOr for LimitStatus {
    type Output = LimitStatus;
    fn bitor(self, rhs: Self) -> Self::Output {
        LimitStatus(self.0 | rhs.0)
    }
}

impl std::fmt::LowerHex for LimitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Parse a signed decimal integer.
fn parse_integer(reply: &str) -> Result<i32, MalformedReplyError> {
    reply
        .trim()
        .parse()
        .map_err(|_| MalformedReplyError::new(reply))
}

/// Decode the readback counter (`?CNT<n>`).
pub fn parse_readback_position(reply: Result<String, Error>) -> Result<i32, Error> {
    let reply = reply?;
    Ok(parse_integer(&reply)?)
}

/// Decode the limit status bits (`?ESTAT<n>`).
///
/// An empty reply or a negative value is malformed.
pub fn parse_limit_status(reply: Result<String, Error>) -> Result<LimitStatus, Error> {
    let reply = reply?;
    if reply.trim().is_empty() {
        return Err(MalformedReplyError::new(reply).into());
    }
    let bits = parse_integer(&reply)?;
    u32::try_from(bits)
        .map(LimitStatus::from_bits)
        .map_err(|_| MalformedReplyError::new(reply).into())
}

/// Decode the motor type of an axis (`?MOTYPE<n>`).
///
/// Values that do not name an [`AxisType`] are an
/// [`OutOfRangeError`](crate::error::OutOfRangeError).
pub fn parse_axis_type(reply: Result<String, Error>) -> Result<AxisType, Error> {
    let reply = reply?;
    let code = parse_integer(&reply)?;
    Ok(AxisType::try_from(code)?)
}
