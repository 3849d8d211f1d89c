//! Building the ASCII commands sent to the controller.
//!
//! Commands are rendered from [templates](template) whose placeholders are
//! filled in with [`strfmt`]. Axes are 0-based throughout this crate but
//! 1-based on the wire, so the `{axis}` placeholder always receives the axis
//! index plus one:
//!
//! ```rust
//! # use owisps::command::{build_move_command, CommandBuffer};
//! let mut buffer = CommandBuffer::new();
//! build_move_command(&mut buffer, 0, 1250.7).unwrap();
//! assert_eq!(buffer.as_str(), "PSET1=1250");
//! ```
//!
//! None of the builders perform I/O.

use crate::error::InvalidCommandError;
use std::collections::HashMap;
use strfmt::strfmt;

/// The longest command, in bytes, that fits in a [`CommandBuffer`].
pub const MAX_COMMAND_LEN: usize = 80;

/// Command templates.
///
/// `{axis}` is replaced by the 1-based axis number, `{val}` by a position or
/// counter value and `{mode}` by a [`HomeReferenceMode`](crate::axis::HomeReferenceMode) code.
pub mod template {
    /// Query the motor type of an axis.
    pub const QUERY_AXIS_TYPE: &str = "?MOTYPE{axis}";
    /// Query the status character of every axis.
    pub const QUERY_GROUP_STATUS: &str = "?ASTAT";
    /// Query the limit switch and power stage status bits of an axis.
    pub const QUERY_LIMIT_STATUS: &str = "?ESTAT{axis}";
    /// Initialize an axis.
    pub const INIT_AXIS: &str = "INIT{axis}";
    /// Enable the motor of an axis.
    pub const MOTOR_ON: &str = "MON{axis}";
    /// Disable the motor of an axis.
    pub const MOTOR_OFF: &str = "MOFF{axis}";
    /// Stop an axis.
    pub const STOP: &str = "STOP{axis}";
    /// Query the readback counter.
    pub const QUERY_COUNTER: &str = "?CNT{axis}";
    /// Force the readback counter to a value.
    pub const SET_COUNTER: &str = "CNT{axis}={val}";
    /// Query the positioning velocity.
    pub const QUERY_VELOCITY: &str = "?PVEL{axis}";
    /// Interpret targets as absolute positions.
    pub const ABSOLUTE_MODE: &str = "ABSOL{axis}";
    /// Interpret targets as relative distances.
    pub const RELATIVE_MODE: &str = "RELAT{axis}";
    /// Set the target position.
    pub const SET_TARGET: &str = "PSET{axis}={val}";
    /// Query the target position.
    pub const QUERY_TARGET: &str = "?PSET{axis}";
    /// Start moving to the target.
    pub const GO: &str = "PGO{axis}";
    /// Start homing with a reference mode.
    pub const HOME: &str = "REF{axis}={mode}";
    /// Query the firmware version.
    pub const QUERY_VERSION: &str = "?VERSION";
    /// Query the last error message.
    pub const QUERY_MESSAGE: &str = "?MSG";
}

/// A fixed capacity buffer holding one rendered command.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CommandBuffer {
    text: String,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        CommandBuffer {
            text: String::with_capacity(MAX_COMMAND_LEN),
        }
    }

    /// The rendered command.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether nothing has been rendered into the buffer.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the contents of the buffer, leaving it untouched if `text` does not fit.
    fn replace(&mut self, text: String) -> Result<(), InvalidCommandError> {
        if text.len() > MAX_COMMAND_LEN {
            return Err(InvalidCommandError::new(format!(
                "{text:?} is longer than {MAX_COMMAND_LEN} bytes"
            )));
        }
        self.text = text;
        Ok(())
    }
}

impl AsRef<str> for CommandBuffer {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Convert a 0-based axis index into the number used on the wire.
fn wire_axis(axis: usize) -> i64 {
    i64::try_from(axis).map_or(i64::MAX, |axis| axis.saturating_add(1))
}

/// Truncate a position toward zero, the way the controller's integer
/// arguments expect. Finite values outside the `i32` range saturate.
#[allow(clippy::cast_possible_truncation)]
fn truncate(position: f64) -> Result<i64, InvalidCommandError> {
    if !position.is_finite() {
        return Err(InvalidCommandError::new(format!(
            "position {position} is not a finite number"
        )));
    }
    Ok((position as i32).into())
}

fn render(
    buffer: &mut CommandBuffer,
    template: &str,
    vars: &[(&str, i64)],
) -> Result<(), InvalidCommandError> {
    if template.is_empty() {
        return Err(InvalidCommandError::new("empty command template"));
    }
    let fmt_context: HashMap<String, String> = vars
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.to_string()))
        .collect();
    let text = strfmt(template, &fmt_context)
        .map_err(|e| InvalidCommandError::new(format!("failed to format {template:?}: {e}")))?;
    buffer.replace(text)
}

/// Render a template whose only placeholder is the axis.
///
/// Fails, leaving `buffer` untouched, if the template is empty.
pub fn build_generic_command(
    buffer: &mut CommandBuffer,
    template: &str,
    axis: usize,
) -> Result<(), InvalidCommandError> {
    render(buffer, template, &[("axis", wire_axis(axis))])
}

/// Render the "set target position" command.
///
/// The position is truncated toward zero. A NaN or infinite position fails,
/// leaving `buffer` untouched.
pub fn build_move_command(
    buffer: &mut CommandBuffer,
    axis: usize,
    position: f64,
) -> Result<(), InvalidCommandError> {
    render(
        buffer,
        template::SET_TARGET,
        &[("axis", wire_axis(axis)), ("val", truncate(position)?)],
    )
}

/// Render the "force readback counter" command.
///
/// The position is truncated toward zero. A NaN or infinite position fails,
/// leaving `buffer` untouched.
pub fn build_set_position_command(
    buffer: &mut CommandBuffer,
    axis: usize,
    position: f64,
) -> Result<(), InvalidCommandError> {
    render(
        buffer,
        template::SET_COUNTER,
        &[("axis", wire_axis(axis)), ("val", truncate(position)?)],
    )
}

/// Render the "start homing" command with the given reference mode code.
pub fn build_home_command(
    buffer: &mut CommandBuffer,
    axis: usize,
    home_mode: i32,
) -> Result<(), InvalidCommandError> {
    render(
        buffer,
        template::HOME,
        &[("axis", wire_axis(axis)), ("mode", home_mode.into())],
    )
}
