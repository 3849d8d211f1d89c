//! Commands run at initialization, before motion and after motion.
//!
//! Each hook reads a configuration string for the axis from the
//! [`ParameterStore`] and sends a command only for the values it knows:
//!
//! | Hook | Value | Command |
//! |---|---|---|
//! | [`Hook::Init`] | `"INIT"` | `INIT<n>` |
//! | [`Hook::Prem`] | `"INIT"` | `INIT<n>` |
//! | [`Hook::Prem`] | `"MON"` | `MON<n>` |
//! | [`Hook::Post`] | `"MOFF"` | `MOFF<n>` |
//!
//! Any other value, including an unset one, sends nothing. When a command is
//! sent the axis's problem flag follows its outcome.

use crate::{
    axis::{Axis, Flag},
    command::{build_generic_command, template, CommandBuffer},
    error::Error,
    params::{Param, ParameterStore},
    transport::Transport,
};

/// Enables or initializes the axis.
pub const VALUE_INIT: &str = "INIT";
/// Enables the motor.
pub const VALUE_MOTOR_ON: &str = "MON";
/// Disables the motor.
pub const VALUE_MOTOR_OFF: &str = "MOFF";

/// The three lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Runs when the init string is written.
    Init,
    /// Runs before every move or home.
    Prem,
    /// Runs when a motion completes.
    Post,
}

impl Hook {
    /// The parameter holding the hook's configuration string.
    pub const fn param(self) -> Param {
        match self {
            Hook::Init => Param::Init,
            Hook::Prem => Param::Prem,
            Hook::Post => Param::Post,
        }
    }

    /// The command template to send for a configuration value, if any.
    fn template(self, value: &str) -> Option<&'static str> {
        match (self, value) {
            (Hook::Init | Hook::Prem, VALUE_INIT) => Some(template::INIT_AXIS),
            (Hook::Prem, VALUE_MOTOR_ON) => Some(template::MOTOR_ON),
            (Hook::Post, VALUE_MOTOR_OFF) => Some(template::MOTOR_OFF),
            _ => None,
        }
    }
}

/// What a hook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookOutcome {
    /// A command was sent successfully.
    Sent,
    /// The hook has nothing to do for the configured value.
    NotConfigured,
}

/// Run a hook for an axis.
///
/// A failed command raises the axis's problem flag and is returned; a
/// successful one clears it.
pub fn execute<T, S>(
    hook: Hook,
    transport: &mut T,
    store: &mut S,
    axis: &mut Axis,
) -> Result<HookOutcome, Error>
where
    T: Transport + ?Sized,
    S: ParameterStore + ?Sized,
{
    let value = store.get_string(axis.index(), hook.param()).unwrap_or_default();
    let Some(command_template) = hook.template(&value) else {
        return Ok(HookOutcome::NotConfigured);
    };

    let mut buffer = CommandBuffer::new();
    let result = build_generic_command(&mut buffer, command_template, axis.index())
        .map_err(Error::from)
        .and_then(|()| transport.command(buffer.as_str()));
    match result {
        Ok(()) => {
            log::debug!("axis {}: {hook:?} hook sent {buffer}", axis.index());
            axis.set_flag(store, Flag::Problem, false);
            Ok(HookOutcome::Sent)
        }
        Err(e) => {
            log::warn!("axis {}: {hook:?} hook failed: {e}", axis.index());
            axis.set_flag(store, Flag::Problem, true);
            Err(e)
        }
    }
}

/// Run the init hook.
pub fn execute_init<T, S>(transport: &mut T, store: &mut S, axis: &mut Axis) -> Result<HookOutcome, Error>
where
    T: Transport + ?Sized,
    S: ParameterStore + ?Sized,
{
    execute(Hook::Init, transport, store, axis)
}

/// Run the pre-motion hook.
pub fn execute_prem<T, S>(transport: &mut T, store: &mut S, axis: &mut Axis) -> Result<HookOutcome, Error>
where
    T: Transport + ?Sized,
    S: ParameterStore + ?Sized,
{
    execute(Hook::Prem, transport, store, axis)
}

/// Run the post-motion hook.
pub fn execute_post<T, S>(transport: &mut T, store: &mut S, axis: &mut Axis) -> Result<HookOutcome, Error>
where
    T: Transport + ?Sized,
    S: ParameterStore + ?Sized,
{
    execute(Hook::Post, transport, store, axis)
}
