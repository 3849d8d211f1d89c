//! The controller: axis discovery, motion commands and polling.
//!
//! A [`Controller`] owns the [`Transport`] to the device, the
//! [`ParameterStore`] its axis state is published to, and one [`Axis`] per
//! configured axis. Every exchange goes through `&mut self`, so only one is
//! ever outstanding. To share a controller between a polling thread and
//! command callers, wrap it in an `Arc<Mutex<_>>` (see
//! [`Poller`](crate::poller::Poller)).
//!
//! ```rust
//! # use owisps::{controller::ControllerOptions, params::Params, port::Port};
//! # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let port = Port::open_serial("/dev/ttyUSB0")?;
//! let mut controller = ControllerOptions::new().num_axes(2).build(port, Params::new());
//! controller.move_axis(0, 1250.0, false)?;
//! while controller.poll_cycle()? {
//!     std::thread::sleep(controller.moving_poll_period());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Every command or query that targets an axis updates its problem flag: it
//! is raised when the exchange fails and cleared when it succeeds.

mod options;
mod report;
#[cfg(test)]
mod test;

use crate::{
    axis::{Axis, AxisType, Flag, HomeReferenceMode, StatusCode},
    command::{
        build_generic_command, build_home_command, build_move_command,
        build_set_position_command, template, CommandBuffer,
    },
    error::{AxisNotReadyError, Error, NoSuchAxisError, PowerStageError, UnsupportedOperationError},
    lifecycle::{self, Hook, HookOutcome},
    params::ParameterStore,
    reply::{parse_axis_type, parse_limit_status, parse_readback_position},
    status::apply_status,
    transport::Transport,
};
pub use options::*;
pub use report::*;
use std::time::Duration;

/// Send a write-only command that only takes the axis.
fn send<T: Transport + ?Sized>(transport: &mut T, template: &str, axis: usize) -> Result<(), Error> {
    let mut buffer = CommandBuffer::new();
    build_generic_command(&mut buffer, template, axis)?;
    transport.command(buffer.as_str())
}

/// Send a query that only takes the axis and return its reply.
fn query<T: Transport + ?Sized>(transport: &mut T, template: &str, axis: usize) -> Result<String, Error> {
    let mut buffer = CommandBuffer::new();
    build_generic_command(&mut buffer, template, axis)?;
    transport.command_reply(buffer.as_str())
}

/// Update the axis's problem flag from the outcome of an interaction.
fn record_outcome<S, V>(store: &mut S, axis: &mut Axis, result: Result<V, Error>) -> Result<V, Error>
where
    S: ParameterStore + ?Sized,
{
    match &result {
        Ok(_) => axis.set_flag(store, Flag::Problem, false),
        Err(e) => {
            log::warn!("axis {}: {e}", axis.index());
            axis.set_flag(store, Flag::Problem, true);
        }
    }
    result
}

/// Run the pre-motion hook and check that the axis can move.
fn prepare_motion<T, S>(transport: &mut T, store: &mut S, axis: &mut Axis) -> Result<(), Error>
where
    T: Transport + ?Sized,
    S: ParameterStore + ?Sized,
{
    match lifecycle::execute_prem(transport, store, axis)? {
        HookOutcome::NotConfigured if axis.last_status().is_unready() => {
            let err = AxisNotReadyError::new(axis.index(), axis.last_status());
            record_outcome(store, axis, Err(err.into()))
        }
        _ => Ok(()),
    }
}

/// Apply one character of a group status reply to an axis.
fn apply_group_status<T, S>(transport: &mut T, store: &mut S, axis: &mut Axis, code: StatusCode)
where
    T: Transport + ?Sized,
    S: ParameterStore + ?Sized,
{
    let Some(transition) = apply_status(axis.axis_type(), axis.flags(), code) else {
        return;
    };
    if axis.last_status() != code {
        log::debug!(
            "axis {}: status {} -> {}",
            axis.index(),
            axis.last_status().as_char(),
            code.as_char()
        );
    }
    axis.set_last_status(code);
    if code == StatusCode::Unknown {
        log::warn!("axis {}: controller reported an unknown status", axis.index());
    }
    axis.update_flags(store, transition.flags);
    if transition.run_post_hook {
        // A failure raises the problem flag and has already been logged.
        let _ = lifecycle::execute_post(transport, store, axis);
    }
}

/// Query the limit status and readback counter of an axis.
fn poll_detail<T, S>(transport: &mut T, store: &mut S, axis: &mut Axis) -> Result<(), Error>
where
    T: Transport + ?Sized,
    S: ParameterStore + ?Sized,
{
    let index = axis.index();
    let limits = parse_limit_status(query(transport, template::QUERY_LIMIT_STATUS, index))?;
    if limits.power_stage_error() {
        return Err(PowerStageError::new(index).into());
    }
    axis.set_flag(store, Flag::LowLimit, limits.low_limit());
    axis.set_flag(store, Flag::HighLimit, limits.high_limit());

    let position = parse_readback_position(query(transport, template::QUERY_COUNTER, index))?;
    axis.set_position(store, position);
    Ok(())
}

/// A connection to a controller and the state of its axes.
pub struct Controller<T, S> {
    /// The channel to the device
    transport: T,
    /// Where axis state is published
    store: S,
    /// One entry per configured axis, in wire order
    axes: Vec<Axis>,
    /// The options the controller was created with
    options: ControllerOptions,
}

impl<T, S> std::fmt::Debug for Controller<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("axes", &self.axes)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, S: ParameterStore> Controller<T, S> {
    /// Create a controller and discover the type of each of its axes.
    ///
    /// Discovery never fails as a whole: an axis whose type cannot be
    /// determined stays [`AxisType::Unknown`] with its comms error flag set,
    /// and is ignored from then on.
    pub fn new(transport: T, store: S, options: &ControllerOptions) -> Self {
        let mut controller = Controller {
            transport,
            store,
            axes: Vec::with_capacity(options.num_axes),
            options: options.clone(),
        };
        for index in 0..options.num_axes {
            let axis = controller.discover_axis(index);
            log::info!("axis {index}: discovered {:?}", axis.axis_type());
            controller.axes.push(axis);
        }
        controller
    }

    /// Query the type of an axis and check its power stage.
    fn discover_axis(&mut self, index: usize) -> Axis {
        let transport = &mut self.transport;
        let store = &mut self.store;

        let discovered = parse_axis_type(query(transport, template::QUERY_AXIS_TYPE, index));
        let axis_type = match &discovered {
            Ok(axis_type) => *axis_type,
            Err(e) => {
                log::error!("axis {index}: failed to determine the motor type: {e}");
                AxisType::Unknown
            }
        };
        let mut axis = Axis::new(index, axis_type, self.options.homing_mode);

        if discovered.is_ok() {
            let result = parse_limit_status(query(transport, template::QUERY_LIMIT_STATUS, index))
                .and_then(|limits| {
                    if limits.power_stage_error() {
                        Err(PowerStageError::new(index).into())
                    } else {
                        Ok(())
                    }
                });
            // Failures are reported through the problem flag.
            let _ = record_outcome(store, &mut axis, result);
        } else {
            axis.set_flag(store, Flag::Problem, true);
        }
        if axis_type == AxisType::Unknown {
            axis.set_flag(store, Flag::CommsError, true);
        }
        axis
    }

    /// Split the controller into the parts needed to work on one axis.
    fn split(&mut self, index: usize) -> Result<(&mut T, &mut S, &mut Axis), NoSuchAxisError> {
        let count = self.axes.len();
        let axis = self
            .axes
            .get_mut(index)
            .ok_or_else(|| NoSuchAxisError::new(index, count))?;
        Ok((&mut self.transport, &mut self.store, axis))
    }

    /// The number of axes.
    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    /// All axes, in wire order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Get an axis.
    pub fn axis(&self, index: usize) -> Result<&Axis, NoSuchAxisError> {
        self.axes
            .get(index)
            .ok_or_else(|| NoSuchAxisError::new(index, self.axes.len()))
    }

    /// The poll period to use while any axis is moving.
    pub fn moving_poll_period(&self) -> Duration {
        self.options.moving_poll_period
    }

    /// The poll period to use while all axes are idle.
    pub fn idle_poll_period(&self) -> Duration {
        self.options.idle_poll_period
    }

    /// The poll period matching the current motion state.
    pub fn poll_period(&self) -> Duration {
        if self.any_moving() {
            self.moving_poll_period()
        } else {
            self.idle_poll_period()
        }
    }

    /// Whether any axis is currently flagged as moving.
    pub fn any_moving(&self) -> bool {
        self.axes.iter().any(|axis| axis.flag(Flag::Moving))
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport.
    ///
    /// Exchanges made directly on the transport bypass all axis bookkeeping.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get a reference to the parameter store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a mutable reference to the parameter store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the controller and return its transport and parameter store.
    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.store)
    }

    /// Move an axis to an absolute position, or by a relative distance.
    ///
    /// Only [`AxisType::StepperOpenLoop`] axes can move. The pre-motion hook
    /// runs first. If it has nothing to do and the axis is not enabled the
    /// move is refused with an [`AxisNotReadyError`]. Otherwise the
    /// coordinate mode, target and go commands are sent, stopping at the
    /// first failure.
    ///
    /// A NaN or infinite `position` is refused before anything is sent.
    pub fn move_axis(&mut self, index: usize, position: f64, relative: bool) -> Result<(), Error> {
        let (transport, store, axis) = self.split(index)?;
        let mut target = CommandBuffer::new();
        build_move_command(&mut target, index, position)?;
        if !axis.axis_type().supports_motion() {
            let err = UnsupportedOperationError::new(index, axis.axis_type());
            return record_outcome(store, axis, Err(err.into()));
        }
        prepare_motion(transport, store, axis)?;

        axis.set_flag(store, Flag::Done, false);
        let mode = if relative {
            template::RELATIVE_MODE
        } else {
            template::ABSOLUTE_MODE
        };
        let result = || -> Result<(), Error> {
            send(transport, mode, index)?;
            transport.command(target.as_str())?;
            send(transport, template::GO, index)
        }();
        record_outcome(store, axis, result)
    }

    /// Home an axis with its configured [`HomeReferenceMode`].
    ///
    /// The same restrictions as [`move_axis`](Self::move_axis) apply.
    pub fn home(&mut self, index: usize) -> Result<(), Error> {
        let (transport, store, axis) = self.split(index)?;
        if !axis.axis_type().supports_motion() {
            let err = UnsupportedOperationError::new(index, axis.axis_type());
            return record_outcome(store, axis, Err(err.into()));
        }
        prepare_motion(transport, store, axis)?;

        axis.set_flag(store, Flag::Home, true);
        axis.set_flag(store, Flag::Done, false);
        let result = || -> Result<(), Error> {
            let mut buffer = CommandBuffer::new();
            build_home_command(&mut buffer, index, axis.homing_mode().code())?;
            transport.command(buffer.as_str())
        }();
        record_outcome(store, axis, result)
    }

    /// Stop an axis.
    ///
    /// Axes of unknown type cannot be stopped and report a problem.
    pub fn stop(&mut self, index: usize) -> Result<(), Error> {
        let (transport, store, axis) = self.split(index)?;
        let result = if axis.axis_type() == AxisType::Unknown {
            Err(UnsupportedOperationError::new(index, AxisType::Unknown).into())
        } else {
            send(transport, template::STOP, index)
        };
        record_outcome(store, axis, result)
    }

    /// Force the readback counter of an axis to a position.
    ///
    /// A NaN or infinite `position` is refused before anything is sent.
    pub fn set_position(&mut self, index: usize, position: f64) -> Result<(), Error> {
        let (transport, store, axis) = self.split(index)?;
        let mut buffer = CommandBuffer::new();
        build_set_position_command(&mut buffer, index, position)?;
        let result = transport.command(buffer.as_str());
        record_outcome(store, axis, result)
    }

    /// Set the homing strategy of an axis.
    pub fn set_homing_mode(&mut self, index: usize, mode: HomeReferenceMode) -> Result<(), NoSuchAxisError> {
        let (_, _, axis) = self.split(index)?;
        axis.set_homing_mode(mode);
        Ok(())
    }

    /// Store the configuration string of a lifecycle hook.
    ///
    /// Writing the init string runs the init hook straight away and returns
    /// its outcome. The other hooks only run around motion, so storing their
    /// strings returns `None`.
    pub fn set_lifecycle(
        &mut self,
        index: usize,
        hook: Hook,
        value: &str,
    ) -> Result<Option<HookOutcome>, Error> {
        let (transport, store, axis) = self.split(index)?;
        store.set_string(index, hook.param(), value);
        if hook == Hook::Init {
            lifecycle::execute_init(transport, store, axis).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Query the group status and apply each axis's status character.
    ///
    /// If the query fails no axis is updated. Characters beyond the number of
    /// axes are ignored, as are axes beyond the length of the reply.
    pub fn poll(&mut self) -> Result<(), Error> {
        let reply = match self.transport.command_reply(template::QUERY_GROUP_STATUS) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("group status query failed: {e}");
                return Err(e);
            }
        };
        for (axis, ch) in self.axes.iter_mut().zip(reply.chars()) {
            apply_group_status(&mut self.transport, &mut self.store, axis, StatusCode::from(ch));
        }
        Ok(())
    }

    /// Poll the limit switches and readback position of an axis.
    ///
    /// Returns whether the axis is moving according to its last group status.
    /// Axes of unknown type are skipped and never moving. A power stage error
    /// fails the poll before any flag is updated.
    pub fn poll_axis(&mut self, index: usize) -> Result<bool, Error> {
        let (transport, store, axis) = self.split(index)?;
        if axis.axis_type() == AxisType::Unknown {
            return Ok(false);
        }
        let moving = axis.last_status().is_moving();
        let result = poll_detail(transport, store, axis);
        record_outcome(store, axis, result).map(|()| moving)
    }

    /// Run a full poll cycle: the group status, then every axis in turn.
    ///
    /// All axes are polled even if an earlier step fails; the first error is
    /// returned. On success, returns whether any axis is moving.
    pub fn poll_cycle(&mut self) -> Result<bool, Error> {
        let mut first_error = self.poll().err();
        for index in 0..self.axes.len() {
            if let Err(e) = self.poll_axis(index) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(self.any_moving()),
        }
    }

    /// Report the state of an axis.
    ///
    /// At `level > 0` the controller is also queried for the axis's live
    /// status, limit bits, readback, target and velocity.
    pub fn report_axis(&mut self, index: usize, level: u32) -> Result<AxisReport, NoSuchAxisError> {
        let (transport, _, axis) = self.split(index)?;
        let detail = (level > 0).then(|| AxisDetail {
            status: transport
                .command_reply(template::QUERY_GROUP_STATUS)
                .ok()
                .and_then(|reply| reply.chars().nth(index))
                .map(StatusCode::from),
            limits: parse_limit_status(query(transport, template::QUERY_LIMIT_STATUS, index)).ok(),
            readback: parse_readback_position(query(transport, template::QUERY_COUNTER, index)).ok(),
            target: parse_readback_position(query(transport, template::QUERY_TARGET, index)).ok(),
            velocity: parse_readback_position(query(transport, template::QUERY_VELOCITY, index)).ok(),
        });
        Ok(AxisReport {
            index,
            axis_type: axis.axis_type(),
            homing_mode: axis.homing_mode(),
            last_status: axis.last_status(),
            flags: axis.flags(),
            position: axis.position(),
            detail,
        })
    }

    /// Report the state of the controller and all its axes.
    ///
    /// At `level > 0` the controller is also queried for its last error
    /// message, group status and firmware version.
    pub fn report(&mut self, level: u32) -> ControllerReport {
        let detail = (level > 0).then(|| ControllerDetail {
            message: self.transport.command_reply(template::QUERY_MESSAGE).ok(),
            group_status: self.transport.command_reply(template::QUERY_GROUP_STATUS).ok(),
            version: self.transport.command_reply(template::QUERY_VERSION).ok(),
        });
        let axes = (0..self.axes.len())
            .filter_map(|index| self.report_axis(index, level).ok())
            .collect();
        ControllerReport {
            num_axes: self.axes.len(),
            moving_poll_period: self.moving_poll_period(),
            idle_poll_period: self.idle_poll_period(),
            detail,
            axes,
        }
    }
}
