//! Options for creating a [`Controller`].

use super::Controller;
use crate::{axis::HomeReferenceMode, params::ParameterStore, transport::Transport};
use std::time::Duration;

/// Options for configuring a [`Controller`].
///
/// ## Example
///
/// ```rust
/// # use owisps::{controller::ControllerOptions, params::Params, port::Port};
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let port = Port::open_serial("/dev/ttyUSB0")?;
/// let controller = ControllerOptions::new()
///     .num_axes(3)
///     .moving_poll_period(Duration::from_millis(50))
///     .build(port, Params::new());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// The number of axes to discover.
    pub(super) num_axes: usize,
    /// The poll period while any axis is moving.
    pub(super) moving_poll_period: Duration,
    /// The poll period while all axes are idle.
    pub(super) idle_poll_period: Duration,
    /// The homing strategy every axis starts with.
    pub(super) homing_mode: HomeReferenceMode,
}

impl ControllerOptions {
    /// Create a blank set of options ready for configuration.
    ///
    /// The defaults are one axis, poll periods of 100 ms while moving and 1 s
    /// while idle, and [`HomeReferenceMode::ReferenceSwitchZero`].
    ///
    /// Equivalent to [`default`](ControllerOptions::default).
    pub fn new() -> Self {
        ControllerOptions {
            num_axes: 1,
            moving_poll_period: Duration::from_millis(100),
            idle_poll_period: Duration::from_secs(1),
            homing_mode: HomeReferenceMode::default(),
        }
    }

    /// Set the number of axes.
    pub fn num_axes(&mut self, num_axes: usize) -> &mut Self {
        self.num_axes = num_axes;
        self
    }

    /// Set the poll period used while any axis is moving.
    pub fn moving_poll_period(&mut self, period: Duration) -> &mut Self {
        self.moving_poll_period = period;
        self
    }

    /// Set the poll period used while all axes are idle.
    pub fn idle_poll_period(&mut self, period: Duration) -> &mut Self {
        self.idle_poll_period = period;
        self
    }

    /// Set the homing strategy every axis starts with.
    pub fn homing_mode(&mut self, mode: HomeReferenceMode) -> &mut Self {
        self.homing_mode = mode;
        self
    }

    /// Create a controller with these options, discovering its axes.
    pub fn build<T: Transport, S: ParameterStore>(&self, transport: T, store: S) -> Controller<T, S> {
        Controller::new(transport, store, self)
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions::new()
    }
}
