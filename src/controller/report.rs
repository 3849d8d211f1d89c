//! Diagnostic snapshots of a controller and its axes.
//!
//! Reports are built by [`Controller::report`](super::Controller::report) and
//! [`Controller::report_axis`](super::Controller::report_axis). At level 0
//! they only contain cached state; at higher levels the controller is also
//! queried. A query that fails leaves its field `None`.

use crate::{
    axis::{AxisFlags, AxisType, HomeReferenceMode, StatusCode},
    reply::LimitStatus,
};
use std::{fmt, time::Duration};

/// Live values read from the controller for an axis.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AxisDetail {
    /// The axis's character in a fresh group status reply.
    pub status: Option<StatusCode>,
    /// The limit switch and power stage bits.
    pub limits: Option<LimitStatus>,
    /// The readback counter.
    pub readback: Option<i32>,
    /// The target position.
    pub target: Option<i32>,
    /// The positioning velocity.
    pub velocity: Option<i32>,
}

/// The state of one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisReport {
    /// The 0-based axis index.
    pub index: usize,
    /// The motor type.
    pub axis_type: AxisType,
    /// The homing strategy.
    pub homing_mode: HomeReferenceMode,
    /// The status last seen in a group status reply.
    pub last_status: StatusCode,
    /// The cached flags.
    pub flags: AxisFlags,
    /// The cached readback position.
    pub position: Option<i32>,
    /// Live values, when requested.
    pub detail: Option<AxisDetail>,
}

/// Live values read from the controller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ControllerDetail {
    /// The last error message (`?MSG`).
    pub message: Option<String>,
    /// The group status (`?ASTAT`).
    pub group_status: Option<String>,
    /// The firmware version (`?VERSION`).
    pub version: Option<String>,
}

/// The state of a controller and all its axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerReport {
    /// The number of axes.
    pub num_axes: usize,
    /// The poll period used while any axis is moving.
    pub moving_poll_period: Duration,
    /// The poll period used while all axes are idle.
    pub idle_poll_period: Duration,
    /// Live values, when requested.
    pub detail: Option<ControllerDetail>,
    /// One report per axis.
    pub axes: Vec<AxisReport>,
}

struct OrDash<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrDash<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("-"),
        }
    }
}

impl fmt::Display for AxisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  axis {}", self.index)?;
        writeln!(f, "    type = {}", self.axis_type.code())?;
        writeln!(f, "    homing type = {}", self.homing_mode.code())?;
        match &self.detail {
            None => writeln!(f, "    last status = {}", self.last_status.as_char()),
            Some(detail) => {
                let status = detail.status.map(StatusCode::as_char);
                let limits = detail.limits.map(|limits| format!("{limits:x}"));
                writeln!(f, "    current status = {}", OrDash(&status))?;
                writeln!(f, "    limit switches = {}", OrDash(&limits))?;
                writeln!(f, "    readback = {}", OrDash(&detail.readback))?;
                writeln!(f, "    target = {}", OrDash(&detail.target))?;
                writeln!(f, "    velocity = {}", OrDash(&detail.velocity))
            }
        }
    }
}

impl fmt::Display for ControllerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OWIS PS controller")?;
        writeln!(f, "    axes = {}", self.num_axes)?;
        writeln!(
            f,
            "    moving poll period = {} ms",
            self.moving_poll_period.as_millis()
        )?;
        writeln!(
            f,
            "    idle poll period = {} ms",
            self.idle_poll_period.as_millis()
        )?;
        if let Some(detail) = &self.detail {
            writeln!(f, "    error message = {}", OrDash(&detail.message))?;
            writeln!(f, "    axes status = {}", OrDash(&detail.group_status))?;
            writeln!(f, "    firmware version = {}", OrDash(&detail.version))?;
        }
        for axis in &self.axes {
            write!(f, "{axis}")?;
        }
        Ok(())
    }
}
