//! The parameter store the controller publishes axis state to.
//!
//! Motion frameworks keep per-axis values (flags, positions, configuration
//! strings) in a store keyed by axis and parameter. [`ParameterStore`] is the
//! slice of such a store the controller needs, and [`Params`] is a simple
//! in-memory implementation.

use std::collections::HashMap;

/// The parameters read or written by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    /// Integer: the axis is moving.
    Moving,
    /// Integer: the last motion has completed.
    Done,
    /// Integer: a homing motion is in progress.
    Home,
    /// Integer: the axis has been homed.
    Homed,
    /// Integer: the last interaction with the axis failed.
    Problem,
    /// Integer: the low limit switch is active.
    LowLimit,
    /// Integer: the high limit switch is active.
    HighLimit,
    /// Integer: the axis could not be identified.
    CommsError,
    /// Double: the readback position.
    Position,
    /// String: run at initialization, `"INIT"` initializes the axis.
    Init,
    /// String: run before motion, `"INIT"` initializes and `"MON"` enables the axis.
    Prem,
    /// String: run after motion completes, `"MOFF"` disables the axis.
    Post,
}

impl Param {
    /// The conventional name of the parameter.
    pub const fn name(self) -> &'static str {
        match self {
            Param::Moving => "MOTOR_STATUS_MOVING",
            Param::Done => "MOTOR_STATUS_DONE",
            Param::Home => "MOTOR_STATUS_HOME",
            Param::Homed => "MOTOR_STATUS_HOMED",
            Param::Problem => "MOTOR_STATUS_PROBLEM",
            Param::LowLimit => "MOTOR_STATUS_LOW_LIMIT",
            Param::HighLimit => "MOTOR_STATUS_HIGH_LIMIT",
            Param::CommsError => "MOTOR_STATUS_COMMS_ERROR",
            Param::Position => "MOTOR_POSITION",
            Param::Init => "MOTOR_INIT",
            Param::Prem => "MOTOR_PREM",
            Param::Post => "MOTOR_POST",
        }
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-axis storage of integer, double and string values.
///
/// Getters return `None` when the value has never been set.
pub trait ParameterStore {
    /// Get an integer value.
    fn get_integer(&self, axis: usize, param: Param) -> Option<i32>;
    /// Set an integer value.
    fn set_integer(&mut self, axis: usize, param: Param, value: i32);
    /// Get a double value.
    fn get_double(&self, axis: usize, param: Param) -> Option<f64>;
    /// Set a double value.
    fn set_double(&mut self, axis: usize, param: Param, value: f64);
    /// Get a string value.
    fn get_string(&self, axis: usize, param: Param) -> Option<String>;
    /// Set a string value.
    fn set_string(&mut self, axis: usize, param: Param, value: &str);
}

impl<S: ParameterStore + ?Sized> ParameterStore for &mut S {
    fn get_integer(&self, axis: usize, param: Param) -> Option<i32> {
        (**self).get_integer(axis, param)
    }
    fn set_integer(&mut self, axis: usize, param: Param, value: i32) {
        (**self).set_integer(axis, param, value);
    }
    fn get_double(&self, axis: usize, param: Param) -> Option<f64> {
        (**self).get_double(axis, param)
    }
    fn set_double(&mut self, axis: usize, param: Param, value: f64) {
        (**self).set_double(axis, param, value);
    }
    fn get_string(&self, axis: usize, param: Param) -> Option<String> {
        (**self).get_string(axis, param)
    }
    fn set_string(&mut self, axis: usize, param: Param, value: &str) {
        (**self).set_string(axis, param, value);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Integer(i32),
    Double(f64),
    String(String),
}

/// An in-memory [`ParameterStore`].
///
/// It also counts the writes to each parameter, which is handy for checking
/// what a controller published.
#[derive(Debug, Default, Clone)]
pub struct Params {
    values: HashMap<(usize, Param), Value>,
    writes: HashMap<(usize, Param), usize>,
}

impl Params {
    /// Create an empty store.
    pub fn new() -> Self {
        Params::default()
    }

    /// The number of times a parameter has been set.
    pub fn write_count(&self, axis: usize, param: Param) -> usize {
        self.writes.get(&(axis, param)).copied().unwrap_or(0)
    }

    /// Forget all write counts, keeping the values.
    pub fn reset_write_counts(&mut self) {
        self.writes.clear();
    }

    fn insert(&mut self, axis: usize, param: Param, value: Value) {
        self.values.insert((axis, param), value);
        *self.writes.entry((axis, param)).or_insert(0) += 1;
    }
}

impl ParameterStore for Params {
    fn get_integer(&self, axis: usize, param: Param) -> Option<i32> {
        match self.values.get(&(axis, param)) {
            Some(Value::Integer(value)) => Some(*value),
            _ => None,
        }
    }
    fn set_integer(&mut self, axis: usize, param: Param, value: i32) {
        self.insert(axis, param, Value::Integer(value));
    }
    fn get_double(&self, axis: usize, param: Param) -> Option<f64> {
        match self.values.get(&(axis, param)) {
            Some(Value::Double(value)) => Some(*value),
            _ => None,
        }
    }
    fn set_double(&mut self, axis: usize, param: Param, value: f64) {
        self.insert(axis, param, Value::Double(value));
    }
    fn get_string(&self, axis: usize, param: Param) -> Option<String> {
        match self.values.get(&(axis, param)) {
            Some(Value::String(value)) => Some(value.clone()),
            _ => None,
        }
    }
    fn set_string(&mut self, axis: usize, param: Param, value: &str) {
        self.insert(axis, param, Value::String(value.to_string()));
    }
}
