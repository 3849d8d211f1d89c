//! Per-axis state: motor type, homing mode, status codes and flags.

use crate::{
    error::OutOfRangeError,
    params::{Param, ParameterStore},
};

/// The kind of motor driven by an axis, as reported by `?MOTYPE<n>`.
///
/// Only [`AxisType::StepperOpenLoop`] supports motion commands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AxisType {
    /// The type could not be determined. The axis is ignored.
    #[default]
    Unknown = -1,
    /// DC brush motor.
    DcBrush = 0,
    /// Reserved by the firmware.
    Reserved = 1,
    /// Stepper motor without an encoder.
    StepperOpenLoop = 2,
    /// Stepper motor with an encoder.
    StepperClosedLoop = 3,
    /// Brushless DC motor.
    Bldc = 4,
}

impl AxisType {
    /// The numeric code used on the wire.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Whether the axis accepts move and home commands.
    pub const fn supports_motion(self) -> bool {
        matches!(self, AxisType::StepperOpenLoop)
    }
}

impl TryFrom<i32> for AxisType {
    type Error = OutOfRangeError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            -1 => AxisType::Unknown,
            0 => AxisType::DcBrush,
            1 => AxisType::Reserved,
            2 => AxisType::StepperOpenLoop,
            3 => AxisType::StepperClosedLoop,
            4 => AxisType::Bldc,
            _ => return Err(OutOfRangeError::new("axis type", code.into())),
        })
    }
}

/// The homing strategy executed by `REF<n>=<mode>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HomeReferenceMode {
    /// Move to the index pulse.
    Index = 0,
    /// Move to the reference switch.
    ReferenceSwitch = 1,
    /// Move to the reference switch, then to the index pulse.
    ReferenceSwitchIndex = 2,
    /// Move to the index pulse and zero the counter.
    IndexZero = 3,
    /// Move to the reference switch and zero the counter.
    #[default]
    ReferenceSwitchZero = 4,
    /// Move to the reference switch, then the index pulse, and zero the counter.
    ReferenceSwitchIndexZero = 5,
    /// Move to the maximum then the minimum limit and zero the counter.
    MaxMinZero = 6,
    /// Move to the minimum then the maximum limit and zero the counter.
    MinMaxZero = 7,
}

impl HomeReferenceMode {
    /// The numeric code used on the wire.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for HomeReferenceMode {
    type Error = OutOfRangeError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        use HomeReferenceMode as M;
        Ok(match code {
            0 => M::Index,
            1 => M::ReferenceSwitch,
            2 => M::ReferenceSwitchIndex,
            3 => M::IndexZero,
            4 => M::ReferenceSwitchZero,
            5 => M::ReferenceSwitchIndexZero,
            6 => M::MaxMinZero,
            7 => M::MinMaxZero,
            _ => return Err(OutOfRangeError::new("home reference mode", code.into())),
        })
    }
}

macro_rules! status_codes {
    (
        $(
            $(#[$attr:meta])*
            $variant:ident = $ch:literal
        ),+
        $(,)?
    ) => {
        /// The status character reported for an axis by the group status query.
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $(
                $(#[$attr])*
                $variant,
            )+
            /// The status is not known.
            #[default]
            Unknown,
            /// A character this crate does not know about.
            Unrecognized(char),
        }

        impl From<char> for StatusCode {
            fn from(ch: char) -> Self {
                match ch {
                    $($ch => StatusCode::$variant,)+
                    '?' => StatusCode::Unknown,
                    other => StatusCode::Unrecognized(other),
                }
            }
        }

        impl StatusCode {
            /// The character used on the wire.
            pub const fn as_char(self) -> char {
                match self {
                    $(StatusCode::$variant => $ch,)+
                    StatusCode::Unknown => '?',
                    StatusCode::Unrecognized(ch) => ch,
                }
            }
        }
    };
}

status_codes! {
    /// Initialized but not enabled.
    Initialized = 'I',
    /// Disabled.
    Disabled = 'O',
    /// Enabled and idle.
    Ready = 'R',
    /// Positioning with a trapezoidal profile.
    PositionTrapezoid = 'T',
    /// Positioning with an S-curve profile.
    PositionSCurve = 'S',
    /// Velocity mode.
    VelocityMode = 'V',
    /// Homing.
    Homing = 'P',
    /// Moving off a limit switch.
    ReleaseSwitch = 'F',
    /// Joystick mode.
    JoyMode = 'J',
    /// Disabled by a limit switch.
    DisabledSwitch = 'B',
    /// Disabled by a limit switch error.
    DisabledSwitchError = 'A',
    /// Disabled by a controller error.
    DisabledControllerError = 'M',
    /// Disabled by a timeout.
    DisabledTimeoutError = 'Z',
    /// Initialization in progress.
    InitActive = 'H',
    /// A limit switch has not been released.
    NotReleased = 'U',
    /// Disabled by a motor error.
    DisabledMotorError = 'E',
    /// Trapezoidal positioning with motion supervision.
    PositionTrapezoidSupervised = 'W',
    /// S-curve positioning with motion supervision.
    PositionSCurveSupervised = 'X',
    /// Velocity mode with motion supervision.
    VelocitySupervised = 'Y',
    /// Velocity mode with constant path control.
    VelocityConstantPath = 'C',
    /// Piezo mode with motion supervision.
    PiezoSupervised = 'N',
}

impl StatusCode {
    /// Whether the code means the axis is moving.
    pub const fn is_moving(self) -> bool {
        matches!(
            self,
            StatusCode::PositionTrapezoid
                | StatusCode::PositionSCurve
                | StatusCode::Homing
                | StatusCode::ReleaseSwitch
                | StatusCode::PositionTrapezoidSupervised
                | StatusCode::PositionSCurveSupervised
        )
    }

    /// Whether the motor has to be enabled before it can move.
    pub const fn is_unready(self) -> bool {
        matches!(
            self,
            StatusCode::Unknown | StatusCode::Initialized | StatusCode::Disabled
        )
    }
}

/// A boolean flag kept for each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Flag {
    Moving,
    Done,
    Home,
    Homed,
    Problem,
    LowLimit,
    HighLimit,
    CommsError,
}

impl Flag {
    /// Every flag.
    pub const ALL: [Flag; 8] = [
        Flag::Moving,
        Flag::Done,
        Flag::Home,
        Flag::Homed,
        Flag::Problem,
        Flag::LowLimit,
        Flag::HighLimit,
        Flag::CommsError,
    ];

    /// The parameter the flag is published to.
    pub const fn param(self) -> Param {
        match self {
            Flag::Moving => Param::Moving,
            Flag::Done => Param::Done,
            Flag::Home => Param::Home,
            Flag::Homed => Param::Homed,
            Flag::Problem => Param::Problem,
            Flag::LowLimit => Param::LowLimit,
            Flag::HighLimit => Param::HighLimit,
            Flag::CommsError => Param::CommsError,
        }
    }
}

/// The motion flags of an axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct AxisFlags {
    /// The axis is moving.
    pub moving: bool,
    /// The last motion has completed.
    pub done: bool,
    /// A homing motion is in progress.
    pub home: bool,
    /// The axis has been homed.
    pub homed: bool,
    /// The last interaction with the axis failed.
    pub problem: bool,
    /// The low limit switch is active.
    pub low_limit: bool,
    /// The high limit switch is active.
    pub high_limit: bool,
    /// The axis could not be identified.
    pub comms_error: bool,
}

impl AxisFlags {
    /// Get a flag.
    pub const fn get(self, flag: Flag) -> bool {
        match flag {
            Flag::Moving => self.moving,
            Flag::Done => self.done,
            Flag::Home => self.home,
            Flag::Homed => self.homed,
            Flag::Problem => self.problem,
            Flag::LowLimit => self.low_limit,
            Flag::HighLimit => self.high_limit,
            Flag::CommsError => self.comms_error,
        }
    }

    fn get_mut(&mut self, flag: Flag) -> &mut bool {
        match flag {
            Flag::Moving => &mut self.moving,
            Flag::Done => &mut self.done,
            Flag::Home => &mut self.home,
            Flag::Homed => &mut self.homed,
            Flag::Problem => &mut self.problem,
            Flag::LowLimit => &mut self.low_limit,
            Flag::HighLimit => &mut self.high_limit,
            Flag::CommsError => &mut self.comms_error,
        }
    }
}

/// The runtime state of one axis.
///
/// Flag and position changes are mirrored to a [`ParameterStore`], which is
/// only written when a value actually changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    index: usize,
    axis_type: AxisType,
    homing_mode: HomeReferenceMode,
    last_status: StatusCode,
    flags: AxisFlags,
    position: Option<i32>,
}

impl Axis {
    /// Create the state for the axis at the 0-based `index`.
    pub fn new(index: usize, axis_type: AxisType, homing_mode: HomeReferenceMode) -> Self {
        Axis {
            index,
            axis_type,
            homing_mode,
            last_status: StatusCode::Unknown,
            flags: AxisFlags::default(),
            position: None,
        }
    }

    /// The 0-based index of the axis.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The motor type, fixed at discovery.
    pub fn axis_type(&self) -> AxisType {
        self.axis_type
    }

    /// The homing strategy used by `home`.
    pub fn homing_mode(&self) -> HomeReferenceMode {
        self.homing_mode
    }

    /// Set the homing strategy used by `home`.
    pub fn set_homing_mode(&mut self, mode: HomeReferenceMode) {
        self.homing_mode = mode;
    }

    /// The status character last seen in a group status reply.
    pub fn last_status(&self) -> StatusCode {
        self.last_status
    }

    pub(crate) fn set_last_status(&mut self, status: StatusCode) {
        self.last_status = status;
    }

    /// The current flags.
    pub fn flags(&self) -> AxisFlags {
        self.flags
    }

    /// Get a single flag.
    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.get(flag)
    }

    /// The last readback position, if one has been read.
    pub fn position(&self) -> Option<i32> {
        self.position
    }

    /// Set a flag, publishing it if it changed.
    pub fn set_flag<S: ParameterStore + ?Sized>(&mut self, store: &mut S, flag: Flag, value: bool) {
        let slot = self.flags.get_mut(flag);
        if *slot != value {
            *slot = value;
            store.set_integer(self.index, flag.param(), value.into());
        }
    }

    /// Replace all flags, publishing those that changed.
    pub fn update_flags<S: ParameterStore + ?Sized>(&mut self, store: &mut S, flags: AxisFlags) {
        for flag in Flag::ALL {
            self.set_flag(store, flag, flags.get(flag));
        }
    }

    /// Record a readback position, publishing it if it changed.
    pub fn set_position<S: ParameterStore + ?Sized>(&mut self, store: &mut S, position: i32) {
        if self.position != Some(position) {
            self.position = Some(position);
            store.set_double(self.index, Param::Position, position.into());
        }
    }
}
