//! Turning a status character into motion flags.

use crate::axis::{AxisFlags, AxisType, StatusCode};

/// The outcome of applying a status code to an axis's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The updated flags.
    pub flags: AxisFlags,
    /// The axis just finished moving and the post-motion hook should run.
    pub run_post_hook: bool,
}

/// Apply a status code reported by the group status query.
///
/// Returns `None` for an axis of unknown type, whose status is ignored.
/// Codes that are neither "ready", "in motion" nor "unknown" leave the flags
/// unchanged.
pub fn apply_status(axis_type: AxisType, flags: AxisFlags, code: StatusCode) -> Option<Transition> {
    if axis_type == AxisType::Unknown {
        return None;
    }

    let mut next = flags;
    let mut run_post_hook = false;
    match code {
        StatusCode::Unknown => next.problem = true,
        StatusCode::Ready => {
            next.problem = false;
            next.moving = false;
            if !flags.done {
                next.done = true;
                run_post_hook = true;
            }
            if flags.home {
                next.home = false;
                next.homed = true;
            }
        }
        code if code.is_moving() => {
            next.problem = false;
            next.moving = true;
            next.done = false;
        }
        _ => {}
    }

    Some(Transition {
        flags: next,
        run_post_hook,
    })
}
