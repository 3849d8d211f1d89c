use std::io;

use crate::{
    axis::{AxisType, Flag, HomeReferenceMode, StatusCode},
    backend::Mock,
    controller::{Controller, ControllerOptions},
    error::Error,
    lifecycle::{Hook, HookOutcome},
    params::{Param, ParameterStore, Params},
    port::Port,
    reply::LimitStatus,
    transport::Transport,
};

type MockController = Controller<Port<Mock>, Params>;

/// A mock port that refuses to write one particular command.
struct Refusing {
    port: Port<Mock>,
    refused: &'static str,
}

impl Refusing {
    fn check(&self, command: &str) -> Result<(), Error> {
        if command == self.refused {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged").into())
        } else {
            Ok(())
        }
    }
}

impl Transport for Refusing {
    fn command(&mut self, command: &str) -> Result<(), Error> {
        self.check(command)?;
        self.port.command(command)
    }

    fn command_reply(&mut self, command: &str) -> Result<String, Error> {
        self.check(command)?;
        self.port.command_reply(command)
    }
}

fn unplug(controller: &mut MockController) {
    controller
        .transport_mut()
        .backend_mut()
        .write_error(Some(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")));
}

/// Create a controller whose axes report the given types and no limit bits
/// during discovery.
fn controller(types: &[&str]) -> MockController {
    let mut port = Port::open_mock();
    for axis_type in types {
        port.backend_mut().push_reply(axis_type);
        port.backend_mut().push_reply("0");
    }
    let mut controller = ControllerOptions::new()
        .num_axes(types.len())
        .build(port, Params::new());
    sent(&mut controller);
    controller
}

fn reply(controller: &mut MockController, text: &str) {
    controller.transport_mut().backend_mut().push_reply(text);
}

fn sent(controller: &mut MockController) -> Vec<String> {
    controller.transport_mut().backend_mut().take_sent_lines()
}

fn flag(controller: &MockController, axis: usize, flag: Flag) -> bool {
    controller.axis(axis).unwrap().flag(flag)
}

#[test]
fn discovery() {
    let mut port = Port::open_mock();
    for text in ["2", "0", "0", "16", "5", "-1", "0"] {
        port.backend_mut().push_reply(text);
    }
    let mut controller = ControllerOptions::new().num_axes(4).build(port, Params::new());
    assert_eq!(
        sent(&mut controller),
        ["?MOTYPE1", "?ESTAT1", "?MOTYPE2", "?ESTAT2", "?MOTYPE3", "?MOTYPE4", "?ESTAT4"]
    );

    let axes = controller.axes();
    assert_eq!(axes[0].axis_type(), AxisType::StepperOpenLoop);
    assert!(!axes[0].flag(Flag::Problem));
    assert!(!axes[0].flag(Flag::CommsError));

    // Power stage error
    assert_eq!(axes[1].axis_type(), AxisType::DcBrush);
    assert!(axes[1].flag(Flag::Problem));
    assert!(!axes[1].flag(Flag::CommsError));

    // Out of range type
    assert_eq!(axes[2].axis_type(), AxisType::Unknown);
    assert!(axes[2].flag(Flag::Problem));
    assert!(axes[2].flag(Flag::CommsError));

    // Reported as unknown
    assert_eq!(axes[3].axis_type(), AxisType::Unknown);
    assert!(axes[3].flag(Flag::CommsError));
    assert_eq!(controller.store().get_integer(3, Param::CommsError), Some(1));
}

#[test]
fn discovery_timeout_leaves_axis_unknown() {
    let controller = ControllerOptions::new()
        .num_axes(1)
        .build(Port::open_mock(), Params::new());
    let axis = controller.axis(0).unwrap();
    assert_eq!(axis.axis_type(), AxisType::Unknown);
    assert!(axis.flag(Flag::CommsError));
    assert!(axis.flag(Flag::Problem));
    assert_eq!(axis.homing_mode(), HomeReferenceMode::ReferenceSwitchZero);
}

#[test]
fn move_then_poll_to_completion() {
    let mut controller = controller(&["2"]);
    controller.set_lifecycle(0, Hook::Prem, "MON").unwrap();
    controller.set_lifecycle(0, Hook::Post, "MOFF").unwrap();
    assert!(sent(&mut controller).is_empty());

    controller.move_axis(0, 1250.0, false).unwrap();
    assert_eq!(sent(&mut controller), ["MON1", "ABSOL1", "PSET1=1250", "PGO1"]);
    assert!(!flag(&controller, 0, Flag::Done));

    reply(&mut controller, "T");
    controller.poll().unwrap();
    assert_eq!(sent(&mut controller), ["?ASTAT"]);
    assert!(flag(&controller, 0, Flag::Moving));
    assert!(!flag(&controller, 0, Flag::Done));

    reply(&mut controller, "R");
    controller.poll().unwrap();
    assert_eq!(sent(&mut controller), ["?ASTAT", "MOFF1"]);
    assert!(flag(&controller, 0, Flag::Done));
    assert!(!flag(&controller, 0, Flag::Moving));
    assert!(!flag(&controller, 0, Flag::Problem));
    assert_eq!(controller.store().get_integer(0, Param::Done), Some(1));

    // The post hook only runs on the transition.
    reply(&mut controller, "R");
    controller.poll().unwrap();
    assert_eq!(sent(&mut controller), ["?ASTAT"]);
}

#[test]
fn relative_move_truncates() {
    let mut controller = controller(&["2", "2"]);
    reply(&mut controller, "RR");
    controller.poll().unwrap();
    sent(&mut controller);

    controller.move_axis(1, -10.9, true).unwrap();
    assert_eq!(sent(&mut controller), ["RELAT2", "PSET2=-10", "PGO2"]);
}

#[test]
fn move_refused_for_unsupported_axis_types() {
    let mut controller = controller(&["0", "3", "4"]);
    for index in 0..3 {
        let err = controller.move_axis(index, 5.0, false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)), "{err}");
        let err = controller.home(index).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)), "{err}");
        assert!(flag(&controller, index, Flag::Problem));
    }
    assert!(sent(&mut controller).is_empty());
}

#[test]
fn move_refused_when_not_ready_without_prem() {
    let mut controller = controller(&["2"]);
    assert_eq!(controller.axis(0).unwrap().last_status(), StatusCode::Unknown);
    let err = controller.move_axis(0, 5.0, false).unwrap_err();
    assert!(matches!(err, Error::AxisNotReady(_)), "{err}");
    assert!(sent(&mut controller).is_empty());
    assert!(flag(&controller, 0, Flag::Problem));

    reply(&mut controller, "O");
    controller.poll().unwrap();
    sent(&mut controller);
    assert!(controller.home(0).is_err());
    assert!(sent(&mut controller).is_empty());
}

#[test]
fn move_stops_at_first_failure() {
    let mut controller = controller(&["2"]);
    reply(&mut controller, "R");
    controller.poll().unwrap();
    sent(&mut controller);
    assert!(flag(&controller, 0, Flag::Done));

    controller
        .transport_mut()
        .backend_mut()
        .write_error(Some(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")));
    let err = controller.move_axis(0, 100.0, false).unwrap_err();
    assert!(err.is_transport());
    assert!(sent(&mut controller).is_empty());
    assert!(flag(&controller, 0, Flag::Problem));
    assert!(!flag(&controller, 0, Flag::Done));

    // The next successful interaction clears the problem.
    controller.stop(0).unwrap();
    assert_eq!(sent(&mut controller), ["STOP1"]);
    assert!(!flag(&controller, 0, Flag::Problem));
}

#[test]
fn failed_prem_aborts_move() {
    let mut controller = controller(&["2"]);
    controller.set_lifecycle(0, Hook::Prem, "INIT").unwrap();
    unplug(&mut controller);
    assert!(controller.move_axis(0, 100.0, false).is_err());
    assert!(sent(&mut controller).is_empty());
    assert!(flag(&controller, 0, Flag::Problem));
}

#[test]
fn failed_prem_aborts_home() {
    let mut controller = controller(&["2"]);
    controller.set_lifecycle(0, Hook::Prem, "MON").unwrap();
    unplug(&mut controller);
    assert!(controller.home(0).unwrap_err().is_transport());
    assert!(sent(&mut controller).is_empty());
    assert!(flag(&controller, 0, Flag::Problem));
    assert!(!flag(&controller, 0, Flag::Home));

    // Nothing else was attempted, so the next home goes through in full.
    controller.home(0).unwrap();
    assert_eq!(sent(&mut controller), ["MON1", "REF1=4"]);
    assert!(!flag(&controller, 0, Flag::Problem));
}

#[test]
fn failed_post_hook_raises_problem() {
    let mut port = Port::open_mock();
    for text in ["2", "0", "T", "R"] {
        port.backend_mut().push_reply(text);
    }
    let transport = Refusing {
        port,
        refused: "MOFF1",
    };
    let mut controller = ControllerOptions::new().num_axes(1).build(transport, Params::new());
    controller.set_lifecycle(0, Hook::Post, "MOFF").unwrap();

    controller.poll().unwrap();
    assert!(controller.axis(0).unwrap().flag(Flag::Moving));

    // The failure is reported through the flags, the poll itself succeeds.
    controller.poll().unwrap();
    let axis = controller.axis(0).unwrap();
    assert!(axis.flag(Flag::Done));
    assert!(!axis.flag(Flag::Moving));
    assert!(axis.flag(Flag::Problem));
    assert_eq!(controller.store().get_integer(0, Param::Problem), Some(1));
    assert_eq!(
        controller.transport().port.backend().sent_lines(),
        ["?MOTYPE1", "?ESTAT1", "?ASTAT", "?ASTAT"]
    );
}

#[test]
fn non_finite_positions_send_nothing() {
    let mut controller = controller(&["2"]);
    controller.set_lifecycle(0, Hook::Prem, "MON").unwrap();
    for position in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = controller.move_axis(0, position, false).unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)), "{err}");
        let err = controller.move_axis(0, position, true).unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)), "{err}");
        let err = controller.set_position(0, position).unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)), "{err}");
    }
    assert!(sent(&mut controller).is_empty());
    assert!(!flag(&controller, 0, Flag::Problem));
}

#[test]
fn home_sequence() {
    let mut controller = controller(&["2"]);
    controller
        .set_homing_mode(0, HomeReferenceMode::Index)
        .unwrap();
    controller.set_lifecycle(0, Hook::Prem, "MON").unwrap();

    controller.home(0).unwrap();
    assert_eq!(sent(&mut controller), ["MON1", "REF1=0"]);
    assert!(flag(&controller, 0, Flag::Home));
    assert!(!flag(&controller, 0, Flag::Done));

    reply(&mut controller, "P");
    controller.poll().unwrap();
    assert!(flag(&controller, 0, Flag::Moving));

    reply(&mut controller, "R");
    controller.poll().unwrap();
    assert!(!flag(&controller, 0, Flag::Home));
    assert!(flag(&controller, 0, Flag::Homed));
    assert!(flag(&controller, 0, Flag::Done));
}

#[test]
fn default_homing_mode() {
    let mut controller = controller(&["2"]);
    reply(&mut controller, "R");
    controller.poll().unwrap();
    sent(&mut controller);
    controller.home(0).unwrap();
    assert_eq!(sent(&mut controller), ["REF1=4"]);
}

#[test]
fn stop_and_set_position() {
    let mut controller = controller(&["2", "3"]);
    controller.stop(1).unwrap();
    controller.set_position(1, -6500.0).unwrap();
    assert_eq!(sent(&mut controller), ["STOP2", "CNT2=-6500"]);
}

#[test]
fn stop_unknown_axis_reports_problem() {
    let mut port = Port::open_mock();
    port.backend_mut().push_reply("-1");
    port.backend_mut().push_reply("0");
    let mut controller = ControllerOptions::new().num_axes(1).build(port, Params::new());
    sent(&mut controller);

    assert!(controller.stop(0).is_err());
    assert!(sent(&mut controller).is_empty());
    assert!(flag(&controller, 0, Flag::Problem));

    // Set position is sent regardless of the axis type.
    controller.set_position(0, 1.0).unwrap();
    assert_eq!(sent(&mut controller), ["CNT1=1"]);
}

#[test]
fn no_such_axis() {
    let mut controller = controller(&["2"]);
    assert!(matches!(controller.move_axis(1, 0.0, false), Err(Error::NoSuchAxis(_))));
    assert!(matches!(controller.poll_axis(3), Err(Error::NoSuchAxis(_))));
    assert!(controller.axis(1).is_err());
}

#[test]
fn group_status_failure_updates_nothing() {
    let mut controller = controller(&["2"]);
    let before = controller.axis(0).unwrap().flags();
    let err = controller.poll().unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(controller.axis(0).unwrap().flags(), before);
}

#[test]
fn group_status_length_mismatch() {
    let mut controller = controller(&["2", "2"]);
    // Longer than the number of axes
    reply(&mut controller, "TRR");
    controller.poll().unwrap();
    assert!(flag(&controller, 0, Flag::Moving));
    assert!(flag(&controller, 1, Flag::Done));

    // Shorter than the number of axes
    reply(&mut controller, "R");
    controller.poll().unwrap();
    assert!(flag(&controller, 0, Flag::Done));
    assert_eq!(controller.axis(1).unwrap().last_status(), StatusCode::Ready);
}

#[test]
fn group_status_ignores_unknown_axes() {
    let mut port = Port::open_mock();
    port.backend_mut().push_reply("-1");
    port.backend_mut().push_reply("0");
    let mut controller = ControllerOptions::new().num_axes(1).build(port, Params::new());
    reply(&mut controller, "R");
    controller.poll().unwrap();
    assert_eq!(controller.axis(0).unwrap().last_status(), StatusCode::Unknown);
    assert!(!flag(&controller, 0, Flag::Done));
}

#[test]
fn unknown_status_raises_problem() {
    let mut controller = controller(&["2"]);
    reply(&mut controller, "?");
    controller.poll().unwrap();
    assert!(flag(&controller, 0, Flag::Problem));
}

#[test]
fn poll_axis_updates_limits_and_position() {
    let mut controller = controller(&["2"]);
    reply(&mut controller, "T");
    controller.poll().unwrap();
    sent(&mut controller);

    reply(&mut controller, "2");
    reply(&mut controller, "-2500");
    assert!(controller.poll_axis(0).unwrap());
    assert_eq!(sent(&mut controller), ["?ESTAT1", "?CNT1"]);
    assert!(flag(&controller, 0, Flag::LowLimit));
    assert!(!flag(&controller, 0, Flag::HighLimit));
    assert_eq!(controller.axis(0).unwrap().position(), Some(-2500));
    assert_eq!(controller.store().get_double(0, Param::Position), Some(-2500.0));

    // Unchanged limits are not published again.
    reply(&mut controller, "3");
    reply(&mut controller, "-2500");
    controller.poll_axis(0).unwrap();
    assert_eq!(controller.store().write_count(0, Param::LowLimit), 1);
    assert_eq!(controller.store().write_count(0, Param::Position), 1);

    // The stop bits alone do not count as being at a limit.
    reply(&mut controller, &(LimitStatus::HIGH_LIMIT_STOP.bits()).to_string());
    reply(&mut controller, "0");
    controller.poll_axis(0).unwrap();
    assert!(!flag(&controller, 0, Flag::LowLimit));
    assert!(!flag(&controller, 0, Flag::HighLimit));
}

#[test]
fn poll_axis_power_stage_error() {
    let mut controller = controller(&["2"]);
    reply(&mut controller, "18");
    let err = controller.poll_axis(0).unwrap_err();
    assert!(matches!(err, Error::PowerStage(_)), "{err}");
    assert_eq!(sent(&mut controller), ["?ESTAT1"]);
    assert!(flag(&controller, 0, Flag::Problem));
    assert!(!flag(&controller, 0, Flag::LowLimit));

    reply(&mut controller, "0");
    reply(&mut controller, "7");
    assert!(!controller.poll_axis(0).unwrap());
    assert!(!flag(&controller, 0, Flag::Problem));
}

#[test]
fn poll_axis_malformed_reply() {
    let mut controller = controller(&["2"]);
    reply(&mut controller, "A");
    let err = controller.poll_axis(0).unwrap_err();
    assert!(matches!(err, Error::MalformedReply(_)), "{err}");
    assert!(flag(&controller, 0, Flag::Problem));
}

#[test]
fn poll_axis_skips_unknown_axes() {
    let mut controller = ControllerOptions::new()
        .num_axes(1)
        .build(Port::open_mock(), Params::new());
    sent(&mut controller);
    assert!(!controller.poll_axis(0).unwrap());
    assert!(sent(&mut controller).is_empty());
}

#[test]
fn poll_cycle() {
    let mut controller = controller(&["2", "2"]);
    for text in ["TR", "0", "10", "0", "20"] {
        reply(&mut controller, text);
    }
    assert!(controller.poll_cycle().unwrap());
    assert_eq!(
        sent(&mut controller),
        ["?ASTAT", "?ESTAT1", "?CNT1", "?ESTAT2", "?CNT2"]
    );
    assert_eq!(controller.poll_period(), controller.moving_poll_period());

    for text in ["RR", "0", "10", "0", "20"] {
        reply(&mut controller, text);
    }
    assert!(!controller.poll_cycle().unwrap());
    assert_eq!(controller.poll_period(), controller.idle_poll_period());
}

#[test]
fn poll_cycle_continues_after_failure() {
    let mut controller = controller(&["2", "2"]);
    // The group status times out, the mock then serves the detail polls.
    controller
        .transport_mut()
        .backend_mut()
        .read_error(Some(io::Error::new(io::ErrorKind::TimedOut, "timed out")));
    for text in ["0", "10", "0", "20"] {
        reply(&mut controller, text);
    }
    assert!(controller.poll_cycle().unwrap_err().is_timeout());
    assert_eq!(controller.axis(1).unwrap().position(), Some(20));
}

#[test]
fn init_string_runs_init_hook() {
    let mut controller = controller(&["2", "2"]);
    let outcome = controller.set_lifecycle(1, Hook::Init, "INIT").unwrap();
    assert_eq!(outcome, Some(HookOutcome::Sent));
    assert_eq!(sent(&mut controller), ["INIT2"]);
    assert_eq!(
        controller.store().get_string(1, Param::Init).as_deref(),
        Some("INIT")
    );

    let outcome = controller.set_lifecycle(1, Hook::Init, "").unwrap();
    assert_eq!(outcome, Some(HookOutcome::NotConfigured));
    assert!(sent(&mut controller).is_empty());
}

#[test]
fn motion_hook_strings_are_only_stored() {
    let mut controller = controller(&["2"]);
    assert_eq!(controller.set_lifecycle(0, Hook::Prem, "MON").unwrap(), None);
    assert_eq!(controller.set_lifecycle(0, Hook::Post, "MOFF").unwrap(), None);
    assert!(sent(&mut controller).is_empty());
    assert_eq!(
        controller.store().get_string(0, Param::Post).as_deref(),
        Some("MOFF")
    );
}

#[test]
fn failed_init_hook_raises_problem() {
    let mut controller = controller(&["2"]);
    unplug(&mut controller);
    let err = controller.set_lifecycle(0, Hook::Init, "INIT").unwrap_err();
    assert!(err.is_transport());
    assert!(sent(&mut controller).is_empty());
    assert!(flag(&controller, 0, Flag::Problem));
    // The string is kept for the next attempt.
    assert_eq!(
        controller.store().get_string(0, Param::Init).as_deref(),
        Some("INIT")
    );

    assert_eq!(
        controller.set_lifecycle(0, Hook::Init, "INIT").unwrap(),
        Some(HookOutcome::Sent)
    );
    assert_eq!(sent(&mut controller), ["INIT1"]);
    assert!(!flag(&controller, 0, Flag::Problem));
}

#[test]
fn reports() {
    let mut controller = controller(&["2"]);
    reply(&mut controller, "R");
    controller.poll().unwrap();
    sent(&mut controller);

    let report = controller.report(0);
    assert!(sent(&mut controller).is_empty());
    assert_eq!(report.num_axes, 1);
    assert_eq!(report.axes[0].last_status, StatusCode::Ready);
    assert!(report.detail.is_none());
    let text = report.to_string();
    assert!(text.contains("  axis 0\n    type = 2\n    homing type = 4\n    last status = R\n"));

    for text in ["", "R", "V1.0", "R", "6", "120", "150", "2000"] {
        reply(&mut controller, text);
    }
    let report = controller.report(1);
    assert_eq!(
        sent(&mut controller),
        ["?MSG", "?ASTAT", "?VERSION", "?ASTAT", "?ESTAT1", "?CNT1", "?PSET1", "?PVEL1"]
    );
    let detail = report.detail.as_ref().unwrap();
    assert_eq!(detail.version.as_deref(), Some("V1.0"));
    let axis = report.axes[0].detail.as_ref().unwrap();
    assert_eq!(axis.status, Some(StatusCode::Ready));
    assert_eq!(axis.limits, Some(LimitStatus::from_bits(6)));
    assert_eq!(axis.readback, Some(120));
    assert_eq!(axis.target, Some(150));
    assert_eq!(axis.velocity, Some(2000));
    assert!(report.to_string().contains("    limit switches = 6\n"));
}

#[test]
fn report_axis_tolerates_failures() {
    let mut controller = controller(&["2"]);
    let report = controller.report_axis(0, 1).unwrap();
    let detail = report.detail.unwrap();
    assert_eq!(detail.status, None);
    assert_eq!(detail.velocity, None);
    assert!(controller.report_axis(1, 0).is_err());
}
