//! Polls a two-axis controller in the background while commanding motion.

use owisps::{
    controller::ControllerOptions, lifecycle::Hook, params::Params, poller::Poller, port::Port,
};
use simple_logger::SimpleLogger;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable logging
    SimpleLogger::new().init().unwrap();

    // Open the port and discover two axes.
    let port = Port::open_serial("/dev/ttyUSB0")?;
    let mut controller = ControllerOptions::new()
        .num_axes(2)
        .moving_poll_period(Duration::from_millis(50))
        .build(port, Params::new());
    println!("{}", controller.report(1));

    // Enable the motor before every motion and disable it afterwards.
    controller.set_lifecycle(0, Hook::Prem, "MON")?;
    controller.set_lifecycle(0, Hook::Post, "MOFF")?;

    // Poll in the background while we command the axis.
    let poller = Poller::for_controller(&controller);
    let controller = Arc::new(Mutex::new(controller));
    let handle = poller.spawn(Arc::clone(&controller));

    controller.lock().unwrap().home(0)?;
    wait_until_done(&controller);
    controller.lock().unwrap().move_axis(0, 10_000.0, false)?;
    wait_until_done(&controller);

    handle.stop().unwrap();
    let controller = controller.lock().unwrap();
    println!("final position: {:?}", controller.axis(0)?.position());
    Ok(())
}

fn wait_until_done<T, S>(controller: &Mutex<owisps::controller::Controller<T, S>>)
where
    T: owisps::transport::Transport,
    S: owisps::params::ParameterStore,
{
    use owisps::axis::Flag;
    loop {
        std::thread::sleep(Duration::from_millis(100));
        if controller.lock().unwrap().axis(0).unwrap().flag(Flag::Done) {
            break;
        }
    }
}
