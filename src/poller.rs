//! Periodic polling of a controller.
//!
//! A [`Poller`] runs [poll cycles](Controller::poll_cycle) and picks the
//! delay before the next one: short while any axis is moving and long while
//! all are idle. [`Poller::spawn`] runs it on a dedicated thread:
//!
//! ```rust
//! # use owisps::{controller::ControllerOptions, params::Params, poller::Poller, port::Port};
//! # use std::sync::{Arc, Mutex};
//! # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let port = Port::open_serial("/dev/ttyUSB0")?;
//! let controller = ControllerOptions::new().num_axes(2).build(port, Params::new());
//! let poller = Poller::for_controller(&controller);
//! let controller = Arc::new(Mutex::new(controller));
//! let handle = poller.spawn(Arc::clone(&controller));
//!
//! // Commands lock the same controller, so they never interleave with a cycle.
//! controller.lock().unwrap().move_axis(0, 1000.0, false)?;
//!
//! let _ = handle.stop();
//! # Ok(())
//! # }
//! ```

use crate::{
    controller::Controller,
    error::Error,
    params::ParameterStore,
    shared::Shared,
    transport::Transport,
};
use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

/// Schedules poll cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    moving_period: Duration,
    idle_period: Duration,
}

impl Poller {
    /// Create a poller with explicit periods.
    pub fn new(moving_period: Duration, idle_period: Duration) -> Self {
        Poller {
            moving_period,
            idle_period,
        }
    }

    /// Create a poller using the periods a controller was configured with.
    pub fn for_controller<T: Transport, S: ParameterStore>(controller: &Controller<T, S>) -> Self {
        Poller::new(controller.moving_poll_period(), controller.idle_poll_period())
    }

    /// The delay before the next cycle.
    pub fn interval(&self, moving: bool) -> Duration {
        if moving {
            self.moving_period
        } else {
            self.idle_period
        }
    }

    /// Run one poll cycle and return the delay before the next one.
    ///
    /// A failed cycle is logged. The delay still follows the axes' moving
    /// flags, which a failure leaves as they were.
    pub fn poll_once<T: Transport, S: ParameterStore>(&self, controller: &mut Controller<T, S>) -> Duration {
        if let Err(e) = controller.poll_cycle() {
            log::warn!("poll cycle failed: {e}");
        }
        self.interval(controller.any_moving())
    }

    /// Lock a shared controller for one poll cycle and return the delay
    /// before the next one.
    pub fn poll_shared<C, T, S>(&self, controller: &C) -> Result<Duration, Error>
    where
        C: Shared<Controller<T, S>>,
        T: Transport,
        S: ParameterStore,
    {
        let mut guard = controller.lock()?;
        Ok(self.poll_once(&mut *guard))
    }

    /// Poll a shared controller on a new thread until the returned handle is
    /// stopped or dropped.
    ///
    /// The controller is locked for one cycle at a time. The thread exits if
    /// the lock is poisoned.
    pub fn spawn<C, T, S>(self, controller: C) -> PollerHandle
    where
        C: Shared<Controller<T, S>> + Send + 'static,
        T: Transport + 'static,
        S: ParameterStore + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::spawn(move || loop {
            let delay = match self.poll_shared(&controller) {
                Ok(delay) => delay,
                Err(e) => {
                    log::error!("poller stopped: {e}");
                    break;
                }
            };
            match stop_rx.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        PollerHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// A handle to a polling thread started with [`Poller::spawn`].
///
/// Dropping the handle stops the thread without waiting for it.
#[derive(Debug)]
pub struct PollerHandle {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PollerHandle {
    /// Stop polling and wait for the thread to exit.
    ///
    /// A cycle in progress is completed first.
    pub fn stop(mut self) -> thread::Result<()> {
        self.stop.take();
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(()),
        }
    }

    /// Whether the polling thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(thread::JoinHandle::is_finished)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop.take();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        axis::Flag,
        backend::Mock,
        controller::ControllerOptions,
        params::Params,
        port::Port,
    };
    use static_assertions::assert_impl_all;
    use std::{
        cell::RefCell,
        rc::Rc,
        sync::{Arc, Mutex},
    };

    assert_impl_all!(Controller<Port<Mock>, Params>: Send);
    assert_impl_all!(PollerHandle: Send);

    const MOVING: Duration = Duration::from_millis(10);
    const IDLE: Duration = Duration::from_millis(500);

    fn controller() -> Controller<Port<Mock>, Params> {
        let mut port = Port::open_mock();
        port.backend_mut().push_reply("2");
        port.backend_mut().push_reply("0");
        ControllerOptions::new()
            .num_axes(1)
            .moving_poll_period(MOVING)
            .idle_poll_period(IDLE)
            .build(port, Params::new())
    }

    #[test]
    fn interval_follows_moving_flags() {
        let mut controller = controller();
        let poller = Poller::for_controller(&controller);
        assert_eq!(poller, Poller::new(MOVING, IDLE));

        for text in ["T", "0", "5"] {
            controller.transport_mut().backend_mut().push_reply(text);
        }
        assert_eq!(poller.poll_once(&mut controller), MOVING);

        for text in ["R", "0", "9"] {
            controller.transport_mut().backend_mut().push_reply(text);
        }
        assert_eq!(poller.poll_once(&mut controller), IDLE);
    }

    #[test]
    fn failed_cycle_keeps_interval() {
        let mut controller = controller();
        let poller = Poller::for_controller(&controller);
        for text in ["T", "0", "5"] {
            controller.transport_mut().backend_mut().push_reply(text);
        }
        poller.poll_once(&mut controller);
        // Nothing queued: every query times out.
        assert_eq!(poller.poll_once(&mut controller), MOVING);
        assert!(controller.axis(0).unwrap().flag(Flag::Problem));
    }

    #[test]
    fn poll_shared_locks_once() {
        let shared: Rc<RefCell<_>> = Shared::new(controller());
        let poller = Poller::new(MOVING, IDLE);
        shared.borrow_mut().transport_mut().backend_mut().push_reply("R");
        assert_eq!(poller.poll_shared(&shared).unwrap(), IDLE);

        let _guard = shared.borrow();
        assert!(matches!(poller.poll_shared(&shared), Err(Error::LockUnavailable(_))));
    }

    #[test]
    fn spawned_poller_runs_until_stopped() {
        let shared: Arc<Mutex<_>> = Shared::new(controller());
        shared
            .lock()
            .unwrap()
            .transport_mut()
            .backend_mut()
            .take_sent_lines();
        let handle = Poller::new(MOVING, MOVING).spawn(Arc::clone(&shared));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let cycles = shared
                .lock()
                .unwrap()
                .transport()
                .backend()
                .sent_lines()
                .iter()
                .filter(|line| *line == "?ASTAT")
                .count();
            if cycles >= 2 || std::time::Instant::now() > deadline {
                break;
            }
            thread::sleep(MOVING);
        }
        handle.stop().unwrap();
        let cycles = shared
            .lock()
            .unwrap()
            .transport()
            .backend()
            .sent_lines()
            .iter()
            .filter(|line| *line == "?ASTAT")
            .count();
        assert!(cycles >= 2);
    }
}
