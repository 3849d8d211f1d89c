//! A library for driving OWIS PS multi-axis positioning controllers.
//!
//! The controllers speak a line oriented ASCII protocol over a serial port or
//! a TCP connection. This crate covers the protocol layer:
//!
//!  * [`command`]: rendering the ASCII commands,
//!  * [`reply`]: decoding replies into typed values,
//!  * [`status`]: turning the per-axis status character into motion flags,
//!  * [`lifecycle`]: the configurable init, pre-motion and post-motion commands,
//!  * [`controller`]: axis discovery, motion commands and poll cycles,
//!  * [`poller`]: running poll cycles periodically.
//!
//! Connections are opened with [`port::Port`], and axis state is published to
//! a [`params::ParameterStore`].
//!
//! ```rust
//! use owisps::{controller::ControllerOptions, params::Params, poller::Poller, port::Port};
//! # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let port = Port::open_serial("/dev/ttyUSB0")?;
//! let mut controller = ControllerOptions::new().num_axes(3).build(port, Params::new());
//! let poller = Poller::for_controller(&controller);
//!
//! controller.move_axis(1, -6500.0, true)?;
//! loop {
//!     let delay = poller.poll_once(&mut controller);
//!     if !controller.any_moving() {
//!         break;
//!     }
//!     std::thread::sleep(delay);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(missing_debug_implementations)]

pub mod axis;
pub mod backend;
pub mod command;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod poller;
pub mod port;
pub mod reply;
pub mod shared;
pub mod status;
pub mod transport;
