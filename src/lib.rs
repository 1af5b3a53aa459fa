//! Greenhouse controller firmware
//!
//! A cooperative run-to-completion scheduler drives every subsystem: a
//! timer interrupt queues due periodic tasks, the main loop drains them and
//! sleeps when there is nothing left to do.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

pub mod application;
pub mod config;
pub mod drivers;
#[cfg(target_arch = "avr")]
pub mod hal;
pub mod logger;
pub mod menu;
pub mod os;
pub mod protocol;
pub mod rtos;
