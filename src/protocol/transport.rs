//! Receive side of the serial link
//!
//! The UART receive interrupt pushes bytes into a fixed buffer. Each NUL
//! byte completes a frame and submits the frame handler task as a one-shot
//! job, which wakes the main loop.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{Deque, Vec};

use super::packet::{Message, FRAME_LEN};
use super::{ProtocolError, Result};
use crate::rtos::{Error, TaskRef, TaskSpawn};

const TERMINATOR: u8 = 0;

struct RxState<const N: usize> {
    buffer: Deque<u8, N>,
    frames: u8,
    overflow: bool,
}

pub struct SerialLink<'a, const N: usize> {
    rx: Mutex<RefCell<RxState<N>>>,
    handler: TaskRef<'a>,
}

impl<'a, const N: usize> SerialLink<'a, N> {
    /// `handler` is submitted once per completed frame.
    pub const fn new(handler: TaskRef<'a>) -> Self {
        Self {
            rx: Mutex::new(RefCell::new(RxState {
                buffer: Deque::new(),
                frames: 0,
                overflow: false,
            })),
            handler,
        }
    }

    /// Receive interrupt entry point.
    ///
    /// A byte arriving on a full buffer is dropped and the overflow flag
    /// set. A terminator replaces the newest byte instead, so the damaged
    /// frame still ends where the sender meant it to. When the newest byte
    /// already ends a frame, everything since was lost and the terminator
    /// is dropped as well.
    pub fn receive(&self, byte: u8, spawner: &dyn TaskSpawn<'a>) -> core::result::Result<(), Error> {
        let complete = critical_section::with(|cs| {
            let mut rx = self.rx.borrow_ref_mut(cs);
            if rx.buffer.is_full() {
                rx.overflow = true;
                if byte != TERMINATOR || rx.buffer.back() == Some(&TERMINATOR) {
                    return false;
                }
                rx.buffer.pop_back();
            }
            // Cannot fail, checked above
            let _ = rx.buffer.push_back(byte);
            if byte == TERMINATOR {
                rx.frames = rx.frames.saturating_add(1);
                true
            } else {
                false
            }
        });

        if complete {
            spawner.enqueue_external(self.handler)
        } else {
            Ok(())
        }
    }

    /// Removes the oldest complete frame, terminator excluded. Frames longer
    /// than `FRAME_LEN` are consumed and reported as `Overflow`.
    pub fn read_frame(&self) -> Option<Result<Vec<u8, FRAME_LEN>>> {
        critical_section::with(|cs| {
            let mut rx = self.rx.borrow_ref_mut(cs);
            if rx.frames == 0 {
                return None;
            }
            rx.frames -= 1;

            let mut frame = Vec::new();
            let mut fits = true;
            while let Some(byte) = rx.buffer.pop_front() {
                if byte == TERMINATOR {
                    break;
                }
                fits &= frame.push(byte).is_ok();
            }
            Some(if fits {
                Ok(frame)
            } else {
                Err(ProtocolError::Overflow)
            })
        })
    }

    /// Reads and parses the oldest complete frame.
    pub fn next_message(&self) -> Option<Result<Message>> {
        self.read_frame()
            .map(|frame| frame.and_then(|frame| Message::parse(&frame)))
    }

    /// Returns and clears the overflow flag.
    pub fn take_overflow(&self) -> bool {
        critical_section::with(|cs| core::mem::replace(&mut self.rx.borrow_ref_mut(cs).overflow, false))
    }

    pub fn pending_frames(&self) -> usize {
        critical_section::with(|cs| self.rx.borrow_ref(cs).frames as usize)
    }
}
