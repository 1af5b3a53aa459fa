//! Greenhouse subsystems and the routing of operator and sensor input

pub mod climate;
pub mod irrigation;
pub mod lighting;

pub use climate::{Climate, Comfort};
pub use irrigation::Irrigation;
pub use lighting::Lighting;

use crate::drivers::ButtonEvent;
use crate::menu::{Input, OptionMenu};
use crate::protocol::{Message, ProtocolError, SerialLink};

/// Consumer of a numeric sensor reading.
pub type Reading<'a> = &'a (dyn Fn(i32) + Sync);

/// Input mapped to each push button, by button index.
pub const BUTTON_INPUTS: [Input; 3] = [Input::ButtonA, Input::ButtonB, Input::JoystickSelect];

pub fn button_input(index: usize) -> Option<Input> {
    BUTTON_INPUTS.get(index).copied()
}

/// Sends decoded messages and button presses to their destination.
///
/// Joystick select shows or hides the menu. Every other input goes to the
/// menu's input queue. Sensor readings go to their consumers.
pub struct Router<'r, 'm> {
    menu: &'r OptionMenu<'m>,
    water: Reading<'r>,
    air: Reading<'r>,
}

impl<'r, 'm> Router<'r, 'm> {
    pub const fn new(menu: &'r OptionMenu<'m>, water: Reading<'r>, air: Reading<'r>) -> Self {
        Self { menu, water, air }
    }

    pub fn input(&self, input: Input) {
        if input == Input::JoystickSelect {
            if let Err(e) = self.menu.toggle() {
                crate::log_error!("router: menu toggle failed: {:?}", e);
            }
        } else if !self.menu.push_input(input) {
            crate::log_debug!("router: {} ignored", input.name());
        }
    }

    pub fn button(&self, event: ButtonEvent) {
        if let ButtonEvent::Pressed(index) = event {
            match button_input(index) {
                Some(input) => self.input(input),
                None => crate::log_warn!("router: no input for button {}", index),
            }
        }
    }

    pub fn dispatch(&self, message: Message) {
        match message {
            Message::Controller(input) => self.input(input),
            Message::Water(level) => {
                crate::log_debug!("router: water {}", level);
                (self.water)(level)
            }
            Message::Air(value) => {
                crate::log_debug!("router: air {}", value);
                (self.air)(value)
            }
        }
    }

    /// Frame handler task body: dispatches every complete frame on `link`.
    /// Returns the number of frames consumed.
    pub fn handle_frames<const N: usize>(&self, link: &SerialLink<'_, N>) -> usize {
        if link.take_overflow() {
            crate::log_warn!("router: receive buffer overflow");
        }

        let mut frames = 0;
        while let Some(message) = link.next_message() {
            frames += 1;
            match message {
                Ok(message) => self.dispatch(message),
                Err(ProtocolError::Overflow) => crate::log_warn!("router: frame too long"),
                Err(e) => crate::log_warn!("router: bad frame: {:?}", e),
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtos::Scheduler;
    use core::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn buttons_map_to_inputs() {
        assert_eq!(button_input(0), Some(Input::ButtonA));
        assert_eq!(button_input(2), Some(Input::JoystickSelect));
        assert_eq!(button_input(3), None);
    }

    #[test]
    fn frames_reach_menu_and_sensor_consumers() {
        let water_seen = AtomicI32::new(-1);
        let air_seen = AtomicI32::new(-1);
        let water = |v: i32| water_seen.store(v, Ordering::SeqCst);
        let air = |v: i32| air_seen.store(v, Ordering::SeqCst);
        let handler = || {};

        let scheduler: Scheduler<'_, 2, 8> = Scheduler::new();
        let menu = OptionMenu::new(&scheduler);
        let router = Router::new(&menu, &water, &air);
        let link: SerialLink<'_, 64> = SerialLink::new(&handler);

        for &b in b"WATER:12\0AIR:1500\0CONTROLLER:DOWN\0BOGUS\0".iter() {
            let _ = link.receive(b, &scheduler);
        }

        assert_eq!(router.handle_frames(&link), 4);
        assert_eq!(water_seen.load(Ordering::SeqCst), 12);
        assert_eq!(air_seen.load(Ordering::SeqCst), 1500);
        assert_eq!(menu.pending_inputs(), 1);
        assert_eq!(router.handle_frames(&link), 0);
    }

    #[test]
    fn select_toggles_the_menu_and_hidden_menu_drops_inputs() {
        let ignore = |_: i32| {};
        let noop = || {};
        let scheduler: Scheduler<'_, 4, 4> = Scheduler::new();
        let menu = OptionMenu::new(&scheduler);
        let router = Router::new(&menu, &ignore, &ignore);

        let input_task = scheduler.register(&noop, 10, 10, true).unwrap();
        let redraw_task = scheduler.register(&noop, 500, 500, true).unwrap();
        menu.attach_tasks(input_task, redraw_task);

        router.dispatch(Message::Controller(Input::JoystickSelect));
        assert!(!menu.is_enabled());
        assert_eq!(scheduler.is_active(redraw_task), Ok(false));

        router.button(ButtonEvent::Pressed(0));
        assert_eq!(menu.pending_inputs(), 0);

        router.button(ButtonEvent::Pressed(2));
        assert!(menu.is_enabled());
        router.button(ButtonEvent::Pressed(0));
        router.button(ButtonEvent::Released(0));
        assert_eq!(menu.pending_inputs(), 1);
    }
}
