//! Option menu
//!
//! A list of runtime-tunable options driven by directional inputs. Changes
//! are staged until the operator confirms, at which point each changed
//! option's action runs with its new value.

pub mod input;
pub mod options;

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{String, Vec};
use ufmt::derive::uDebug;
use ufmt::{uWrite, uwrite};

use crate::config::{INPUT_QUEUE_CAPACITY, MAX_OPTIONS, MENU_LINE_LEN};
use crate::logger::LineWriter;
use crate::rtos::{Error, TaskControl, TaskHandle};

pub use input::{Input, InputQueue};
pub use options::{MenuOption, OnChange, OptionKind, Threshold, TimerStep, TIMER_STEPS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub enum MenuError {
    /// The option list is at capacity.
    Full,
    /// Threshold bounds or step are inconsistent.
    InvalidThreshold,
    /// No timer preset with that label.
    UnknownTimer,
}

#[derive(Clone, Copy)]
struct MenuTasks {
    input: TaskHandle,
    redraw: TaskHandle,
}

struct MenuState<'a> {
    options: Vec<MenuOption<'a>, MAX_OPTIONS>,
    cursor: Option<usize>,
    enabled: bool,
    inputs: InputQueue<INPUT_QUEUE_CAPACITY>,
    tasks: Option<MenuTasks>,
}

pub struct OptionMenu<'a> {
    state: Mutex<RefCell<MenuState<'a>>>,
    control: &'a dyn TaskControl,
}

impl<'a> OptionMenu<'a> {
    /// Starts enabled with no options.
    pub const fn new(control: &'a dyn TaskControl) -> Self {
        Self {
            state: Mutex::new(RefCell::new(MenuState {
                options: Vec::new(),
                cursor: None,
                enabled: true,
                inputs: InputQueue::new(),
                tasks: None,
            })),
            control,
        }
    }

    /// Records the input handler and redraw tasks so `toggle` can pause
    /// them along with the menu.
    pub fn attach_tasks(&self, input: TaskHandle, redraw: TaskHandle) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).tasks = Some(MenuTasks { input, redraw });
        });
    }

    /// Appends an option and returns its position. The first option
    /// becomes the current one.
    pub fn push_option(&self, option: MenuOption<'a>) -> Result<usize, MenuError> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.options.push(option).map_err(|_| MenuError::Full)?;
            if state.cursor.is_none() {
                state.cursor = Some(0);
            }
            Ok(state.options.len() - 1)
        })
    }

    pub fn pop_option(&self) -> Option<MenuOption<'a>> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let option = state.options.pop()?;
            let len = state.options.len();
            state.cursor = match state.cursor {
                _ if len == 0 => None,
                Some(cursor) if cursor >= len => Some(len - 1),
                cursor => cursor,
            };
            Some(option)
        })
    }

    /// Moves to the next option. Returns the new position, or `None` when
    /// already on the last one.
    pub fn next(&self) -> Option<usize> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let cursor = state.cursor?;
            if cursor + 1 >= state.options.len() {
                return None;
            }
            state.cursor = Some(cursor + 1);
            state.cursor
        })
    }

    pub fn prev(&self) -> Option<usize> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let cursor = state.cursor?.checked_sub(1)?;
            state.cursor = Some(cursor);
            state.cursor
        })
    }

    pub fn increment(&self) {
        self.with_current(MenuOption::increment);
    }

    pub fn decrement(&self) {
        self.with_current(MenuOption::decrement);
    }

    fn with_current(&self, f: impl FnOnce(&mut MenuOption<'a>)) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let state = &mut *state;
            if let Some(option) = state.cursor.and_then(|i| state.options.get_mut(i)) {
                f(option);
            }
        });
    }

    /// Runs the action of every changed option, in list order, and clears
    /// the changed flags. Returns how many actions ran.
    pub fn confirm(&self) -> usize {
        let pending: Vec<(OnChange<'a>, i32), MAX_OPTIONS> = critical_section::with(|cs| {
            self.state
                .borrow_ref_mut(cs)
                .options
                .iter_mut()
                .filter_map(|option| option.take_change())
                .collect()
        });

        // Actions may call back into subsystems and the scheduler
        for (action, value) in pending.iter() {
            action(*value);
        }
        pending.len()
    }

    pub fn current(&self) -> Option<usize> {
        critical_section::with(|cs| self.state.borrow_ref(cs).cursor)
    }

    pub fn value_of(&self, index: usize) -> Option<i32> {
        critical_section::with(|cs| {
            self.state
                .borrow_ref(cs)
                .options
                .get(index)
                .map(MenuOption::value)
        })
    }

    /// Re-syncs the option at `index` with a value applied elsewhere, for
    /// example after its action refused a change. Returns false for an
    /// unknown index.
    pub fn set_value(&self, index: usize, value: i32) -> bool {
        critical_section::with(|cs| {
            match self.state.borrow_ref_mut(cs).options.get_mut(index) {
                Some(option) => {
                    option.set_value(value);
                    true
                }
                None => false,
            }
        })
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).options.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enabled(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).enabled)
    }

    /// Shows or hides the menu, resuming or pausing its tasks. Returns the
    /// new enabled state.
    pub fn toggle(&self) -> Result<bool, Error> {
        let (enabled, tasks) = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.enabled = !state.enabled;
            (state.enabled, state.tasks)
        });

        if let Some(tasks) = tasks {
            self.control.set_active(tasks.input, enabled)?;
            self.control.set_active(tasks.redraw, enabled)?;
        }
        crate::log_info!("menu: {}", if enabled { "shown" } else { "hidden" });
        Ok(enabled)
    }

    /// Queues an input for the handler task. Inputs are dropped while the
    /// menu is hidden or the queue is full; returns whether it was queued.
    pub fn push_input(&self, input: Input) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.enabled && state.inputs.push(input).is_ok()
        })
    }

    pub fn pending_inputs(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).inputs.len())
    }

    /// Input handler task body: applies at most one queued input.
    pub fn handle_input(&self) {
        let input = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.enabled {
                state.inputs.pop()
            } else {
                None
            }
        });

        match input {
            Some(Input::Up) => {
                self.prev();
            }
            Some(Input::Down) => {
                self.next();
            }
            Some(Input::Left) => self.decrement(),
            Some(Input::Right) => self.increment(),
            Some(Input::ButtonA) => {
                self.confirm();
            }
            Some(Input::ButtonB) | Some(Input::JoystickSelect) | None => {}
        }
    }

    /// Formats the current option as `name < value >`, cut to the line
    /// length.
    pub fn render_line(&self) -> String<MENU_LINE_LEN> {
        let mut line = String::new();
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            let mut w = LineWriter::new(&mut line);
            let _ = match state.cursor.and_then(|i| state.options.get(i)) {
                Some(option) => uwrite!(w, "{} < ", option.name())
                    .and_then(|_| option.write_value(&mut w))
                    .and_then(|_| w.write_str(" >")),
                None => w.write_str("no option selected"),
            };
        });
        line
    }

    /// Redraw task body: writes the current line to `out`.
    pub fn render<W: uWrite>(&self, out: &mut W) -> Result<(), W::Error> {
        let line = self.render_line();
        out.write_str(line.as_str())?;
        out.write_str("\r\n")
    }
}
