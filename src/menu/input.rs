//! Menu inputs and their pending queue

use heapless::Deque;
use ufmt::derive::uDebug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub enum Input {
    Up,
    Down,
    Left,
    Right,
    ButtonA,
    ButtonB,
    JoystickSelect,
}

impl Input {
    /// Parses the name used on the serial link, e.g. `UP` or `SELECT`.
    pub fn from_name(name: &str) -> Option<Self> {
        let input = match name {
            "UP" => Input::Up,
            "DOWN" => Input::Down,
            "LEFT" => Input::Left,
            "RIGHT" => Input::Right,
            "A" | "BUTTON_A" => Input::ButtonA,
            "B" | "BUTTON_B" => Input::ButtonB,
            "SELECT" | "JOYSTICK_SELECT" => Input::JoystickSelect,
            _ => return None,
        };
        Some(input)
    }

    pub fn name(self) -> &'static str {
        match self {
            Input::Up => "UP",
            Input::Down => "DOWN",
            Input::Left => "LEFT",
            Input::Right => "RIGHT",
            Input::ButtonA => "BUTTON_A",
            Input::ButtonB => "BUTTON_B",
            Input::JoystickSelect => "SELECT",
        }
    }
}

/// FIFO of inputs waiting for the menu's input handler task.
pub struct InputQueue<const N: usize> {
    inputs: Deque<Input, N>,
}

impl<const N: usize> InputQueue<N> {
    pub const fn new() -> Self {
        Self {
            inputs: Deque::new(),
        }
    }

    /// Hands the input back when the queue is full.
    #[inline]
    pub fn push(&mut self, input: Input) -> Result<(), Input> {
        self.inputs.push_back(input)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Input> {
        self.inputs.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl<const N: usize> Default for InputQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
