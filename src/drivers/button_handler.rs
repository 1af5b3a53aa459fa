use embedded_hal::digital::v2::InputPin;

use crate::config::BUTTON_DEBOUNCE_SAMPLES;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed(usize),
    Released(usize),
}

/// Debounced active-low push buttons, sampled from a periodic task.
pub struct ButtonHandler<P, const N: usize> {
    buttons: [P; N],
    states: [bool; N],
    debounce_counters: [u8; N],
}

impl<P: InputPin, const N: usize> ButtonHandler<P, N> {
    pub fn new(buttons: [P; N]) -> Self {
        Self {
            buttons,
            states: [false; N],
            debounce_counters: [0; N],
        }
    }

    /// Samples every button once and reports the first state change that
    /// has been stable for `BUTTON_DEBOUNCE_SAMPLES` samples.
    pub fn poll(&mut self) -> Result<Option<ButtonEvent>, P::Error> {
        for (idx, button) in self.buttons.iter().enumerate() {
            let raw_state = button.is_low()?; // Buttons are active low

            if raw_state != self.states[idx] {
                self.debounce_counters[idx] = self.debounce_counters[idx].saturating_add(1);
                if self.debounce_counters[idx] >= BUTTON_DEBOUNCE_SAMPLES {
                    self.states[idx] = raw_state;
                    self.debounce_counters[idx] = 0;

                    return Ok(Some(if raw_state {
                        ButtonEvent::Pressed(idx)
                    } else {
                        ButtonEvent::Released(idx)
                    }));
                }
            } else {
                self.debounce_counters[idx] = 0;
            }
        }
        Ok(None)
    }

    pub fn is_pressed(&self, button: usize) -> bool {
        self.states.get(button).copied().unwrap_or(false)
    }
}
