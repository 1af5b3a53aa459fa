use embedded_hal::digital::v2::OutputPin;

/// Alarm buzzer.
///
/// In automatic mode the climate subsystem drives it through `alarm`. In
/// manual mode only `manual_power` switches it.
pub struct Buzzer<P> {
    pin: P,
    on: bool,
    manual: bool,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self {
            pin,
            on: false,
            manual: false,
        })
    }

    pub fn set_manual(&mut self, manual: bool) {
        self.manual = manual;
    }

    #[inline]
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Automatic control. Ignored in manual mode.
    pub fn alarm(&mut self, active: bool) -> Result<(), P::Error> {
        if self.manual {
            return Ok(());
        }
        self.switch(active)
    }

    /// Manual control. Ignored in automatic mode.
    pub fn manual_power(&mut self, on: bool) -> Result<(), P::Error> {
        if !self.manual {
            return Ok(());
        }
        self.switch(on)
    }

    fn switch(&mut self, on: bool) -> Result<(), P::Error> {
        if self.on == on {
            return Ok(());
        }
        if on {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.on = on;
        Ok(())
    }
}
