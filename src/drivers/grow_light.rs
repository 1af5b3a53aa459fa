use embedded_hal::PwmPin;

use crate::config::MAX_BRIGHTNESS;

/// PWM-dimmed grow light. Brightness is expressed on the
/// `0..=MAX_BRIGHTNESS` scale and mapped onto the channel's duty range.
pub struct GrowLight<P> {
    pwm: P,
    brightness: i32,
    on: bool,
}

impl<P: PwmPin<Duty = u16>> GrowLight<P> {
    pub fn new(mut pwm: P) -> Self {
        pwm.set_duty(0);
        pwm.disable();
        Self {
            pwm,
            brightness: 0,
            on: false,
        }
    }

    pub fn set_brightness(&mut self, brightness: i32) {
        let brightness = brightness.clamp(0, MAX_BRIGHTNESS);
        if brightness == self.brightness {
            return;
        }
        let max_duty = self.pwm.get_max_duty() as u32;
        let duty = brightness as u32 * max_duty / MAX_BRIGHTNESS as u32;
        self.pwm.set_duty(duty as u16);
        self.brightness = brightness;
    }

    pub fn power(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        if on {
            self.pwm.enable();
        } else {
            self.pwm.disable();
        }
        self.on = on;
    }

    #[inline]
    pub fn brightness(&self) -> i32 {
        self.brightness
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fake::FakePwm;

    #[test]
    fn starts_dark_and_disabled() {
        let pwm = FakePwm::new(255);
        let light = GrowLight::new(pwm.clone());
        assert_eq!(pwm.duty(), 0);
        assert!(!pwm.is_enabled());
        assert!(!light.is_on());
    }

    #[test]
    fn brightness_scales_to_duty_range() {
        let pwm = FakePwm::new(255);
        let mut light = GrowLight::new(pwm.clone());

        light.set_brightness(MAX_BRIGHTNESS / 2);
        assert_eq!(pwm.duty(), 127);
        light.set_brightness(MAX_BRIGHTNESS * 3);
        assert_eq!(light.brightness(), MAX_BRIGHTNESS);
        assert_eq!(pwm.duty(), 255);
        light.set_brightness(-4);
        assert_eq!(pwm.duty(), 0);
    }

    #[test]
    fn power_toggles_the_channel() {
        let pwm = FakePwm::new(255);
        let mut light = GrowLight::new(pwm.clone());
        light.power(true);
        assert!(pwm.is_enabled());
        light.power(false);
        assert!(!pwm.is_enabled());
    }
}
