//! Configurable menu options: bounded thresholds, timer presets and switches

use ufmt::{uWrite, uwrite};

use super::MenuError;

/// Action run on confirm for an option whose value changed.
pub type OnChange<'a> = &'a (dyn Fn(i32) + Sync);

pub struct TimerStep {
    pub label: &'static str,
    pub ms: i32,
}

pub const TIMER_STEPS: [TimerStep; 18] = [
    TimerStep { label: "2ms", ms: 2 },
    TimerStep { label: "10ms", ms: 10 },
    TimerStep { label: "100ms", ms: 100 },
    TimerStep { label: "500ms", ms: 500 },
    TimerStep { label: "1s", ms: 1_000 },
    TimerStep { label: "2s", ms: 2_000 },
    TimerStep { label: "5s", ms: 5_000 },
    TimerStep { label: "10s", ms: 10_000 },
    TimerStep { label: "20s", ms: 20_000 },
    TimerStep { label: "30s", ms: 30_000 },
    TimerStep { label: "1m", ms: 60_000 },
    TimerStep { label: "2m", ms: 120_000 },
    TimerStep { label: "5m", ms: 300_000 },
    TimerStep { label: "10m", ms: 600_000 },
    TimerStep { label: "20m", ms: 1_200_000 },
    TimerStep { label: "30m", ms: 1_800_000 },
    TimerStep { label: "1h", ms: 3_600_000 },
    TimerStep { label: "2h", ms: 7_200_000 },
];

pub fn timer_index(label: &str) -> Option<usize> {
    TIMER_STEPS.iter().position(|step| step.label == label)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Threshold {
    value: i32,
    min: i32,
    max: i32,
    step: i32,
}

impl Threshold {
    pub fn new(value: i32, min: i32, max: i32, step: i32) -> Result<Self, MenuError> {
        if min > max || value < min || value > max || step <= 0 {
            return Err(MenuError::InvalidThreshold);
        }
        Ok(Self {
            value,
            min,
            max,
            step,
        })
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    fn set(&mut self, value: i32) {
        self.value = value.clamp(self.min, self.max);
    }

    fn increment(&mut self) {
        self.value = if self.max - self.value <= self.step {
            self.max
        } else {
            self.value + self.step
        };
    }

    fn decrement(&mut self) {
        self.value = if self.value - self.min <= self.step {
            self.min
        } else {
            self.value - self.step
        };
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Threshold(Threshold),
    Timer(usize),
    Switch(bool),
}

pub struct MenuOption<'a> {
    name: &'static str,
    kind: OptionKind,
    changed: bool,
    on_change: OnChange<'a>,
}

impl<'a> MenuOption<'a> {
    pub fn threshold(name: &'static str, threshold: Threshold, on_change: OnChange<'a>) -> Self {
        Self::new(name, OptionKind::Threshold(threshold), on_change)
    }

    /// A timer option starting at the preset named `label` (e.g. `"5s"`).
    pub fn timer(name: &'static str, label: &str, on_change: OnChange<'a>) -> Result<Self, MenuError> {
        let index = timer_index(label).ok_or(MenuError::UnknownTimer)?;
        Ok(Self::new(name, OptionKind::Timer(index), on_change))
    }

    pub fn switch(name: &'static str, on: bool, on_change: OnChange<'a>) -> Self {
        Self::new(name, OptionKind::Switch(on), on_change)
    }

    fn new(name: &'static str, kind: OptionKind, on_change: OnChange<'a>) -> Self {
        Self {
            name,
            kind,
            changed: false,
            on_change,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    #[inline]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Milliseconds for timers, 0/1 for switches.
    pub fn value(&self) -> i32 {
        match self.kind {
            OptionKind::Threshold(threshold) => threshold.value(),
            OptionKind::Timer(index) => TIMER_STEPS[index].ms,
            OptionKind::Switch(on) => on as i32,
        }
    }

    pub fn increment(&mut self) {
        match &mut self.kind {
            OptionKind::Threshold(threshold) => threshold.increment(),
            OptionKind::Timer(index) => *index = (*index + 1).min(TIMER_STEPS.len() - 1),
            OptionKind::Switch(on) => *on = !*on,
        }
        self.changed = true;
    }

    pub fn decrement(&mut self) {
        match &mut self.kind {
            OptionKind::Threshold(threshold) => threshold.decrement(),
            OptionKind::Timer(index) => *index = index.saturating_sub(1),
            OptionKind::Switch(on) => *on = !*on,
        }
        self.changed = true;
    }

    /// Overwrites the shown value without marking the option changed.
    /// Timers take the closest preset not above `value`.
    pub fn set_value(&mut self, value: i32) {
        match &mut self.kind {
            OptionKind::Threshold(threshold) => threshold.set(value),
            OptionKind::Timer(index) => {
                *index = TIMER_STEPS
                    .iter()
                    .rposition(|step| step.ms <= value)
                    .unwrap_or(0);
            }
            OptionKind::Switch(on) => *on = value != 0,
        }
    }

    /// Clears the changed flag, returning the action to run if it was set.
    pub(crate) fn take_change(&mut self) -> Option<(OnChange<'a>, i32)> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some((self.on_change, self.value()))
    }

    pub fn write_value<W: uWrite>(&self, out: &mut W) -> Result<(), W::Error> {
        match self.kind {
            OptionKind::Threshold(threshold) => uwrite!(out, "{} u", threshold.value()),
            OptionKind::Timer(index) => out.write_str(TIMER_STEPS[index].label),
            OptionKind::Switch(true) => out.write_str("ON"),
            OptionKind::Switch(false) => out.write_str("OFF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignore(_: i32) {}

    #[test]
    fn threshold_clamps_at_both_bounds() {
        let threshold = Threshold::new(25, 20, 30, 4).unwrap();
        let mut option = MenuOption::threshold("t", threshold, &ignore);

        option.increment();
        assert_eq!(option.value(), 29);
        option.increment();
        assert_eq!(option.value(), 30);

        for _ in 0..5 {
            option.decrement();
        }
        assert_eq!(option.value(), 20);
    }

    #[test]
    fn threshold_rejects_inconsistent_bounds() {
        assert_eq!(Threshold::new(5, 10, 0, 1), Err(MenuError::InvalidThreshold));
        assert_eq!(Threshold::new(50, 0, 10, 1), Err(MenuError::InvalidThreshold));
        assert_eq!(Threshold::new(5, 0, 10, 0), Err(MenuError::InvalidThreshold));
    }

    #[test]
    fn timer_walks_the_preset_table_and_stops_at_the_ends() {
        let mut option = MenuOption::timer("poll", "1h", &ignore).unwrap();
        assert_eq!(option.value(), 3_600_000);

        option.increment();
        option.increment();
        assert_eq!(option.value(), 7_200_000);

        let mut fast = MenuOption::timer("poll", "2ms", &ignore).unwrap();
        fast.decrement();
        assert_eq!(fast.value(), 2);
        fast.increment();
        assert_eq!(fast.value(), 10);
    }

    #[test]
    fn unknown_timer_label_is_an_error() {
        assert!(matches!(
            MenuOption::timer("poll", "3s", &ignore),
            Err(MenuError::UnknownTimer)
        ));
    }

    #[test]
    fn switch_toggles_either_way_and_marks_changed() {
        let mut option = MenuOption::switch("manual", false, &ignore);
        assert!(!option.is_changed());

        option.decrement();
        assert_eq!(option.value(), 1);
        assert!(option.is_changed());

        assert!(option.take_change().is_some());
        assert!(option.take_change().is_none());
    }

    #[test]
    fn set_value_overwrites_without_marking_changed() {
        let mut threshold = MenuOption::threshold("low", Threshold::new(20, 0, 50, 1).unwrap(), &ignore);
        threshold.increment();
        assert!(threshold.take_change().is_some());

        threshold.set_value(99);
        assert_eq!(threshold.value(), 50);
        assert!(!threshold.is_changed());

        let mut timer = MenuOption::timer("poll", "1s", &ignore).unwrap();
        timer.set_value(5_500);
        assert_eq!(timer.value(), 5_000);
        timer.set_value(0);
        assert_eq!(timer.value(), 2);
        assert!(!timer.is_changed());
    }
}
