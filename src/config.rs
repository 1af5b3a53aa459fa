//! Configuration constants for the greenhouse controller

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// UART baud rate
pub const UART_BAUD: u32 = 9600;

/// ADC reference voltage in millivolts
pub const ADC_VREF_MV: u32 = 5000;

/// Scheduler tick period in milliseconds
pub const TICK_MS: i32 = 2;

/// Periodic task table capacity
pub const MAX_TASKS: usize = 10;

/// Physical ready queue slots; one is always kept free
pub const READY_QUEUE_SLOTS: usize = 50;

/// Menu option list capacity
pub const MAX_OPTIONS: usize = 20;

/// Pending menu inputs
pub const INPUT_QUEUE_CAPACITY: usize = 50;

/// Serial receive buffer, in bytes
pub const SERIAL_RX_CAPACITY: usize = 64;

/// Log ring capacity, in entries
pub const LOG_CAPACITY: usize = 16;

/// Maximum formatted length of one log line
pub const LOG_LINE_LEN: usize = 48;

/// Rendered menu line length
pub const MENU_LINE_LEN: usize = 40;

/// Temperature conversion start interval
pub const TEMPERATURE_POLL_MS: i32 = 5500;

/// Interval between polls of a pending ADC conversion
pub const CONVERSION_POLL_MS: i32 = 10;

/// Ambient light read interval
pub const LIGHT_UPDATE_MS: i32 = 10_500;

/// Menu input handler interval
pub const MENU_INPUT_MS: i32 = 10;

/// Menu redraw interval
pub const MENU_REDRAW_MS: i32 = 500;

/// Button sampling interval
pub const BUTTON_POLL_MS: i32 = 10;

/// Log flush to the serial console
pub const LOG_FLUSH_MS: i32 = 1000;

/// Number of irrigation pumps
pub const PUMP_COUNT: usize = 2;

/// Default pump run time
pub const PUMP_ON_MS: i32 = 10_000;

/// Default pump rest time
pub const PUMP_OFF_MS: i32 = 60_000;

/// Temperature alarm bounds, in degrees Celsius
pub const TEMPERATURE_LOWER: i32 = 20;
pub const TEMPERATURE_HIGHER: i32 = 30;

/// Air quality readings above this sound the alarm
pub const AIR_QUALITY_LIMIT: i32 = 1000;

/// Water level readings below this block the pumps
pub const LOW_WATER_LEVEL: i32 = 10;

/// Brightness scale of the grow light; also bounds the light threshold
pub const MAX_BRIGHTNESS: i32 = 2500;
pub const MIN_BRIGHTNESS: i32 = 500;

/// Ambient light level below which the grow light starts
pub const LIGHT_THRESHOLD_DEFAULT: i32 = 1000;

/// Light sensor ADC counts to light level
pub const LIGHT_LEVEL_SCALE: i32 = 4;

/// Consecutive samples before a button state change is accepted
pub const BUTTON_DEBOUNCE_SAMPLES: u8 = 5;
