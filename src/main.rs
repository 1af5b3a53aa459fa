#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use core::cell::RefCell;

    use avr_device::atmega128a::Peripherals;
    use critical_section::Mutex;
    use panic_halt as _;
    use ufmt::derive::uDebug;

    use greenhouse_firmware::application::{Climate, Irrigation, Lighting, Router};
    use greenhouse_firmware::config::*;
    use greenhouse_firmware::drivers::{ButtonHandler, Buzzer, GrowLight, Pump, SerialConsole};
    use greenhouse_firmware::hal::{self, board, AdcChannel, AnalogInput, Power, SystemTimer, Timer1Pwm, Uart};
    use greenhouse_firmware::menu::{MenuError, MenuOption, OptionMenu, Threshold};
    use greenhouse_firmware::os::{self, SCHEDULER};
    use greenhouse_firmware::protocol::SerialLink;
    use greenhouse_firmware::rtos::{self, TaskBuilder, TaskRef};
    use greenhouse_firmware::logger::{self, Level};
    use greenhouse_firmware::{log_error, log_info, log_warn};

    type Console = SerialConsole<Uart>;
    type Buttons = ButtonHandler<board::ButtonPin, 3>;

    static CLIMATE: Climate<'static, AnalogInput, board::BuzzerPin> = Climate::new(&SCHEDULER);
    static IRRIGATION: Irrigation<'static, board::PumpPin, PUMP_COUNT> = Irrigation::new(&SCHEDULER);
    static LIGHTING: Lighting<'static, AnalogInput, Timer1Pwm> = Lighting::new(&SCHEDULER);
    static MENU: OptionMenu<'static> = OptionMenu::new(&SCHEDULER);
    static ROUTER: Router<'static, 'static> = Router::new(&MENU, &report_water, &report_air);
    static LINK: SerialLink<'static, SERIAL_RX_CAPACITY> = SerialLink::new(&handle_frames);

    // Only the main loop writes to the console. It is taken out of the cell
    // while in use so that output never runs with interrupts masked.
    static CONSOLE: Mutex<RefCell<Option<Console>>> = Mutex::new(RefCell::new(None));
    static BUTTONS: Mutex<RefCell<Option<Buttons>>> = Mutex::new(RefCell::new(None));

    #[derive(uDebug)]
    enum StartupError {
        Peripherals,
        Task(rtos::Error),
        Menu(MenuError),
        Pump,
    }

    impl From<rtos::Error> for StartupError {
        fn from(e: rtos::Error) -> Self {
            StartupError::Task(e)
        }
    }

    impl From<MenuError> for StartupError {
        fn from(e: MenuError) -> Self {
            StartupError::Menu(e)
        }
    }

    fn with_console<R>(f: impl FnOnce(&mut Console) -> R) -> Option<R> {
        let mut console = critical_section::with(|cs| CONSOLE.borrow_ref_mut(cs).take())?;
        let result = f(&mut console);
        critical_section::with(|cs| *CONSOLE.borrow_ref_mut(cs) = Some(console));
        Some(result)
    }

    fn receive(byte: u8) {
        if LINK.receive(byte, &SCHEDULER).is_err() {
            log_warn!("uart: frame dropped, ready queue full");
        }
    }

    fn handle_frames() {
        ROUTER.handle_frames(&LINK);
    }

    fn report_water(level: i32) {
        IRRIGATION.report_water(level);
    }

    fn report_air(value: i32) {
        CLIMATE.report_air(value);
    }

    fn climate_start() {
        CLIMATE.start_conversion();
    }

    fn climate_collect() {
        CLIMATE.collect();
    }

    fn light_update() {
        LIGHTING.update();
    }

    fn light_collect() {
        LIGHTING.collect();
    }

    fn pump0() {
        IRRIGATION.cycle(0);
    }

    fn pump1() {
        IRRIGATION.cycle(1);
    }

    fn menu_input() {
        MENU.handle_input();
    }

    fn menu_redraw() {
        with_console(|console| MENU.render(console));
    }

    fn poll_buttons() {
        let event = critical_section::with(|cs| {
            BUTTONS
                .borrow_ref_mut(cs)
                .as_mut()
                .and_then(|buttons| buttons.poll().ok().flatten())
        });
        if let Some(event) = event {
            ROUTER.button(event);
        }
    }

    fn flush_log() {
        with_console(|console| logger::flush(console).and_then(|_| console.flush()));
    }

    // Positions in `build_menu`
    const LOWER_OPTION: usize = 0;
    const HIGHER_OPTION: usize = 1;

    fn lower_threshold(value: i32) {
        if !CLIMATE.set_lower_threshold(value) {
            log_warn!("menu: lower threshold {} rejected", value);
            MENU.set_value(LOWER_OPTION, CLIMATE.thresholds().0);
        }
    }

    fn higher_threshold(value: i32) {
        if !CLIMATE.set_higher_threshold(value) {
            log_warn!("menu: higher threshold {} rejected", value);
            MENU.set_value(HIGHER_OPTION, CLIMATE.thresholds().1);
        }
    }

    fn temperature_poll(ms: i32) {
        CLIMATE.set_poll_interval(ms);
    }

    fn light_threshold(value: i32) {
        LIGHTING.set_threshold(value);
    }

    fn light_poll(ms: i32) {
        LIGHTING.set_update_interval(ms);
    }

    fn light_manual(on: i32) {
        LIGHTING.set_manual(on != 0);
    }

    fn light_power(on: i32) {
        LIGHTING.manual_power(on != 0);
    }

    fn pump_manual(on: i32) {
        IRRIGATION.set_manual(on != 0);
    }

    fn pump_power(on: i32) {
        IRRIGATION.manual_power(on != 0);
    }

    fn pump_on_time(ms: i32) {
        IRRIGATION.set_on_duration(ms);
    }

    fn pump_off_time(ms: i32) {
        IRRIGATION.set_off_duration(ms);
    }

    fn buzzer_manual(on: i32) {
        CLIMATE.set_buzzer_manual(on != 0);
    }

    fn buzzer_power(on: i32) {
        CLIMATE.buzzer_power(on != 0);
    }

    fn verbose_log(on: i32) {
        logger::set_max_level(if on != 0 { Level::Debug } else { Level::Info });
    }

    const PUMP_TASKS: [TaskRef<'static>; PUMP_COUNT] = [&pump0, &pump1];

    fn register_tasks() -> Result<(), StartupError> {
        let start = TaskBuilder::new(&climate_start)
            .period(TEMPERATURE_POLL_MS)
            .register(&SCHEDULER)?;
        let collect = TaskBuilder::new(&climate_collect)
            .period(CONVERSION_POLL_MS)
            .active(false)
            .register(&SCHEDULER)?;
        CLIMATE.attach_tasks(start, collect);

        let light = TaskBuilder::new(&light_update)
            .period(LIGHT_UPDATE_MS)
            .register(&SCHEDULER)?;
        let light_result = TaskBuilder::new(&light_collect)
            .period(CONVERSION_POLL_MS)
            .active(false)
            .register(&SCHEDULER)?;
        LIGHTING.attach_tasks(light, light_result);

        for (idx, body) in PUMP_TASKS.into_iter().enumerate() {
            let task = TaskBuilder::new(body)
                .period(PUMP_OFF_MS)
                .register(&SCHEDULER)?;
            IRRIGATION.attach_task(idx, task);
        }

        let input = TaskBuilder::new(&menu_input)
            .period(MENU_INPUT_MS)
            .register(&SCHEDULER)?;
        let redraw = TaskBuilder::new(&menu_redraw)
            .period(MENU_REDRAW_MS)
            .register(&SCHEDULER)?;
        MENU.attach_tasks(input, redraw);

        TaskBuilder::new(&poll_buttons)
            .period(BUTTON_POLL_MS)
            .register(&SCHEDULER)?;
        TaskBuilder::new(&flush_log)
            .period(LOG_FLUSH_MS)
            .register(&SCHEDULER)?;
        Ok(())
    }

    fn build_menu() -> Result<(), StartupError> {
        let options = [
            MenuOption::threshold(
                "temp low",
                Threshold::new(TEMPERATURE_LOWER, 0, 50, 1)?,
                &lower_threshold,
            ),
            MenuOption::threshold(
                "temp high",
                Threshold::new(TEMPERATURE_HIGHER, 0, 50, 1)?,
                &higher_threshold,
            ),
            MenuOption::timer("temp poll", "5s", &temperature_poll)?,
            MenuOption::threshold(
                "light limit",
                Threshold::new(LIGHT_THRESHOLD_DEFAULT, MIN_BRIGHTNESS, MAX_BRIGHTNESS, 100)?,
                &light_threshold,
            ),
            MenuOption::timer("light poll", "10s", &light_poll)?,
            MenuOption::switch("light manual", false, &light_manual),
            MenuOption::switch("light power", false, &light_power),
            MenuOption::switch("pump manual", false, &pump_manual),
            MenuOption::switch("pump power", false, &pump_power),
            MenuOption::timer("pump on", "10s", &pump_on_time)?,
            MenuOption::timer("pump off", "1m", &pump_off_time)?,
            MenuOption::switch("buzzer manual", false, &buzzer_manual),
            MenuOption::switch("buzzer power", false, &buzzer_power),
            MenuOption::switch("verbose log", cfg!(feature = "debug"), &verbose_log),
        ];
        for option in options {
            MENU.push_option(option)?;
        }
        Ok(())
    }

    fn setup() -> Result<SystemTimer, StartupError> {
        let dp = Peripherals::take().ok_or(StartupError::Peripherals)?;

        let console = SerialConsole::new(Uart::new(dp.USART0));
        critical_section::with(|cs| *CONSOLE.borrow_ref_mut(cs) = Some(console));
        hal::set_rx_handler(receive);

        let adc = hal::adc::init(dp.ADC);
        let buzzer = match Buzzer::new(board::buzzer()) {
            Ok(buzzer) => buzzer,
            Err(never) => match never {},
        };
        CLIMATE.init(adc.channel(AdcChannel::Adc0), buzzer);

        board::light_output();
        LIGHTING.init(
            adc.channel(AdcChannel::Adc1),
            GrowLight::new(Timer1Pwm::new(dp.TC1)),
        );

        for pin in board::pumps() {
            let pump = match Pump::new(pin) {
                Ok(pump) => pump,
                Err(never) => match never {},
            };
            IRRIGATION.add_pump(pump).map_err(|_| StartupError::Pump)?;
        }

        let buttons = ButtonHandler::new(board::buttons());
        critical_section::with(|cs| *BUTTONS.borrow_ref_mut(cs) = Some(buttons));

        register_tasks()?;
        build_menu()?;

        Ok(SystemTimer::new(dp.TC0))
    }

    #[avr_device::entry]
    fn main() -> ! {
        let mut timer = match setup() {
            Ok(timer) => timer,
            Err(e) => {
                log_error!("startup failed: {:?}", e);
                flush_log();
                panic!();
            }
        };

        timer.start();
        unsafe { avr_device::interrupt::enable() };
        log_info!("greenhouse v{}", env!("CARGO_PKG_VERSION"));

        let mut power = Power::new();
        os::run(&SCHEDULER, || power.enter_idle_mode())
    }
}

#[cfg(not(target_arch = "avr"))]
mod host {
    //! Runs the scheduler against a simulated tick source and prints the log.

    use core::convert::Infallible;

    use ufmt::uWrite;

    use greenhouse_firmware::config::{LOG_FLUSH_MS, TICK_MS};
    use greenhouse_firmware::os::{self, CLOCK, SCHEDULER};
    use greenhouse_firmware::rtos::TaskBuilder;
    use greenhouse_firmware::{log_error, log_info, logger};

    const SIMULATED_MS: i32 = 10_000;

    struct Stdout;

    impl uWrite for Stdout {
        type Error = Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            print!("{}", s);
            Ok(())
        }
    }

    fn fast_blink() {
        log_info!("blink 1000ms at {}", os::uptime_ms());
    }

    fn slow_blink() {
        log_info!("blink 2000ms at {}", os::uptime_ms());
    }

    fn flush_log() {
        let _ = logger::flush(&mut Stdout);
    }

    pub fn simulate() {
        let tasks = [
            TaskBuilder::new(&fast_blink).period(1000),
            TaskBuilder::new(&slow_blink).period(2000),
            TaskBuilder::new(&flush_log).period(LOG_FLUSH_MS),
        ];
        for task in tasks {
            if let Err(e) = task.register(&SCHEDULER) {
                log_error!("register failed: {:?}", e);
            }
        }

        for _ in 0..SIMULATED_MS / TICK_MS {
            CLOCK.advance(TICK_MS as u32);
            SCHEDULER.tick(TICK_MS);
            os::step(&SCHEDULER, || {});
        }
        flush_log();

        let stats = SCHEDULER.stats();
        println!(
            "ticks {} enqueued {} dispatched {} dropped {}",
            stats.ticks, stats.enqueued, stats.dispatched, stats.dropped
        );
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    host::simulate();
}
