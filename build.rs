use std::env;

fn main() {
    let target = env::var("TARGET").unwrap_or_default();

    // Host builds (tests, simulation) need nothing from here
    if !target.contains("avr") {
        return;
    }

    // Configure for ATmega128
    println!("cargo:rustc-link-arg=-mmcu=atmega128");

    // Pass CPU frequency for timing calculations
    println!("cargo:rustc-env=MCU_FREQ_HZ=16000000");

    println!("cargo:rerun-if-changed=build.rs");
}
