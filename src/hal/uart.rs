use core::cell::Cell;
use core::convert::Infallible;

use avr_device::atmega128a::USART0;
use critical_section::Mutex;
use embedded_hal::serial;

use crate::config::{CPU_FREQ_HZ, UART_BAUD};

// 103 at 9600 baud from 16MHz
const UBRR: u16 = (CPU_FREQ_HZ / (16 * UART_BAUD) - 1) as u16;

const RXC: u8 = 1 << 7;
const TXC: u8 = 1 << 6;
const UDRE: u8 = 1 << 5;
const RXCIE: u8 = 1 << 7;
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;
// 8 data bits, no parity, 1 stop bit
const UCSZ_8BIT: u8 = 0x06;

static RX_HANDLER: Mutex<Cell<Option<fn(u8)>>> = Mutex::new(Cell::new(None));

/// Receive interrupt callback. Runs with interrupts disabled.
pub fn set_rx_handler(handler: fn(u8)) {
    critical_section::with(|cs| RX_HANDLER.borrow(cs).set(Some(handler)));
}

/// USART0 at `UART_BAUD`, 8N1. Transmission polls the data register;
/// reception is interrupt driven.
pub struct Uart {
    _usart: USART0,
}

impl Uart {
    pub fn new(usart: USART0) -> Self {
        unsafe {
            let p = USART0::ptr();
            (*p).ubrr0h.write(|w| w.bits((UBRR >> 8) as u8));
            (*p).ubrr0l.write(|w| w.bits(UBRR as u8));
            (*p).ucsr0c.write(|w| w.bits(UCSZ_8BIT));
            (*p).ucsr0b.write(|w| w.bits(RXEN | TXEN | RXCIE));
        }
        Self { _usart: usart }
    }
}

impl serial::Write<u8> for Uart {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        unsafe {
            let p = USART0::ptr();
            if (*p).ucsr0a.read().bits() & UDRE == 0 {
                return Err(nb::Error::WouldBlock);
            }
            // Clear TXC so flush can tell when this byte is out
            (*p).ucsr0a.modify(|r, w| w.bits(r.bits() | TXC));
            (*p).udr0.write(|w| w.bits(byte));
        }
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        unsafe {
            let status = (*USART0::ptr()).ucsr0a.read().bits();
            if status & UDRE != 0 && status & TXC != 0 {
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }
}

#[avr_device::interrupt(atmega128a)]
fn USART0_RX() {
    let byte = unsafe {
        let p = USART0::ptr();
        if (*p).ucsr0a.read().bits() & RXC == 0 {
            return;
        }
        (*p).udr0.read().bits()
    };
    let handler = critical_section::with(|cs| RX_HANDLER.borrow(cs).get());
    if let Some(handler) = handler {
        handler(byte);
    }
}
