use core::fmt::{self, Write as _};

use embedded_hal::blocking::delay::DelayMs as _;
use esp32c3_hal::{Delay, UsbSerialJtag};
use xyplot_control::HostLink;

/// The host connection, over the chip's built-in USB serial port.
pub struct UsbHost {
    serial: UsbSerialJtag<'static>,
    delay: Delay,
    // How long to wait for a byte before giving up.
    timeout_ms: u32,
}

impl UsbHost {
    pub fn new(serial: UsbSerialJtag<'static>, delay: Delay, timeout_ms: u32) -> Self {
        Self {
            serial,
            delay,
            timeout_ms,
        }
    }
}

impl HostLink for UsbHost {
    fn poll_byte(&mut self) -> Option<u8> {
        for _ in 0..self.timeout_ms.max(1) {
            if let Ok(b) = self.serial.read_byte() {
                return Some(b);
            }
            self.delay.delay_ms(1u32);
        }
        None
    }

    fn send_line(&mut self, line: fmt::Arguments<'_>) {
        // If the host isn't listening, there's nobody to tell.
        let _ = self.serial.write_fmt(line);
        let _ = self.serial.write_str("\n");
    }
}
