use core::cell::RefCell;

use embedded_hal::{adc::OneShot, digital::v2::InputPin};
use esp32c3_hal::{
    adc::{AdcPin, ADC, ADC1},
    gpio::{Analog, GpioPin, Input, PullUp},
};
use xyplot_control::CalibrationInput;
use xyplot_motion::AnalogChannel;

pub type Adc1 = ADC<'static, ADC1>;
pub type LimitPinX = AdcPin<GpioPin<Analog, 0>, ADC1>;
pub type LimitPinY = AdcPin<GpioPin<Analog, 1>, ADC1>;
pub type KnobPin = AdcPin<GpioPin<Analog, 2>, ADC1>;
pub type ButtonPin = GpioPin<Input<PullUp>, 9>;

// The ADC is 12 bits, but everything upstream works in 10.
fn to_10_bits(raw: u16) -> u16 {
    raw >> 2
}

/// The resistor ladder that the limit switches for one axis pull on.
pub enum LimitChannel {
    X(&'static RefCell<Adc1>, LimitPinX),
    Y(&'static RefCell<Adc1>, LimitPinY),
}

impl AnalogChannel for LimitChannel {
    fn read_raw(&mut self) -> u16 {
        // A failed read looks like an open switch.
        let raw: u16 = match self {
            LimitChannel::X(adc, pin) => nb::block!(adc.borrow_mut().read(pin)).unwrap_or(0),
            LimitChannel::Y(adc, pin) => nb::block!(adc.borrow_mut().read(pin)).unwrap_or(0),
        };
        to_10_bits(raw)
    }
}

/// The pen-pressure knob, and the button that accepts its setting.
pub struct Knob {
    adc: &'static RefCell<Adc1>,
    pin: KnobPin,
    button: ButtonPin,
}

impl Knob {
    pub fn new(adc: &'static RefCell<Adc1>, pin: KnobPin, button: ButtonPin) -> Self {
        Self { adc, pin, button }
    }
}

impl CalibrationInput for Knob {
    fn read_level(&mut self) -> u16 {
        let raw: u16 = nb::block!(self.adc.borrow_mut().read(&mut self.pin)).unwrap_or(0);
        to_10_bits(raw)
    }

    fn confirmed(&mut self) -> bool {
        self.button.is_low().unwrap_or(false)
    }
}
