#![no_std]
#![no_main]

use core::cell::RefCell;

use embedded_storage::{ReadStorage, Storage};
use esp32c3_hal::{
    adc::{AdcConfig, Attenuation, ADC, ADC1},
    clock::{ClockControl, Clocks},
    gpio::{AnyPin, Output, PushPull},
    ledc::{self, timer, LSGlobalClkSource, LowSpeed, LEDC},
    peripherals::Peripherals,
    prelude::*,
    Delay, UsbSerialJtag, IO,
};
use esp_backtrace as _;
use esp_storage::FlashStorage;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use xyplot_control::Plotter;
use xyplot_geom::XY;
use xyplot_motion::{AnalogLimit, MachineConfig, MotionController, Pen, StepDir};

use analog::{Adc1, Knob, LimitChannel};
use serial::UsbHost;
use servo::Servo;

mod analog;
mod serial;
mod servo;

macro_rules! singleton {
    ($val:expr, $T:ty) => {{
        static STATIC_CELL: ::static_cell::StaticCell<$T> = ::static_cell::StaticCell::new();
        STATIC_CELL.init($val)
    }};
}

pub type AnyOutput = AnyPin<Output<PushPull>>;

const FLASH_ADDR: u32 = 0x110000;
const FLASH_MAGIC: &[u8; 4] = b"xypl";

/// The bits of calibration that survive a reboot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct FlashData {
    pen_down_angle: u8,
}

impl FlashData {
    fn load() -> Option<FlashData> {
        let mut buf = [0u8; 64];
        let mut flash = FlashStorage::new();
        if let Err(e) = flash.read(FLASH_ADDR, &mut buf) {
            warn!("failed to read flash: {e:?}");
            return None;
        }

        if &buf[0..4] == FLASH_MAGIC {
            postcard::from_bytes(&buf[4..]).ok()
        } else {
            None
        }
    }

    fn save(&self) {
        let mut buf = [0u8; 64];
        buf[0..4].copy_from_slice(FLASH_MAGIC);
        if postcard::to_slice(self, &mut buf[4..]).is_err() {
            warn!("failed to serialize {self:?}");
            return;
        }
        let mut flash = FlashStorage::new();
        if let Err(e) = flash.write(FLASH_ADDR, &buf) {
            warn!("failed to write flash: {e:?}");
        }
    }
}

#[entry]
fn main() -> ! {
    let peripherals = Peripherals::take();
    let system = peripherals.SYSTEM.split();
    let clocks: &'static Clocks = singleton!(
        ClockControl::max(system.clock_control).freeze(),
        Clocks<'static>
    );
    esp_println::logger::init_logger(log::LevelFilter::Info);

    let mut config = MachineConfig::default();
    let mut stored = FlashData::load();
    if let Some(data) = stored {
        info!("restored pen angle {} from flash", data.pen_down_angle);
        config.pen_down_angle = data.pen_down_angle;
    }

    let io = IO::new(peripherals.GPIO, peripherals.IO_MUX);

    let stepper = |step: AnyOutput, dir: AnyOutput, enable: AnyOutput, inverted| {
        StepDir::new(step, dir, enable, Delay::new(clocks), config.step_delay_ms, inverted)
    };
    let x_axis = stepper(
        io.pins.gpio3.into_push_pull_output().into(),
        io.pins.gpio4.into_push_pull_output().into(),
        io.pins.gpio5.into_push_pull_output().into(),
        config.invert_x,
    );
    let y_axis = stepper(
        io.pins.gpio6.into_push_pull_output().into(),
        io.pins.gpio7.into_push_pull_output().into(),
        io.pins.gpio8.into_push_pull_output().into(),
        config.invert_y,
    );

    let analog = peripherals.APB_SARADC.split();
    let mut adc_config = AdcConfig::new();
    let x_limit_pin = adc_config.enable_pin(io.pins.gpio0.into_analog(), Attenuation::Attenuation11dB);
    let y_limit_pin = adc_config.enable_pin(io.pins.gpio1.into_analog(), Attenuation::Attenuation11dB);
    let knob_pin = adc_config.enable_pin(io.pins.gpio2.into_analog(), Attenuation::Attenuation11dB);
    let adc = singleton!(
        RefCell::new(ADC::<ADC1>::new(analog.adc1, adc_config)),
        RefCell<Adc1>
    );
    let limits = XY::new(
        AnalogLimit::new(LimitChannel::X(adc, x_limit_pin), config.thresholds()),
        AnalogLimit::new(LimitChannel::Y(adc, y_limit_pin), config.thresholds()),
    );
    let knob = Knob::new(adc, knob_pin, io.pins.gpio9.into_pull_up_input());

    let ledc = singleton!(LEDC::new(peripherals.LEDC, clocks), LEDC<'static>);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
    let lstimer0 = singleton!(
        ledc.get_timer::<LowSpeed>(timer::Number::Timer2),
        ledc::timer::Timer<LowSpeed>
    );
    if let Err(e) = lstimer0.configure(timer::config::Config {
        duty: timer::config::Duty::Duty14Bit,
        clock_source: timer::LSClockSource::APBClk,
        frequency: 50u32.Hz(),
    }) {
        panic!("servo timer: {e:?}");
    }
    let mut servo_channel = ledc.get_channel::<LowSpeed, _>(
        ledc::channel::Number::Channel0,
        io.pins.gpio10.into_push_pull_output(),
    );
    if let Err(e) = servo_channel.configure(ledc::channel::config::Config {
        timer: lstimer0,
        duty_pct: 4,
        pin_config: ledc::channel::config::PinConfig::PushPull,
    }) {
        panic!("servo channel: {e:?}");
    }
    let pen = Pen::new(
        Servo::new(servo_channel),
        Delay::new(clocks),
        config.servo_delay_ms,
        config.pen_up_angle,
        config.pen_down_angle,
    );

    let machine = MotionController::new(
        XY::new(x_axis, y_axis),
        limits,
        pen,
        Delay::new(clocks),
        &config,
    );
    let host = UsbHost::new(
        UsbSerialJtag::new(peripherals.USB_DEVICE),
        Delay::new(clocks),
        config.ready_interval_ms,
    );

    let mut plotter = Plotter::new(host, knob, machine);
    loop {
        plotter.run_session();

        let data = FlashData {
            pen_down_angle: plotter.machine().tool().low_angle(),
        };
        if stored != Some(data) {
            info!("saving pen angle {}", data.pen_down_angle);
            data.save();
            stored = Some(data);
        }
    }
}
