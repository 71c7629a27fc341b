use esp32c3_hal::{
    gpio::{GpioPin, Output, PushPull},
    ledc::{
        channel::{Channel, ChannelHW as _},
        LowSpeed,
    },
};
use xyplot_motion::ServoOutput;

pub type ServoChannel = Channel<'static, LowSpeed, GpioPin<Output<PushPull>, 10>>;

/// The pen-lift servo, on a 50Hz LEDC channel with 14-bit duty.
pub struct Servo {
    channel: ServoChannel,
}

impl Servo {
    pub fn new(channel: ServoChannel) -> Self {
        Self { channel }
    }

    // 0 degrees is 4% duty; 180 degrees is 12% duty.
    pub fn duty_for_angle(deg: u8) -> u16 {
        let duty_exp = 14;
        let duty_range: u32 = 1 << duty_exp;
        (4 * duty_range / 100 + deg.min(180) as u32 * 8 * duty_range / (100 * 180)) as u16
    }
}

impl ServoOutput for Servo {
    // The pen driver already ramps one degree at a time, so there's no need
    // for the hardware fade here.
    fn write_angle(&mut self, degrees: u8) {
        self.channel.set_duty_hw(Self::duty_for_angle(degrees) as u32);
    }
}
