//! Sprayer servo on a PWM channel.
//!
//! The PWM runs at 125 kHz (prescaler /128) with a top of 2500 counts,
//! giving the 20 ms frame a hobby servo expects; one count is 8 µs.

use embassy_nrf::pwm::{Instance, Prescaler, SimplePwm};
use waterbot::actuation::Servo;
use waterbot::config::{SERVO_MAX_PULSE_US, SERVO_MIN_PULSE_US, SERVO_NEUTRAL_DEG};
use waterbot::error::Error;

const PWM_TOP: u16 = 2500;
const US_PER_COUNT: u32 = 8;
const MAX_DEG: u8 = 180;

pub struct PwmServo<'d, T: Instance> {
    pwm: SimplePwm<'d, T>,
    position: u8,
}

impl<'d, T: Instance> PwmServo<'d, T> {
    /// Configure the PWM and park the arm at neutral.
    pub fn new(mut pwm: SimplePwm<'d, T>) -> Result<Self, Error> {
        pwm.set_prescaler(Prescaler::Div128);
        pwm.set_max_duty(PWM_TOP);
        let mut servo = Self { pwm, position: 0 };
        servo.set_position(SERVO_NEUTRAL_DEG)?;
        Ok(servo)
    }
}

fn pulse_counts(degrees: u8) -> u16 {
    let span = SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US;
    let us = SERVO_MIN_PULSE_US + span * degrees as u32 / MAX_DEG as u32;
    (us / US_PER_COUNT) as u16
}

impl<T: Instance> Servo for PwmServo<'_, T> {
    fn set_position(&mut self, degrees: u8) -> Result<(), Error> {
        if degrees > MAX_DEG {
            return Err(Error::Actuator);
        }
        // The nRF PWM counts the idle level first; invert to get a high pulse.
        self.pwm.set_duty(0, PWM_TOP - pulse_counts(degrees));
        self.position = degrees;
        Ok(())
    }

    fn position(&self) -> u8 {
        self.position
    }
}
