//! Soil probe on SAADC channel 0.
//!
//! Raw counts are mapped onto 0..=100 between the dry and wet calibration
//! points, so wetter soil reads higher regardless of the probe's own
//! direction.

use defmt::trace;
use embassy_nrf::saadc::Saadc;
use waterbot::config::{SOIL_RAW_DRY, SOIL_RAW_WET};
use waterbot::error::Error;
use waterbot::sensor::SoilSensor;

/// Counts this far outside the calibration span mean a broken probe.
const FAULT_MARGIN: i32 = 400;

pub struct SaadcProbe<'d> {
    saadc: Saadc<'d, 1>,
}

impl<'d> SaadcProbe<'d> {
    pub async fn new(saadc: Saadc<'d, 1>) -> Self {
        saadc.calibrate().await;
        Self { saadc }
    }
}

fn scale(raw: i16) -> Result<u16, Error> {
    let (dry, wet) = (SOIL_RAW_DRY as i32, SOIL_RAW_WET as i32);
    let raw = raw as i32;
    let (lo, hi) = (dry.min(wet), dry.max(wet));
    if raw < lo - FAULT_MARGIN || raw > hi + FAULT_MARGIN {
        return Err(Error::Sensor);
    }
    let wetness = (raw - dry) * 100 / (wet - dry);
    Ok(wetness.clamp(0, 100) as u16)
}

impl SoilSensor for SaadcProbe<'_> {
    async fn read_raw(&mut self) -> Result<u16, Error> {
        let mut buf = [0i16; 1];
        self.saadc.sample(&mut buf).await;
        trace!("SAADC raw {}", buf[0]);
        scale(buf[0])
    }
}
