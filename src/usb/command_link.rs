//! USB CDC-ACM command link.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes one serial port. Text lines received on it are
//! translated into menu inputs (`up`, `down`, `confirm`).

use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;
use waterbot::config;
use waterbot::input::remote::LineAssembler;
use waterbot::input::InputQueue;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

static CDC_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Build result containing the USB device runner and the serial class.
pub struct UsbCommandLink {
    pub device: UsbDevice<'static, UsbDriver>,
    pub serial: CdcAcmClass<'static, UsbDriver>,
}

/// Initialise the USB stack and create the CDC-ACM device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbCommandLink {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        USB_CONFIG_DESC.init([0u8; 256]),
        USB_BOS_DESC.init([0u8; 256]),
        USB_MSOS_DESC.init([0u8; 256]),
        USB_CTRL_BUF.init([0u8; 64]),
    );

    let serial = CdcAcmClass::new(
        &mut builder,
        CDC_STATE.init(State::new()),
        config::USB_CDC_PACKET_SIZE,
    );
    let device = builder.build();

    info!("USB CDC-ACM command link initialised");

    UsbCommandLink { device, serial }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Read command lines from the host and queue the recognised ones.
pub async fn command_task(
    mut serial: CdcAcmClass<'static, UsbDriver>,
    queue: &InputQueue<CriticalSectionRawMutex>,
) -> ! {
    let mut assembler: LineAssembler = LineAssembler::new();
    let mut buf = [0u8; config::USB_CDC_PACKET_SIZE as usize];

    loop {
        serial.wait_connection().await;
        info!("Command link: host connected");

        loop {
            match serial.read_packet(&mut buf).await {
                Ok(n) => {
                    assembler.feed(&buf[..n], queue);
                }
                Err(EndpointError::BufferOverflow) => warn!("Command link: packet too large"),
                Err(EndpointError::Disabled) => break,
            }
        }

        // Drop any half-received line.
        assembler = LineAssembler::new();
        info!("Command link: host disconnected");
    }
}
