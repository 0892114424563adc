//! waterbot - autonomous plant-watering controller firmware for nRF52840.
//!
//! Task layout:
//!   - watering : periodic soil checks, sprays until the goal is reached
//!   - actuator : owns the sprayer servo, one motion per request
//!   - ui       : drains the input queue into the menu, drives the OLED
//!   - buttons  : UP / CONFIRM / DOWN feed the queue, SLEEP toggles power
//!   - usb      : CDC-ACM command link feeding the same queue

#![no_std]
#![no_main]

mod hw;
mod usb;

use defmt::{info, unwrap, warn};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Pin};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::peripherals::{PWM0, TWISPI0};
use embassy_nrf::pwm::SimplePwm;
use embassy_nrf::saadc::{self, ChannelConfig, Saadc};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use static_cell::StaticCell;
use waterbot::actuation::{run_actuator, SprayMotion, SprayTrigger};
use waterbot::config::ControllerConfig;
use waterbot::context::Context;
use waterbot::input::{InputQueue, MenuInput};
use waterbot::menu::{ControllerLine, Menu};
use waterbot::power::{DisplayPolicy, IoGate};
use waterbot::ui::{run_ui, Ui};
use {defmt_rtt as _, panic_probe as _};

use hw::clock::EmbassyClock;
use hw::display::OledSink;
use hw::flash::FlashStore;
use hw::servo::PwmServo;
use hw::soil::SaadcProbe;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

type Probe = SaadcProbe<'static>;
type Store = FlashStore<BlockingAsync<Nvmc<'static>>>;
type Ctx = Context<'static, CriticalSectionRawMutex, Probe, Store, EmbassyClock>;
type Oled = OledSink<Twim<'static, TWISPI0>>;

type Queue = InputQueue<CriticalSectionRawMutex>;
type Sprayer = SprayTrigger<CriticalSectionRawMutex>;

static INPUT_QUEUE: StaticCell<Queue> = StaticCell::new();
static SPRAYER: StaticCell<Sprayer> = StaticCell::new();
static IO_GATE: StaticCell<IoGate> = StaticCell::new();
static CONTEXT: StaticCell<Ctx> = StaticCell::new();

const CONFIG: ControllerConfig = ControllerConfig::reference();

// ═══════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::task]
async fn watering_task(ctx: &'static Ctx) -> ! {
    ctx.run_watering().await
}

#[embassy_executor::task]
async fn actuator_task(sprayer: &'static Sprayer, servo: PwmServo<'static, PWM0>) -> ! {
    run_actuator(sprayer, servo, SprayMotion::default(), EmbassyClock).await
}

#[embassy_executor::task]
async fn ui_task(
    queue: &'static Queue,
    gate: &'static IoGate,
    ui: Ui<ControllerLine>,
    ctx: &'static Ctx,
    sink: Oled,
) -> ! {
    run_ui(queue, ui, ctx, Ctx::revision, gate, sink, EmbassyClock).await
}

#[embassy_executor::task(pool_size = 3)]
async fn menu_button_task(
    pin: AnyPin,
    symbol: MenuInput,
    queue: &'static Queue,
    gate: &'static IoGate,
) -> ! {
    hw::buttons::menu_button(pin, symbol, CONFIG.debounce_ms, queue, gate).await
}

#[embassy_executor::task]
async fn sleep_button_task(pin: AnyPin, gate: &'static IoGate) -> ! {
    hw::buttons::sleep_button(pin, CONFIG.debounce_ms, gate).await
}

#[embassy_executor::task]
async fn usb_device_task(device: embassy_usb::UsbDevice<'static, usb::command_link::UsbDriver>) -> ! {
    usb::command_link::run_usb_device(device).await
}

#[embassy_executor::task]
async fn usb_command_task(
    serial: embassy_usb::class::cdc_acm::CdcAcmClass<'static, usb::command_link::UsbDriver>,
    queue: &'static Queue,
) -> ! {
    usb::command_link::command_task(serial, queue).await
}

// ═══════════════════════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("=== waterbot starting ===");

    if let Err(e) = CONFIG.validate() {
        defmt::panic!("invalid controller configuration: {}", e);
    }

    let p = embassy_nrf::init(Default::default());

    let queue: &'static Queue = INPUT_QUEUE.init(InputQueue::new());
    let sprayer: &'static Sprayer = SPRAYER.init(SprayTrigger::new());
    let gate: &'static IoGate = IO_GATE.init(IoGate::new(DisplayPolicy::from_config()));

    // Soil probe on AIN0 (P0.02)
    let channel = ChannelConfig::single_ended(p.P0_02);
    let saadc = Saadc::new(p.SAADC, Irqs, saadc::Config::default(), [channel]);
    let probe = SaadcProbe::new(saadc).await;

    // Sprayer servo on P0.13
    let pwm = SimplePwm::new_1ch(p.PWM0, p.P0_13);
    let servo = unwrap!(PwmServo::new(pwm));

    // OLED on I²C (SDA P0.26, SCL P0.27)
    let twim = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim::Config::default());
    let sink = OledSink::new(hw::display::init(twim));

    // Settings in internal flash
    let store = FlashStore::new(BlockingAsync::new(Nvmc::new(p.NVMC)));

    let ctx: &'static Ctx = CONTEXT.init(Context::new(
        &CONFIG,
        probe,
        store,
        sprayer,
        EmbassyClock,
    ));
    match ctx.load_settings().await {
        Ok(s) => info!(
            "Settings: goal {}, every {} min",
            s.desired_reading, s.check_interval_mins
        ),
        Err(e) => warn!("Settings not loaded, using defaults: {}", e),
    }

    let ui = Ui::new(unwrap!(Menu::new(ControllerLine::ALL)));

    let link = usb::command_link::init(p.USBD);

    unwrap!(spawner.spawn(actuator_task(sprayer, servo)));
    unwrap!(spawner.spawn(watering_task(ctx)));
    unwrap!(spawner.spawn(ui_task(queue, gate, ui, ctx, sink)));
    unwrap!(spawner.spawn(menu_button_task(p.P0_11.degrade(), MenuInput::Up, queue, gate)));
    unwrap!(spawner.spawn(menu_button_task(p.P0_12.degrade(), MenuInput::Confirm, queue, gate)));
    unwrap!(spawner.spawn(menu_button_task(p.P0_24.degrade(), MenuInput::Down, queue, gate)));
    unwrap!(spawner.spawn(sleep_button_task(p.P0_25.degrade(), gate)));
    unwrap!(spawner.spawn(usb_device_task(link.device)));
    unwrap!(spawner.spawn(usb_command_task(link.serial, queue)));

    info!("All tasks spawned");
}
