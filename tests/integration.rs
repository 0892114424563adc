//! End-to-end tests for the waterbot control core, wired the way the
//! firmware wires it but on simulated peripherals.

use embassy_futures::block_on;
use embassy_futures::select::{select, select3, Either, Either3};
use core::cell::Cell;

use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use waterbot::actuation::{run_actuator, SprayMotion, SprayTrigger};
use waterbot::config::{ControllerConfig, DEFAULT_MAX_SPRAYS_PER_CHECK, OVERDUE_POLL_MS};
use waterbot::context::{Context, WateringOutcome};
use waterbot::input::remote::LineAssembler;
use waterbot::input::{InputQueue, MenuInput};
use waterbot::menu::{ControllerLine, Menu};
use waterbot::power::{DisplayPolicy, IoGate};
use waterbot::sim::{SimClock, SimDisplay, SimPlant, SimProbe, SimStore};
use waterbot::time::Timebase;
use waterbot::ui::Ui;

type Ctx<'a> = Context<'a, NoopRawMutex, SimProbe<'a>, &'a SimStore, &'a SimClock>;

fn controller_ui() -> Ui<ControllerLine> {
    Ui::new(Menu::new(ControllerLine::ALL).unwrap())
}

/// Drain the queue into the UI and redraw, as one pass of the UI task.
fn pump(
    queue: &InputQueue<NoopRawMutex>,
    ui: &mut Ui<ControllerLine>,
    ctx: &Ctx<'_>,
    gate: &IoGate,
    display: &mut SimDisplay,
    now_ms: u64,
) {
    while let Some(input) = queue.try_pop() {
        block_on(ui.handle(input, ctx, gate, now_ms));
    }
    block_on(ui.render(ctx, ctx.revision(), gate, display, now_ms)).unwrap();
}

#[test]
fn remote_commands_edit_and_persist_goal() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(40, 0),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        SimClock::new(),
    );
    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
    let queue = InputQueue::<NoopRawMutex>::new();
    let gate = IoGate::new(DisplayPolicy { auto_off_secs: None });
    let mut display = SimDisplay::new();
    let mut ui = controller_ui();

    pump(&queue, &mut ui, &ctx, &gate, &mut display, 0);
    assert_eq!(display.row(0), Some(">Goal: 25"));

    let mut link: LineAssembler = LineAssembler::new();
    assert_eq!(link.feed(b"confirm\r\nup\nUP\n", &queue), 3);
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 10);
    assert_eq!(display.row(0), Some("#Goal: 27"));
    assert_eq!(store.writes(), 0);

    // Split across two packets.
    assert_eq!(link.feed(b"conf", &queue), 0);
    assert_eq!(link.feed(b"irm\n", &queue), 1);
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 20);

    assert_eq!(display.row(0), Some(">Goal: 27"));
    assert_eq!(block_on(ctx.snapshot()).unwrap().desired_reading, 27);
    assert_eq!(store.writes(), 2);
}

#[test]
fn unknown_remote_lines_are_ignored() {
    let queue = InputQueue::<NoopRawMutex>::new();
    let mut link: LineAssembler = LineAssembler::new();

    assert_eq!(link.feed(b"water now\nsideways\n\n", &queue), 0);
    assert!(queue.is_empty());
    assert_eq!(link.feed(b"down\n", &queue), 1);
    assert_eq!(queue.try_pop(), Some(MenuInput::Down));
}

#[test]
fn settings_survive_restart() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(40, 0),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        SimClock::new(),
    );

    {
        let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
        let queue = InputQueue::<NoopRawMutex>::new();
        let gate = IoGate::new(DisplayPolicy { auto_off_secs: None });
        let mut display = SimDisplay::new();
        let mut ui = controller_ui();
        pump(&queue, &mut ui, &ctx, &gate, &mut display, 0);

        // Down to the interval line, edit it up by three minutes.
        for input in [
            MenuInput::Down,
            MenuInput::Confirm,
            MenuInput::Up,
            MenuInput::Up,
            MenuInput::Up,
            MenuInput::Confirm,
        ] {
            assert!(queue.push(input));
        }
        pump(&queue, &mut ui, &ctx, &gate, &mut display, 10);
        assert_eq!(block_on(ctx.snapshot()).unwrap().check_interval_mins, 103);
    }

    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
    let loaded = block_on(ctx.load_settings()).unwrap();
    assert_eq!(loaded.check_interval_mins, 103);
    assert_eq!(loaded.desired_reading, 25);
    assert_eq!(block_on(ctx.snapshot()).unwrap().check_interval_mins, 103);
}

#[test]
fn dormant_mode_masks_inputs_and_blanks_display() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(40, 0),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        SimClock::new(),
    );
    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
    let queue = InputQueue::<NoopRawMutex>::new();
    let gate = IoGate::new(DisplayPolicy { auto_off_secs: None });
    let mut display = SimDisplay::new();
    let mut ui = controller_ui();
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 0);

    gate.toggle(1_000);
    queue.push(MenuInput::Confirm);
    queue.push(MenuInput::Up);
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 1_000);

    assert!(display.is_blank());
    assert!(!ui.is_display_on());
    assert_eq!(block_on(ctx.snapshot()).unwrap().desired_reading, 25);

    gate.toggle(2_000);
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 2_000);
    assert!(!display.is_blank());
    assert_eq!(display.row(0), Some(">Goal: 25"));
}

#[test]
fn idle_display_wakes_on_first_input_only() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(40, 0),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        SimClock::new(),
    );
    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
    let queue = InputQueue::<NoopRawMutex>::new();
    let gate = IoGate::new(DisplayPolicy {
        auto_off_secs: Some(120),
    });
    let mut display = SimDisplay::new();
    let mut ui = controller_ui();
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 0);

    pump(&queue, &mut ui, &ctx, &gate, &mut display, 120_000);
    assert!(display.is_blank());

    queue.push(MenuInput::Down);
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 130_000);
    assert!(!display.is_blank());
    assert_eq!(ui.menu().hover_index(), 0);

    queue.push(MenuInput::Down);
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 131_000);
    assert_eq!(ui.menu().hover_index(), 1);
    assert_eq!(display.row(0), Some(">Every: 100 min"));
}

#[test]
fn watering_task_tops_up_overdue_plant() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(10, 5),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        SimClock::new(),
    );
    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);

    let watcher = async {
        while plant.moisture() < 25 {
            yield_now().await;
        }
    };
    let actuator = run_actuator(&trigger, plant.sprayer(), SprayMotion::default(), &clock);

    match block_on(select3(ctx.run_watering(), actuator, watcher)) {
        Either3::Third(()) => {}
        _ => unreachable!(),
    }
    assert_eq!(plant.sprays(), 3);
    assert!(!block_on(ctx.is_check_overdue()));
}

#[test]
fn sensor_fault_stops_watering_and_marks_reading_stale() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(10, 5),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        SimClock::new(),
    );
    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
    plant.set_sensor_fault(true);

    let actuator = run_actuator(&trigger, plant.sprayer(), SprayMotion::default(), &clock);
    let report = match block_on(select(ctx.water_until_satisfied(), actuator)) {
        Either::First(report) => report,
        Either::Second(_) => unreachable!(),
    };

    assert_eq!(report.sprays, 0);
    assert!(matches!(report.outcome, WateringOutcome::Aborted(_)));
    assert_eq!(plant.sprays(), 0);
    assert!(!block_on(ctx.is_check_overdue()));

    let queue = InputQueue::<NoopRawMutex>::new();
    let gate = IoGate::new(DisplayPolicy { auto_off_secs: None });
    let mut display = SimDisplay::new();
    let mut ui = controller_ui();
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 0);
    queue.push(MenuInput::Down);
    queue.push(MenuInput::Down);
    pump(&queue, &mut ui, &ctx, &gate, &mut display, 0);
    // Never read successfully, so the boot value is shown.
    assert_eq!(display.row(0), Some(">Soil: 0 stale"));
}

#[test]
fn empty_reservoir_stops_at_spray_cap() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(10, 5),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        SimClock::new(),
    );
    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
    plant.set_gain(0);

    let water = || {
        let actuator = run_actuator(&trigger, plant.sprayer(), SprayMotion::default(), &clock);
        match block_on(select(ctx.water_until_satisfied(), actuator)) {
            Either::First(report) => report,
            Either::Second(_) => unreachable!(),
        }
    };

    let report = water();
    assert_eq!(report.outcome, WateringOutcome::SprayCapReached);
    assert_eq!(report.sprays, DEFAULT_MAX_SPRAYS_PER_CHECK);
    assert_eq!(plant.moisture(), 10);
    assert!(block_on(ctx.is_below_desired()));

    // Refilled: the next check tops the plant up.
    plant.set_gain(5);
    let report = water();
    assert_eq!(report.outcome, WateringOutcome::Satisfied);
    assert_eq!(report.sprays, 3);
    assert_eq!(plant.sprays(), DEFAULT_MAX_SPRAYS_PER_CHECK + 3);
}

/// Clock that only moves when told to; sleeps wait for it.
struct ManualClock {
    now_ms: Cell<u64>,
}

impl Timebase for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    async fn sleep_ms(&self, ms: u64) {
        let deadline = self.now_ms.get() + ms;
        while self.now_ms.get() < deadline {
            yield_now().await;
        }
    }
}

#[test]
fn check_now_wakes_watering_task() {
    let config = ControllerConfig::reference();
    let (plant, store, trigger, clock) = (
        SimPlant::new(40, 0),
        SimStore::new(),
        SprayTrigger::<NoopRawMutex>::new(),
        ManualClock { now_ms: Cell::new(0) },
    );
    let ctx = Context::new(&config, plant.probe(), &store, &trigger, &clock);
    block_on(ctx.check(true));
    assert_eq!(plant.reads(), 1);

    let operator = async {
        // Let the watering task settle into its idle wait.
        for _ in 0..10 {
            yield_now().await;
        }
        assert_eq!(plant.reads(), 1);

        let mut menu: Menu<ControllerLine> = Menu::new(ControllerLine::ALL).unwrap();
        for input in [
            MenuInput::Up,
            MenuInput::Up,
            MenuInput::Up,
            MenuInput::Confirm,
            MenuInput::Confirm,
        ] {
            menu.react(input, &ctx).await;
        }

        for _ in 0..100 {
            if plant.reads() > 1 {
                return true;
            }
            yield_now().await;
        }
        false
    };

    match block_on(select(ctx.run_watering(), operator)) {
        Either::Second(checked) => assert!(checked),
        Either::First(_) => unreachable!(),
    }
    assert_eq!(plant.reads(), 2);
    assert!(clock.now_ms() < OVERDUE_POLL_MS);
    assert!(!block_on(ctx.is_check_overdue()));
}
