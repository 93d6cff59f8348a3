#![no_std]
#![no_main]
#![feature(type_alias_impl_trait)]

use embassy_executor::{Executor, Spawner};
use embassy_time::{Duration, Timer};
use sbs_gauge::{SbsGauge, SMART_BATTERY_ADDR};
use static_cell::StaticCell;

use crate::board::{hal::entry, startup::StartupResources};

mod board;
mod link;

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[entry]
fn main() -> ! {
    // StartupResources::initialize sets up embassy so it must be called first.
    let resources = StartupResources::initialize();

    let executor = EXECUTOR.init(Executor::new());
    executor.run(move |spawner| {
        spawner.spawn(main_task(spawner, resources)).ok();
    });
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner, resources: StartupResources) {
    logger::info!(
        "SMBus battery reader started (fw {}, {} trigger)",
        env!("FW_VERSION"),
        env!("TRIGGER_VARIANT")
    );

    // Let the gauge settle after bus bring-up before accepting polls.
    Timer::after(Duration::from_millis(1000)).await;

    let gauge = SbsGauge::new(resources.gauge_i2c, SMART_BATTERY_ADDR);

    #[cfg(feature = "trigger_serial")]
    spawner
        .spawn(link::serial_task(gauge, resources.host_rx, resources.host_tx))
        .ok();

    #[cfg(feature = "trigger_timer")]
    {
        // Timer-driven builds never read from the host.
        let _ = resources.host_rx;
        spawner.spawn(link::timer_task(gauge, resources.host_tx)).ok();
    }
}
