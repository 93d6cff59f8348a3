pub mod startup;

use esp_backtrace as _;

#[cfg(feature = "esp32s3")]
pub use esp32s3_hal as hal;

#[cfg(feature = "trigger_timer")]
use embassy_time::Duration;

use crate::board::hal::{
    i2c::I2C,
    peripherals,
    uart::{UartRx, UartTx},
};

/// Bus the gauge hangs off.
pub type GaugeI2c = I2C<'static, peripherals::I2C0>;

pub type HostUartTx = UartTx<'static, peripherals::UART0>;
pub type HostUartRx = UartRx<'static, peripherals::UART0>;

/// Host link baud rate. The downstream collector opens the port at this
/// fixed rate.
pub const HOST_BAUD_RATE: u32 = 115_200;

/// Poll cadence of timer-driven builds.
#[cfg(feature = "trigger_timer")]
pub const POLL_PERIOD: Duration = Duration::from_secs(1);
