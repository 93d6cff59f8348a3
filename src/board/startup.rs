use crate::board::{
    hal::{
        clock::{ClockControl, CpuClock},
        embassy,
        i2c::I2C,
        interrupt,
        peripherals::{self, Peripherals},
        prelude::*,
        systimer::SystemTimer,
        uart::{config::Config as UartConfig, TxRxPins},
        Rtc, Uart, IO,
    },
    GaugeI2c, HostUartRx, HostUartTx, HOST_BAUD_RATE,
};

pub struct StartupResources {
    pub gauge_i2c: GaugeI2c,
    pub host_rx: HostUartRx,
    pub host_tx: HostUartTx,
}

impl StartupResources {
    pub fn initialize() -> Self {
        #[cfg(feature = "log")]
        esp_println::logger::init_logger(log::LevelFilter::Info);

        let peripherals = Peripherals::take();

        let mut system = peripherals.SYSTEM.split();
        let clocks = ClockControl::configure(system.clock_control, CpuClock::Clock240MHz).freeze();

        let mut rtc = Rtc::new(peripherals.RTC_CNTL);
        rtc.rwdt.disable();

        embassy::init(&clocks, SystemTimer::new(peripherals.SYSTIMER));

        let io = IO::new(peripherals.GPIO, peripherals.IO_MUX);

        // Gauge bus at the standard SMBus clock rate.
        let gauge_i2c = I2C::new(
            peripherals.I2C0,
            io.pins.gpio35,
            io.pins.gpio36,
            100u32.kHz(),
            &mut system.peripheral_clock_control,
            &clocks,
        );

        interrupt::enable(
            peripherals::Interrupt::I2C_EXT0,
            interrupt::Priority::Priority1,
        )
        .unwrap();

        // Host link on UART0.
        let host_uart = Uart::new_with_config(
            peripherals.UART0,
            Some(UartConfig::default().baudrate(HOST_BAUD_RATE)),
            Some(TxRxPins::new_tx_rx(
                io.pins.gpio43.into_push_pull_output(),
                io.pins.gpio44.into_floating_input(),
            )),
            &mut system.peripheral_clock_control,
            &clocks,
        );

        interrupt::enable(
            peripherals::Interrupt::UART0,
            interrupt::Priority::Priority1,
        )
        .unwrap();

        let (host_tx, host_rx) = host_uart.split();

        StartupResources {
            gauge_i2c,
            host_rx,
            host_tx,
        }
    }
}
