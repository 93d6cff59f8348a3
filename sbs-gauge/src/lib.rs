#![no_std]

//! Async driver for SBS (Smart Battery System) fuel gauges on SMBus.
//!
//! The gauge exposes its telemetry as 16-bit registers addressed by an 8-bit
//! command code. Every measurement is one word read; there is no
//! configuration handshake and no write path in this driver.

use embedded_hal_async::i2c::I2c as AsyncI2c;
use heapless::Vec;

/// Conventional 7-bit address of a smart battery on the SMBus.
pub const SMART_BATTERY_ADDR: u8 = 0x0B;

/// Word returned by generic gauges for commands they do not implement.
///
/// A bus-level failure and a gauge answering `0xFFFF` are equivalent from the
/// caller's point of view; both mean the register has no usable value.
pub const WORD_INVALID: u16 = 0xFFFF;

/// SBS command codes understood by this driver.
///
/// The per-cell commands are not part of the SBS standard; they follow the
/// TI BQ series convention where 0x3C addresses the lowest cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Temperature = 0x08,
    Voltage = 0x09,
    Current = 0x0A,
    RemainingCapacity = 0x0F,
    FullChargeCapacity = 0x10,
    BatteryStatus = 0x16,
    CycleCount = 0x17,
    CellVoltage1 = 0x3C,
    CellVoltage2 = 0x3D,
    CellVoltage3 = 0x3E,
    CellVoltage4 = 0x3F,
}

const CELL_COMMANDS: [Command; 4] = [
    Command::CellVoltage1,
    Command::CellVoltage2,
    Command::CellVoltage3,
    Command::CellVoltage4,
];

/// Converts a raw `Temperature` register word (units of 0.1 K) to degrees
/// Celsius.
///
/// [`WORD_INVALID`] converts to exactly `0.0`; running the formula on it
/// would produce a large positive number with no physical meaning.
///
/// ```rust
/// use sbs_gauge::{raw_temperature_to_celsius, WORD_INVALID};
///
/// assert!((raw_temperature_to_celsius(3031) - 29.95).abs() < 0.01);
/// assert!((raw_temperature_to_celsius(2732) - 0.05).abs() < 0.01);
/// assert_eq!(raw_temperature_to_celsius(WORD_INVALID), 0.0);
/// ```
pub fn raw_temperature_to_celsius(raw: u16) -> f32 {
    if raw == WORD_INVALID {
        return 0.0;
    }

    raw as f32 / 10.0 - 273.15
}

/// Reinterprets a raw `Current` register word as a signed current in mA.
///
/// The register is two's-complement: positive while charging, negative while
/// discharging.
///
/// ```rust
/// use sbs_gauge::raw_current_to_ma;
///
/// assert_eq!(raw_current_to_ma(0), 0);
/// assert_eq!(raw_current_to_ma(250), 250);
/// assert_eq!(raw_current_to_ma(0xFFF6), -10);
/// ```
pub fn raw_current_to_ma(raw: u16) -> i16 {
    raw as i16
}

/// One poll's worth of gauge registers.
///
/// Fields are read independently; a register that failed to read or returned
/// [`WORD_INVALID`] is `None`. `cells` holds only cell voltages that are
/// present and non-zero, in cell order.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub voltage_mv: Option<u16>,
    pub current_ma: Option<i16>,
    pub temperature_dk: Option<u16>,
    pub remaining_capacity_mah: Option<u16>,
    pub full_capacity_mah: Option<u16>,
    pub cycle_count: Option<u16>,
    /// Raw `BatteryStatus` word. Read in the per-cell variant only, and not
    /// decoded by this driver.
    pub battery_status: Option<u16>,
    pub cells: Vec<u16, 4>,
}

impl Snapshot {
    /// Pack temperature in °C, or exactly `0.0` if the register could not be
    /// read.
    pub fn temperature_celsius(&self) -> f32 {
        match self.temperature_dk {
            Some(raw) => raw_temperature_to_celsius(raw),
            None => 0.0,
        }
    }
}

pub struct SbsGauge<I> {
    i2c: I,
    address: u8,
}

impl<I> SbsGauge<I> {
    pub const fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }
}

impl<I> SbsGauge<I>
where
    I: AsyncI2c,
{
    /// Reads one 16-bit register.
    ///
    /// The command byte is written and the two data bytes are read in a
    /// single transaction (repeated start, bus ownership is not released in
    /// between). Data arrives low byte first. A failed transaction is
    /// surfaced as-is; no retry is attempted.
    pub async fn read_word(&mut self, command: Command) -> Result<u16, I::Error> {
        let mut word = [0; 2];
        self.i2c
            .write_read(self.address, &[command as u8], &mut word)
            .await?;

        Ok(u16::from_le_bytes(word))
    }

    /// Reads a register, collapsing transaction failures and the
    /// [`WORD_INVALID`] pattern into `None`.
    async fn read_valid(&mut self, command: Command) -> Option<u16> {
        match self.read_word(command).await {
            Ok(WORD_INVALID) | Err(_) => {
                logger::trace!("SBS register {} unavailable", command as u8);
                None
            }
            Ok(word) => Some(word),
        }
    }

    /// Polls the core register set of a generic SMBus gauge.
    ///
    /// Always succeeds: registers that could not be read leave their field
    /// empty. Standard SMBus has no per-cell registers, so `cells` stays
    /// empty and `BatteryStatus` is not attempted.
    pub async fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            voltage_mv: self.read_valid(Command::Voltage).await,
            current_ma: self
                .read_valid(Command::Current)
                .await
                .map(raw_current_to_ma),
            temperature_dk: self.read_valid(Command::Temperature).await,
            remaining_capacity_mah: self.read_valid(Command::RemainingCapacity).await,
            full_capacity_mah: self.read_valid(Command::FullChargeCapacity).await,
            cycle_count: self.read_valid(Command::CycleCount).await,
            battery_status: None,
            cells: Vec::new(),
        }
    }

    /// Polls the core register set plus the raw status word and the per-cell
    /// voltages of a BQ-family gauge.
    ///
    /// Cells reading zero are skipped: zero is not a physically meaningful
    /// cell voltage, it marks an unpopulated position.
    pub async fn snapshot_with_cells(&mut self) -> Snapshot {
        let mut snapshot = self.snapshot().await;

        snapshot.battery_status = self.read_valid(Command::BatteryStatus).await;

        for command in CELL_COMMANDS {
            if let Some(mv) = self.read_valid(command).await {
                if mv != 0 {
                    let _ = snapshot.cells.push(mv);
                }
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct BusFault;

    impl embedded_hal::i2c::Error for BusFault {
        fn kind(&self) -> embedded_hal::i2c::ErrorKind {
            embedded_hal::i2c::ErrorKind::Other
        }
    }

    /// Replies to word reads from a fixed register table. Commands missing
    /// from the table fail the transaction, like a gauge that does not
    /// acknowledge the command. Every addressed command code is recorded.
    struct ScriptedBus<'a> {
        registers: &'a [(u8, u16)],
        requested: Vec<u8, 32>,
    }

    impl<'a> ScriptedBus<'a> {
        fn new(registers: &'a [(u8, u16)]) -> Self {
            Self {
                registers,
                requested: Vec::new(),
            }
        }
    }

    impl ErrorType for ScriptedBus<'_> {
        type Error = BusFault;
    }

    impl I2c for ScriptedBus<'_> {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), BusFault> {
            assert_eq!(address, SMART_BATTERY_ADDR);

            let mut selected = None;
            for operation in operations.iter_mut() {
                match operation {
                    Operation::Write(bytes) => {
                        assert_eq!(bytes.len(), 1);
                        selected = Some(bytes[0]);
                        self.requested.push(bytes[0]).unwrap();
                    }
                    Operation::Read(buffer) => {
                        let command = selected.expect("read issued before the command write");
                        let word = self
                            .registers
                            .iter()
                            .find(|(register, _)| *register == command)
                            .map(|(_, word)| *word)
                            .ok_or(BusFault)?;
                        buffer.copy_from_slice(&word.to_le_bytes());
                    }
                }
            }

            Ok(())
        }
    }

    /// Answers every read with a fixed byte pair, regardless of command.
    struct FixedBytesBus([u8; 2]);

    impl ErrorType for FixedBytesBus {
        type Error = BusFault;
    }

    impl I2c for FixedBytesBus {
        async fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), BusFault> {
            for operation in operations.iter_mut() {
                if let Operation::Read(buffer) = operation {
                    buffer.copy_from_slice(&self.0);
                }
            }
            Ok(())
        }
    }

    /// Fails every transaction before any byte moves.
    struct DeadBus;

    impl ErrorType for DeadBus {
        type Error = BusFault;
    }

    impl I2c for DeadBus {
        async fn transaction(
            &mut self,
            _address: u8,
            _operations: &mut [Operation<'_>],
        ) -> Result<(), BusFault> {
            Err(BusFault)
        }
    }

    const HEALTHY_PACK: &[(u8, u16)] = &[
        (0x08, 3031),   // 303.1 K
        (0x09, 14800),  // mV
        (0x0A, 0xFFF6), // -10 mA
        (0x0F, 1200),   // mAh
        (0x10, 2500),   // mAh
        (0x16, 0x00E0), // raw status
        (0x17, 42),
        (0x3C, 3700),
        (0x3D, 3650),
        (0x3E, 0),      // position not populated
        (0x3F, 0xFFFF), // read failed on the gauge side
    ];

    #[test]
    fn word_is_assembled_low_byte_first() {
        let mut gauge = SbsGauge::new(FixedBytesBus([0x34, 0x12]), SMART_BATTERY_ADDR);

        let word = block_on(gauge.read_word(Command::Voltage)).unwrap();

        assert_eq!(word, 0x1234);
    }

    #[test]
    fn core_snapshot_converts_units() {
        let mut gauge = SbsGauge::new(ScriptedBus::new(HEALTHY_PACK), SMART_BATTERY_ADDR);

        let snapshot = block_on(gauge.snapshot());

        assert_eq!(snapshot.voltage_mv, Some(14800));
        assert_eq!(snapshot.current_ma, Some(-10));
        assert_eq!(snapshot.temperature_dk, Some(3031));
        assert!((snapshot.temperature_celsius() - 29.95).abs() < 0.01);
        assert_eq!(snapshot.remaining_capacity_mah, Some(1200));
        assert_eq!(snapshot.full_capacity_mah, Some(2500));
        assert_eq!(snapshot.cycle_count, Some(42));
    }

    #[test]
    fn core_snapshot_leaves_status_and_cells_alone() {
        let mut gauge = SbsGauge::new(ScriptedBus::new(HEALTHY_PACK), SMART_BATTERY_ADDR);

        let snapshot = block_on(gauge.snapshot());

        assert_eq!(snapshot.battery_status, None);
        assert!(snapshot.cells.is_empty());

        let bus = gauge.into_inner();
        assert!(!bus.requested.contains(&0x16));
        assert!(!bus.requested.iter().any(|code| (0x3C..=0x3F).contains(code)));
    }

    #[test]
    fn cell_snapshot_filters_invalid_and_empty_positions() {
        let mut gauge = SbsGauge::new(ScriptedBus::new(HEALTHY_PACK), SMART_BATTERY_ADDR);

        let snapshot = block_on(gauge.snapshot_with_cells());

        assert_eq!(snapshot.battery_status, Some(0x00E0));
        assert_eq!(snapshot.cells.as_slice(), &[3700, 3650]);
    }

    #[test]
    fn failed_registers_do_not_disturb_the_rest() {
        // Gauge that answers voltage only.
        let registers = &[(0x09, 15000)];
        let mut gauge = SbsGauge::new(ScriptedBus::new(registers), SMART_BATTERY_ADDR);

        let snapshot = block_on(gauge.snapshot_with_cells());

        assert_eq!(snapshot.voltage_mv, Some(15000));
        assert_eq!(snapshot.current_ma, None);
        assert_eq!(snapshot.temperature_dk, None);
        assert_eq!(snapshot.temperature_celsius(), 0.0);
        assert_eq!(snapshot.remaining_capacity_mah, None);
        assert_eq!(snapshot.full_capacity_mah, None);
        assert_eq!(snapshot.cycle_count, None);
        assert_eq!(snapshot.battery_status, None);
        assert!(snapshot.cells.is_empty());
    }

    #[test]
    fn dead_bus_still_yields_a_snapshot() {
        let mut gauge = SbsGauge::new(DeadBus, SMART_BATTERY_ADDR);

        let snapshot = block_on(gauge.snapshot_with_cells());

        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn invalid_word_reads_as_absent() {
        let registers = &[(0x08, 0xFFFF)];
        let mut gauge = SbsGauge::new(ScriptedBus::new(registers), SMART_BATTERY_ADDR);

        let snapshot = block_on(gauge.snapshot());

        assert_eq!(snapshot.temperature_dk, None);
        assert_eq!(snapshot.temperature_celsius(), 0.0);
    }

    #[test]
    fn consecutive_polls_are_identical() {
        let mut gauge = SbsGauge::new(ScriptedBus::new(HEALTHY_PACK), SMART_BATTERY_ADDR);

        let first = block_on(gauge.snapshot_with_cells());
        let second = block_on(gauge.snapshot_with_cells());

        assert_eq!(first, second);
    }
}
