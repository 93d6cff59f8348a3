//! Host-link tasks: trigger handling, polling, record emission.

#[cfg(feature = "trigger_serial")]
use embassy_time::{Duration, Timer};
#[cfg(feature = "trigger_timer")]
use embassy_time::Ticker;
#[cfg(feature = "trigger_serial")]
use embedded_io_async::Read;
use embedded_io_async::Write;
use heapless::String;
use sbs_gauge::SbsGauge;
#[cfg(feature = "trigger_serial")]
use telemetry_proto::{HostCommand, LineBuffer, MAX_COMMAND_LEN};
use telemetry_proto::{TelemetryRecord, MAX_RECORD_LEN};

#[cfg(feature = "trigger_serial")]
use crate::board::HostUartRx;
use crate::board::{GaugeI2c, HostUartTx};

/// Device-family label stamped into every record.
pub const GAUGE_TYPE: &str = env!("GAUGE_TYPE");

pub type Gauge = SbsGauge<GaugeI2c>;

async fn poll(gauge: &mut Gauge) -> TelemetryRecord {
    #[cfg(feature = "gauge_bq")]
    let snapshot = gauge.snapshot_with_cells().await;

    #[cfg(feature = "gauge_smbus")]
    let snapshot = gauge.snapshot().await;

    #[cfg(feature = "gauge_bq")]
    if let Some(status) = snapshot.battery_status {
        // Raw word only; the status bits are not interpreted.
        logger::debug!("battery status word: {}", status);
    }

    TelemetryRecord::from_snapshot(&snapshot, GAUGE_TYPE)
}

async fn emit(record: &TelemetryRecord, tx: &mut HostUartTx) {
    let mut line = String::<MAX_RECORD_LEN>::new();
    if record.write_json(&mut line).is_err() {
        logger::error!("telemetry record exceeds the output buffer");
        return;
    }

    if tx.write_all(line.as_bytes()).await.is_err() {
        logger::warn!("host link write failed");
    }
}

/// Polls on request: one record per `READ_ALL` line from the host. Other
/// lines are dropped without a response.
#[cfg(feature = "trigger_serial")]
#[embassy_executor::task]
pub async fn serial_task(mut gauge: Gauge, mut rx: HostUartRx, mut tx: HostUartTx) {
    let mut lines = LineBuffer::<MAX_COMMAND_LEN>::new();
    let mut rx_buffer = [0u8; 32];

    loop {
        let received = match rx.read(&mut rx_buffer).await {
            Ok(received) => received,
            Err(_) => {
                logger::warn!("host link read failed");
                Timer::after(Duration::from_millis(10)).await;
                continue;
            }
        };

        for &byte in &rx_buffer[..received] {
            let Some(line) = lines.push(byte) else {
                continue;
            };

            match HostCommand::parse(&line) {
                Some(HostCommand::ReadAll) => {
                    let record = poll(&mut gauge).await;
                    emit(&record, &mut tx).await;
                }
                None => logger::trace!("ignoring unrecognized host command"),
            }
        }
    }
}

/// Polls on a fixed cadence, one record per tick.
#[cfg(feature = "trigger_timer")]
#[embassy_executor::task]
pub async fn timer_task(mut gauge: Gauge, mut tx: HostUartTx) {
    let mut ticker = Ticker::every(crate::board::POLL_PERIOD);

    loop {
        let record = poll(&mut gauge).await;
        emit(&record, &mut tx).await;

        ticker.next().await;
    }
}
