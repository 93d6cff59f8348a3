#![no_std]

//! Host-link protocol: the telemetry record wire format and the command
//! grammar of the serial control channel.
//!
//! A record is one JSON object per line. The key names and their order are a
//! compatibility contract with the host-side collector; changing either
//! breaks deployed consumers.

use core::fmt::{self, Write};

use heapless::{String, Vec};
use sbs_gauge::Snapshot;

/// Upper bound of a serialized record, including the line terminator.
pub const MAX_RECORD_LEN: usize = 256;

/// Longest accepted command line from the host.
pub const MAX_COMMAND_LEN: usize = 64;

/// Commands the host may send over the serial link.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand {
    /// Poll every register and emit one telemetry record.
    ReadAll,
}

impl HostCommand {
    /// Parses one received line. Surrounding whitespace is ignored;
    /// anything that is not a known command yields `None` and is to be
    /// silently dropped by the caller.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "READ_ALL" => Some(Self::ReadAll),
            _ => None,
        }
    }
}

/// One emitted telemetry record.
///
/// Always complete: fields whose source register could not be read carry
/// their documented default (0, 0.0, or absence from `cells`) instead of an
/// error marker.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryRecord {
    pub pack_voltage_mv: u16,
    pub current_ma: i16,
    pub temperature_c: f32,
    pub cycle_count: u16,
    /// Reserved; emitted as literal 0 until a status-bit scheme is specified.
    pub safety_status: u16,
    /// Reserved; emitted as literal 0 until a status-bit scheme is specified.
    pub pf_status: u16,
    pub gauge_type: &'static str,
    pub cells: Vec<u16, 4>,
    pub remaining_capacity_mah: u16,
    pub full_capacity_mah: u16,
}

impl TelemetryRecord {
    pub fn from_snapshot(snapshot: &Snapshot, gauge_type: &'static str) -> Self {
        Self {
            pack_voltage_mv: snapshot.voltage_mv.unwrap_or(0),
            current_ma: snapshot.current_ma.unwrap_or(0),
            temperature_c: snapshot.temperature_celsius(),
            cycle_count: snapshot.cycle_count.unwrap_or(0),
            safety_status: 0,
            pf_status: 0,
            gauge_type,
            cells: snapshot.cells.clone(),
            remaining_capacity_mah: snapshot.remaining_capacity_mah.unwrap_or(0),
            full_capacity_mah: snapshot.full_capacity_mah.unwrap_or(0),
        }
    }

    /// Serializes the record as one CRLF-terminated JSON line.
    ///
    /// Key order is fixed; see the module documentation.
    pub fn write_json<const N: usize>(&self, out: &mut String<N>) -> fmt::Result {
        write!(
            out,
            "{{\"PackVoltage_mV\":{},\"Current_mA\":{},\"Temperature_C\":{:.1},\"CycleCount\":{}",
            self.pack_voltage_mv, self.current_ma, self.temperature_c, self.cycle_count,
        )?;

        write!(
            out,
            ",\"SafetyStatus\":{},\"PF_Status\":{},\"GaugeType\":\"{}\"",
            self.safety_status, self.pf_status, self.gauge_type,
        )?;

        write!(out, ",\"Cells\":[")?;
        for (index, cell) in self.cells.iter().enumerate() {
            if index > 0 {
                write!(out, ",")?;
            }
            write!(out, "{}", cell)?;
        }
        write!(out, "]")?;

        write!(
            out,
            ",\"RemainCapacity_mAh\":{},\"FullCapacity_mAh\":{}}}\r\n",
            self.remaining_capacity_mah, self.full_capacity_mah,
        )
    }
}

/// Accumulates received bytes into LF-terminated lines.
///
/// A line longer than the buffer is dropped in its entirety once its LF
/// arrives; truncating it could turn one command into another. A CR before
/// the LF is stripped, so both LF and CRLF framing parse.
pub struct LineBuffer<const N: usize> {
    buffer: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Feeds one received byte; returns the completed line on LF.
    ///
    /// Overlong and non-UTF-8 lines complete as `None`.
    pub fn push(&mut self, byte: u8) -> Option<String<N>> {
        if byte != b'\n' {
            if self.buffer.push(byte).is_err() {
                self.overflowed = true;
            }
            return None;
        }

        let mut bytes = core::mem::take(&mut self.buffer);
        if core::mem::replace(&mut self.overflowed, false) {
            return None;
        }

        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }

        let mut line = String::new();
        line.push_str(core::str::from_utf8(&bytes).ok()?).ok()?;
        Some(line)
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
