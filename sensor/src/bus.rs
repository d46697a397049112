use async_trait::async_trait;
use std::collections::VecDeque;
use thiserror::Error;

use crate::packet::{FaceRecord, Frame, GeometryLayout, PACKET_LEN};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no device acknowledged address {0:#04x}")]
    NoDevice(u8),
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
    #[error("invalid bus script: {0}")]
    InvalidScript(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Two-wire bus the sensor hangs off.
#[async_trait]
pub trait Bus: Send {
    /// Read into `buf` from the device at `address`, returning the byte count.
    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BusError>;
    /// Write `bytes` to the device at `address`.
    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError>;
}

/// Set `register` on the device at `address` to `value`.
pub async fn write_register<B: Bus + ?Sized>(
    bus: &mut B,
    address: u8,
    register: u8,
    value: u8,
) -> Result<(), BusError> {
    bus.write(address, &[register, value]).await
}

/// Addresses of the form `000 0xxx` and `111 1xxx` are reserved by the protocol.
pub fn is_reserved_address(address: u8) -> bool {
    let high = address & 0x78;
    high == 0 || high == 0x78
}

/// Probe every non-reserved 7-bit address with a one byte read and return
/// those that answered.
pub async fn scan<B: Bus + ?Sized>(bus: &mut B) -> Vec<u8> {
    let mut found = Vec::new();
    let mut probe = [0u8; 1];
    for address in 0..0x80u8 {
        if is_reserved_address(address) {
            continue;
        }
        if let Ok(1) = bus.read(address, &mut probe).await {
            found.push(address);
        }
    }
    found
}

/// One canned reply of a [`ScriptedBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A full packet.
    Packet([u8; PACKET_LEN]),
    /// Only the first `n` bytes arrive.
    Short(usize),
    /// Nothing acknowledges.
    Absent,
}

/// In-memory bus that replays scripted replies and records every write.
///
/// Only the configured address answers; everything else reports
/// [`BusError::NoDevice`].
#[derive(Debug, Clone)]
pub struct ScriptedBus {
    address: u8,
    script: Vec<Response>,
    pending: VecDeque<Response>,
    cycle: bool,
    writes: Vec<(u8, Vec<u8>)>,
}

impl ScriptedBus {
    pub fn new(address: u8, script: Vec<Response>) -> Self {
        Self {
            address,
            pending: script.iter().cloned().collect(),
            script,
            cycle: false,
            writes: Vec::new(),
        }
    }

    /// Encode each frame with `layout` and queue it.
    pub fn from_frames(address: u8, frames: &[Frame], layout: GeometryLayout) -> Self {
        let script = frames
            .iter()
            .map(|f| Response::Packet(f.to_bytes(layout)))
            .collect();
        Self::new(address, script)
    }

    /// Parse a JSON script: an array of frames, each an array of faces.
    pub fn from_json(address: u8, json: &str, layout: GeometryLayout) -> Result<Self, BusError> {
        let faces: Vec<Vec<FaceRecord>> =
            serde_json::from_str(json).map_err(|e| BusError::InvalidScript(e.to_string()))?;
        let frames = faces
            .iter()
            .map(|f| Frame::new(f))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BusError::InvalidScript(e.to_string()))?;
        Ok(Self::from_frames(address, &frames, layout))
    }

    /// Start over from the beginning once the script runs out.
    pub fn cycle(mut self) -> Self {
        self.cycle = true;
        self
    }

    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    fn next_response(&mut self) -> Response {
        if self.pending.is_empty() && self.cycle {
            self.pending = self.script.iter().cloned().collect();
        }
        self.pending.pop_front().unwrap_or(Response::Absent)
    }
}

#[async_trait]
impl Bus for ScriptedBus {
    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        if address != self.address {
            return Err(BusError::NoDevice(address));
        }
        if buf.len() != PACKET_LEN {
            // Probes and other odd-sized reads get zeros without consuming the script.
            buf.fill(0);
            return Ok(buf.len());
        }
        match self.next_response() {
            Response::Packet(bytes) => {
                buf.copy_from_slice(&bytes);
                Ok(PACKET_LEN)
            }
            Response::Short(n) => {
                let n = n.min(PACKET_LEN);
                buf[..n].fill(0);
                Ok(n)
            }
            Response::Absent => Err(BusError::NoDevice(address)),
        }
    }

    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        if address != self.address {
            return Err(BusError::NoDevice(address));
        }
        self.writes.push((address, bytes.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl<B: Bus + ?Sized> Bus for Box<B> {
    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        (**self).read(address, buf).await
    }

    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(address, bytes).await
    }
}
