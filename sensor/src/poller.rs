use async_trait::async_trait;
use tokio::{
    sync::mpsc,
    time::{self, Duration, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::bus::{write_register, Bus, BusError};
use crate::calibration::{Calibrator, Phase};
use crate::packet::{decode_with, packet_from_read, verify_checksum, Frame, PACKET_LEN};
use crate::registers::{Mode, Register};
use crate::{Config, Observation, Sensation, SensorError, Sensor};

/// Polls a person sensor and, when recognition is on, teaches it new faces.
pub struct PersonSensor<B> {
    bus: B,
    config: Config,
    calibrator: Option<Calibrator>,
    exhaustion_reported: bool,
}

impl<B: Bus> PersonSensor<B> {
    pub fn new(bus: B, config: Config) -> Self {
        let calibrator = config.recognition.then(|| Calibrator::new(config.policy));
        Self {
            bus,
            config,
            calibrator,
            exhaustion_reported: false,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calibrator(&self) -> Option<&Calibrator> {
        self.calibrator.as_ref()
    }

    /// Write the configured [`crate::DeviceSettings`] to the sensor.
    pub async fn configure(&mut self) -> Result<(), BusError> {
        for (register, value) in self.config.device.writes() {
            debug!(?register, value, "writing register");
            write_register(&mut self.bus, self.config.address, register as u8, value).await?;
        }
        Ok(())
    }

    /// Read and decode one packet without touching calibration state.
    pub async fn read_frame(&mut self) -> Result<Frame, SensorError> {
        let address = self.config.address;
        if self.config.device.mode == Mode::Standby {
            write_register(&mut self.bus, address, Register::SingleShot as u8, 0).await?;
        }
        let mut buf = [0u8; PACKET_LEN];
        let n = self.bus.read(address, &mut buf).await?;
        let raw = packet_from_read(&buf, n).ok_or(BusError::ShortRead {
            expected: PACKET_LEN,
            actual: n,
        })?;
        if !verify_checksum(raw) {
            debug!("checksum mismatch");
        }
        Ok(decode_with(raw, self.config.layout)?)
    }

    /// One full cycle: read, decode, run calibration, issue any command.
    ///
    /// On error nothing has been mutated and the cycle should simply be skipped.
    pub async fn poll_once(&mut self) -> Result<Vec<Sensation>, SensorError> {
        let frame = self.read_frame().await?;
        debug!(faces = frame.num_faces(), "frame");
        for (i, face) in frame.faces().iter().enumerate() {
            if face.is_recognized() {
                debug!(
                    face = i,
                    id = face.id,
                    confidence = face.id_confidence,
                    "recognized face"
                );
            } else {
                debug!(face = i, "unrecognized face");
            }
        }

        let mut out = Vec::new();
        if let Some(calibrator) = self.calibrator.as_mut() {
            let before = calibrator.phase();
            if let Some(command) = calibrator.observe(&frame) {
                info!(id = command.id, "calibrating");
                if let Err(e) = self.bus.write(self.config.address, &command.as_bytes()).await {
                    warn!(error = %e, id = command.id, "calibration command not delivered");
                }
                out.push(Observation::CalibrationStarted { id: command.id });
            } else if before == Phase::Calibrating && calibrator.phase() != Phase::Calibrating {
                info!("done calibrating");
                out.push(Observation::CalibrationFinished);
            }
            if calibrator.capacity_exhausted() && !self.exhaustion_reported {
                self.exhaustion_reported = true;
                info!(max_ids = calibrator.policy().max_ids, "identity capacity exhausted");
                out.push(Observation::CapacityExhausted);
            }
        }
        out.insert(0, Observation::Faces(frame));
        Ok(out.into_iter().map(Sensation::new).collect())
    }
}

#[async_trait]
impl<B: Bus> Sensor for PersonSensor<B> {
    async fn run(&mut self, tx: mpsc::Sender<Sensation>) {
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let sensations = match self.poll_once().await {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "no person sensor results this cycle");
                    vec![Sensation::no_data(e.to_string())]
                }
            };
            for s in sensations {
                if tx.send(s).await.is_err() {
                    return;
                }
            }
        }
    }
}
