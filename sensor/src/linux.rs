use async_trait::async_trait;
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use std::io;
use std::path::Path;
use tracing::debug;

use crate::bus::{Bus, BusError};
use crate::packet::I2C_ADDRESS;

/// Bus backed by a Linux `/dev/i2c-N` character device.
///
/// A single file descriptor is kept open; talking to another address
/// retargets it with `I2C_SLAVE` instead of opening a new one.
pub struct LinuxBus {
    device: Option<LinuxI2CDevice>,
    /// Slave address the descriptor currently points at.
    target: Option<u8>,
}

impl LinuxBus {
    /// Open the adapter at `path`, initially addressed at the sensor.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BusError> {
        let device = LinuxI2CDevice::new(path, u16::from(I2C_ADDRESS))
            .map_err(|e| BusError::Io(io::Error::other(e.to_string())))?;
        Ok(Self {
            device: Some(device),
            target: Some(I2C_ADDRESS),
        })
    }

    /// Run `op` against the device at `address` on the blocking pool.
    async fn with_device<T, F>(&mut self, address: u8, op: F) -> Result<T, BusError>
    where
        T: Send + 'static,
        F: FnOnce(&mut LinuxI2CDevice) -> Result<T, LinuxI2CError> + Send + 'static,
    {
        let mut dev = self
            .device
            .take()
            .ok_or_else(|| BusError::Io(io::Error::other("i2c adapter lost after a failed call")))?;
        let retarget = self.target != Some(address);
        let (dev, targeted, result) = tokio::task::spawn_blocking(move || {
            if retarget {
                if let Err(e) = dev.set_slave_address(u16::from(address)) {
                    return (dev, false, Err(e));
                }
            }
            let result = op(&mut dev);
            (dev, true, result)
        })
        .await
        .map_err(|e| BusError::Io(io::Error::other(e.to_string())))?;
        self.device = Some(dev);
        self.target = targeted.then_some(address);
        result.map_err(|e| {
            debug!(address, error = %e, "i2c transfer failed");
            BusError::NoDevice(address)
        })
    }
}

#[async_trait]
impl Bus for LinuxBus {
    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BusError> {
        let mut owned = vec![0u8; buf.len()];
        let owned = self
            .with_device(address, move |dev| dev.read(&mut owned).map(|()| owned))
            .await?;
        buf.copy_from_slice(&owned);
        Ok(owned.len())
    }

    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        let owned = bytes.to_vec();
        self.with_device(address, move |dev| dev.write(&owned)).await
    }
}
