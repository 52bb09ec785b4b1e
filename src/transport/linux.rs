//! Linux `/dev/i2c-N` transport (feature `linux_i2c`).

use linux_embedded_hal::I2cdev;
use std::io;
use tracing::info;

use super::HalBus;

/// Open `path` (e.g. "/dev/i2c-1") and bind it to `address`.
pub fn open(path: &str, address: u8) -> io::Result<HalBus<I2cdev>> {
    let dev = I2cdev::new(path).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("failed to open i2c bus '{path}': {e}"),
        )
    })?;
    info!(bus = path, address, "opened i2c bus");
    Ok(HalBus::new(dev, address))
}
