use async_trait::async_trait;

use crate::channel::{ChannelKind, ChannelSpec, InfoMask};
use crate::error::AppResult;

/// Capability for sensors that report final-unit values per channel.
///
/// This is the query a host framework binds to: every call runs an independent
/// acquisition, nothing is cached between calls.
#[async_trait]
pub trait ProcessedReadout: Send + Sync {
    /// Channels this device serves.
    fn channels(&self) -> &'static [ChannelSpec];

    /// Read `info` of channel `kind`.
    ///
    /// Unsupported kinds or masks fail with `InvalidArgument` before touching the bus.
    async fn read_processed(&self, kind: ChannelKind, info: InfoMask) -> AppResult<i32>;
}
