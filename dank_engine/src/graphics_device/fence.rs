/// Fence trait - monotonic GPU progress counter

use std::any::Any;
use crate::error::Result;

/// GPU fence with a 64-bit monotonic value
///
/// The queue raises the value through `GraphicsDevice::signal_fence` once
/// every command submitted before the signal has completed.
pub trait Fence: Send + Sync {
    /// Highest value the GPU has reached
    fn completed_value(&self) -> Result<u64>;

    /// Block until `completed_value() >= value`
    ///
    /// Returns immediately when the value is already reached. Never returns
    /// `Ok` before the value is observed complete.
    fn wait_for(&self, value: u64) -> Result<()>;

    /// Downcast hook for the owning backend
    fn as_any(&self) -> &dyn Any;
}
