//! Event channel factories and handles.

use super::types::CompensationRequired;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for CompensationRequired events.
pub type CompensationSender = mpsc::Sender<CompensationRequired>;
/// Receiver handle for CompensationRequired events.
pub type CompensationReceiver = mpsc::Receiver<CompensationRequired>;

/// Create a new CompensationRequired channel.
///
/// The engine keeps the sender; the reconciliation worker owns the receiver.
pub fn compensation_channel() -> (CompensationSender, CompensationReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
