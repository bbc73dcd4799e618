//! Channel statistics.

/// Counters describing a channel's traffic since open.
///
/// All fields are monotone counters except `active` (the current CID window
/// width) and the three storage gauges `bundles`/`payloads`/`records`, which
/// are refreshed from the storage service by `latchstats`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Bundles encoded and committed to storage by `store`.
    pub generated: u32,
    /// Bundles emitted by `load`, including retransmissions and records.
    pub transmitted: u32,
    /// Bundles that timed out and were emitted again.
    pub retransmitted: u32,
    /// Payloads handed to the application by `accept`.
    pub delivered: u32,
    /// Bundles presented to `process`, whatever became of them.
    pub received: u32,
    /// Bundles released from the active table by custody signals.
    pub acknowledged: u32,
    /// Bundles abandoned to storage failures, drops, or flushes.
    pub lost: u32,
    /// Bundles and payloads discarded past their lifetime.
    pub expired: u32,
    /// Width of the active CID window.
    pub active: u32,
    /// Data bundles currently resident in storage.
    pub bundles: u32,
    /// Payloads currently resident in storage.
    pub payloads: u32,
    /// Custody signal records currently resident in storage.
    pub records: u32,
}
