//! Channel engine: the top-level store/load/process/accept flow.
//!
//! A channel owns three storage queues (data bundles, inbound payloads,
//! custody signal records), the bundle builder with its prebuilt header, the
//! custody engine, and the active table of in-flight bundles. One lock plus
//! a condition variable guard the active table and CID window; `process`
//! signals the condvar when acknowledgments free slots so a `load` blocked
//! on table wrap can continue.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use bp6_core::attributes::{ChannelAttributes, WrapResponse};
use bp6_core::bundle::{BundleBuilder, BundleRecord, PayloadRecord, Reception};
use bp6_core::clock::{Clock, SystemClock};
use bp6_core::types::{BpVal, EventFlags, Route, Timeout};
use bp6_storage::{Sid, StorageProvider, StorageService, StoreError, StoreKind};

use crate::acs;
use crate::active_table::{ActiveBundle, ActiveTable, ActiveTableError};
use crate::custody::CustodyEngine;
use crate::error::ChannelError;
use crate::stats::ChannelStats;

/// What `process` concluded about a received bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Payload stored for `accept`; no custody requested.
    Delivered,
    /// Payload stored and its CID recorded for a future custody signal.
    CustodyTransfer,
    /// The bundle was a custody signal; this many bundles were released.
    Acknowledged(u32),
    /// The bundle's lifetime had already elapsed.
    Expired,
}

/// Configuration access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptMode {
    Read,
    Write,
}

/// Runtime-configurable channel options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opt {
    Lifetime,
    RequestCustody,
    AdminRecord,
    IntegrityCheck,
    AllowFragmentation,
    IgnoreExpiration,
    CidReuse,
    CipherSuite,
    ClassOfService,
    Timeout,
    MaxLength,
    WrapResponse,
    DacsRate,
}

/// Where a loaded bundle came from.
enum Source {
    /// A pending custody signal record.
    Record,
    /// A fresh bundle dequeued from the bundle store.
    Fresh,
    /// A timed-out bundle being sent again. `reused_cid` is set when the
    /// original custody id stays on the wire.
    Retransmit { reused_cid: Option<BpVal> },
}

/// A bundle chosen by the load scan, not yet emitted.
struct Selected {
    record: BundleRecord,
    sid: Sid,
    source: Source,
    from_records: bool,
    now: BpVal,
}

/// A bundle protocol endpoint channel.
pub struct Channel<P: StorageProvider> {
    bundle_store: P::Service,
    payload_store: P::Service,
    record_store: P::Service,
    builder: Mutex<BundleBuilder>,
    custody: Mutex<CustodyEngine>,
    active: Mutex<ActiveTable>,
    relief: Condvar,
    stats: Mutex<ChannelStats>,
    clock: Arc<dyn Clock>,
}

impl<P: StorageProvider> Channel<P> {
    /// Open a channel against the given storage provider.
    pub fn open(
        route: Route,
        provider: &P,
        attributes: ChannelAttributes,
    ) -> Result<Self, ChannelError> {
        Self::open_with_clock(route, provider, attributes, Arc::new(SystemClock))
    }

    /// Open a channel with an explicit time source.
    pub fn open_with_clock(
        route: Route,
        provider: &P,
        attributes: ChannelAttributes,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChannelError> {
        if attributes.timeout > 0 && attributes.active_table_size == 0 {
            return Err(ChannelError::Parameter(
                "active table size must be nonzero when a timeout is set",
            ));
        }

        let bundle_store = provider.create(StoreKind::Bundles, route.local)?;
        let payload_store = provider.create(StoreKind::Payloads, route.local)?;
        let record_store = provider.create(StoreKind::Records, route.local)?;
        let custody = CustodyEngine::new(route, &attributes)?;
        let table = ActiveTable::new(attributes.active_table_size);

        tracing::debug!(
            local = %route.local,
            destination = %route.destination,
            table_size = attributes.active_table_size,
            "channel opened"
        );

        Ok(Self {
            bundle_store,
            payload_store,
            record_store,
            builder: Mutex::new(BundleBuilder::new(route, attributes)),
            custody: Mutex::new(custody),
            active: Mutex::new(table),
            relief: Condvar::new(),
            stats: Mutex::new(ChannelStats::default()),
            clock,
        })
    }

    // ------------------------------------------------------------------ //
    // Small internals
    // ------------------------------------------------------------------ //

    fn builder(&self) -> MutexGuard<'_, BundleBuilder> {
        self.builder.lock().expect("builder lock poisoned")
    }

    fn custody(&self) -> MutexGuard<'_, CustodyEngine> {
        self.custody.lock().expect("custody lock poisoned")
    }

    fn active(&self) -> MutexGuard<'_, ActiveTable> {
        self.active.lock().expect("active table lock poisoned")
    }

    fn stats(&self) -> MutexGuard<'_, ChannelStats> {
        self.stats.lock().expect("stats lock poisoned")
    }

    /// Current time plus whether the reading can be trusted. An untrusted
    /// reading raises `UNRELIABLE_TIME` and substitutes zero.
    fn time(&self, flags: &mut EventFlags) -> (BpVal, bool) {
        match self.clock.now() {
            Ok(now) => (now, true),
            Err(_) => {
                flags.raise(EventFlags::UNRELIABLE_TIME);
                (0, false)
            }
        }
    }

    fn outbound_store(&self, from_records: bool) -> &P::Service {
        if from_records {
            &self.record_store
        } else {
            &self.bundle_store
        }
    }

    // ------------------------------------------------------------------ //
    // store
    // ------------------------------------------------------------------ //

    /// Encode an application payload as a bundle and commit it to storage.
    pub fn store(
        &self,
        payload: &[u8],
        timeout: Timeout,
        flags: &mut EventFlags,
    ) -> Result<(), ChannelError> {
        let (now, reliable) = self.time(flags);

        let mut builder = self.builder();
        let records = builder.send(payload, now, reliable, flags)?;

        let mut stored = 0u32;
        for record in &records {
            let bytes = record
                .to_bytes()
                .map_err(|e| ChannelError::Record(e.to_string()))?;
            match self.bundle_store.enqueue(&bytes, timeout) {
                Ok(()) => stored += 1,
                Err(StoreError::Timeout) | Err(StoreError::Full { .. }) => {
                    self.stats().generated += stored;
                    return Err(ChannelError::Timeout);
                }
                Err(e) => {
                    flags.raise(EventFlags::STORE_FAILURE);
                    self.stats().generated += stored;
                    return Err(ChannelError::Store(e));
                }
            }
        }
        builder.advance_sequence();
        drop(builder);

        self.stats().generated += stored;
        Ok(())
    }

    // ------------------------------------------------------------------ //
    // load
    // ------------------------------------------------------------------ //

    /// Produce the next wire-ready bundle, allocating the output buffer.
    pub fn load(&self, timeout: Timeout, flags: &mut EventFlags) -> Result<Vec<u8>, ChannelError> {
        let selected = self.select(timeout, flags)?;
        let record = self.emit(selected, None, flags)?;
        Ok(record.to_wire())
    }

    /// Produce the next wire-ready bundle into a caller buffer.
    ///
    /// Returns the number of bytes written. A buffer smaller than the chosen
    /// bundle fails with `BundleTooLarge` and the bundle is abandoned.
    pub fn load_into(
        &self,
        out: &mut [u8],
        timeout: Timeout,
        flags: &mut EventFlags,
    ) -> Result<usize, ChannelError> {
        let selected = self.select(timeout, flags)?;
        let record = self.emit(selected, Some(out.len()), flags)?;
        Ok(record.copy_to(out))
    }

    /// Steps 1–3 of the load algorithm: pick the bundle to send.
    fn select(&self, timeout: Timeout, flags: &mut EventFlags) -> Result<Selected, ChannelError> {
        let (now, reliable) = self.time(flags);

        // Pending custody signals go out first.
        {
            let mut custody = self.custody();
            let mut stats = self.stats();
            custody.flush_due(&self.record_store, now, reliable, &mut stats, flags);
        }
        match self.record_store.dequeue(Timeout::Check) {
            Ok(object) => {
                let record = match BundleRecord::from_bytes(&object.data) {
                    Ok(record) => record,
                    Err(e) => {
                        let _ = self.record_store.relinquish(object.sid);
                        return Err(ChannelError::Record(e.to_string()));
                    }
                };
                flags.raise(EventFlags::ROUTE_NEEDED);
                return Ok(Selected {
                    record,
                    sid: object.sid,
                    source: Source::Record,
                    from_records: true,
                    now,
                });
            }
            Err(StoreError::Timeout) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to dequeue custody signal");
                flags.raise(EventFlags::STORE_FAILURE);
            }
        }

        // Then the active table: expired entries are culled, timed-out
        // entries retransmitted, and the window checked for wrap before any
        // fresh bundle is taken.
        let attrs = self.builder().attributes.clone();
        if let Some(selected) = self.scan_active(&attrs, now, flags)? {
            return Ok(selected);
        }

        // Finally a fresh bundle from the bundle store.
        loop {
            match self.bundle_store.dequeue(timeout) {
                Ok(object) => {
                    let Ok(record) = BundleRecord::from_bytes(&object.data) else {
                        let _ = self.bundle_store.relinquish(object.sid);
                        self.stats().lost += 1;
                        flags.raise(EventFlags::STORE_FAILURE);
                        continue;
                    };
                    if record.exprtime != 0 && now >= record.exprtime {
                        let _ = self.bundle_store.relinquish(object.sid);
                        self.stats().expired += 1;
                        continue;
                    }
                    return Ok(Selected {
                        record,
                        sid: object.sid,
                        source: Source::Fresh,
                        from_records: false,
                        now,
                    });
                }
                Err(StoreError::Timeout) => return Err(ChannelError::Timeout),
                Err(e) => {
                    flags.raise(EventFlags::STORE_FAILURE);
                    return Err(ChannelError::Store(e));
                }
            }
        }
    }

    /// Walk the active window from the oldest CID looking for a retransmit
    /// candidate; enforce wrap safety when the oldest live entry is not due.
    fn scan_active(
        &self,
        attrs: &ChannelAttributes,
        now: BpVal,
        flags: &mut EventFlags,
    ) -> Result<Option<Selected>, ChannelError> {
        let wrap_wait = Duration::from_millis(u64::from(attrs.wrap_timeout_ms));
        let mut table = self.active();

        loop {
            if table.oldest_cid() == table.newest_cid() {
                return Ok(None);
            }

            let oldest = table.oldest_cid();
            let Some(entry) = table.occupant(oldest) else {
                table.advance_oldest();
                continue;
            };

            // The entry is the oldest in-flight bundle. Fetch it to check
            // lifetime before deciding whether it is due for retransmit.
            let record = match self.bundle_store.retrieve(entry.sid, Timeout::Check) {
                Ok(object) => match BundleRecord::from_bytes(&object.data) {
                    Ok(record) => record,
                    Err(_) => {
                        self.drop_entry(&mut table, entry, flags);
                        continue;
                    }
                },
                Err(_) => {
                    self.drop_entry(&mut table, entry, flags);
                    continue;
                }
            };

            if record.exprtime != 0 && now >= record.exprtime {
                let _ = self.bundle_store.relinquish(entry.sid);
                table.remove(entry.cid);
                table.advance_oldest();
                self.stats().expired += 1;
                continue;
            }

            if attrs.timeout != 0 && now >= entry.retx + attrs.timeout {
                self.stats().retransmitted += 1;
                table.advance_oldest();
                let reused_cid = if attrs.cid_reuse {
                    Some(entry.cid)
                } else {
                    table.remove(entry.cid);
                    None
                };
                tracing::debug!(cid = entry.cid, reuse = attrs.cid_reuse, "retransmit");
                return Ok(Some(Selected {
                    record,
                    sid: entry.sid,
                    source: Source::Retransmit { reused_cid },
                    from_records: false,
                    now,
                }));
            }

            // Oldest live entry still waiting for its acknowledgment. A new
            // bundle needs the slot at the next CID; if that slot is taken
            // the table has wrapped.
            if table.available(table.newest_cid()) {
                return Ok(None);
            }
            flags.raise(EventFlags::ACTIVE_TABLE_WRAP);

            match attrs.wrap_response {
                WrapResponse::Resend => {
                    table.advance_oldest();
                    let Some(blocker) = table.occupant(table.newest_cid()) else {
                        continue;
                    };
                    match self.bundle_store.retrieve(blocker.sid, Timeout::Check) {
                        Ok(object) => match BundleRecord::from_bytes(&object.data) {
                            Ok(record) => {
                                if record.exprtime != 0 && now >= record.exprtime {
                                    let _ = self.bundle_store.relinquish(blocker.sid);
                                    table.remove(blocker.cid);
                                    self.stats().expired += 1;
                                    continue;
                                }
                                self.stats().retransmitted += 1;
                                table.remove(blocker.cid);
                                tracing::debug!(cid = blocker.cid, "wrap: resending blocking bundle");
                                // Give an in-flight acknowledgment a chance
                                // to land before the slot is reused.
                                let (guard, _) = self
                                    .relief
                                    .wait_timeout(table, wrap_wait)
                                    .expect("active table lock poisoned");
                                drop(guard);
                                return Ok(Some(Selected {
                                    record,
                                    sid: blocker.sid,
                                    source: Source::Retransmit { reused_cid: None },
                                    from_records: false,
                                    now,
                                }));
                            }
                            Err(_) => {
                                self.drop_entry(&mut table, blocker, flags);
                                continue;
                            }
                        },
                        Err(_) => {
                            self.drop_entry(&mut table, blocker, flags);
                            continue;
                        }
                    }
                }
                WrapResponse::Block => {
                    let (guard, _) = self
                        .relief
                        .wait_timeout(table, wrap_wait)
                        .expect("active table lock poisoned");
                    table = guard;
                    if table.available(table.newest_cid()) {
                        return Ok(None);
                    }
                    tracing::debug!("wrap: no relief before timeout");
                    return Err(ChannelError::Overflow);
                }
                WrapResponse::Drop => {
                    table.advance_oldest();
                    if let Some(blocker) = table.occupant(table.newest_cid()) {
                        let _ = self.bundle_store.relinquish(blocker.sid);
                        table.remove(blocker.cid);
                        self.stats().lost += 1;
                        tracing::debug!(cid = blocker.cid, "wrap: dropped blocking bundle");
                    }
                    continue;
                }
            }
        }
    }

    /// Cull an active entry whose stored bundle is gone or unreadable.
    fn drop_entry(&self, table: &mut ActiveTable, entry: ActiveBundle, flags: &mut EventFlags) {
        let _ = self.bundle_store.relinquish(entry.sid);
        table.remove(entry.cid);
        if table.oldest_cid() == entry.cid {
            table.advance_oldest();
        }
        self.stats().lost += 1;
        flags.raise(EventFlags::STORE_FAILURE);
        tracing::warn!(cid = entry.cid, "lost bundle dropped from active table");
    }

    /// Step 4 of the load algorithm: assign or refresh the custody id and
    /// hand the bundle over.
    fn emit(
        &self,
        selected: Selected,
        capacity: Option<usize>,
        flags: &mut EventFlags,
    ) -> Result<BundleRecord, ChannelError> {
        let Selected {
            mut record,
            sid,
            source,
            from_records,
            now,
        } = selected;

        let size = record.wire_size();
        if let Some(capacity) = capacity {
            if capacity < size {
                let _ = self.outbound_store(from_records).relinquish(sid);
                self.stats().lost += 1;
                return Err(ChannelError::BundleTooLarge { size, capacity });
            }
        }

        if record.requests_custody() {
            let mut table = self.active();
            match source {
                Source::Retransmit {
                    reused_cid: Some(cid),
                } => {
                    // Same CID as the original transmission; the stored
                    // image still carries the placeholder, so patch the
                    // outgoing copy only.
                    record.rewrite_cid(cid, flags);
                    table.touch(cid, now);
                }
                _ => {
                    let cid = table.newest_cid();
                    record.rewrite_cid(cid, flags);
                    match table.add(ActiveBundle { sid, retx: now, cid }, false) {
                        Ok(()) => {}
                        Err(ActiveTableError::DuplicateCid(_)) => {
                            flags.raise(EventFlags::DUPLICATES);
                        }
                        Err(ActiveTableError::SlotOccupied { occupant, .. }) => {
                            // A stale entry left behind by CID reuse still
                            // holds the slot; displace it.
                            if let Some(stale) = table.remove(occupant) {
                                let _ = self.bundle_store.relinquish(stale.sid);
                                self.stats().lost += 1;
                            }
                            let _ = table.add(ActiveBundle { sid, retx: now, cid }, false);
                            flags.raise(EventFlags::ACTIVE_TABLE_WRAP);
                        }
                    }
                    tracing::trace!(cid, "custody id assigned");
                }
            }
        }

        self.stats().transmitted += 1;

        // Without custody transfer nothing will ever acknowledge the bundle;
        // its storage ends here.
        if !record.requests_custody() {
            let _ = self.outbound_store(from_records).relinquish(sid);
        }

        Ok(record)
    }

    // ------------------------------------------------------------------ //
    // process
    // ------------------------------------------------------------------ //

    /// Decode and act on a received bundle.
    pub fn process(
        &self,
        bundle: &[u8],
        timeout: Timeout,
        flags: &mut EventFlags,
    ) -> Result<Disposition, ChannelError> {
        self.stats().received += 1;
        let (now, reliable) = self.time(flags);

        let reception = self.builder().receive(bundle, now, reliable, flags)?;

        match reception {
            Reception::Expired => {
                self.stats().expired += 1;
                Ok(Disposition::Expired)
            }
            Reception::Acknowledgment { record, .. } => {
                let mut table = self.active();
                let count = acs::read_record(
                    &record,
                    |cid| match table.remove(cid) {
                        Some(entry) => {
                            let _ = self.bundle_store.relinquish(entry.sid);
                            true
                        }
                        None => false,
                    },
                    flags,
                )?;
                self.stats().acknowledged += count;
                drop(table);

                // Wake any load() waiting out a table wrap.
                self.relief.notify_all();
                tracing::debug!(count, "custody signal processed");
                Ok(Disposition::Acknowledged(count))
            }
            Reception::CustodyTransfer {
                custodian,
                cid,
                payload,
            } => {
                self.deliver(payload, timeout, flags)?;

                let mut custody = self.custody();
                let mut stats = self.stats();
                custody.take(
                    &self.record_store,
                    custodian,
                    cid,
                    now,
                    reliable,
                    &mut stats,
                    flags,
                )?;
                Ok(Disposition::CustodyTransfer)
            }
            Reception::Delivered { payload } => {
                self.deliver(payload, timeout, flags)?;
                Ok(Disposition::Delivered)
            }
        }
    }

    /// Queue a received payload for `accept`.
    fn deliver(
        &self,
        payload: PayloadRecord,
        timeout: Timeout,
        flags: &mut EventFlags,
    ) -> Result<(), ChannelError> {
        let bytes = payload
            .to_bytes()
            .map_err(|e| ChannelError::Record(e.to_string()))?;
        self.payload_store.enqueue(&bytes, timeout).map_err(|e| {
            flags.raise(EventFlags::STORE_FAILURE);
            self.stats().lost += 1;
            ChannelError::Store(e)
        })
    }

    // ------------------------------------------------------------------ //
    // accept
    // ------------------------------------------------------------------ //

    /// Dequeue the next payload, allocating the output buffer.
    pub fn accept(&self, timeout: Timeout, flags: &mut EventFlags) -> Result<Vec<u8>, ChannelError> {
        let (sid, record) = self.take_payload(timeout, flags)?;
        let _ = self.payload_store.relinquish(sid);
        self.stats().delivered += 1;
        Ok(record.bytes)
    }

    /// Dequeue the next payload into a caller buffer.
    pub fn accept_into(
        &self,
        out: &mut [u8],
        timeout: Timeout,
        flags: &mut EventFlags,
    ) -> Result<usize, ChannelError> {
        let (sid, record) = self.take_payload(timeout, flags)?;
        let size = record.bytes.len();
        if out.len() < size {
            let _ = self.payload_store.relinquish(sid);
            self.stats().lost += 1;
            return Err(ChannelError::PayloadTooLarge {
                size,
                capacity: out.len(),
            });
        }
        out[..size].copy_from_slice(&record.bytes);
        let _ = self.payload_store.relinquish(sid);
        self.stats().delivered += 1;
        Ok(size)
    }

    fn take_payload(
        &self,
        timeout: Timeout,
        flags: &mut EventFlags,
    ) -> Result<(Sid, PayloadRecord), ChannelError> {
        loop {
            match self.payload_store.dequeue(timeout) {
                Ok(object) => {
                    let Ok(record) = PayloadRecord::from_bytes(&object.data) else {
                        let _ = self.payload_store.relinquish(object.sid);
                        self.stats().lost += 1;
                        flags.raise(EventFlags::STORE_FAILURE);
                        continue;
                    };

                    let (now, reliable) = self.time(flags);
                    let now = if reliable { now } else { 0 };
                    if record.exprtime != 0 && record.exprtime <= now {
                        let _ = self.payload_store.relinquish(object.sid);
                        self.stats().expired += 1;
                        continue;
                    }
                    return Ok((object.sid, record));
                }
                Err(StoreError::Timeout) => return Err(ChannelError::Timeout),
                Err(e) => {
                    flags.raise(EventFlags::STORE_FAILURE);
                    self.stats().lost += 1;
                    return Err(ChannelError::Store(e));
                }
            }
        }
    }

    // ------------------------------------------------------------------ //
    // flush / stats / config
    // ------------------------------------------------------------------ //

    /// Abandon every in-flight bundle and close the CID window.
    ///
    /// Returns the number of bundles dropped.
    pub fn flush(&self) -> usize {
        let mut table = self.active();
        let dropped = table.drain(|entry| {
            let _ = self.bundle_store.relinquish(entry.sid);
        });
        self.stats().lost += dropped as u32;
        drop(table);

        self.relief.notify_all();
        tracing::debug!(dropped, "active table flushed");
        dropped
    }

    /// Snapshot the channel statistics.
    pub fn latchstats(&self) -> ChannelStats {
        let mut stats = *self.stats();
        let table = self.active();
        stats.active = (table.newest_cid() - table.oldest_cid()) as u32;
        drop(table);

        stats.bundles = self.bundle_store.count() as u32;
        stats.payloads = self.payload_store.count() as u32;
        stats.records = self.record_store.count() as u32;
        stats
    }

    /// Read or write one integer-valued channel option.
    ///
    /// Writes validate their range and invalidate the prebuilt header so the
    /// next `store` re-encodes it.
    pub fn config(&self, mode: OptMode, opt: Opt, val: &mut i64) -> Result<(), ChannelError> {
        let write = mode == OptMode::Write;

        if opt == Opt::DacsRate {
            let mut custody = self.custody();
            if write {
                custody.set_dacs_rate(non_negative(*val, "dacs_rate")?);
            } else {
                *val = custody.dacs_rate() as i64;
            }
        } else {
            let mut builder = self.builder();
            let attrs = &mut builder.attributes;
            match opt {
                Opt::Lifetime => {
                    if write {
                        attrs.lifetime = non_negative(*val, "lifetime")?;
                    } else {
                        *val = attrs.lifetime as i64;
                    }
                }
                Opt::RequestCustody => rw_bool(&mut attrs.request_custody, val, write, "request_custody")?,
                Opt::AdminRecord => rw_bool(&mut attrs.admin_record, val, write, "admin_record")?,
                Opt::IntegrityCheck => rw_bool(&mut attrs.integrity_check, val, write, "integrity_check")?,
                Opt::AllowFragmentation => {
                    rw_bool(&mut attrs.allow_fragmentation, val, write, "allow_fragmentation")?
                }
                Opt::IgnoreExpiration => {
                    rw_bool(&mut attrs.ignore_expiration, val, write, "ignore_expiration")?
                }
                Opt::CidReuse => rw_bool(&mut attrs.cid_reuse, val, write, "cid_reuse")?,
                Opt::CipherSuite => {
                    if write {
                        attrs.cipher_suite = non_negative(*val, "cipher_suite")?;
                    } else {
                        *val = attrs.cipher_suite as i64;
                    }
                }
                Opt::ClassOfService => {
                    if write {
                        attrs.class_of_service =
                            u8::try_from(*val).map_err(|_| ChannelError::Parameter("class_of_service"))?;
                    } else {
                        *val = i64::from(attrs.class_of_service);
                    }
                }
                Opt::Timeout => {
                    if write {
                        attrs.timeout = non_negative(*val, "timeout")?;
                    } else {
                        *val = attrs.timeout as i64;
                    }
                }
                Opt::MaxLength => {
                    if write {
                        attrs.max_length = usize::try_from(*val)
                            .map_err(|_| ChannelError::Parameter("max_length"))?;
                    } else {
                        *val = attrs.max_length as i64;
                    }
                }
                Opt::WrapResponse => {
                    if write {
                        attrs.wrap_response = match *val {
                            0 => WrapResponse::Resend,
                            1 => WrapResponse::Block,
                            2 => WrapResponse::Drop,
                            _ => return Err(ChannelError::Parameter("wrap_response")),
                        };
                    } else {
                        *val = match attrs.wrap_response {
                            WrapResponse::Resend => 0,
                            WrapResponse::Block => 1,
                            WrapResponse::Drop => 2,
                        };
                    }
                }
                Opt::DacsRate => unreachable!("handled above"),
            }
        }

        if write {
            self.builder().invalidate();
        }
        Ok(())
    }
}

fn non_negative(val: i64, name: &'static str) -> Result<u64, ChannelError> {
    u64::try_from(val).map_err(|_| ChannelError::Parameter(name))
}

fn rw_bool(
    field: &mut bool,
    val: &mut i64,
    write: bool,
    name: &'static str,
) -> Result<(), ChannelError> {
    if write {
        *field = match *val {
            0 => false,
            1 => true,
            _ => return Err(ChannelError::Parameter(name)),
        };
    } else {
        *val = i64::from(*field);
    }
    Ok(())
}
