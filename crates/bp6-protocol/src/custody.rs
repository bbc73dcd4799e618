//! Aggregate custody signal engine.
//!
//! Collects the custody ids of received custodial bundles into a range set
//! and periodically drains the set into ACS record bundles bound for the
//! current custodian. Emission happens when the set fills, when the
//! custodian changes, when the configured rate elapses, or on an explicit
//! flush. The emitted records are ordinary admin-record bundles enqueued to
//! the channel's record store for the next `load`.

use bp6_core::bundle::BundleBuilder;
use bp6_core::types::{BpVal, EventFlags, IpnAddress, Route, Timeout};
use bp6_storage::StorageService;

use crate::acs;
use crate::error::ChannelError;
use crate::range_set::{RangeSet, RangeSetError};
use crate::stats::ChannelStats;

use bp6_core::attributes::ChannelAttributes;

/// Custody aggregation state for one channel.
pub struct CustodyEngine {
    builder: BundleBuilder,
    set: RangeSet,
    recbuf: Vec<u8>,
    last_sent: BpVal,
}

impl CustodyEngine {
    /// Custody signals are admin records that never themselves request
    /// custody; the destination is filled in when the first custodial
    /// bundle names its custodian.
    pub fn new(route: Route, attributes: &ChannelAttributes) -> Result<Self, RangeSetError> {
        let mut dacs_attributes = attributes.clone();
        dacs_attributes.request_custody = false;
        dacs_attributes.admin_record = true;

        let mut dacs_route = route;
        dacs_route.destination = IpnAddress::NULL;

        // Tracking `max_gaps` gaps takes one more range than gaps.
        let arena = attributes.max_gaps_per_dacs as usize + 1;

        Ok(Self {
            builder: BundleBuilder::new(dacs_route, dacs_attributes),
            set: RangeSet::new(arena)?,
            recbuf: vec![0; acs::record_capacity(attributes.max_fills_per_dacs)],
            last_sent: 0,
        })
    }

    /// Seconds between forced emissions; 0 disables the timer.
    pub fn dacs_rate(&self) -> BpVal {
        self.builder.attributes.dacs_rate
    }

    pub fn set_dacs_rate(&mut self, rate: BpVal) {
        self.builder.attributes.dacs_rate = rate;
    }

    /// Number of CID ranges awaiting acknowledgment.
    pub fn pending(&self) -> usize {
        self.set.len()
    }

    /// Record custody of a received bundle's CID.
    ///
    /// A full set is flushed and the insert retried; a custodian change
    /// flushes whatever was aggregated for the previous custodian and
    /// retargets the signal bundle. Duplicate CIDs are reported through the
    /// flags word and otherwise ignored.
    pub fn take<S: StorageService>(
        &mut self,
        store: &S,
        custodian: IpnAddress,
        cid: BpVal,
        now: BpVal,
        reliable: bool,
        stats: &mut ChannelStats,
        flags: &mut EventFlags,
    ) -> Result<(), ChannelError> {
        if self.builder.route().destination != custodian {
            if !self.set.is_empty() {
                // Emission failures are advisory here; the aggregation must
                // retarget regardless.
                let _ = self.flush(store, now, reliable, stats, flags);
            }
            tracing::debug!(%custodian, "custody signals retargeted");
            self.builder.retarget(custodian);
        }

        match self.set.insert(cid) {
            Ok(()) => Ok(()),
            Err(RangeSetError::Duplicate) => {
                flags.raise(EventFlags::DUPLICATES);
                Ok(())
            }
            Err(RangeSetError::Full) => {
                flags.raise(EventFlags::CUSTODY_FULL);
                let _ = self.flush(store, now, reliable, stats, flags);
                // The set just drained; a second failure means the
                // bookkeeping is broken.
                self.set.insert(cid).map_err(|_| ChannelError::Response)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Emit pending acknowledgments if a threshold is met: the gap budget
    /// is reached, or the rate timer has elapsed (rate 0 disables it).
    pub fn flush_due<S: StorageService>(
        &mut self,
        store: &S,
        now: BpVal,
        reliable: bool,
        stats: &mut ChannelStats,
        flags: &mut EventFlags,
    ) {
        if self.set.is_empty() {
            return;
        }
        let rate = self.dacs_rate();
        let timer_due = rate > 0 && now >= self.last_sent + rate;
        let gaps_full = self.set.len() >= self.builder.attributes.max_gaps_per_dacs as usize;
        if timer_due || gaps_full {
            let _ = self.flush(store, now, reliable, stats, flags);
        }
    }

    /// Drain the whole set into ACS record bundles.
    ///
    /// One record covers up to the fill budget; larger sets produce several
    /// bundles. The first storage failure is returned after the drain
    /// completes, with each dropped record counted lost.
    pub fn flush<S: StorageService>(
        &mut self,
        store: &S,
        now: BpVal,
        reliable: bool,
        stats: &mut ChannelStats,
        flags: &mut EventFlags,
    ) -> Result<(), ChannelError> {
        let max_fills = self.builder.attributes.max_fills_per_dacs;
        let mut result = Ok(());

        while !self.set.is_empty() {
            let size = acs::write_record(&mut self.recbuf, &mut self.set, max_fills, flags)?;

            let bundles = self
                .builder
                .send(&self.recbuf[..size], now, reliable, flags)?;

            let mut committed = true;
            for bundle in &bundles {
                let bytes = bundle
                    .to_bytes()
                    .map_err(|e| ChannelError::Record(e.to_string()))?;
                if let Err(e) = store.enqueue(&bytes, Timeout::Check) {
                    tracing::warn!(error = %e, "failed to store custody signal");
                    flags.raise(EventFlags::STORE_FAILURE);
                    stats.lost += 1;
                    committed = false;
                    if result.is_ok() {
                        result = Err(ChannelError::Store(e));
                    }
                }
            }

            if committed {
                self.builder.advance_sequence();
                self.last_sent = now;
                tracing::debug!(size, destination = %self.builder.route().destination, "custody signal enqueued");
            }
        }

        result
    }
}
