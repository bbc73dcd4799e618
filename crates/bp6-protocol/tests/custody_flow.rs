//! End-to-end custody flows between two channels wired back to back.
//!
//! A "flight" channel stores and loads custodial bundles; a "ground" channel
//! processes them, delivers their payloads, and emits aggregate custody
//! signals that release the flight side's active table.

use std::sync::Arc;

use bp6_core::attributes::{ChannelAttributes, WrapResponse};
use bp6_core::bundle::{BundleBuilder, Reception};
use bp6_core::clock::ManualClock;
use bp6_core::types::{EventFlags, IpnAddress, Route, Timeout};
use bp6_protocol::{acs, Channel, ChannelError, Disposition};
use bp6_storage::RamProvider;

const FLIGHT: IpnAddress = IpnAddress::new(9, 1);
const GROUND: IpnAddress = IpnAddress::new(4, 2);

fn open(
    local: IpnAddress,
    destination: IpnAddress,
    attributes: ChannelAttributes,
    clock: &ManualClock,
) -> Channel<RamProvider> {
    Channel::open_with_clock(
        Route::new(local, destination),
        &RamProvider::new(256),
        attributes,
        Arc::new(clock.clone()),
    )
    .unwrap()
}

fn flight_attrs() -> ChannelAttributes {
    ChannelAttributes {
        active_table_size: 16,
        dacs_rate: 0,
        ..ChannelAttributes::default()
    }
}

fn ground_attrs() -> ChannelAttributes {
    ChannelAttributes {
        active_table_size: 16,
        dacs_rate: 5,
        ..ChannelAttributes::default()
    }
}

/// Parse a custodial data bundle (as `GROUND` would see it) and return the
/// custody id it carries.
fn wire_cid(wire: &[u8]) -> u64 {
    let receiver = BundleBuilder::new(
        Route::new(GROUND, FLIGHT),
        ChannelAttributes::default(),
    );
    let mut flags = EventFlags::new();
    match receiver.receive(wire, 0, true, &mut flags).unwrap() {
        Reception::CustodyTransfer { cid, .. } => cid,
        other => panic!("expected custody transfer, got {other:?}"),
    }
}

/// Parse an ACS bundle (as `FLIGHT` would see it) into its acknowledged CIDs.
fn acs_cids(wire: &[u8]) -> Vec<u64> {
    let receiver = BundleBuilder::new(
        Route::new(FLIGHT, GROUND),
        ChannelAttributes::default(),
    );
    let mut flags = EventFlags::new();
    match receiver.receive(wire, 0, true, &mut flags).unwrap() {
        Reception::Acknowledgment { record, .. } => {
            let mut cids = Vec::new();
            acs::read_record(
                &record,
                |cid| {
                    cids.push(cid);
                    true
                },
                &mut flags,
            )
            .unwrap();
            cids
        }
        other => panic!("expected acknowledgment, got {other:?}"),
    }
}

#[test]
fn custody_round_trip() {
    let clock = ManualClock::new(100);
    let flight = open(FLIGHT, GROUND, flight_attrs(), &clock);
    let ground = open(GROUND, FLIGHT, ground_attrs(), &clock);
    let mut flags = EventFlags::new();

    // Flight stores and emits one custodial bundle.
    flight.store(b"hello", Timeout::Check, &mut flags).unwrap();
    let wire = flight.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(wire_cid(&wire), 1);
    assert_eq!(flight.latchstats().active, 1);
    assert_eq!(flight.latchstats().bundles, 1);

    // Ground takes custody and delivers the payload.
    let disposition = ground.process(&wire, Timeout::Check, &mut flags).unwrap();
    assert_eq!(disposition, Disposition::CustodyTransfer);
    assert_eq!(ground.accept(Timeout::Check, &mut flags).unwrap(), b"hello");
    assert_eq!(ground.latchstats().delivered, 1);

    // Ground's next load produces the aggregate custody signal.
    let mut acs_flags = EventFlags::new();
    let acs_wire = ground.load(Timeout::Check, &mut acs_flags).unwrap();
    assert!(acs_flags.contains(EventFlags::ROUTE_NEEDED));
    assert_eq!(acs_cids(&acs_wire), vec![1]);

    // Processing the signal releases the flight side's bundle.
    let disposition = flight.process(&acs_wire, Timeout::Check, &mut flags).unwrap();
    assert_eq!(disposition, Disposition::Acknowledged(1));

    let stats = flight.latchstats();
    assert_eq!(stats.acknowledged, 1);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.bundles, 0);
}

#[test]
fn retransmit_rewrites_cid() {
    let clock = ManualClock::new(0);
    let mut attrs = flight_attrs();
    attrs.timeout = 2;
    let flight = open(FLIGHT, GROUND, attrs, &clock);
    let mut flags = EventFlags::new();

    flight.store(b"retry me", Timeout::Check, &mut flags).unwrap();
    let first = flight.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(wire_cid(&first), 1);

    // Not due yet at t=1.
    clock.set(1);
    assert!(matches!(
        flight.load(Timeout::Check, &mut flags),
        Err(ChannelError::Timeout)
    ));

    // Due at t=3: the same bundle goes out under a fresh custody id.
    clock.set(3);
    let second = flight.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(wire_cid(&second), 2);

    let stats = flight.latchstats();
    assert_eq!(stats.retransmitted, 1);
    assert_eq!(stats.active, 1);
    // Still exactly one copy in storage.
    assert_eq!(stats.bundles, 1);
}

#[test]
fn retransmit_reuses_cid_when_configured() {
    let clock = ManualClock::new(0);
    let mut attrs = flight_attrs();
    attrs.timeout = 2;
    attrs.cid_reuse = true;
    let flight = open(FLIGHT, GROUND, attrs, &clock);
    let mut flags = EventFlags::new();

    flight.store(b"again", Timeout::Check, &mut flags).unwrap();
    let first = flight.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(wire_cid(&first), 1);

    clock.set(3);
    let second = flight.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(wire_cid(&second), 1);
    assert_eq!(flight.latchstats().retransmitted, 1);
}

#[test]
fn wrap_drop_displaces_oldest() {
    let clock = ManualClock::new(0);
    let mut attrs = flight_attrs();
    attrs.active_table_size = 2;
    attrs.wrap_response = WrapResponse::Drop;
    let flight = open(FLIGHT, GROUND, attrs, &clock);
    let mut flags = EventFlags::new();

    for payload in [b"one", b"two", b"ten"] {
        flight.store(payload, Timeout::Check, &mut flags).unwrap();
    }

    assert_eq!(wire_cid(&flight.load(Timeout::Check, &mut flags).unwrap()), 1);
    assert_eq!(wire_cid(&flight.load(Timeout::Check, &mut flags).unwrap()), 2);

    // The third load wraps onto CID 1's slot and drops it.
    let third = flight.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(wire_cid(&third), 3);
    assert!(flags.contains(EventFlags::ACTIVE_TABLE_WRAP));

    let stats = flight.latchstats();
    assert_eq!(stats.lost, 1);
    assert_eq!(stats.transmitted, 3);
}

#[test]
fn wrap_block_returns_overflow() {
    let clock = ManualClock::new(0);
    let mut attrs = flight_attrs();
    attrs.active_table_size = 2;
    attrs.wrap_response = WrapResponse::Block;
    attrs.wrap_timeout_ms = 20;
    let flight = open(FLIGHT, GROUND, attrs, &clock);
    let mut flags = EventFlags::new();

    for payload in [b"one", b"two", b"ten"] {
        flight.store(payload, Timeout::Check, &mut flags).unwrap();
    }
    flight.load(Timeout::Check, &mut flags).unwrap();
    flight.load(Timeout::Check, &mut flags).unwrap();

    let result = flight.load(Timeout::Check, &mut flags);
    assert!(matches!(result, Err(ChannelError::Overflow)));
    assert!(flags.contains(EventFlags::ACTIVE_TABLE_WRAP));
    assert_eq!(flight.latchstats().lost, 0);
}

#[test]
fn wrap_resend_retransmits_blocking_bundle() {
    let clock = ManualClock::new(0);
    let mut attrs = flight_attrs();
    attrs.active_table_size = 2;
    attrs.wrap_response = WrapResponse::Resend;
    attrs.wrap_timeout_ms = 10;
    let flight = open(FLIGHT, GROUND, attrs, &clock);
    let mut flags = EventFlags::new();

    for payload in [b"one", b"two", b"ten"] {
        flight.store(payload, Timeout::Check, &mut flags).unwrap();
    }
    flight.load(Timeout::Check, &mut flags).unwrap();
    flight.load(Timeout::Check, &mut flags).unwrap();

    // The wrapped load re-emits the blocking bundle under CID 3 instead of
    // taking a fresh one.
    let third = flight.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(wire_cid(&third), 3);
    assert_eq!(flight.latchstats().retransmitted, 1);
    // The third stored bundle is still queued.
    assert_eq!(flight.latchstats().bundles, 3);
}

#[test]
fn acs_threshold_emits_single_record() {
    let clock = ManualClock::new(0);
    let mut attrs = ground_attrs();
    attrs.max_gaps_per_dacs = 2;
    attrs.dacs_rate = 0;
    let ground = open(GROUND, FLIGHT, attrs, &clock);
    let mut flags = EventFlags::new();

    // Receive custodial bundles carrying CIDs 1,2,3,7,8,12.
    let mut sender = BundleBuilder::new(
        Route::new(FLIGHT, GROUND),
        ChannelAttributes::default(),
    );
    for cid in [1u64, 2, 3, 7, 8, 12] {
        let mut records = sender.send(b"data", 0, true, &mut flags).unwrap();
        records[0].rewrite_cid(cid, &mut flags);
        let disposition = ground
            .process(&records[0].to_wire(), Timeout::Check, &mut flags)
            .unwrap();
        assert_eq!(disposition, Disposition::CustodyTransfer);
        sender.advance_sequence();
    }

    // Three ranges exceed the two-gap budget: one signal covers all of them.
    let acs_wire = ground.load(Timeout::Check, &mut flags).unwrap();
    assert_eq!(acs_cids(&acs_wire), vec![1, 2, 3, 7, 8, 12]);

    // Exactly one record was pending.
    assert!(matches!(
        ground.load(Timeout::Check, &mut flags),
        Err(ChannelError::Timeout)
    ));
}

#[test]
fn acknowledgment_ignores_unknown_cids() {
    let clock = ManualClock::new(100);
    let flight = open(FLIGHT, GROUND, flight_attrs(), &clock);
    let ground = open(GROUND, FLIGHT, ground_attrs(), &clock);
    let mut flags = EventFlags::new();

    flight.store(b"only one", Timeout::Check, &mut flags).unwrap();
    let wire = flight.load(Timeout::Check, &mut flags).unwrap();

    // Ground acknowledges CID 1; replaying the same signal later finds the
    // slot already vacant and acknowledges nothing.
    ground.process(&wire, Timeout::Check, &mut flags).unwrap();
    let acs_wire = ground.load(Timeout::Check, &mut flags).unwrap();

    assert_eq!(
        flight.process(&acs_wire, Timeout::Check, &mut flags).unwrap(),
        Disposition::Acknowledged(1)
    );
    assert_eq!(
        flight.process(&acs_wire, Timeout::Check, &mut flags).unwrap(),
        Disposition::Acknowledged(0)
    );
    assert_eq!(flight.latchstats().acknowledged, 1);
}

#[test]
fn expired_inbound_bundle_counted() {
    let clock = ManualClock::new(1000);
    let flight = open(FLIGHT, GROUND, flight_attrs(), &clock);
    let ground = open(GROUND, FLIGHT, ground_attrs(), &clock);
    let mut flags = EventFlags::new();

    let mut val = 10;
    flight
        .config(bp6_protocol::OptMode::Write, bp6_protocol::Opt::Lifetime, &mut val)
        .unwrap();

    flight.store(b"stale", Timeout::Check, &mut flags).unwrap();
    let wire = flight.load(Timeout::Check, &mut flags).unwrap();

    clock.advance(100);
    let disposition = ground.process(&wire, Timeout::Check, &mut flags).unwrap();
    assert_eq!(disposition, Disposition::Expired);
    assert_eq!(ground.latchstats().expired, 1);
    assert_eq!(ground.latchstats().received, 1);
}

#[test]
fn blocked_load_woken_by_acknowledgment() {
    let clock = ManualClock::new(100);
    let mut attrs = flight_attrs();
    attrs.active_table_size = 1;
    attrs.timeout = 0;
    attrs.wrap_response = WrapResponse::Block;
    attrs.wrap_timeout_ms = 5000;
    let flight = Arc::new(open(FLIGHT, GROUND, attrs, &clock));
    let ground = open(GROUND, FLIGHT, ground_attrs(), &clock);
    let mut flags = EventFlags::new();

    flight.store(b"first", Timeout::Check, &mut flags).unwrap();
    flight.store(b"second", Timeout::Check, &mut flags).unwrap();

    let first = flight.load(Timeout::Check, &mut flags).unwrap();
    ground.process(&first, Timeout::Check, &mut flags).unwrap();
    let acs_wire = ground.load(Timeout::Check, &mut flags).unwrap();

    // The second load wraps on the single-slot table and parks on the
    // condvar until the acknowledgment lands.
    let loader = {
        let flight = Arc::clone(&flight);
        std::thread::spawn(move || {
            let mut flags = EventFlags::new();
            flight.load(Timeout::Check, &mut flags)
        })
    };

    std::thread::sleep(std::time::Duration::from_millis(50));
    flight.process(&acs_wire, Timeout::Check, &mut flags).unwrap();

    let second = loader.join().unwrap().unwrap();
    assert_eq!(wire_cid(&second), 2);
}
