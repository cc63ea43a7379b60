//! A network interface connecting IP (the internet layer) with Ethernet
//! (the link layer).
//!
//! The interface translates datagrams coming from its customer (a TCP/IP
//! stack, or a router) into Ethernet frames, resolving next-hop hardware
//! addresses with ARP. In the opposite direction it accepts Ethernet
//! frames, passing IPv4 payloads up the stack and learning from or replying
//! to ARP packets. The same type is used repeatedly inside a
//! [`Router`](crate::Router), which is little more than a bundle of
//! interfaces plus a forwarding table.

use super::arp::{ArpPacket, Operation};
use super::ethernet::{
    EthernetAddress, EthernetFrame, EthernetHeader, ETHERTYPE_ARP, ETHERTYPE_IPV4,
};
use crate::ipv4::{Ipv4Address, Ipv4Datagram};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// How long a learned IP-to-Ethernet mapping stays usable.
pub const MAPPING_CACHE_DURATION_MS: u64 = 30_000;
/// How long before an unanswered ARP request may be repeated, and how long
/// a datagram waits for resolution before being dropped.
pub const ARP_RESEND_TIMEOUT_MS: u64 = 5_000;

/// The physical output port where an interface sends Ethernet frames.
///
/// Implementers connect this to a NIC, a simulated wire, or a test
/// harness. `transmit` is called synchronously from inside the interface's
/// methods and must not re-enter the sending interface with mutating
/// calls; queue frames for later if needed.
pub trait OutputPort {
    fn transmit(&mut self, sender: &NetworkInterface, frame: &EthernetFrame);
}

/// A learned IP-to-Ethernet mapping, aged by `tick`.
#[derive(Debug, Clone, Copy)]
struct CachedMapping {
    age_ms: u64,
    address: EthernetAddress,
}

/// A datagram parked while its next hop resolves.
#[derive(Debug)]
struct PendingDatagram {
    age_ms: u64,
    datagram: Ipv4Datagram,
}

/// Everything queued behind one unresolved next-hop address.
#[derive(Debug, Default)]
struct PendingEntry {
    /// Milliseconds since we last broadcast a request for this address, or
    /// `None` once the cooldown has elapsed and a rebroadcast is allowed.
    request_age_ms: Option<u64>,
    datagrams: Vec<PendingDatagram>,
}

/// IP-over-Ethernet with an ARP cache and pending-datagram queueing.
pub struct NetworkInterface {
    /// Human-readable name of the interface.
    name: String,
    port: Rc<RefCell<dyn OutputPort>>,
    ethernet_address: EthernetAddress,
    ip_address: Ipv4Address,
    /// Datagrams addressed to us, awaiting pickup by the customer.
    datagrams_received: VecDeque<Ipv4Datagram>,
    arp_cache: FxHashMap<u32, CachedMapping>,
    pending: FxHashMap<u32, PendingEntry>,
}

impl NetworkInterface {
    pub fn new(
        name: impl Into<String>,
        port: Rc<RefCell<dyn OutputPort>>,
        ethernet_address: EthernetAddress,
        ip_address: Ipv4Address,
    ) -> Self {
        let name = name.into();
        tracing::debug!(
            name = %name,
            ethernet = %ethernet_address,
            ip = %ip_address,
            "network interface up"
        );
        Self {
            name,
            port,
            ethernet_address,
            ip_address,
            datagrams_received: VecDeque::new(),
            arp_cache: FxHashMap::default(),
            pending: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ethernet_address(&self) -> EthernetAddress {
        self.ethernet_address
    }

    pub fn ip_address(&self) -> Ipv4Address {
        self.ip_address
    }

    /// The shared output port, for diagnostics or wiring.
    pub fn output(&self) -> Rc<RefCell<dyn OutputPort>> {
        self.port.clone()
    }

    /// Datagrams addressed to this interface, in arrival order.
    pub fn datagrams_received(&mut self) -> &mut VecDeque<Ipv4Datagram> {
        &mut self.datagrams_received
    }

    /// Sends a datagram toward `next_hop`, encapsulated in an Ethernet
    /// frame. If the hardware address of the next hop is unknown, the
    /// datagram is queued and an ARP request goes out, unless a request is
    /// already outstanding, in which case only the queueing happens.
    pub fn send_datagram(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Address) {
        let ip = next_hop.to_u32();

        if let Some(mapping) = self.arp_cache.get(&ip) {
            let address = mapping.address;
            self.transmit_datagram(&datagram, address);
            return;
        }

        let request_due = match self.pending.get(&ip) {
            None => true,
            Some(entry) => entry.request_age_ms.is_none(),
        };
        if request_due {
            let request = ArpPacket::new_request(self.ethernet_address, self.ip_address, next_hop);
            self.transmit_arp(&request, EthernetAddress::BROADCAST);
        }

        let entry = self.pending.entry(ip).or_default();
        if request_due {
            entry.request_age_ms = Some(0);
        }
        entry.datagrams.push(PendingDatagram {
            age_ms: 0,
            datagram,
        });
    }

    /// Accepts one Ethernet frame from the wire.
    pub fn recv_frame(&mut self, frame: &EthernetFrame) {
        match frame.header.ethertype {
            ETHERTYPE_IPV4 => {
                if frame.header.dst != self.ethernet_address {
                    return;
                }
                match Ipv4Datagram::parse(&frame.payload) {
                    Ok(datagram) => self.datagrams_received.push_back(datagram),
                    Err(error) => {
                        tracing::error!(interface = %self.name, %error, "dropping IPv4 frame");
                    }
                }
            }
            ETHERTYPE_ARP => {
                let packet = match ArpPacket::from_bytes(frame.payload.iter().cloned()) {
                    Ok(packet) => packet,
                    Err(error) => {
                        tracing::error!(interface = %self.name, %error, "dropping ARP frame");
                        return;
                    }
                };

                // Learn from requests as well as replies.
                self.arp_cache.insert(
                    packet.sender_ip_address.to_u32(),
                    CachedMapping {
                        age_ms: 0,
                        address: packet.sender_ethernet_address,
                    },
                );

                // Resolution flushes everything parked behind this address.
                if let Some(entry) = self.pending.remove(&packet.sender_ip_address.to_u32()) {
                    for pending in entry.datagrams {
                        self.transmit_datagram(&pending.datagram, packet.sender_ethernet_address);
                    }
                }

                if packet.operation == Operation::Request
                    && packet.target_ip_address == self.ip_address
                {
                    let reply = ArpPacket::new_reply(
                        self.ethernet_address,
                        self.ip_address,
                        packet.sender_ethernet_address,
                        packet.sender_ip_address,
                    );
                    self.transmit_arp(&reply, packet.sender_ethernet_address);
                }
            }
            _ => {}
        }
    }

    /// Advances the interface's clocks: expires cache entries, re-arms the
    /// ARP request cooldown, and drops datagrams that have waited too long.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        self.arp_cache.retain(|_, mapping| {
            mapping.age_ms += ms_since_last_tick;
            mapping.age_ms < MAPPING_CACHE_DURATION_MS
        });

        for entry in self.pending.values_mut() {
            if let Some(age) = entry.request_age_ms {
                let age = age + ms_since_last_tick;
                entry.request_age_ms = (age < ARP_RESEND_TIMEOUT_MS).then_some(age);
            }
            entry.datagrams.retain_mut(|pending| {
                pending.age_ms += ms_since_last_tick;
                pending.age_ms < ARP_RESEND_TIMEOUT_MS
            });
        }
    }

    fn transmit_datagram(&self, datagram: &Ipv4Datagram, dst: EthernetAddress) {
        self.transmit(&EthernetFrame {
            header: EthernetHeader {
                dst,
                src: self.ethernet_address,
                ethertype: ETHERTYPE_IPV4,
            },
            payload: datagram.serialize(),
        });
    }

    fn transmit_arp(&self, packet: &ArpPacket, dst: EthernetAddress) {
        self.transmit(&EthernetFrame {
            header: EthernetHeader {
                dst,
                src: self.ethernet_address,
                ethertype: ETHERTYPE_ARP,
            },
            payload: packet.build(),
        });
    }

    fn transmit(&self, frame: &EthernetFrame) {
        let port = self.port.clone();
        port.borrow_mut().transmit(self, frame);
    }
}
