//! A longest-prefix-match IPv4 router over a bundle of network interfaces.

use crate::ipv4::Ipv4Address;
use crate::link::NetworkInterface;

/// One entry in the forwarding table.
#[derive(Debug, Clone, Copy)]
struct Route {
    /// The up-to-32-bit address prefix to match destinations against.
    prefix: u32,
    /// How many high-order bits of `prefix` must match. Zero matches
    /// every destination.
    prefix_length: u8,
    /// Where to send matching datagrams next. Absent when the network is
    /// directly attached, in which case the next hop is the datagram's own
    /// destination.
    next_hop: Option<Ipv4Address>,
    /// Index of the interface to send matching datagrams out on.
    interface: usize,
}

impl Route {
    fn matches(&self, ip: u32) -> bool {
        if self.prefix_length == 0 {
            return true;
        }
        let shift = 32 - u32::from(self.prefix_length);
        (self.prefix >> shift) == (ip >> shift)
    }
}

/// Routes datagrams between [`NetworkInterface`]s according to a
/// longest-prefix-match forwarding table.
#[derive(Default)]
pub struct Router {
    interfaces: Vec<NetworkInterface>,
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an interface, returning its index for use in
    /// [`add_route`](Self::add_route).
    pub fn add_interface(&mut self, interface: NetworkInterface) -> usize {
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    pub fn interface_mut(&mut self, index: usize) -> &mut NetworkInterface {
        &mut self.interfaces[index]
    }

    /// Appends a forwarding rule.
    pub fn add_route(
        &mut self,
        prefix: u32,
        prefix_length: u8,
        next_hop: Option<Ipv4Address>,
        interface: usize,
    ) {
        tracing::debug!(
            prefix = %Ipv4Address::from(prefix),
            prefix_length,
            next_hop = %next_hop.map(|hop| hop.to_string()).unwrap_or_else(|| "(direct)".into()),
            interface,
            "adding route"
        );
        self.routes.push(Route {
            prefix,
            prefix_length: prefix_length.min(32),
            next_hop,
            interface,
        });
    }

    /// Drains every interface's receive queue, forwarding each datagram to
    /// its proper outgoing interface. Datagrams with no matching route or
    /// an expired TTL are dropped.
    pub fn route(&mut self) {
        for index in 0..self.interfaces.len() {
            while let Some(mut datagram) = self.interfaces[index].datagrams_received().pop_front() {
                let destination = datagram.header.destination;
                let Some(route) = self.lookup(destination.to_u32()) else {
                    continue;
                };
                if datagram.header.time_to_live <= 1 {
                    continue;
                }
                datagram.header.time_to_live -= 1;

                let next_hop = route.next_hop.unwrap_or(destination);
                let out = route.interface;
                self.interfaces[out].send_datagram(datagram, next_hop);
            }
        }
    }

    /// The matching rule with the longest prefix. Among equally long
    /// matches, the earliest-added rule wins.
    fn lookup(&self, ip: u32) -> Option<Route> {
        let mut best: Option<Route> = None;
        for route in &self.routes {
            if !route.matches(ip) {
                continue;
            }
            let improves = match best {
                None => true,
                Some(current) => route.prefix_length > current.prefix_length,
            };
            if improves {
                best = Some(*route);
            }
        }
        best
    }
}
