//! A packet-switched network of machines running the same program.
//!
//! Every node is booted with its own address. Nodes emit packets as
//! `(destination, x, y)` output triples; a node with nothing queued is fed
//! [`IDLE_INPUT`]. Packets addressed to [`NAT_ADDRESS`] are held by the NAT,
//! which wakes node 0 up with the last of them once the whole network is idle.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::{Machine, Program, Result, VmError};

pub const NAT_ADDRESS: i64 = 255;
pub const IDLE_INPUT: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub destination: i64,
    pub x: i64,
    pub y: i64,
}

struct Node {
    machine: Machine,
    queue: VecDeque<i64>,
    // Output values not yet forming a full packet.
    outbox: Vec<i64>,
}

pub struct Network {
    nodes: Vec<Node>,
    nat: Option<Packet>,
}

impl Network {
    /// Boots `size` copies of `program`, handing each its address.
    pub fn boot(program: &Program, size: usize) -> Result<Self> {
        let nodes = (0..size)
            .map(|_| {
                Ok(Node {
                    machine: Machine::from_program(program)?,
                    queue: VecDeque::new(),
                    outbox: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let mut network = Self { nodes, nat: None };

        for address in 0..size {
            let outputs = network.nodes[address].machine.run(&[address as i64])?;
            network.collect(address, outputs)?;
        }

        debug!("booted network of {} nodes", size);
        Ok(network)
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node has a packet waiting.
    pub fn is_idle(&self) -> bool {
        self.nodes.iter().all(|node| node.queue.is_empty())
    }

    /// The last packet the NAT received, if any.
    pub fn nat(&self) -> Option<Packet> {
        self.nat
    }

    /// Runs every node once, in address order, and returns the packets sent to the NAT.
    pub fn round(&mut self) -> Result<Vec<Packet>> {
        let mut to_nat = Vec::new();

        for address in 0..self.nodes.len() {
            let node = &mut self.nodes[address];
            let inputs: Vec<i64> = if node.queue.is_empty() {
                vec![IDLE_INPUT]
            } else {
                node.queue.drain(..).collect()
            };
            let outputs = node.machine.run(&inputs)?;
            to_nat.extend(self.collect(address, outputs)?);
        }

        Ok(to_nat)
    }

    /// Runs rounds until some node sends a packet to the NAT, and returns it.
    pub fn first_nat_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(&packet) = self.round()?.first() {
                return Ok(packet);
            }
        }
    }

    /// Runs the network with the NAT active and returns the first `y` the NAT
    /// delivers to node 0 twice in a row.
    pub fn first_repeated_wakeup(&mut self) -> Result<i64> {
        let mut last_wakeup: Option<i64> = None;

        loop {
            self.round()?;

            if !self.is_idle() {
                continue;
            }
            let packet = match self.nat {
                Some(packet) => packet,
                None => continue,
            };
            if last_wakeup == Some(packet.y) {
                return Ok(packet.y);
            }

            debug!("network idle, NAT wakes node 0 with ({}, {})", packet.x, packet.y);
            self.nodes[0].queue.extend([packet.x, packet.y]);
            last_wakeup = Some(packet.y);
        }
    }

    /// Buffers `outputs` from node `source` and routes every complete packet.
    fn collect(&mut self, source: usize, outputs: Vec<i64>) -> Result<Vec<Packet>> {
        let outbox = &mut self.nodes[source].outbox;
        outbox.extend(outputs);

        let complete = outbox.len() - outbox.len() % 3;
        let packets: Vec<Packet> = outbox
            .drain(..complete)
            .collect::<Vec<_>>()
            .chunks(3)
            .map(|chunk| Packet {
                destination: chunk[0],
                x: chunk[1],
                y: chunk[2],
            })
            .collect();

        let mut to_nat = Vec::new();
        for packet in packets {
            trace!("{} -> {:?}", source, packet);
            if packet.destination == NAT_ADDRESS {
                self.nat = Some(packet);
                to_nat.push(packet);
                continue;
            }
            let node = usize::try_from(packet.destination)
                .ok()
                .and_then(|address| self.nodes.get_mut(address))
                .ok_or(VmError::Unroutable {
                    destination: packet.destination,
                })?;
            node.queue.extend([packet.x, packet.y]);
        }

        Ok(to_nat)
    }
}
