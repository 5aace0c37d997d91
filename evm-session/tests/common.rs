//! Scripted engine transport shared by the integration tests.
#![allow(dead_code)]

use evm_protocol::{
    Address, Command, CommandFrame, CommandKind, CpuState, Response, ResponseFrame, RESET_PC_ADDR,
    RESET_SSP_ADDR,
};
use evm_session::{EngineTransport, TransportError};
use evm_srec::record::record_checksum;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::rc::Rc;

#[derive(Default)]
struct Inner {
    memory: BTreeMap<Address, u8>,
    state: CpuState,
    outbox: VecDeque<ResponseFrame>,
    sent: Vec<CommandFrame>,
    swallow: HashSet<CommandKind>,
    fail: HashSet<CommandKind>,
}

impl Inner {
    fn read_long(&self, addr: Address) -> u32 {
        (0..4).fold(0u32, |acc, i| {
            (acc << 8) | u32::from(*self.memory.get(&(addr + i)).unwrap_or(&0))
        })
    }

    fn write(&mut self, addr: Address, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.memory.insert(addr + i as u32, *byte);
        }
    }

    fn handle(&mut self, frame: CommandFrame) {
        let kind = frame.command.kind();
        self.sent.push(frame.clone());
        if self.swallow.contains(&kind) {
            return;
        }
        if self.fail.contains(&kind) {
            self.outbox.push_back(ResponseFrame {
                id: frame.id,
                response: Response::Error(format!("injected {kind} failure")),
            });
            return;
        }

        let response = match frame.command {
            Command::Init => Response::Ready,
            Command::Step => {
                self.state.pc = self.state.pc.wrapping_add(2);
                Response::State(self.state.clone())
            }
            Command::Run { count } => {
                self.state.pc = self.state.pc.wrapping_add(2 * count);
                Response::State(self.state.clone())
            }
            Command::Pause => return,
            Command::Reset => {
                self.state.ssp = self.read_long(RESET_SSP_ADDR);
                self.state.pc = self.read_long(RESET_PC_ADDR);
                self.state.aregs[7] = self.state.ssp;
                Response::State(self.state.clone())
            }
            Command::GetState => Response::State(self.state.clone()),
            Command::ReadMemory { addr, size } => {
                let data = (0..size)
                    .map(|i| *self.memory.get(&(addr + i)).unwrap_or(&0))
                    .collect();
                Response::Memory { addr, data }
            }
            Command::WriteMemory { addr, data } => {
                self.write(addr, &data);
                Response::Ready
            }
            Command::LoadImage { addr, data } => {
                self.write(addr, &data);
                Response::Ready
            }
        };
        self.outbox.push_back(ResponseFrame {
            id: frame.id,
            response,
        });
    }
}

/// A conforming engine: applies every command against a sparse memory map
/// and a register file, and answers with the id echoed.
pub struct MockEngine {
    inner: Rc<RefCell<Inner>>,
}

/// Test-side view into the mock engine after the transport has been handed
/// to a channel or session.
#[derive(Clone)]
pub struct EngineProbe {
    inner: Rc<RefCell<Inner>>,
}

pub fn mock_engine() -> (MockEngine, EngineProbe) {
    let inner = Rc::new(RefCell::new(Inner::default()));
    (
        MockEngine {
            inner: Rc::clone(&inner),
        },
        EngineProbe { inner },
    )
}

impl MockEngine {
    /// Never answer commands of this kind.
    pub fn swallowing(self, kind: CommandKind) -> Self {
        self.inner.borrow_mut().swallow.insert(kind);
        self
    }

    /// Answer commands of this kind with an engine error.
    pub fn failing(self, kind: CommandKind) -> Self {
        self.inner.borrow_mut().fail.insert(kind);
        self
    }
}

impl EngineTransport for MockEngine {
    fn send(&mut self, frame: CommandFrame) -> Result<(), TransportError> {
        self.inner.borrow_mut().handle(frame);
        Ok(())
    }

    fn poll_response(&mut self) -> Option<ResponseFrame> {
        self.inner.borrow_mut().outbox.pop_front()
    }
}

impl EngineProbe {
    pub fn memory(&self, addr: Address, len: usize) -> Vec<u8> {
        let inner = self.inner.borrow();
        (0..len as u32)
            .map(|i| *inner.memory.get(&(addr + i)).unwrap_or(&0))
            .collect()
    }

    pub fn sent_kinds(&self) -> Vec<CommandKind> {
        self.inner
            .borrow()
            .sent
            .iter()
            .map(|frame| frame.command.kind())
            .collect()
    }

    /// Addresses of LoadImage commands, in arrival order
    pub fn load_addresses(&self) -> Vec<Address> {
        self.inner
            .borrow()
            .sent
            .iter()
            .filter_map(|frame| match &frame.command {
                Command::LoadImage { addr, .. } => Some(*addr),
                _ => None,
            })
            .collect()
    }
}

/// Build one S2 data record with a valid checksum.
pub fn data_record(addr: u32, payload: &[u8]) -> String {
    let count = 3 + payload.len() + 1;
    let addr_bytes = [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8];
    let mut line = format!(
        "S2{count:02X}{:02X}{:02X}{:02X}",
        addr_bytes[0], addr_bytes[1], addr_bytes[2]
    );
    for byte in payload {
        line.push_str(&format!("{byte:02X}"));
    }
    line.push_str(&format!(
        "{:02X}",
        record_checksum(count as u8, &addr_bytes, payload)
    ));
    line
}

/// Build a complete object file: header, data records, terminator.
pub fn object_text(entries: &[(u32, &[u8])]) -> String {
    let mut text = String::from("S00F000068656C6C6F202020202000003C\n");
    for (addr, payload) in entries {
        text.push_str(&data_record(*addr, payload));
        text.push('\n');
    }
    text.push_str("S9030000FC\n");
    text
}
