//! Shared helpers for integration tests

use servoscope::backend::{MockTransport, SessionStats, Transport};
use servoscope::Result;
use std::cell::RefCell;
use std::rc::Rc;

/// A mock transport handle that stays inspectable after the monitor takes
/// ownership of the boxed transport
pub struct SharedTransport(Rc<RefCell<MockTransport>>);

impl SharedTransport {
    /// Wrap a mock; returns the boxed transport for the monitor and a
    /// handle for assertions
    pub fn new(mock: MockTransport) -> (Box<dyn Transport>, Rc<RefCell<MockTransport>>) {
        let shared = Rc::new(RefCell::new(mock));
        (Box::new(SharedTransport(shared.clone())), shared)
    }
}

impl Transport for SharedTransport {
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.0.borrow_mut().read_registers(address, count)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        self.0.borrow_mut().write_register(address, value)
    }

    fn stats(&self) -> SessionStats {
        self.0.borrow().stats()
    }
}
