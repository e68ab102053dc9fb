#![allow(dead_code)]

use arm_link::drivers::CommandSink;
use arm_link::packets::ArmCommand;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Sink that records what would have gone over the wire.
#[derive(Debug)]
pub struct RecordingSink {
    open: AtomicBool,
    sent: Mutex<Vec<ArmCommand>>,
}

impl RecordingSink {
    pub fn open() -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn closed() -> Arc<Self> {
        let sink = Self::open();
        sink.set_open(false);
        sink
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<ArmCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<ArmCommand> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl CommandSink for RecordingSink {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    // Mirrors the driver: nothing is recorded while closed.
    fn send(&self, command: ArmCommand) {
        if self.is_open() {
            self.sent.lock().unwrap().push(command);
        }
    }
}

pub fn as_sink(sink: &Arc<RecordingSink>) -> Arc<dyn CommandSink> {
    sink.clone()
}
