use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::transport::FrameReader;

#[derive(Clone, Default)]
pub(crate) struct Sink(Arc<Mutex<Vec<u8>>>);

impl Sink {
    pub(crate) fn frames(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        std::iter::from_fn(|| reader.read_frame())
            .map(|frame| serde_json::from_slice(&frame).unwrap())
            .collect()
    }

    pub(crate) fn last_frame(&self) -> Value {
        self.frames().pop().unwrap()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
