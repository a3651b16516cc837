#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use lox_walk::diagnostics::Diagnostics;
use lox_walk::driver;

/// Cloneable in-memory writer; every clone appends to the same buffer.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// What a pipeline printed and how it would have exited.
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

fn drive<F>(f: F) -> Outcome
where
    F: FnOnce(SharedBuffer, &mut Diagnostics) -> lox_walk::error::Result<()>,
{
    let stdout = SharedBuffer::default();
    let stderr = SharedBuffer::default();
    let mut diagnostics = Diagnostics::with_writer(Box::new(stderr.clone()));

    f(stdout.clone(), &mut diagnostics).expect("pipeline I/O failed");

    Outcome {
        stdout: stdout.contents(),
        stderr: stderr.contents(),
        exit_code: diagnostics.exit_code(),
    }
}

pub fn run(source: &str) -> Outcome {
    drive(|out, diagnostics| driver::run(source, Box::new(out), diagnostics))
}

pub fn evaluate(source: &str) -> Outcome {
    drive(|out, diagnostics| driver::evaluate(source, Box::new(out), diagnostics))
}

pub fn parse(source: &str) -> Outcome {
    drive(|mut out, diagnostics| driver::parse(source, &mut out, diagnostics))
}

pub fn tokenize(source: &str) -> Outcome {
    drive(|mut out, diagnostics| driver::tokenize(source, &mut out, diagnostics))
}
