//! Line‑oriented diagnostic sink.
//!
//! Every pass hands its errors here.  The sink prints them to its writer
//! (stderr for the CLI) and remembers whether a static or a runtime failure
//! was seen, which the driver turns into an exit code.

use std::io::{self, Write};

use log::{debug, info};

use crate::error::LoxError;

/// Exit code for lexical, syntax, and resolution errors.
pub const EXIT_STATIC_ERROR: i32 = 65;

/// Exit code for an unhandled runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

pub struct Diagnostics {
    out: Box<dyn Write>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// A sink writing to standard error.
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stderr()))
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Self {
            out,
            had_error: false,
            had_runtime_error: false,
        }
    }

    pub fn report(&mut self, error: &LoxError) {
        debug!("Reporting diagnostic: {}", error);

        if error.is_static() {
            self.had_error = true;
        } else {
            self.had_runtime_error = true;
        }

        let _ = writeln!(self.out, "{}", error);
    }

    pub fn report_all<'e, I>(&mut self, errors: I)
    where
        I: IntoIterator<Item = &'e LoxError>,
    {
        for error in errors {
            self.report(error);
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Exit code implied by what has been reported so far.
    pub fn exit_code(&self) -> i32 {
        let code = if self.had_error {
            EXIT_STATIC_ERROR
        } else if self.had_runtime_error {
            EXIT_RUNTIME_ERROR
        } else {
            0
        };

        info!("Diagnostics exit code: {}", code);

        code
    }
}
