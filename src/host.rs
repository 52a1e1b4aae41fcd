// The host environment (SPEC_FULL.md §11): the output sink and input
// source the evaluator's `print`/`inputi`/`inputs` statements go through.
//
// Grounded on `output.rs`'s `Output` trait and `data.rs`'s `ReadSource`,
// generalized from cairo/DRM framebuffer output to line-oriented stdio —
// the teacher's trait is the render-one-frame callback; this one is the
// print-one-line callback, but the "small trait the VM holds a `&mut dyn`
// of" shape is the same.

use std::collections::VecDeque;
use std::io::{self, Write};

pub trait Host {
    fn print_line(&mut self, line: &str);
    fn read_line(&mut self) -> Option<String>;
}

#[derive(Default)]
pub struct StdioHost;

impl Host for StdioHost {
    fn print_line(&mut self, line: &str) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        // One whole line per `print`, flushed before the next becomes
        // observable (SPEC_FULL.md §5).
        let _ = writeln!(lock, "{}", line);
        let _ = lock.flush();
    }

    fn read_line(&mut self) -> Option<String> {
        let mut buf = String::new();
        match io::stdin().read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf.trim_end_matches(['\n', '\r']).to_string()),
            Err(_) => None,
        }
    }
}

/// In-memory host for tests: records `print` output, replays a scripted
/// sequence of input lines.
#[derive(Default)]
pub struct BufferHost {
    pub output: Vec<String>,
    input: VecDeque<String>,
}

impl BufferHost {
    pub fn new<I: IntoIterator<Item = String>>(input: I) -> BufferHost {
        BufferHost { output: Vec::new(), input: input.into_iter().collect() }
    }
}

impl Host for BufferHost {
    fn print_line(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }
}
