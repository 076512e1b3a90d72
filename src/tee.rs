//! Stream tee: duplicate child-process output to the terminal and a log sink.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A writer that can be registered with more than one [`FanoutSink`].
/// The log file is shared this way between the stdout and stderr sides.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Wrap a writer for registration with one or more sinks.
pub fn shared_writer<W: Write + Send + 'static>(writer: W) -> SharedWriter {
    Arc::new(Mutex::new(Box::new(writer)))
}

/// Fan-out sink: every chunk written is forwarded to all registered
/// destinations in registration order, then flushed. Chunks from separate
/// sinks interleave in a shared destination in arrival order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    dests: Vec<SharedWriter>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination owned by this sink alone.
    pub fn push<W: Write + Send + 'static>(&mut self, writer: W) {
        self.dests.push(shared_writer(writer));
    }

    /// Register a destination shared with other sinks.
    pub fn attach(&mut self, dest: SharedWriter) {
        self.dests.push(dest);
    }

    /// Forward a chunk to every destination. A failing destination does
    /// not stop the others; the first error is returned after the pass.
    pub fn write_all(&self, chunk: &[u8]) -> io::Result<()> {
        let mut first_err = None;
        for dest in &self.dests {
            let result = match dest.lock() {
                Ok(mut guard) => guard.write_all(chunk).and_then(|_| guard.flush()),
                Err(_) => Err(io::Error::other("tee destination lock poisoned")),
            };
            if let Err(err) = result {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Create the log file, truncating any prior content, along with its
/// parent directory. Happens before the child's output begins flowing.
pub fn open_log_sink(path: &Path) -> Result<SharedWriter> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    Ok(shared_writer(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory destination whose contents stay inspectable after the
    /// sink takes ownership of the writer half.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn forwards_every_byte_to_all_destinations() {
        let a = Capture::default();
        let b = Capture::default();
        let mut sink = FanoutSink::new();
        sink.push(a.clone());
        sink.push(b.clone());

        sink.write_all(b"hello ").unwrap();
        sink.write_all(b"world").unwrap();

        assert_eq!(a.contents(), b"hello world");
        assert_eq!(b.contents(), b"hello world");
    }

    #[test]
    fn shared_destination_sees_arrival_order() {
        let log = Capture::default();
        let shared = shared_writer(log.clone());

        let mut out = FanoutSink::new();
        out.attach(Arc::clone(&shared));
        let mut err = FanoutSink::new();
        err.attach(shared);

        out.write_all(b"line from stdout\n").unwrap();
        err.write_all(b"line from stderr\n").unwrap();
        out.write_all(b"more stdout\n").unwrap();

        assert_eq!(
            log.contents(),
            b"line from stdout\nline from stderr\nmore stdout\n"
        );
    }

    #[test]
    fn failing_destination_does_not_starve_others() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let healthy = Capture::default();
        let mut sink = FanoutSink::new();
        sink.push(Broken);
        sink.push(healthy.clone());

        assert!(sink.write_all(b"still delivered").is_err());
        assert_eq!(healthy.contents(), b"still delivered");
    }

    #[test]
    fn open_log_sink_creates_directory_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dev.log");

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale content from a previous run").unwrap();

        let sink = open_log_sink(&path).unwrap();
        drop(sink);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        let fresh = dir.path().join("brand").join("new").join("dev.log");
        let sink = open_log_sink(&fresh).unwrap();
        sink.lock().unwrap().write_all(b"first bytes").unwrap();
        assert_eq!(std::fs::read_to_string(&fresh).unwrap(), "first bytes");
    }
}
