//! Scripted peripherals for driving the instrument step by step in tests and
//! bring-up. Clones share state so a test can keep a handle after moving the
//! peripheral into the builder.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thermocal_traits::{
    Adc, ButtonPin, DEVICE_DISCONNECTED_F, DataLog, DeviceAddress, StatusSink, TempProbe,
};

type BoxErr = Box<dyn std::error::Error + Send + Sync>;

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// ADC whose value is a function of the read index.
#[derive(Clone)]
pub struct ScriptedAdc {
    source: Arc<Mutex<dyn FnMut(usize) -> Result<i16, BoxErr> + Send>>,
    reads: Arc<AtomicUsize>,
}

impl core::fmt::Debug for ScriptedAdc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScriptedAdc")
            .field("reads", &self.reads.load(Ordering::Relaxed))
            .finish()
    }
}

impl ScriptedAdc {
    pub fn from_fn(mut f: impl FnMut(usize) -> i16 + Send + 'static) -> Self {
        Self::fallible(move |i| Ok(f(i)))
    }

    pub fn fallible(f: impl FnMut(usize) -> Result<i16, BoxErr> + Send + 'static) -> Self {
        Self {
            source: Arc::new(Mutex::new(f)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn constant(v: i16) -> Self {
        Self::from_fn(move |_| v)
    }

    /// Number of reads so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Adc for ScriptedAdc {
    fn read(&mut self) -> Result<i16, BoxErr> {
        let i = self.reads.fetch_add(1, Ordering::Relaxed);
        let mut f = lock(&self.source);
        (*f)(i)
    }
}

#[derive(Debug, Default)]
struct ProbeScript {
    temps: VecDeque<f32>,
    last: Option<f32>,
    requests: usize,
    missing: bool,
}

/// Reference probe replaying a queue of temperatures. When the queue runs
/// dry the last value repeats; with nothing queued it reads disconnected.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProbe {
    inner: Arc<Mutex<ProbeScript>>,
}

impl ScriptedProbe {
    pub fn new(temps: impl IntoIterator<Item = f32>) -> Self {
        let p = Self::default();
        p.push(temps);
        p
    }

    /// Probe that never answers its address lookup.
    pub fn missing() -> Self {
        let p = Self::default();
        lock(&p.inner).missing = true;
        p
    }

    pub fn push(&self, temps: impl IntoIterator<Item = f32>) {
        lock(&self.inner).temps.extend(temps);
    }

    pub fn requests(&self) -> usize {
        lock(&self.inner).requests
    }
}

impl TempProbe for ScriptedProbe {
    fn resolve_address(&mut self, index: u8) -> Option<DeviceAddress> {
        if lock(&self.inner).missing {
            return None;
        }
        Some([0x28, index, 0, 0, 0, 0, 0, 0x01])
    }

    fn request_conversion(&mut self) {
        lock(&self.inner).requests += 1;
    }

    fn read_temp_f(&mut self) -> f32 {
        let mut s = lock(&self.inner);
        if let Some(t) = s.temps.pop_front() {
            s.last = Some(t);
        }
        s.last.unwrap_or(DEVICE_DISCONNECTED_F)
    }
}

/// Button level shared with the test.
#[derive(Debug, Clone, Default)]
pub struct SharedButton {
    level: Arc<AtomicBool>,
}

impl SharedButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.level.store(true, Ordering::Release);
    }

    pub fn release(&self) {
        self.level.store(false, Ordering::Release);
    }
}

impl ButtonPin for SharedButton {
    fn is_pressed(&mut self) -> bool {
        self.level.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
struct LogState {
    header: Vec<String>,
    rows: Vec<(i32, f32)>,
    open: bool,
    sessions: usize,
    closes: usize,
    fail_begin: bool,
    fail_append: bool,
}

/// In-memory `DataLog` with switchable failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<LogState>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_begin(&self, fail: bool) {
        lock(&self.inner).fail_begin = fail;
    }

    pub fn fail_append(&self, fail: bool) {
        lock(&self.inner).fail_append = fail;
    }

    pub fn rows(&self) -> Vec<(i32, f32)> {
        lock(&self.inner).rows.clone()
    }

    pub fn header(&self) -> Vec<String> {
        lock(&self.inner).header.clone()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner).open
    }

    /// Successful `begin` calls.
    pub fn sessions(&self) -> usize {
        lock(&self.inner).sessions
    }

    /// `close` calls on an open log.
    pub fn closes(&self) -> usize {
        lock(&self.inner).closes
    }
}

impl DataLog for MemoryLog {
    fn begin(&mut self, header: &[&str]) -> Result<(), BoxErr> {
        let mut s = lock(&self.inner);
        if s.fail_begin {
            return Err(Box::new(std::io::Error::other("storage not mounted")));
        }
        s.header = header.iter().map(|h| (*h).to_string()).collect();
        s.rows.clear();
        s.open = true;
        s.sessions += 1;
        Ok(())
    }

    fn append(&mut self, raw: i32, temp_f: f32) -> Result<(), BoxErr> {
        let mut s = lock(&self.inner);
        if !s.open {
            return Err(Box::new(std::io::Error::other("log is not open")));
        }
        if s.fail_append {
            return Err(Box::new(std::io::Error::other("write failed")));
        }
        s.rows.push((raw, temp_f));
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxErr> {
        let mut s = lock(&self.inner);
        if s.open {
            s.open = false;
            s.closes += 1;
        }
        Ok(())
    }
}

/// Collects status lines.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        lock(&self.lines)
            .iter()
            .filter(|l| l.contains(needle))
            .count()
    }

    pub fn clear(&self) {
        lock(&self.lines).clear();
    }
}

impl StatusSink for VecSink {
    fn line(&mut self, text: &str) {
        lock(&self.lines).push(text.to_string());
    }
}
