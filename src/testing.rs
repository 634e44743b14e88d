// SPDX-License-Identifier: MPL-2.0

//! Deterministic collaborators for scheduler tests.
//!
//! Time only moves when a fake says so: showing a frame costs the sink's
//! render cost and decoding one costs the decoder's decode cost.

use std::{
    cell::{Cell, Ref, RefCell},
    collections::HashMap,
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    rc::Rc,
    time::{Duration, Instant},
};

use image::{Rgb, RgbaImage};

use crate::animated::{Decoder, FrameSource, RawFrame};
use crate::clock::Clock;
use crate::error::Error;
use crate::power::PowerPolicy;
use crate::sink::DisplaySink;
use crate::timer::Deadline;

#[derive(Debug, Clone)]
pub struct FakeClock(Rc<Cell<Instant>>);

impl FakeClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

/// Surface tagged with the animation and frame it was realized from.
#[derive(Debug, PartialEq, Eq)]
pub struct FakeSurface(pub u8, pub u8, pub usize);

#[derive(Debug, Default)]
pub struct SinkLog {
    pub realized: usize,
    pub realized_sizes: Vec<(u32, u32)>,
    /// `(animation, frame)` of every surface shown.
    pub shown: Vec<(u8, u8)>,
    pub released: Vec<FakeSurface>,
}

#[derive(Debug, Clone)]
pub struct FakeSink {
    clock: FakeClock,
    render_cost: Duration,
    log: Rc<RefCell<SinkLog>>,
}

impl FakeSink {
    pub fn new(clock: FakeClock, render_cost: Duration) -> Self {
        Self {
            clock,
            render_cost,
            log: Rc::default(),
        }
    }

    pub fn log(&self) -> Ref<'_, SinkLog> {
        self.log.borrow()
    }

    pub fn live(&self) -> usize {
        let log = self.log.borrow();
        log.realized - log.released.len()
    }

    /// Animations shown, in order, with consecutive repeats collapsed.
    pub fn animations_shown(&self) -> Vec<u8> {
        let mut animations: Vec<u8> = self.log.borrow().shown.iter().map(|s| s.0).collect();
        animations.dedup();
        animations
    }
}

impl DisplaySink for FakeSink {
    type Surface = FakeSurface;

    fn realize(&mut self, frame: &RgbaImage) -> FakeSurface {
        let mut log = self.log.borrow_mut();
        let [animation, index, ..] = frame.get_pixel(0, 0).0;
        let surface = FakeSurface(animation, index, log.realized);
        log.realized += 1;
        log.realized_sizes.push(frame.dimensions());
        surface
    }

    fn show(&mut self, surface: &FakeSurface) {
        self.clock.advance(self.render_cost);
        self.log.borrow_mut().shown.push((surface.0, surface.1));
    }

    fn release(&mut self, surface: FakeSurface) {
        let mut log = self.log.borrow_mut();
        assert!(
            !log.released.iter().any(|released| released.2 == surface.2),
            "surface {} released twice",
            surface.2
        );
        log.released.push(surface);
    }
}

#[derive(Debug, Clone)]
struct Script {
    tag: u8,
    frames: usize,
    size: (u32, u32),
    fail_at: Option<usize>,
}

/// Decoder serving scripted animations keyed by file name.
///
/// Frame `i` of animation `tag` is filled with the pixel `(tag, i, 0)`.
#[derive(Debug, Clone)]
pub struct ScriptedDecoder {
    clock: FakeClock,
    decode_cost: Duration,
    scripts: Rc<RefCell<HashMap<OsString, Script>>>,
    opened: Rc<RefCell<Vec<PathBuf>>>,
}

impl ScriptedDecoder {
    pub fn new(clock: FakeClock, decode_cost: Duration) -> Self {
        Self {
            clock,
            decode_cost,
            scripts: Rc::default(),
            opened: Rc::default(),
        }
    }

    pub fn with(self, name: &str, tag: u8, frames: usize) -> Self {
        self.scripts.borrow_mut().insert(
            name.into(),
            Script {
                tag,
                frames,
                size: (1, 1),
                fail_at: None,
            },
        );
        self
    }

    pub fn sized(self, name: &str, width: u32, height: u32) -> Self {
        if let Some(script) = self.scripts.borrow_mut().get_mut(&OsString::from(name)) {
            script.size = (width, height);
        }
        self
    }

    pub fn failing_at(self, name: &str, index: usize) -> Self {
        if let Some(script) = self.scripts.borrow_mut().get_mut(&OsString::from(name)) {
            script.fail_at = Some(index);
        }
        self
    }

    /// Make `name` unreadable from now on, in every clone of this decoder.
    pub fn forget(&self, name: &str) {
        self.scripts.borrow_mut().remove(&OsString::from(name));
    }

    /// File names opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .borrow()
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

impl Decoder for ScriptedDecoder {
    type Source = ScriptedSource;

    fn open(&self, path: &Path) -> Result<ScriptedSource, Error> {
        self.opened.borrow_mut().push(path.to_path_buf());

        let script = path
            .file_name()
            .and_then(|name| self.scripts.borrow().get(name).cloned())
            .ok_or_else(|| Error::decode(path, io::Error::other("unreadable")))?;

        Ok(ScriptedSource {
            path: path.to_path_buf(),
            script,
            clock: self.clock.clone(),
            decode_cost: self.decode_cost,
            index: 0,
        })
    }
}

#[derive(Debug)]
pub struct ScriptedSource {
    path: PathBuf,
    script: Script,
    clock: FakeClock,
    decode_cost: Duration,
    index: usize,
}

impl FrameSource for ScriptedSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn width(&self) -> u32 {
        self.script.size.0
    }

    fn height(&self) -> u32 {
        self.script.size.1
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, Error> {
        if self.script.fail_at == Some(self.index) {
            return Err(Error::decode(&self.path, io::Error::other("truncated")));
        }

        if self.index == self.script.frames {
            return Ok(None);
        }

        self.clock.advance(self.decode_cost);
        let (width, height) = self.script.size;
        let frame = RawFrame::from_pixel(width, height, Rgb([self.script.tag, self.index as u8, 0]));
        self.index += 1;

        Ok(Some(frame))
    }
}

/// Deadline fired by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualDeadline {
    expired: Rc<Cell<bool>>,
    armed: Rc<Cell<usize>>,
    broken: Rc<Cell<bool>>,
}

impl ManualDeadline {
    pub fn fire(&self) {
        self.expired.set(true);
    }

    /// Make every later arming fail.
    pub fn break_timer(&self) {
        self.broken.set(true);
    }

    /// Times the deadline has been armed.
    pub fn armed(&self) -> usize {
        self.armed.get()
    }
}

impl Deadline for ManualDeadline {
    fn arm(&mut self) -> Result<(), Error> {
        if self.broken.get() {
            return Err(Error::Deadline(calloop::Error::IoError(io::Error::other(
                "timer source rejected",
            ))));
        }

        self.armed.set(self.armed.get() + 1);
        Ok(())
    }

    fn take_expired(&mut self) -> bool {
        self.expired.replace(false)
    }
}

/// Power policy switched by hand.
#[derive(Debug, Clone)]
pub struct FakePower(Rc<Cell<bool>>);

impl FakePower {
    pub fn on() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn set(&self, allowed: bool) {
        self.0.set(allowed);
    }
}

impl PowerPolicy for FakePower {
    fn is_display_allowed(&mut self) -> bool {
        self.0.get()
    }
}
