//! In-memory platform.
//!
//! [`HeadlessPlatform`] keeps a message queue, a table of targets, and a set
//! of hotkey claims in memory. Tests and tools use it to drive a reactor
//! without a windowing system: post messages, "press" hotkeys, drop files on
//! targets, and inspect what the reactor left to default handling.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{ReactorError, Result};
use crate::event::{codes, DispatchFilter, LResult, Message, TargetId};
use crate::hotkey::Hotkey;
use crate::platform::{EventSource, TargetControl, TargetFactory};
use crate::registrar::{HotkeyBackend, HotkeyId};
use crate::target::TargetAttributes;
use crate::timer::TimerQueue;

#[derive(Debug)]
struct TargetRecord {
    attributes: TargetAttributes,
    visible: bool,
    realized: bool,
    destroyed: bool,
}

impl TargetRecord {
    fn is_live(&self) -> bool {
        self.realized && !self.destroyed
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    queue: VecDeque<Message>,
    timers: TimerQueue,
    targets: BTreeMap<TargetId, TargetRecord>,
    last_target: u32,
    defaulted: Vec<Message>,
    refuse_creation: bool,
}

impl HeadlessState {
    fn live_target(&mut self, target: TargetId) -> Option<&mut TargetRecord> {
        self.targets.get_mut(&target).filter(|record| record.is_live())
    }
}

/// An in-memory implementation of every platform seam.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct HeadlessPlatform {
    state: Rc<RefCell<HeadlessState>>,
    hotkeys: HeadlessHotkeys,
}

impl HeadlessPlatform {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// The event source to hand to a reactor.
    pub fn source(&self) -> HeadlessSource {
        HeadlessSource {
            state: Rc::clone(&self.state),
        }
    }

    /// A handle for posting messages from outside the reactor.
    pub fn poster(&self) -> EventPoster {
        EventPoster {
            state: Rc::clone(&self.state),
        }
    }

    /// The hotkey backend to hand to a [`HotkeyRegistry`](crate::HotkeyRegistry).
    pub fn hotkey_backend(&self) -> HeadlessHotkeys {
        self.hotkeys.clone()
    }

    /// This platform as a shareable target factory.
    pub fn factory(&self) -> Rc<dyn TargetFactory> {
        Rc::new(self.clone())
    }

    /// Simulate the user pressing a hotkey.
    ///
    /// Returns `false` if this process never claimed the combination.
    pub fn press(&self, hotkey: Hotkey) -> bool {
        match self.hotkeys.id_of(hotkey) {
            Some(id) => {
                self.poster().post(Message::hotkey(id));
                true
            }
            None => false,
        }
    }

    /// Simulate files being dropped on a target.
    pub fn drop_files(&self, target: TargetId, files: Vec<PathBuf>) {
        self.poster()
            .post(Message::new(codes::DROP_FILES).to(target).with_files(files));
    }

    /// Number of messages waiting in the queue.
    pub fn queued(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Messages that reached default handling, oldest first.
    pub fn defaulted(&self) -> Vec<Message> {
        self.state.borrow().defaulted.clone()
    }

    /// Attributes a target was realized with.
    pub fn attributes(&self, target: TargetId) -> Option<TargetAttributes> {
        self.state
            .borrow()
            .targets
            .get(&target)
            .filter(|record| record.realized)
            .map(|record| record.attributes.clone())
    }

    /// Whether a target was destroyed.
    pub fn is_destroyed(&self, target: TargetId) -> bool {
        self.state
            .borrow()
            .targets
            .get(&target)
            .is_some_and(|record| record.destroyed)
    }

    /// Whether a timer is running on a target.
    pub fn timer_active(&self, target: TargetId, timer: u32) -> bool {
        self.state.borrow().timers.is_active(target, timer)
    }

    /// Make subsequent [`TargetFactory::realize`] calls fail.
    pub fn refuse_creation(&self, refuse: bool) {
        self.state.borrow_mut().refuse_creation = refuse;
    }
}

impl TargetControl for HeadlessPlatform {
    fn set_visible(&self, target: TargetId, visible: bool) {
        match self.state.borrow_mut().live_target(target) {
            Some(record) => record.visible = visible,
            None => tracing::trace!(target: "switchyard_core::platform", %target, "visibility change on dead target ignored"),
        }
    }

    fn is_visible(&self, target: TargetId) -> bool {
        self.state
            .borrow()
            .targets
            .get(&target)
            .is_some_and(|record| record.is_live() && record.visible)
    }

    fn set_timer(&self, target: TargetId, timer: u32, interval: Duration) {
        let mut state = self.state.borrow_mut();
        if state.live_target(target).is_some() {
            state.timers.start(target, timer, interval, Instant::now());
        }
    }

    fn kill_timer(&self, target: TargetId, timer: u32) {
        self.state.borrow_mut().timers.stop(target, timer);
    }

    fn destroy(&self, target: TargetId) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.live_target(target) else {
            return;
        };
        record.destroyed = true;
        record.visible = false;
        state.timers.stop_target(target);
        state.queue.push_back(Message::new(codes::DESTROY).to(target));
        tracing::debug!(target: "switchyard_core::platform", %target, "target destroyed");
    }
}

impl TargetFactory for HeadlessPlatform {
    fn reserve(&self) -> Result<TargetId> {
        let mut state = self.state.borrow_mut();
        state.last_target += 1;
        let id = TargetId(state.last_target);
        state.targets.insert(
            id,
            TargetRecord {
                attributes: TargetAttributes::default(),
                visible: false,
                realized: false,
                destroyed: false,
            },
        );
        Ok(id)
    }

    fn realize(&self, target: TargetId, attributes: &TargetAttributes) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.refuse_creation {
            return Err(ReactorError::TargetCreation(format!(
                "platform refused to realize {target}"
            )));
        }
        let record = state
            .targets
            .get_mut(&target)
            .filter(|record| !record.realized)
            .ok_or_else(|| ReactorError::TargetCreation(format!("{target} was not reserved")))?;
        record.attributes = attributes.clone();
        record.visible = attributes.visible;
        record.realized = true;
        state.queue.push_back(Message::new(codes::CREATE).to(target));
        tracing::debug!(target: "switchyard_core::platform", %target, "target realized");
        Ok(())
    }
}

/// The queue side of a [`HeadlessPlatform`].
#[derive(Debug)]
pub struct HeadlessSource {
    state: Rc<RefCell<HeadlessState>>,
}

impl EventSource for HeadlessSource {
    fn drain(&mut self, filter: &DispatchFilter) -> Vec<Message> {
        let mut state = self.state.borrow_mut();
        let expired = state.timers.process_expired(Instant::now());
        state.queue.extend(expired);

        let mut matched = Vec::new();
        let mut rest = VecDeque::with_capacity(state.queue.len());
        for message in state.queue.drain(..) {
            if filter.matches(&message) {
                matched.push(message);
            } else {
                rest.push_back(message);
            }
        }
        state.queue = rest;
        matched
    }

    fn post(&mut self, message: Message) {
        self.state.borrow_mut().queue.push_back(message);
    }

    fn default_handling(&mut self, message: &Message) -> LResult {
        self.state.borrow_mut().defaulted.push(message.clone());
        0
    }
}

/// Posts messages into a [`HeadlessPlatform`] queue.
#[derive(Debug, Clone)]
pub struct EventPoster {
    state: Rc<RefCell<HeadlessState>>,
}

impl EventPoster {
    /// Append a message to the queue.
    pub fn post(&self, message: Message) {
        self.state.borrow_mut().queue.push_back(message);
    }
}

#[derive(Debug, Default)]
struct HotkeyClaims {
    claimed: BTreeMap<HotkeyId, Hotkey>,
    occupied: HashSet<Hotkey>,
    released: Vec<HotkeyId>,
}

/// Hotkey claims of a [`HeadlessPlatform`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessHotkeys {
    claims: Arc<Mutex<HotkeyClaims>>,
}

impl HeadlessHotkeys {
    /// Mark a combination as held by another process.
    pub fn occupy(&self, hotkey: Hotkey) {
        self.claims.lock().occupied.insert(hotkey);
    }

    /// Combinations currently claimed by this process.
    pub fn claimed(&self) -> Vec<(HotkeyId, Hotkey)> {
        self.claims
            .lock()
            .claimed
            .iter()
            .map(|(id, hotkey)| (*id, *hotkey))
            .collect()
    }

    /// The identity a combination was claimed under.
    pub fn id_of(&self, hotkey: Hotkey) -> Option<HotkeyId> {
        self.claims
            .lock()
            .claimed
            .iter()
            .find(|(_, claimed)| **claimed == hotkey)
            .map(|(id, _)| *id)
    }

    /// Identities released so far, in release order.
    pub fn released(&self) -> Vec<HotkeyId> {
        self.claims.lock().released.clone()
    }
}

impl HotkeyBackend for HeadlessHotkeys {
    fn claim(&mut self, id: HotkeyId, hotkey: Hotkey) -> Result<()> {
        let mut claims = self.claims.lock();
        if claims.occupied.contains(&hotkey) || claims.claimed.values().any(|h| *h == hotkey) {
            return Err(ReactorError::conflict(hotkey, "hot key is already registered"));
        }
        if claims.claimed.contains_key(&id) {
            return Err(ReactorError::conflict(hotkey, format!("{id} is already in use")));
        }
        claims.claimed.insert(id, hotkey);
        Ok(())
    }

    fn release(&mut self, id: HotkeyId) {
        let mut claims = self.claims.lock();
        if claims.claimed.remove(&id).is_some() {
            claims.released.push(id);
        }
    }
}
