//! The routing table and dispatch loop.
//!
//! A [`Reactor`] maps event keys to handler handles and runs them for each
//! message its [`EventSource`] yields. Handlers for one key run in
//! registration order and the last one's result is the one surfaced.
//! Dead handles are skipped.
//!
//! Routing rules:
//!
//! - A hotkey press runs the handlers bound to its hotkey identity.
//! - A thread-wide message runs the wildcard handlers for its code.
//! - A targeted message runs the handlers bound to its exact target, then
//!   the wildcard handlers for its code. If both ran, the target-specific
//!   result is surfaced.
//!
//! Whenever no live handler runs, the source's default handling produces
//! the result.

use std::collections::HashMap;
use std::fmt;

use slotmap::{new_key_type, SlotMap};

use crate::error::{ReactorError, Result};
use crate::event::{AddressedKey, Delivery, DispatchFilter, EventCode, EventKey, LResult, Message, TargetId};
use crate::handler::Handler;
use crate::hotkey::Hotkey;
use crate::platform::EventSource;
use crate::registrar::{HotkeyId, HotkeyRegistry};

new_key_type! {
    /// Storage key of a bound handler.
    pub struct HandlerSlot;
}

/// Live and total handler counts of one routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSummary {
    /// The routing key.
    pub key: EventKey,
    /// Handlers bound under the key.
    pub handlers: usize,
    /// Of those, the ones still alive.
    pub live: usize,
}

/// Single-threaded event reactor.
pub struct Reactor {
    handlers: SlotMap<HandlerSlot, Handler>,
    addressed: HashMap<AddressedKey, Vec<HandlerSlot>>,
    hotkeys: HashMap<HotkeyId, Vec<HandlerSlot>>,
    registry: HotkeyRegistry,
    source: Box<dyn EventSource>,
}

/// Run bound handlers in order. Returns the last live handler's result, or
/// `None` if no live handler ran.
fn run_bound(
    handlers: &SlotMap<HandlerSlot, Handler>,
    slots: Option<&Vec<HandlerSlot>>,
    message: &Message,
) -> Option<LResult> {
    let slots = slots?;
    let mut result = None;
    for slot in slots {
        let Some(handler) = handlers.get(*slot) else {
            continue;
        };
        if handler.is_alive() {
            result = Some(handler.invoke(message));
        }
    }
    result
}

impl Reactor {
    /// Create a reactor polling `source`, registering hotkeys through
    /// `registry`.
    pub fn new(source: impl EventSource + 'static, registry: HotkeyRegistry) -> Self {
        Self {
            handlers: SlotMap::with_key(),
            addressed: HashMap::new(),
            hotkeys: HashMap::new(),
            registry,
            source: Box::new(source),
        }
    }

    fn bind(&mut self, handler: Handler) -> HandlerSlot {
        self.handlers.insert(handler)
    }

    /// Route `code` events addressed to `target` to `handler`.
    ///
    /// Binding under [`TargetId::THREAD`] makes a wildcard binding.
    pub fn add_addressed_handling(
        &mut self,
        code: EventCode,
        target: TargetId,
        handler: Handler,
    ) -> HandlerSlot {
        let slot = self.bind(handler);
        self.addressed
            .entry(AddressedKey::new(code, target))
            .or_default()
            .push(slot);
        tracing::trace!(target: "switchyard_core::reactor", code, %target, "addressed handler bound");
        slot
    }

    /// Route `code` events to `handler` regardless of target.
    pub fn add_thread_handling(&mut self, code: EventCode, handler: Handler) -> HandlerSlot {
        self.add_addressed_handling(code, TargetId::THREAD, handler)
    }

    /// Route presses of `hotkey` to `handler`, registering the combination
    /// with the environment on first use.
    ///
    /// # Errors
    ///
    /// Propagates [`ReactorError::RegistrationConflict`]; the handler is not
    /// bound in that case.
    pub fn add_hotkey_handling(&mut self, hotkey: Hotkey, handler: Handler) -> Result<HotkeyId> {
        let id = self.registry.register(hotkey)?;
        let slot = self.bind(handler);
        self.hotkeys.entry(id).or_default().push(slot);
        tracing::debug!(target: "switchyard_core::reactor", %hotkey, %id, "hotkey handler bound");
        Ok(id)
    }

    /// Unbind every slot holding `handler`.
    ///
    /// # Errors
    ///
    /// Fails with [`ReactorError::InvalidState`] if the handler is not bound.
    pub fn remove_handler(&mut self, handler: &Handler) -> Result<()> {
        let before = self.handlers.len();
        self.handlers.retain(|_, bound| !bound.same_as(handler));
        if self.handlers.len() == before {
            return Err(ReactorError::InvalidState("handler is not bound to this reactor"));
        }

        self.prune_routes();
        Ok(())
    }

    /// Unbind exactly the given slots. Slots already gone are ignored.
    pub(crate) fn unbind_slots(&mut self, slots: &[HandlerSlot]) {
        for slot in slots {
            self.handlers.remove(*slot);
        }
        self.prune_routes();
    }

    fn prune_routes(&mut self) {
        let handlers = &self.handlers;
        let keep = |slots: &mut Vec<HandlerSlot>| {
            slots.retain(|slot| handlers.contains_key(*slot));
            !slots.is_empty()
        };
        self.addressed.retain(|_, slots| keep(slots));
        self.hotkeys.retain(|_, slots| keep(slots));
    }

    /// Queue a message for the next [`dispatch`](Self::dispatch).
    pub fn post(&mut self, message: Message) {
        self.source.post(message);
    }

    /// The hotkey registry this reactor registers through.
    pub fn registry(&self) -> &HotkeyRegistry {
        &self.registry
    }

    /// Number of bound handler slots, dead ones included.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Per-key handler counts, sorted for stable output.
    pub fn bindings(&self) -> Vec<BindingSummary> {
        let summarize = |key: EventKey, slots: &Vec<HandlerSlot>| {
            let bound: Vec<&Handler> = slots.iter().filter_map(|s| self.handlers.get(*s)).collect();
            BindingSummary {
                key,
                handlers: bound.len(),
                live: bound.iter().filter(|h| h.is_alive()).count(),
            }
        };
        let mut summary: Vec<BindingSummary> = self
            .addressed
            .iter()
            .map(|(key, slots)| summarize(EventKey::Addressed(*key), slots))
            .chain(
                self.hotkeys
                    .iter()
                    .map(|(id, slots)| summarize(EventKey::Hotkey(*id), slots)),
            )
            .collect();
        summary.sort_by_key(|s| match s.key {
            EventKey::Addressed(key) => (0, key.target.0, key.code),
            EventKey::Hotkey(id) => (1, id.0, 0),
        });
        summary
    }

    /// Drain every queued message matching `filter` and route each one.
    ///
    /// Messages posted by handlers during this call are delivered by the
    /// next call. A panicking handler aborts the remainder of the batch.
    #[tracing::instrument(skip(self), target = "switchyard_core::reactor", level = "trace")]
    pub fn dispatch(&mut self, filter: DispatchFilter) -> Vec<Delivery> {
        let batch = self.source.drain(&filter);
        let mut deliveries = Vec::with_capacity(batch.len());
        for message in batch {
            deliveries.push(self.deliver(message));
        }
        deliveries
    }

    fn deliver(&mut self, message: Message) -> Delivery {
        if let Some(id) = message.hotkey_id() {
            let ran = run_bound(&self.handlers, self.hotkeys.get(&id), &message);
            return self.finish(message, ran);
        }
        if message.target.is_none() {
            let key = AddressedKey::thread(message.code);
            let ran = run_bound(&self.handlers, self.addressed.get(&key), &message);
            return self.finish(message, ran);
        }
        self.route_to_target(message)
    }

    /// Route a message addressed to a target.
    ///
    /// This is the entry point for environments that deliver some events
    /// synchronously instead of through the queue. Target-specific handlers
    /// run before wildcard handlers; when both run, the target-specific
    /// result is surfaced.
    pub fn route_to_target(&mut self, message: Message) -> Delivery {
        let target = message.target.unwrap_or(TargetId::THREAD);
        let specific = if target.is_thread() {
            None
        } else {
            let key = AddressedKey::new(message.code, target);
            run_bound(&self.handlers, self.addressed.get(&key), &message)
        };
        let wildcard = run_bound(
            &self.handlers,
            self.addressed.get(&AddressedKey::thread(message.code)),
            &message,
        );
        self.finish(message, specific.or(wildcard))
    }

    fn finish(&mut self, message: Message, ran: Option<LResult>) -> Delivery {
        match ran {
            Some(result) => Delivery {
                message,
                result,
                handled: true,
            },
            None => {
                tracing::trace!(target: "switchyard_core::reactor", code = message.code, "default handling");
                let result = self.source.default_handling(&message);
                Delivery {
                    message,
                    result,
                    handled: false,
                }
            }
        }
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("handlers", &self.handlers.len())
            .field("addressed_keys", &self.addressed.len())
            .field("hotkey_keys", &self.hotkeys.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::event::codes;
    use crate::handler::HandlerOwner;
    use crate::platform::headless::HeadlessPlatform;

    fn reactor() -> (Reactor, HeadlessPlatform) {
        let platform = HeadlessPlatform::new();
        let registry = HotkeyRegistry::init(platform.hotkey_backend());
        (Reactor::new(platform.source(), registry), platform)
    }

    #[test]
    fn test_last_handler_wins() {
        let (mut reactor, _platform) = reactor();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let (c1, c2) = (calls.clone(), calls.clone());
        let first = HandlerOwner::new(move |_| {
            c1.borrow_mut().push(1);
            1
        });
        let second = HandlerOwner::new(move |_| {
            c2.borrow_mut().push(2);
            2
        });
        reactor.add_thread_handling(codes::USER, first.handle());
        reactor.add_thread_handling(codes::USER, second.handle());

        reactor.post(Message::new(codes::USER));
        let deliveries = reactor.dispatch(DispatchFilter::all());

        assert_eq!(*calls.borrow(), vec![1, 2]);
        assert_eq!(deliveries[0].result, 2);
        assert!(deliveries[0].handled);
    }

    #[test]
    fn test_dead_handlers_are_skipped() {
        let (mut reactor, platform) = reactor();
        let live = HandlerOwner::new(|_| 1);
        let dead = HandlerOwner::new(|_| 2);
        reactor.add_thread_handling(codes::USER, live.handle());
        reactor.add_thread_handling(codes::USER, dead.handle());
        drop(dead);

        reactor.post(Message::new(codes::USER));
        assert_eq!(reactor.dispatch(DispatchFilter::all())[0].result, 1);

        drop(live);
        reactor.post(Message::new(codes::USER));
        let delivery = &reactor.dispatch(DispatchFilter::all())[0];
        assert!(!delivery.handled);
        assert_eq!(platform.defaulted().len(), 1);
    }

    #[test]
    fn test_unbound_message_defaults() {
        let (mut reactor, platform) = reactor();
        reactor.post(Message::new(codes::PAINT).to(TargetId(4)));
        let deliveries = reactor.dispatch(DispatchFilter::all());
        assert!(!deliveries[0].handled);
        assert_eq!(platform.defaulted()[0].target, Some(TargetId(4)));
    }

    #[test]
    fn test_remove_handler() {
        let (mut reactor, _platform) = reactor();
        let owner = HandlerOwner::new(|_| 1);
        reactor.add_thread_handling(codes::USER, owner.handle());
        reactor.add_addressed_handling(codes::PAINT, TargetId(2), owner.handle());
        assert_eq!(reactor.handler_count(), 2);

        reactor.remove_handler(&owner.handle()).unwrap();
        assert_eq!(reactor.handler_count(), 0);
        assert!(reactor.bindings().is_empty());
        assert!(matches!(
            reactor.remove_handler(&owner.handle()),
            Err(ReactorError::InvalidState(_))
        ));
    }

    #[test]
    fn test_posted_during_dispatch_waits_for_next_call() {
        let (mut reactor, platform) = reactor();
        let poster = platform.poster();
        let owner = HandlerOwner::new(move |_| {
            poster.post(Message::new(codes::USER + 1));
            0
        });
        reactor.add_thread_handling(codes::USER, owner.handle());

        reactor.post(Message::new(codes::USER));
        assert_eq!(reactor.dispatch(DispatchFilter::all()).len(), 1);
        let next = reactor.dispatch(DispatchFilter::all());
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].message.code, codes::USER + 1);
    }

    #[test]
    fn test_bindings_summary() {
        let (mut reactor, _platform) = reactor();
        let a = HandlerOwner::new(|_| 0);
        let b = HandlerOwner::new(|_| 0);
        reactor.add_addressed_handling(codes::TIMER, TargetId(7), a.handle());
        reactor.add_addressed_handling(codes::TIMER, TargetId(7), b.handle());
        drop(b);

        let summary = reactor.bindings();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].handlers, 2);
        assert_eq!(summary[0].live, 1);
    }
}
