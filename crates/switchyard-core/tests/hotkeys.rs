//! Integration tests for global hotkey registration and delivery.

use std::cell::Cell;
use std::rc::Rc;

use switchyard_core::platform::headless::HeadlessPlatform;
use switchyard_core::{
    codes, DispatchFilter, HandlerOwner, Hotkey, HotkeyId, HotkeyRegistry, LiteralError,
    Message, Modifiers, Reactor, ReactorError,
};

fn hotkey(literal: &str) -> Hotkey {
    literal.parse().unwrap()
}

#[test]
fn test_same_hotkey_is_claimed_once() {
    let platform = HeadlessPlatform::new();
    let registry = HotkeyRegistry::init(platform.hotkey_backend());
    let mut reactor = Reactor::new(platform.source(), registry.clone());

    let hits = Rc::new(Cell::new(0));
    let (a, b) = (Rc::clone(&hits), Rc::clone(&hits));
    let first = HandlerOwner::new(move |_| {
        a.set(a.get() + 1);
        1
    });
    let second = HandlerOwner::new(move |_| {
        b.set(b.get() + 10);
        2
    });

    let id1 = reactor.add_hotkey_handling(hotkey("ctrl alt A"), first.handle()).unwrap();
    let id2 = reactor.add_hotkey_handling(hotkey("alt ctrl A"), second.handle()).unwrap();
    assert_eq!(id1, id2);
    assert_eq!(platform.hotkey_backend().claimed(), vec![(id1, hotkey("alt ctrl A"))]);

    assert!(platform.press(hotkey("ctrl alt A")));
    let deliveries = reactor.dispatch(DispatchFilter::all());
    assert_eq!(hits.get(), 11);
    assert_eq!(deliveries[0].result, 2);
}

#[test]
fn test_registries_shared_between_reactors() {
    let platform = HeadlessPlatform::new();
    let registry = HotkeyRegistry::init(platform.hotkey_backend());
    let other = HeadlessPlatform::new();
    let mut first = Reactor::new(platform.source(), registry.clone());
    let mut second = Reactor::new(other.source(), registry.clone());

    let owner = HandlerOwner::new(|_| 0);
    let id1 = first.add_hotkey_handling(hotkey("win Q"), owner.handle()).unwrap();
    let id2 = second.add_hotkey_handling(hotkey("win Q"), owner.handle()).unwrap();
    assert_eq!(id1, id2);
    assert_eq!(registry.registered().len(), 1);
}

#[test]
fn test_occupied_hotkey_is_a_conflict() {
    let platform = HeadlessPlatform::new();
    platform.hotkey_backend().occupy(hotkey("ctrl C"));
    let registry = HotkeyRegistry::init(platform.hotkey_backend());
    let mut reactor = Reactor::new(platform.source(), registry);

    let owner = HandlerOwner::new(|_| 0);
    let err = reactor.add_hotkey_handling(hotkey("ctrl C"), owner.handle()).unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("<ctrl C>"));
    assert_eq!(reactor.handler_count(), 0);
}

#[test]
fn test_unbound_hotkey_press_is_defaulted() {
    let platform = HeadlessPlatform::new();
    let registry = HotkeyRegistry::init(platform.hotkey_backend());
    let mut reactor = Reactor::new(platform.source(), registry);

    reactor.post(Message::hotkey(HotkeyId(42)));
    let deliveries = reactor.dispatch(DispatchFilter::code(codes::HOTKEY));
    assert!(!deliveries[0].handled);
    assert_eq!(platform.defaulted().len(), 1);
}

#[test]
fn test_shutdown_releases_claims() {
    let platform = HeadlessPlatform::new();
    let backend = platform.hotkey_backend();
    let registry = HotkeyRegistry::init(platform.hotkey_backend());
    let mut reactor = Reactor::new(platform.source(), registry.clone());

    let owner = HandlerOwner::new(|_| 0);
    reactor.add_hotkey_handling(hotkey("A"), owner.handle()).unwrap();
    reactor.add_hotkey_handling(hotkey("shift B"), owner.handle()).unwrap();

    registry.shutdown();
    assert!(registry.is_shut_down());
    assert_eq!(backend.released(), vec![HotkeyId(1), HotkeyId(2)]);
    assert!(backend.claimed().is_empty());
    assert!(matches!(
        reactor.add_hotkey_handling(hotkey("C"), owner.handle()),
        Err(ReactorError::InvalidState(_))
    ));
}

#[test]
fn test_literal_scenarios() {
    let parsed = hotkey("ctrl alt A");
    assert_eq!(parsed.modifiers(), Modifiers::CONTROL | Modifiers::ALT);
    assert_eq!(parsed.key(), 'A');

    assert_eq!(Hotkey::parse("A ctrl"), Err(LiteralError::KeyNotLast));
    assert_eq!(
        Hotkey::parse("ctrl ctrl A"),
        Err(LiteralError::DuplicateModifier("ctrl"))
    );
}
