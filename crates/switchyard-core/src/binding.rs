//! Deferred method binding for composite objects.
//!
//! Composites are assembled from capability components. A component asks
//! the composite's [`MethodRegistry`] for a [`Handler`] that calls one of
//! its methods, usually while the composite is still being built and has no
//! final address yet. The registry hands out the handle immediately and
//! wires it up once the composite is [`anchor`]ed; if the composite is later
//! [`relocate`]d or [`overwrite`]n, every issued handle follows it without
//! the component noticing.
//!
//! A composite lists the component types it can hand out with
//! [`impl_composite!`](crate::impl_composite). Binding resolves a method's
//! component through that table, so a handle always calls into the
//! component instance living inside the composite it is bound to.
//!
//! ```
//! use switchyard_core::binding::{anchor, MethodRegistry};
//! use switchyard_core::{codes, impl_composite, Message};
//!
//! #[derive(Default)]
//! struct Counter {
//!     hits: u32,
//! }
//!
//! impl Counter {
//!     fn on_paint(&mut self, _msg: &Message) -> isize {
//!         self.hits += 1;
//!         0
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Widget {
//!     counter: Counter,
//!     bindings: MethodRegistry,
//! }
//!
//! impl_composite!(Widget, registry: bindings, components: [counter: Counter]);
//!
//! let mut widget = Widget::default();
//! let handle = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
//! assert!(!handle.is_alive());
//!
//! let widget = anchor(widget).unwrap();
//! handle.invoke(&Message::new(codes::PAINT));
//! assert_eq!(widget.borrow().counter.hits, 1);
//! ```

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ReactorError, Result};
use crate::event::{LResult, Message};
use crate::handler::{Handler, HandlerOwner};

/// A component method usable as a callback.
pub type Method<T> = fn(&mut T, &Message) -> LResult;

/// An object assembled from components that can be bound to.
///
/// Implement with [`impl_composite!`](crate::impl_composite).
pub trait Composite: 'static {
    /// Whether this composite can hand out a component of type `component`.
    fn provides(component: TypeId) -> bool
    where
        Self: Sized;

    /// The component of type `component`, as `Any` for downcasting.
    fn component_mut(&mut self, component: TypeId) -> Option<&mut dyn Any>;

    /// The registry that tracks this composite's method callbacks.
    fn method_registry(&mut self) -> &mut MethodRegistry;
}

/// Implement [`Composite`](crate::binding::Composite) for a struct.
///
/// The struct itself is always a provided component. List fields holding
/// further components after `components:`.
///
/// ```
/// use switchyard_core::binding::MethodRegistry;
/// use switchyard_core::impl_composite;
///
/// struct Border;
/// struct Panel {
///     border: Border,
///     registry: MethodRegistry,
/// }
///
/// impl_composite!(Panel, registry: registry, components: [border: Border]);
/// ```
#[macro_export]
macro_rules! impl_composite {
    ($ty:ty, registry: $registry:ident $(, components: [$($field:ident : $component:ty),* $(,)?])? $(,)?) => {
        impl $crate::binding::Composite for $ty {
            fn provides(component: ::std::any::TypeId) -> bool {
                component == ::std::any::TypeId::of::<Self>()
                    $($(|| component == ::std::any::TypeId::of::<$component>())*)?
            }

            fn component_mut(
                &mut self,
                component: ::std::any::TypeId,
            ) -> ::std::option::Option<&mut dyn ::std::any::Any> {
                if component == ::std::any::TypeId::of::<Self>() {
                    return ::std::option::Option::Some(self as &mut dyn ::std::any::Any);
                }
                $($(
                    if component == ::std::any::TypeId::of::<$component>() {
                        return ::std::option::Option::Some(&mut self.$field as &mut dyn ::std::any::Any);
                    }
                )*)?
                ::std::option::Option::None
            }

            fn method_registry(&mut self) -> &mut $crate::binding::MethodRegistry {
                &mut self.$registry
            }
        }
    };
}

/// Where a composite currently lives.
#[derive(Clone)]
struct OwnerAddress {
    cell: Weak<RefCell<dyn Composite>>,
    type_name: &'static str,
    provides: fn(TypeId) -> bool,
}

impl OwnerAddress {
    fn of<C: Composite>(cell: &Rc<RefCell<C>>) -> Self {
        let erased: Rc<RefCell<dyn Composite>> = cell.clone();
        Self {
            cell: Rc::downgrade(&erased),
            type_name: type_name::<C>(),
            provides: C::provides,
        }
    }
}

/// The composite address shared by every method owner of one registry.
type SharedAddress = Rc<RefCell<Option<OwnerAddress>>>;

/// Binding state of a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// The composite has no address yet; issued handles are not alive.
    Unbound,
    /// Issued handles call into the composite's first address.
    Bound,
    /// The composite moved; issued handles follow it.
    Rebound,
    /// The composite was detached; issued handles are dead.
    Invalidated,
}

fn bind_method<T: 'static>(
    cell: Weak<RefCell<dyn Composite>>,
    method: Method<T>,
) -> impl Fn(&Message) -> LResult + 'static {
    move |message: &Message| {
        let Some(composite) = cell.upgrade() else {
            return 0;
        };
        let Ok(mut composite) = composite.try_borrow_mut() else {
            tracing::warn!(
                target: "switchyard_core::binding",
                component = type_name::<T>(),
                code = message.code,
                "composite is busy, skipping reentrant callback"
            );
            return 0;
        };
        match composite
            .component_mut(TypeId::of::<T>())
            .and_then(|component| component.downcast_mut::<T>())
        {
            Some(component) => method(component, message),
            None => {
                tracing::warn!(target: "switchyard_core::binding", component = type_name::<T>(), "component missing from composite");
                0
            }
        }
    }
}

/// Type-erased view of a [`MethodOwner`].
trait ErasedMethodOwner {
    fn component_type(&self) -> TypeId;
    fn component_name(&self) -> &'static str;
    fn reassign_owner(&mut self, address: &OwnerAddress) -> bool;
    fn invalidate(&mut self);
    fn len(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Remembers the callbacks issued for the methods of one component type.
struct MethodOwner<T: 'static> {
    address: SharedAddress,
    methods: Vec<(Method<T>, HandlerOwner)>,
}

impl<T: 'static> MethodOwner<T> {
    fn new(address: SharedAddress) -> Self {
        Self {
            address,
            methods: Vec::new(),
        }
    }

    fn callback(&mut self, method: Method<T>) -> Result<Handler> {
        if let Some((_, owner)) = self
            .methods
            .iter()
            .find(|(known, _)| std::ptr::fn_addr_eq(*known, method))
        {
            return Ok(owner.handle());
        }

        let owner = HandlerOwner::empty();
        if let Some(address) = self.address.borrow().as_ref() {
            owner.set(bind_method(address.cell.clone(), method));
        }
        let handle = owner.handle();
        self.methods.push((method, owner));
        Ok(handle)
    }
}

impl<T: 'static> ErasedMethodOwner for MethodOwner<T> {
    fn component_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn reassign_owner(&mut self, address: &OwnerAddress) -> bool {
        if !(address.provides)(TypeId::of::<T>()) {
            return false;
        }
        for (method, owner) in &self.methods {
            owner.set(bind_method(address.cell.clone(), *method));
        }
        true
    }

    fn invalidate(&mut self) {
        for (_, owner) in &self.methods {
            let _ = owner.set_alive(false);
        }
    }

    fn len(&self) -> usize {
        self.methods.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-composite registry of method callbacks.
///
/// Keep one inside every composite and expose it through
/// [`Composite::method_registry`].
pub struct MethodRegistry {
    address: SharedAddress,
    owners: Vec<Box<dyn ErasedMethodOwner>>,
    state: BindingState,
}

impl MethodRegistry {
    /// Create an unbound registry.
    pub fn new() -> Self {
        Self {
            address: Rc::new(RefCell::new(None)),
            owners: Vec::new(),
            state: BindingState::Unbound,
        }
    }

    /// Get a handle that calls `method` on the component of type `T`.
    ///
    /// Requesting the same method again returns a handle to the same
    /// storage. While the composite is unbound the handle stays dead.
    ///
    /// # Errors
    ///
    /// Fails with [`ReactorError::Binding`] when the registry is bound to a
    /// composite that does not provide `T`.
    pub fn request_method_callback<T: 'static>(&mut self, method: Method<T>) -> Result<Handler> {
        if let Some(address) = self.address.borrow().as_ref() {
            if !(address.provides)(TypeId::of::<T>()) {
                return Err(ReactorError::Binding {
                    component: type_name::<T>(),
                    composite: address.type_name,
                });
            }
        }

        let address = Rc::clone(&self.address);
        let index = match self
            .owners
            .iter()
            .position(|owner| owner.component_type() == TypeId::of::<T>())
        {
            Some(index) => index,
            None => {
                self.owners.push(Box::new(MethodOwner::<T>::new(address)));
                self.owners.len() - 1
            }
        };
        self.owners[index]
            .as_any_mut()
            .downcast_mut::<MethodOwner<T>>()
            .ok_or(ReactorError::InvalidState("method owner has mismatched type"))?
            .callback(method)
    }

    /// Point every callback whose component `owner` provides at `owner`.
    ///
    /// Method owners for components `owner` does not provide are left as
    /// they are. Returns how many method owners were rebound.
    pub fn reassign_owner<C: Composite>(&mut self, owner: &Rc<RefCell<C>>) -> usize {
        let address = OwnerAddress::of(owner);
        let mut rebound = 0;
        for method_owner in &mut self.owners {
            if method_owner.reassign_owner(&address) {
                rebound += 1;
            }
        }
        *self.address.borrow_mut() = Some(address);

        self.state = match self.state {
            BindingState::Unbound => BindingState::Bound,
            _ => BindingState::Rebound,
        };
        tracing::debug!(
            target: "switchyard_core::binding",
            composite = type_name::<C>(),
            rebound,
            state = ?self.state,
            "method owners reassigned"
        );
        rebound
    }

    /// Forget the current address and kill every issued handle.
    pub fn detach(&mut self) {
        *self.address.borrow_mut() = None;
        for owner in &mut self.owners {
            owner.invalidate();
        }
        self.state = BindingState::Invalidated;
    }

    /// Current binding state.
    pub fn state(&self) -> BindingState {
        self.state
    }

    /// Number of distinct component types with callbacks.
    pub fn component_count(&self) -> usize {
        self.owners.len()
    }

    /// Number of remembered methods across all components.
    pub fn method_count(&self) -> usize {
        self.owners.iter().map(|owner| owner.len()).sum()
    }

    fn unbindable<C: Composite>(&self) -> Option<&'static str> {
        self.owners
            .iter()
            .find(|owner| !C::provides(owner.component_type()))
            .map(|owner| owner.component_name())
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<&str> = self.owners.iter().map(|o| o.component_name()).collect();
        f.debug_struct("MethodRegistry")
            .field("state", &self.state)
            .field("components", &components)
            .field("methods", &self.method_count())
            .finish()
    }
}

/// Give a composite its final address and bind every pending callback.
///
/// # Errors
///
/// Fails with [`ReactorError::Binding`] if a component requested callbacks
/// for a type the composite does not provide. Such callbacks could never be
/// bound.
pub fn anchor<C: Composite>(composite: C) -> Result<Rc<RefCell<C>>> {
    let cell = Rc::new(RefCell::new(composite));
    bind(&cell)?;
    Ok(cell)
}

fn bind<C: Composite>(cell: &Rc<RefCell<C>>) -> Result<()> {
    let mut composite = cell
        .try_borrow_mut()
        .map_err(|_| ReactorError::InvalidState("composite is borrowed"))?;
    let registry = composite.method_registry();
    if let Some(component) = registry.unbindable::<C>() {
        return Err(ReactorError::Binding {
            component,
            composite: type_name::<C>(),
        });
    }
    registry.reassign_owner(cell);
    Ok(())
}

/// Move an anchored composite to a new address.
///
/// Issued handles keep working and call into the new address.
///
/// # Errors
///
/// Fails with [`ReactorError::InvalidState`] if anything other than issued
/// handles still holds the composite.
#[tracing::instrument(skip_all, target = "switchyard_core::binding", level = "debug", fields(composite = type_name::<C>()))]
pub fn relocate<C: Composite>(cell: Rc<RefCell<C>>) -> Result<Rc<RefCell<C>>> {
    let mut composite = Rc::try_unwrap(cell)
        .map_err(|_| ReactorError::InvalidState("composite is still shared"))?
        .into_inner();
    composite.method_registry().detach();
    anchor(composite)
}

/// Replace an anchored composite's value in place.
///
/// The previous value is dropped, which kills the handles it issued.
/// Handles issued by `source` are bound to `cell`.
///
/// # Errors
///
/// Fails with [`ReactorError::InvalidState`] if the composite is borrowed,
/// or with [`ReactorError::Binding`] as in [`anchor`].
#[tracing::instrument(skip_all, target = "switchyard_core::binding", level = "debug", fields(composite = type_name::<C>()))]
pub fn overwrite<C: Composite>(cell: &Rc<RefCell<C>>, mut source: C) -> Result<()> {
    source.method_registry().detach();
    let previous = {
        let mut slot = cell
            .try_borrow_mut()
            .map_err(|_| ReactorError::InvalidState("composite is borrowed"))?;
        std::mem::replace(&mut *slot, source)
    };
    drop(previous);
    bind(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::codes;

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    impl Counter {
        fn on_paint(&mut self, _: &Message) -> LResult {
            self.hits += 1;
            self.hits as LResult
        }

        fn on_timer(&mut self, _: &Message) -> LResult {
            100
        }
    }

    struct Unrelated;

    impl Unrelated {
        fn poke(&mut self, _: &Message) -> LResult {
            -1
        }
    }

    #[derive(Default)]
    struct Widget {
        label: &'static str,
        counter: Counter,
        bindings: MethodRegistry,
    }

    impl Widget {
        fn labelled(label: &'static str) -> Self {
            Self {
                label,
                ..Default::default()
            }
        }

        fn on_dblclk(&mut self, _: &Message) -> LResult {
            self.label.len() as LResult
        }
    }

    impl_composite!(Widget, registry: bindings, components: [counter: Counter]);

    fn paint() -> Message {
        Message::new(codes::PAINT)
    }

    #[test]
    fn test_unbound_handle_is_dead_until_anchored() {
        let mut widget = Widget::labelled("w");
        let handle = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        assert!(!handle.is_alive());
        assert_eq!(widget.bindings.state(), BindingState::Unbound);

        let widget = anchor(widget).unwrap();
        assert!(handle.is_alive());
        assert_eq!(handle.invoke(&paint()), 1);
        assert_eq!(widget.borrow().counter.hits, 1);
        assert_eq!(widget.borrow().bindings.state(), BindingState::Bound);
    }

    #[test]
    fn test_same_method_shares_storage() {
        let mut widget = Widget::default();
        let first = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        let second = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        let other = widget.bindings.request_method_callback(Counter::on_timer).unwrap();
        assert!(first.same_as(&second));
        assert!(!first.same_as(&other));
        assert_eq!(widget.bindings.component_count(), 1);
        assert_eq!(widget.bindings.method_count(), 2);

        let _widget = anchor(widget).unwrap();
        assert!(first.is_alive() && second.is_alive());
    }

    #[test]
    fn test_request_after_anchor_is_live() {
        let widget = anchor(Widget::labelled("abc")).unwrap();
        let handle = widget
            .borrow_mut()
            .bindings
            .request_method_callback(Widget::on_dblclk)
            .unwrap();
        assert!(handle.is_alive());
        assert_eq!(handle.invoke(&paint()), 3);
    }

    #[test]
    fn test_reassign_points_at_new_address() {
        let widget = anchor(Widget::labelled("old")).unwrap();
        let handle = widget
            .borrow_mut()
            .bindings
            .request_method_callback(Widget::on_dblclk)
            .unwrap();

        let replacement = Rc::new(RefCell::new(Widget::labelled("replacement")));
        let rebound = widget.borrow_mut().bindings.reassign_owner(&replacement);
        assert_eq!(rebound, 1);
        assert_eq!(handle.invoke(&paint()), "replacement".len() as LResult);
        assert_eq!(widget.borrow().bindings.state(), BindingState::Rebound);
    }

    #[test]
    fn test_relocate_keeps_handles_working() {
        let mut widget = Widget::default();
        let handle = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        let widget = anchor(widget).unwrap();
        handle.invoke(&paint());

        let moved = relocate(widget).unwrap();
        assert!(handle.is_alive());
        assert_eq!(handle.invoke(&paint()), 2);
        assert_eq!(moved.borrow().counter.hits, 2);
        assert_eq!(moved.borrow().bindings.state(), BindingState::Rebound);
    }

    #[test]
    fn test_relocate_refuses_shared_composite() {
        let widget = anchor(Widget::default()).unwrap();
        let _extra = Rc::clone(&widget);
        assert!(matches!(
            relocate(widget),
            Err(ReactorError::InvalidState(_))
        ));
    }

    #[test]
    fn test_overwrite_kills_old_and_binds_new() {
        let mut first = Widget::labelled("first");
        let old = first.bindings.request_method_callback(Widget::on_dblclk).unwrap();
        let cell = anchor(first).unwrap();

        let mut second = Widget::labelled("second!");
        let new = second.bindings.request_method_callback(Widget::on_dblclk).unwrap();
        overwrite(&cell, second).unwrap();

        assert!(!old.is_alive());
        assert!(new.is_alive());
        assert_eq!(new.invoke(&paint()), "second!".len() as LResult);
    }

    #[test]
    fn test_dropping_composite_kills_handles() {
        let mut widget = Widget::default();
        let handle = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        let widget = anchor(widget).unwrap();
        drop(widget);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_unprovided_component_is_a_binding_error() {
        let widget = anchor(Widget::default()).unwrap();
        let err = widget
            .borrow_mut()
            .bindings
            .request_method_callback(Unrelated::poke)
            .unwrap_err();
        assert!(matches!(err, ReactorError::Binding { .. }));

        let mut pending = Widget::default();
        pending.bindings.request_method_callback(Unrelated::poke).unwrap();
        assert!(matches!(anchor(pending), Err(ReactorError::Binding { .. })));
    }

    #[test]
    fn test_reassign_leaves_unmatched_owners_untouched() {
        struct Other {
            registry: MethodRegistry,
        }
        impl_composite!(Other, registry: registry);

        let mut widget = Widget::default();
        let counter_handle = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        let widget_handle = widget.bindings.request_method_callback(Widget::on_dblclk).unwrap();

        let other = Rc::new(RefCell::new(Other {
            registry: MethodRegistry::new(),
        }));
        assert_eq!(widget.bindings.reassign_owner(&other), 0);
        assert!(!counter_handle.is_alive());
        assert!(!widget_handle.is_alive());
    }

    #[test]
    fn test_reentrant_call_is_skipped() {
        let mut widget = Widget::default();
        let handle = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        let widget = anchor(widget).unwrap();

        let guard = widget.borrow_mut();
        assert_eq!(handle.invoke(&paint()), 0);
        drop(guard);
        assert_eq!(handle.invoke(&paint()), 1);
    }

    #[test]
    fn test_detach_invalidates() {
        let mut widget = Widget::default();
        let handle = widget.bindings.request_method_callback(Counter::on_paint).unwrap();
        let widget = anchor(widget).unwrap();
        widget.borrow_mut().bindings.detach();
        assert!(!handle.is_alive());
        assert_eq!(widget.borrow().bindings.state(), BindingState::Invalidated);
    }
}
