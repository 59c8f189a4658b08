//! Addressable targets and their construction.
//!
//! A target is anything the environment addresses events to (a window, in
//! a desktop environment). [`TargetConfig`] accumulates the attributes and
//! handlers of a target; configurations coming from several components are
//! merged with [`TargetConfig::mix_with`] before the target is created.
//!
//! Creation binds the configured handlers before the environment realizes
//! the target, so the very first events it sends are already routed.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{ReactorError, Result};
use crate::event::{codes, DispatchFilter, EventCode, TargetId};
use crate::handler::{Handler, HandlerOwner};
use crate::platform::{TargetControl, TargetFactory};
use crate::reactor::Reactor;

/// Native style bits understood by desktop event sources.
pub mod styles {
    /// Redraw on vertical size change.
    pub const CS_VREDRAW: u32 = 0x0001;
    /// Redraw on horizontal size change.
    pub const CS_HREDRAW: u32 = 0x0002;
    /// Deliver double click events.
    pub const CS_DBLCLKS: u32 = 0x0008;

    /// A window without any frame.
    pub const WS_POPUP: u32 = 0x8000_0000;
    /// A window with a thin border.
    pub const WS_BORDER: u32 = 0x0080_0000;
    /// A resizable frame.
    pub const WS_THICKFRAME: u32 = 0x0004_0000;
    /// A regular top-level window.
    pub const WS_OVERLAPPEDWINDOW: u32 = 0x00CF_0000;

    /// Accepts dropped files.
    pub const WS_EX_ACCEPTFILES: u32 = 0x0000_0010;
    /// Stays above non-topmost windows.
    pub const WS_EX_TOPMOST: u32 = 0x0000_0008;
    /// Kept out of the task bar.
    pub const WS_EX_TOOLWINDOW: u32 = 0x0000_0080;
}

/// How one configuration field merges with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixBehavior {
    /// The field was never set; any other value wins.
    #[default]
    NotSet,
    /// Flags are or-ed together; plain values keep the first setting.
    Combine,
    /// The incoming value replaces this one.
    Rewrite,
}

/// Attributes a target is realized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAttributes {
    /// Whether the target starts out shown.
    pub visible: bool,
    /// Class style bits.
    pub class_style: u32,
    /// Style bits.
    pub style: u32,
    /// Extended style bits.
    pub ex_style: u32,
    /// Top-left corner, `None` to let the environment decide.
    pub position: Option<(i32, i32)>,
    /// Width and height, `None` to let the environment decide.
    pub size: Option<(i32, i32)>,
}

impl Default for TargetAttributes {
    fn default() -> Self {
        Self {
            visible: true,
            class_style: styles::CS_HREDRAW | styles::CS_VREDRAW,
            style: styles::WS_OVERLAPPEDWINDOW,
            ex_style: 0,
            position: None,
            size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Mixes {
    visible: MixBehavior,
    class_style: MixBehavior,
    style: MixBehavior,
    ex_style: MixBehavior,
    position: MixBehavior,
    size: MixBehavior,
    handlers: MixBehavior,
}

fn mix_flags(mine: &mut u32, my_mix: &mut MixBehavior, other: u32, other_mix: MixBehavior) {
    if *my_mix == MixBehavior::NotSet || other_mix == MixBehavior::Rewrite {
        *mine = other;
        *my_mix = other_mix;
    } else if *my_mix == MixBehavior::Combine && other_mix == MixBehavior::Combine {
        *mine |= other;
    }
}

fn mix_field<T: Clone>(mine: &mut T, my_mix: &mut MixBehavior, other: &T, other_mix: MixBehavior) {
    if *my_mix == MixBehavior::NotSet || other_mix == MixBehavior::Rewrite {
        *mine = other.clone();
        *my_mix = other_mix;
    }
}

/// Builder for a target.
///
/// ```
/// use switchyard_core::target::{styles, MixBehavior, TargetConfig};
///
/// let base = TargetConfig::new().ex_style(styles::WS_EX_TOPMOST, MixBehavior::Combine);
/// let tool = TargetConfig::new().ex_style(styles::WS_EX_TOOLWINDOW, MixBehavior::Combine);
/// let merged = base.mix_with(&tool);
/// assert_eq!(
///     merged.attributes().ex_style,
///     styles::WS_EX_TOPMOST | styles::WS_EX_TOOLWINDOW
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct TargetConfig {
    attributes: TargetAttributes,
    mixes: Mixes,
    handlers: Vec<(EventCode, Handler)>,
}

impl TargetConfig {
    /// An empty configuration; every field is [`MixBehavior::NotSet`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set initial visibility.
    pub fn visible(mut self, visible: bool, mix: MixBehavior) -> Self {
        self.attributes.visible = visible;
        self.mixes.visible = mix;
        self
    }

    /// Set class style bits.
    pub fn class_style(mut self, class_style: u32, mix: MixBehavior) -> Self {
        self.attributes.class_style = class_style;
        self.mixes.class_style = mix;
        self
    }

    /// Set style bits.
    pub fn style(mut self, style: u32, mix: MixBehavior) -> Self {
        self.attributes.style = style;
        self.mixes.style = mix;
        self
    }

    /// Set extended style bits.
    pub fn ex_style(mut self, ex_style: u32, mix: MixBehavior) -> Self {
        self.attributes.ex_style = ex_style;
        self.mixes.ex_style = mix;
        self
    }

    /// Set the top-left corner.
    pub fn position(mut self, x: i32, y: i32, mix: MixBehavior) -> Self {
        self.attributes.position = Some((x, y));
        self.mixes.position = mix;
        self
    }

    /// Set width and height.
    pub fn size(mut self, width: i32, height: i32, mix: MixBehavior) -> Self {
        self.attributes.size = Some((width, height));
        self.mixes.size = mix;
        self
    }

    /// Route `code` events of the created target to `handler`.
    ///
    /// With [`MixBehavior::Rewrite`] the handler list collected so far is
    /// discarded first.
    pub fn handler(mut self, code: EventCode, handler: Handler, mix: MixBehavior) -> Self {
        if mix == MixBehavior::Rewrite {
            self.handlers.clear();
        }
        self.handlers.push((code, handler));
        self.mixes.handlers = mix;
        self
    }

    /// Merge another configuration into this one.
    ///
    /// A field that was never set takes the other's value; a `Rewrite` in
    /// `other` replaces this field; two `Combine` flag fields are or-ed.
    pub fn mix_with(mut self, other: &TargetConfig) -> Self {
        let attrs = &mut self.attributes;
        let mixes = &mut self.mixes;
        mix_field(&mut attrs.visible, &mut mixes.visible, &other.attributes.visible, other.mixes.visible);
        mix_flags(&mut attrs.class_style, &mut mixes.class_style, other.attributes.class_style, other.mixes.class_style);
        mix_flags(&mut attrs.style, &mut mixes.style, other.attributes.style, other.mixes.style);
        mix_flags(&mut attrs.ex_style, &mut mixes.ex_style, other.attributes.ex_style, other.mixes.ex_style);
        mix_field(&mut attrs.position, &mut mixes.position, &other.attributes.position, other.mixes.position);
        mix_field(&mut attrs.size, &mut mixes.size, &other.attributes.size, other.mixes.size);

        if mixes.handlers == MixBehavior::NotSet || other.mixes.handlers == MixBehavior::Rewrite {
            self.handlers = other.handlers.clone();
            mixes.handlers = other.mixes.handlers;
        } else if mixes.handlers == MixBehavior::Combine && other.mixes.handlers == MixBehavior::Combine {
            self.handlers.extend(other.handlers.iter().cloned());
        }
        self
    }

    /// The attributes the target will be realized with.
    pub fn attributes(&self) -> &TargetAttributes {
        &self.attributes
    }

    /// Number of configured handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Create the target.
    ///
    /// Reserves an identity, binds a built-in `DESTROY` handler that marks
    /// the target closed, binds the configured handlers, then realizes it.
    /// If realization fails, every binding made here is undone.
    ///
    /// # Errors
    ///
    /// Propagates [`ReactorError::TargetCreation`] from the factory.
    #[tracing::instrument(skip_all, target = "switchyard_core::target", level = "debug")]
    pub fn create(self, factory: &Rc<dyn TargetFactory>, reactor: &mut Reactor) -> Result<Target> {
        let id = factory.reserve()?;

        let closed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&closed);
        let destroy_handler = HandlerOwner::new(move |_| {
            flag.set(true);
            0
        });
        let mut slots = Vec::with_capacity(self.handlers.len() + 1);
        slots.push(reactor.add_addressed_handling(codes::DESTROY, id, destroy_handler.handle()));

        for (code, handler) in self.handlers {
            slots.push(reactor.add_addressed_handling(code, id, handler));
        }

        if let Err(err) = factory.realize(id, &self.attributes) {
            reactor.unbind_slots(&slots);
            tracing::warn!(target: "switchyard_core::target", %id, %err, "target creation refused");
            return Err(err);
        }
        tracing::debug!(target: "switchyard_core::target", %id, "target created");

        let control: Rc<dyn TargetControl> = factory.clone();
        Ok(Target {
            id,
            closed,
            control,
            _destroy_handler: destroy_handler,
        })
    }
}

/// Upper bound on dispatch rounds while waiting for a target to close.
const MAX_CLOSE_ROUNDS: usize = 16;

/// A created target. Dropping it destroys the target.
pub struct Target {
    id: TargetId,
    closed: Rc<Cell<bool>>,
    control: Rc<dyn TargetControl>,
    _destroy_handler: HandlerOwner,
}

impl Target {
    /// The target's identity.
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Whether the environment confirmed destruction.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// A lightweight handle for components that act on this target.
    pub fn link(&self) -> TargetLink {
        TargetLink {
            id: self.id,
            control: Rc::clone(&self.control),
        }
    }

    /// Destroy the target and pump its `DESTROY` event.
    ///
    /// # Errors
    ///
    /// Fails with [`ReactorError::InvalidState`] if the environment never
    /// confirms destruction.
    pub fn close(&self, reactor: &mut Reactor) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.control.destroy(self.id);
        let filter = DispatchFilter::code(codes::DESTROY).for_target(self.id);
        for _ in 0..MAX_CLOSE_ROUNDS {
            reactor.dispatch(filter);
            if self.is_closed() {
                return Ok(());
            }
        }
        Err(ReactorError::InvalidState("target did not confirm destruction"))
    }
}

impl Drop for Target {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.control.destroy(self.id);
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Non-owning access to a target's controls.
#[derive(Clone)]
pub struct TargetLink {
    id: TargetId,
    control: Rc<dyn TargetControl>,
}

impl TargetLink {
    /// The linked target.
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Show or hide the target.
    pub fn set_visible(&self, visible: bool) {
        self.control.set_visible(self.id, visible);
    }

    /// Whether the target is shown.
    pub fn is_visible(&self) -> bool {
        self.control.is_visible(self.id)
    }

    /// Start a repeating timer on the target.
    pub fn set_timer(&self, timer: u32, interval: Duration) {
        self.control.set_timer(self.id, timer, interval);
    }

    /// Stop a timer on the target.
    pub fn kill_timer(&self, timer: u32) {
        self.control.kill_timer(self.id, timer);
    }

    /// Ask the environment to destroy the target.
    ///
    /// The owning [`Target`] observes the destruction once its `DESTROY`
    /// event is dispatched.
    pub fn destroy(&self) {
        self.control.destroy(self.id);
    }
}

impl fmt::Debug for TargetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetLink").field("id", &self.id).finish()
    }
}
