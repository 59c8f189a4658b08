//! Reusable target components.
//!
//! A component contributes attributes and handlers to a [`TargetConfig`]
//! before the target exists. Its handlers are method callbacks requested
//! from the enclosing composite's [`MethodRegistry`], so they start calling
//! into the component once the composite is anchored.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use switchyard_core::target::{MixBehavior, Target, TargetConfig, TargetLink};
use switchyard_core::{codes, LResult, Message, MethodRegistry, Result};

/// Hit-test result that makes the whole target draggable.
pub const HT_CAPTION: LResult = 2;

/// Timer a [`Hideable`] uses for [`Hideable::show_for`].
pub const HIDE_TIMER: u32 = 0x5359;

/// An anchored composite together with the target it drives.
#[derive(Debug)]
pub struct Mounted<C> {
    /// The composite; its callbacks are bound to this address.
    pub composite: Rc<RefCell<C>>,
    /// The created target.
    pub target: Target,
}

/// Drops the frame and lets the whole surface drag the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct Borderless;

impl Borderless {
    /// Contribute the frame handlers.
    pub fn configure(registry: &mut MethodRegistry, config: TargetConfig) -> Result<TargetConfig> {
        Ok(config
            .handler(
                codes::NC_CALC_SIZE,
                registry.request_method_callback(Self::on_nc_calc_size)?,
                MixBehavior::Combine,
            )
            .handler(
                codes::NC_HIT_TEST,
                registry.request_method_callback(Self::on_nc_hit_test)?,
                MixBehavior::Combine,
            ))
    }

    fn on_nc_calc_size(&mut self, _message: &Message) -> LResult {
        0
    }

    fn on_nc_hit_test(&mut self, _message: &Message) -> LResult {
        HT_CAPTION
    }
}

/// Visibility control with an optional self-hiding timer.
#[derive(Debug, Default)]
pub struct Hideable {
    shown: bool,
    timer_active: bool,
    link: Option<TargetLink>,
}

impl Hideable {
    /// Create with an initial visibility.
    pub fn new(shown: bool) -> Self {
        Self {
            shown,
            timer_active: false,
            link: None,
        }
    }

    /// Contribute the initial visibility and the timer handler.
    pub fn configure(&self, registry: &mut MethodRegistry, config: TargetConfig) -> Result<TargetConfig> {
        Ok(config.visible(self.shown, MixBehavior::Rewrite).handler(
            codes::TIMER,
            registry.request_method_callback(Self::on_timer)?,
            MixBehavior::Combine,
        ))
    }

    /// Connect to the created target.
    pub fn attach(&mut self, link: TargetLink) {
        self.link = Some(link);
    }

    /// Whether the target is meant to be shown.
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Show or hide the target, cancelling a pending [`show_for`](Self::show_for).
    pub fn show(&mut self, shown: bool) {
        if let Some(link) = &self.link {
            if self.shown != shown {
                link.set_visible(shown);
            }
            if self.timer_active {
                link.kill_timer(HIDE_TIMER);
            }
        }
        self.timer_active = false;
        self.shown = shown;
    }

    /// Show the target and hide it again after `duration`.
    pub fn show_for(&mut self, duration: Duration) {
        self.show(true);
        match &self.link {
            Some(link) => {
                link.set_timer(HIDE_TIMER, duration);
                self.timer_active = true;
            }
            None => {
                tracing::warn!(target: "switchyard::app", "show_for on a component without a target");
            }
        }
    }

    fn on_timer(&mut self, message: &Message) -> LResult {
        if message.wparam() != HIDE_TIMER as usize {
            return 0;
        }
        if self.timer_active {
            self.show(false);
        }
        0
    }
}
