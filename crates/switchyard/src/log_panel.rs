//! A borderless panel that shows startup notes and warnings.

use std::rc::Rc;
use std::time::Duration;

use switchyard_core::target::{styles, MixBehavior, TargetConfig};
use switchyard_core::{
    anchor, codes, impl_composite, LResult, Message, MethodRegistry, Reactor, TargetFactory,
};

use crate::components::{Borderless, Hideable, Mounted};
use crate::error::AppResult;

/// Heading placed above collected warnings.
pub const REPORT_HEADER: &str = "Info\n\n";

/// Hint placed below collected warnings.
pub const REPORT_FOOTER: &str = "\nDouble click to close window";

/// The log panel composite.
pub struct LogPanel {
    frame: Borderless,
    hideable: Hideable,
    text: String,
    bindings: MethodRegistry,
}

impl_composite!(LogPanel, registry: bindings, components: [frame: Borderless, hideable: Hideable]);

impl LogPanel {
    /// Create the target, hidden, and anchor the composite.
    pub fn create(factory: &Rc<dyn TargetFactory>, reactor: &mut Reactor) -> AppResult<Mounted<Self>> {
        let mut panel = Self {
            frame: Borderless,
            hideable: Hideable::new(false),
            text: String::new(),
            bindings: MethodRegistry::new(),
        };

        let config = TargetConfig::new()
            .ex_style(styles::WS_EX_TOOLWINDOW, MixBehavior::Combine)
            .class_style(styles::CS_DBLCLKS, MixBehavior::Combine);
        let config = Borderless::configure(&mut panel.bindings, config)?;
        let config = panel.hideable.configure(&mut panel.bindings, config)?;
        let close = panel.bindings.request_method_callback(Self::on_double_click)?;
        let config = config
            .handler(codes::LBUTTON_DBLCLK, close.clone(), MixBehavior::Combine)
            .handler(codes::NC_LBUTTON_DBLCLK, close, MixBehavior::Combine);

        let target = config.create(factory, reactor)?;
        panel.hideable.attach(target.link());
        Ok(Mounted {
            composite: anchor(panel)?,
            target,
        })
    }

    /// Replace the displayed text.
    pub fn print(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// The displayed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Print a warning report and keep it up until dismissed.
    pub fn report(&mut self, warnings: &[String]) {
        self.print(format!("{REPORT_HEADER}{}{REPORT_FOOTER}", warnings.join("\n")));
        self.hideable.show(true);
    }

    /// Print `text` and hide again after `duration`.
    pub fn flash(&mut self, text: impl Into<String>, duration: Duration) {
        self.print(text);
        self.hideable.show_for(duration);
    }

    /// Whether the panel is meant to be shown.
    pub fn is_shown(&self) -> bool {
        self.hideable.is_shown()
    }

    fn on_double_click(&mut self, _message: &Message) -> LResult {
        self.hideable.show(false);
        0
    }
}
