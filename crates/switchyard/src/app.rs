//! The root application composite and its poll loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use switchyard_core::target::TargetLink;
use switchyard_core::{
    anchor, impl_composite, BindingTableDebug, Delivery, DispatchFilter, EventSource, Hotkey,
    HotkeyRegistry, LResult, Message, Method, MethodRegistry, PerfSpan, Reactor, TargetFactory,
};

use crate::actions::AppActions;
use crate::components::Mounted;
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::fallback::{add_hotkey_with_backup, HotkeyBinding};
use crate::file_drop::FileDrop;
use crate::log_panel::LogPanel;

const GREETING: &str = "Hello!";
const FAREWELL: &str = "Exiting...";

/// Owner of the global hotkeys.
pub struct RootApp {
    file_drop: Rc<RefCell<FileDrop>>,
    file_drop_link: TargetLink,
    actions: Rc<dyn AppActions>,
    file_drop_visible: Duration,
    bound: Vec<HotkeyBinding>,
    warnings: Vec<String>,
    bindings: MethodRegistry,
}

impl_composite!(RootApp, registry: bindings);

impl RootApp {
    fn new(config: &AppConfig, file_drop: &Mounted<FileDrop>, actions: Rc<dyn AppActions>) -> Self {
        Self {
            file_drop: Rc::clone(&file_drop.composite),
            file_drop_link: file_drop.target.link(),
            actions,
            file_drop_visible: config.file_drop_visible(),
            bound: Vec::new(),
            warnings: Vec::new(),
            bindings: MethodRegistry::new(),
        }
    }

    fn bind_hotkeys(&mut self, config: &AppConfig, reactor: &mut Reactor) -> AppResult<()> {
        let hotkeys = &config.hotkeys;
        let table: [(Hotkey, Method<Self>); 4] = [
            (hotkeys.exit, Self::on_exit),
            (hotkeys.spawn_console, Self::on_spawn_console),
            (hotkeys.launch_browser, Self::on_launch_browser),
            (hotkeys.file_pick, Self::on_file_pick),
        ];
        for (hotkey, method) in table {
            let handler = self.bindings.request_method_callback(method)?;
            let binding = add_hotkey_with_backup(reactor, hotkey, handler)?;
            if let Some(warning) = &binding.warning {
                self.warnings.push(warning.clone());
            }
            self.bound.push(binding);
        }
        Ok(())
    }

    /// Hotkeys as actually bound, in binding order.
    pub fn bound(&self) -> &[HotkeyBinding] {
        &self.bound
    }

    /// Warnings collected while binding hotkeys.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn on_exit(&mut self, _message: &Message) -> LResult {
        tracing::info!(target: "switchyard::app", "exit requested");
        self.file_drop_link.destroy();
        0
    }

    fn on_spawn_console(&mut self, _message: &Message) -> LResult {
        if let Err(err) = self.actions.spawn_console(None) {
            tracing::warn!(target: "switchyard::app", error = %err, "failed to spawn console");
        }
        0
    }

    fn on_launch_browser(&mut self, _message: &Message) -> LResult {
        if let Err(err) = self.actions.launch_browser() {
            tracing::warn!(target: "switchyard::app", error = %err, "failed to launch browser");
        }
        0
    }

    fn on_file_pick(&mut self, _message: &Message) -> LResult {
        match self.file_drop.try_borrow_mut() {
            Ok(mut file_drop) => file_drop.show_for(self.file_drop_visible),
            Err(_) => tracing::warn!(target: "switchyard::app", "file drop is busy"),
        }
        0
    }
}

/// The running application.
///
/// Owns the reactor and every anchored composite. Dropping it destroys the
/// targets; [`shutdown`](Self::shutdown) also releases the hotkeys.
pub struct Application {
    reactor: Reactor,
    registry: HotkeyRegistry,
    root: Rc<RefCell<RootApp>>,
    file_drop: Mounted<FileDrop>,
    log: Mounted<LogPanel>,
    poll_interval: Duration,
    greeting_visible: Duration,
}

impl Application {
    /// Build every target, bind the hotkeys and greet the user.
    ///
    /// If any hotkey fell back to its backup combination the log panel
    /// lists the substitutions and stays up until dismissed; otherwise it
    /// flashes a greeting.
    ///
    /// # Errors
    ///
    /// Fails when a target cannot be created or when a hotkey and its
    /// backup are both taken.
    #[tracing::instrument(skip_all, target = "switchyard::app", level = "debug")]
    pub fn new(
        config: AppConfig,
        source: impl EventSource + 'static,
        factory: Rc<dyn TargetFactory>,
        registry: HotkeyRegistry,
        actions: Rc<dyn AppActions>,
    ) -> AppResult<Self> {
        let mut reactor = Reactor::new(source, registry.clone());
        let file_drop = FileDrop::create(&factory, &mut reactor, Rc::clone(&actions))?;
        let log = LogPanel::create(&factory, &mut reactor)?;

        let mut root = RootApp::new(&config, &file_drop, actions);
        root.bind_hotkeys(&config, &mut reactor)?;
        let root = anchor(root)?;

        {
            let root = root.borrow();
            let mut log = log.composite.borrow_mut();
            if root.warnings().is_empty() {
                log.flash(GREETING, config.greeting_visible());
            } else {
                log.report(root.warnings());
            }
        }

        if tracing::enabled!(target: "switchyard::app", tracing::Level::DEBUG) {
            tracing::debug!(target: "switchyard::app", "{}", BindingTableDebug::new().format(&reactor));
        }
        tracing::info!(target: "switchyard::app", hotkeys = root.borrow().bound().len(), "application started");
        Ok(Self {
            reactor,
            registry,
            root,
            file_drop,
            log,
            poll_interval: config.poll_interval(),
            greeting_visible: config.greeting_visible(),
        })
    }

    /// Dispatch everything currently queued.
    pub fn poll_once(&mut self) -> Vec<Delivery> {
        let _span = PerfSpan::new("poll");
        self.reactor.dispatch(DispatchFilter::all())
    }

    /// Whether the file drop target is still alive.
    pub fn is_running(&self) -> bool {
        !self.file_drop.target.is_closed()
    }

    /// Poll until the exit hotkey closes the file drop target, then flash a
    /// farewell and wait for it to fade.
    pub fn run(&mut self) {
        while self.is_running() {
            self.poll_once();
            std::thread::sleep(self.poll_interval);
        }

        self.log.composite.borrow_mut().flash(FAREWELL, self.greeting_visible);
        let filter = DispatchFilter::all().for_target(self.log.target.id());
        while self.log.composite.borrow().is_shown() {
            self.reactor.dispatch(filter);
            std::thread::sleep(self.poll_interval);
        }
        tracing::info!(target: "switchyard::app", "application stopped");
    }

    /// The reactor, for posting messages and inspecting bindings.
    pub fn reactor(&mut self) -> &mut Reactor {
        &mut self.reactor
    }

    /// The root composite.
    pub fn root(&self) -> &Rc<RefCell<RootApp>> {
        &self.root
    }

    /// The file drop composite and target.
    pub fn file_drop(&self) -> &Mounted<FileDrop> {
        &self.file_drop
    }

    /// The log panel composite and target.
    pub fn log(&self) -> &Mounted<LogPanel> {
        &self.log
    }

    /// Close both targets and release every hotkey.
    ///
    /// # Errors
    ///
    /// Fails when a target never confirms destruction.
    pub fn shutdown(mut self) -> AppResult<()> {
        self.file_drop.target.close(&mut self.reactor)?;
        self.log.target.close(&mut self.reactor)?;
        self.registry.shutdown();
        tracing::debug!(target: "switchyard::app", "hotkeys released");
        Ok(())
    }
}
