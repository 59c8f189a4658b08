//! End-to-end behavior of the application on the headless platform.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use switchyard::reactor::platform::headless::HeadlessPlatform;
use switchyard::reactor::{codes, Hotkey, HotkeyRegistry, Message, TargetControl};
use switchyard::{AppActions, AppConfig, AppError, Application, BACKUP_MODIFIERS};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("switchyard=debug,switchyard_core=debug")
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Console(Option<Vec<OsString>>),
    Browser,
    Files(Vec<PathBuf>),
}

#[derive(Default)]
struct RecordingActions {
    calls: RefCell<Vec<Call>>,
    fail: bool,
}

impl RecordingActions {
    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) -> io::Result<()> {
        self.calls.borrow_mut().push(call);
        if self.fail {
            Err(io::Error::other("refused"))
        } else {
            Ok(())
        }
    }
}

impl AppActions for RecordingActions {
    fn spawn_console(&self, extra: Option<&[OsString]>) -> io::Result<()> {
        self.record(Call::Console(extra.map(<[OsString]>::to_vec)))
    }

    fn launch_browser(&self) -> io::Result<()> {
        self.record(Call::Browser)
    }

    fn open_files(&self, files: &[PathBuf]) -> io::Result<()> {
        self.record(Call::Files(files.to_vec()))
    }
}

struct Harness {
    platform: HeadlessPlatform,
    registry: HotkeyRegistry,
    actions: Rc<RecordingActions>,
    app: Application,
}

fn start_with(config: AppConfig, platform: HeadlessPlatform, actions: RecordingActions) -> Result<Harness, AppError> {
    let registry = HotkeyRegistry::init(platform.hotkey_backend());
    let actions = Rc::new(actions);
    let app = Application::new(
        config,
        platform.source(),
        platform.factory(),
        registry.clone(),
        actions.clone(),
    )?;
    Ok(Harness {
        platform,
        registry,
        actions,
        app,
    })
}

fn start() -> Harness {
    start_with(AppConfig::default(), HeadlessPlatform::new(), RecordingActions::default()).unwrap()
}

fn hotkey(literal: &str) -> Hotkey {
    literal.parse().unwrap()
}

#[test]
fn test_startup_binds_default_hotkeys_and_greets() {
    setup();
    let harness = start();

    let bound: Vec<String> = harness
        .app
        .root()
        .borrow()
        .bound()
        .iter()
        .map(|binding| binding.hotkey.to_string())
        .collect();
    assert_eq!(bound, ["D", "A", "B", "C"]);
    assert!(harness.app.root().borrow().warnings().is_empty());

    let log = harness.app.log();
    assert_eq!(log.composite.borrow().text(), "Hello!");
    assert!(log.composite.borrow().is_shown());
    assert!(!harness.app.file_drop().composite.borrow().is_shown());
}

#[test]
fn test_hotkeys_reach_actions() {
    setup();
    let mut harness = start();

    assert!(harness.platform.press(hotkey("A")));
    assert!(harness.platform.press(hotkey("B")));
    harness.app.poll_once();

    assert_eq!(harness.actions.calls(), [Call::Console(None), Call::Browser]);
}

#[test]
fn test_file_pick_shows_drop_target_and_drop_opens_files() {
    setup();
    let mut harness = start();
    let target = harness.app.file_drop().target.id();

    harness.platform.press(hotkey("C"));
    harness.app.poll_once();
    assert!(harness.app.file_drop().composite.borrow().is_shown());
    assert!(harness.platform.is_visible(target));

    let files = vec![PathBuf::from("notes.md"), PathBuf::from("todo.txt")];
    harness.platform.drop_files(target, files.clone());
    harness.app.poll_once();

    assert_eq!(harness.actions.calls(), [Call::Files(files)]);
    assert!(!harness.app.file_drop().composite.borrow().is_shown());
    assert!(!harness.platform.is_visible(target));
    assert_eq!(harness.app.file_drop().composite.borrow().opened(), 1);
}

#[test]
fn test_failed_action_is_not_fatal() {
    setup();
    let mut harness = start_with(
        AppConfig::default(),
        HeadlessPlatform::new(),
        RecordingActions {
            fail: true,
            ..RecordingActions::default()
        },
    )
    .unwrap();

    harness.platform.press(hotkey("A"));
    let deliveries = harness.app.poll_once();
    assert!(deliveries.iter().any(|delivery| delivery.handled));
    assert!(harness.app.is_running());
    assert_eq!(harness.actions.calls().len(), 1);
}

#[test]
fn test_paint_lays_out_icon() {
    setup();
    let mut harness = start();
    let target = harness.app.file_drop().target.id();

    harness.app.reactor().post(Message::new(codes::PAINT).to(target));
    harness.app.poll_once();

    let file_drop = harness.app.file_drop().composite.borrow();
    let frame = file_drop.last_frame().unwrap();
    assert_eq!(frame.strokes.len(), 5);
}

#[test]
fn test_exit_hotkey_stops_the_loop() {
    setup();
    let mut config = AppConfig::default();
    config.poll_interval_ms = 1;
    config.greeting_visible_ms = 5;
    let mut harness = start_with(config, HeadlessPlatform::new(), RecordingActions::default()).unwrap();

    harness.platform.press(hotkey("D"));
    harness.app.run();

    assert!(!harness.app.is_running());
    assert!(harness.platform.is_destroyed(harness.app.file_drop().target.id()));
    assert_eq!(harness.app.log().composite.borrow().text(), "Exiting...");
    assert!(!harness.app.log().composite.borrow().is_shown());
}

#[test]
fn test_taken_hotkey_falls_back_and_is_reported() {
    setup();
    let platform = HeadlessPlatform::new();
    platform.hotkey_backend().occupy(hotkey("B"));
    let harness = start_with(AppConfig::default(), platform, RecordingActions::default()).unwrap();

    let backup = hotkey("B").with_modifiers(BACKUP_MODIFIERS);
    let root = harness.app.root().borrow();
    assert_eq!(root.bound()[2].hotkey, backup);
    assert_eq!(
        root.warnings(),
        ["Failed to register \"B\" hotkey. \"alt ctrl win nr B\" used instead."]
    );

    let log = harness.app.log().composite.borrow();
    assert!(log.text().starts_with("Info\n\n"));
    assert!(log.text().contains("\"alt ctrl win nr B\" used instead."));
    assert!(log.is_shown());
    assert!(!harness.platform.timer_active(harness.app.log().target.id(), switchyard::components::HIDE_TIMER));
}

#[test]
fn test_backup_press_reaches_handler() {
    setup();
    let platform = HeadlessPlatform::new();
    platform.hotkey_backend().occupy(hotkey("B"));
    let mut harness = start_with(AppConfig::default(), platform, RecordingActions::default()).unwrap();

    assert!(!harness.platform.press(hotkey("B")));
    assert!(harness.platform.press(hotkey("alt ctrl win nr B")));
    harness.app.poll_once();
    assert_eq!(harness.actions.calls(), [Call::Browser]);
}

#[test]
fn test_both_combinations_taken_fails_startup() {
    setup();
    let platform = HeadlessPlatform::new();
    platform.hotkey_backend().occupy(hotkey("C"));
    platform
        .hotkey_backend()
        .occupy(hotkey("C").with_modifiers(BACKUP_MODIFIERS));

    let err = start_with(AppConfig::default(), platform, RecordingActions::default())
        .err()
        .unwrap();
    assert!(matches!(err, AppError::Reactor(ref inner) if inner.is_conflict()));
    assert!(err.to_string().contains("<C>"), "{err}");
}

#[test]
fn test_shutdown_releases_hotkeys() {
    setup();
    let harness = start();
    let backend = harness.platform.hotkey_backend();
    assert_eq!(backend.claimed().len(), 4);

    harness.app.shutdown().unwrap();
    assert!(harness.registry.is_shut_down());
    assert!(backend.claimed().is_empty());
    assert_eq!(backend.released().len(), 4);
}

#[test]
fn test_creation_failure_is_reported() {
    setup();
    let platform = HeadlessPlatform::new();
    platform.refuse_creation(true);
    let err = start_with(AppConfig::default(), platform, RecordingActions::default())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        AppError::Reactor(switchyard::reactor::ReactorError::TargetCreation(_))
    ));
}

#[test]
fn test_greeting_fades() {
    setup();
    let mut config = AppConfig::default();
    config.greeting_visible_ms = 1;
    let mut harness = start_with(config, HeadlessPlatform::new(), RecordingActions::default()).unwrap();

    std::thread::sleep(Duration::from_millis(10));
    harness.app.poll_once();
    assert!(!harness.app.log().composite.borrow().is_shown());
}
