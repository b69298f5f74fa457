//! End-to-end switching scenarios over the mock platform and scripted prompt.

use std::sync::{Arc, Mutex};

use keyswitch_agent::application::session::{
    start_session, Collaborators, EngineEvent, MappingRepository, Notice, PersistenceIoError,
    Session, UserNotifier,
};
use keyswitch_agent::application::switch_engine::Dispatch;
use keyswitch_agent::infrastructure::platform::mock::MockPlatform;
use keyswitch_agent::infrastructure::prompt::mock::ScriptedPrompt;
use keyswitch_core::{DeviceHandle, DeviceKind, LayoutCatalog, LayoutId, PowerEvent};

const ENGLISH: LayoutId = LayoutId(0x0409);
const GERMAN: LayoutId = LayoutId(0x0407);

// ── Test doubles ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryRepository {
    contents: Mutex<Option<String>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryRepository {
    fn with(text: &str) -> Self {
        Self {
            contents: Mutex::new(Some(text.to_string())),
            ..Self::default()
        }
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl MappingRepository for MemoryRepository {
    fn read(&self) -> Result<Option<String>, PersistenceIoError> {
        Ok(self.contents.lock().unwrap().clone())
    }

    fn write(&self, contents: &str) -> Result<(), PersistenceIoError> {
        *self.contents.lock().unwrap() = Some(contents.to_string());
        self.writes.lock().unwrap().push(contents.to_string());
        Ok(())
    }

    fn set_aside(&self) -> Result<String, PersistenceIoError> {
        *self.contents.lock().unwrap() = None;
        Ok("memory.rejected".to_string())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

struct Harness {
    platform: Arc<MockPlatform>,
    prompt: Arc<ScriptedPrompt>,
    repository: Arc<MemoryRepository>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new(platform: MockPlatform, prompt: ScriptedPrompt, repository: MemoryRepository) -> Self {
        Self {
            platform: Arc::new(platform),
            prompt: Arc::new(prompt),
            repository: Arc::new(repository),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn start(&self) -> Session {
        start_session(Collaborators {
            catalog: LayoutCatalog::parse("0409=English (US)\n0407=German\n").unwrap(),
            enumerator: self.platform.clone(),
            switcher: self.platform.clone(),
            prompt: self.prompt.clone(),
            repository: self.repository.clone(),
            notifier: self.notifier.clone(),
        })
    }
}

fn type_on(session: &mut Session, handles: &[usize]) -> Vec<Dispatch> {
    handles
        .iter()
        .map(|&h| session.dispatch(EngineEvent::RawInput(DeviceHandle(h))))
        .collect()
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn test_new_keyboard_is_paired_through_prompt_and_saved() {
    // Arrange
    let harness = Harness::new(
        MockPlatform::new()
            .with_keyboard(1, "KBD1")
            .with_installed(&[ENGLISH, GERMAN]),
        ScriptedPrompt::new().then_choose(GERMAN),
        MemoryRepository::default(),
    );
    let mut session = harness.start();

    // Act
    let dispatches = type_on(&mut session, &[1, 1, 1]);
    let written = session.shutdown().expect("save succeeds");

    // Assert
    assert_eq!(
        dispatches,
        vec![
            Dispatch::Switched { layout: GERMAN, prompted: true },
            Dispatch::SameDevice,
            Dispatch::SameDevice,
        ]
    );
    let requests = harness.prompt.requests();
    assert_eq!(requests.len(), 1);
    let offered: Vec<LayoutId> = requests[0].iter().map(|l| l.id).collect();
    assert_eq!(offered, vec![ENGLISH, GERMAN], "English is listed first");
    assert_eq!(harness.platform.broadcasts(), vec![GERMAN]);
    assert_eq!(harness.platform.defaults(), vec![GERMAN]);
    assert_eq!(written, 1);
    assert_eq!(harness.repository.writes(), vec!["KBD1=0407\n".to_string()]);
}

#[test]
fn test_saved_keyboard_switches_without_prompt() {
    let harness = Harness::new(
        MockPlatform::new().with_keyboard(1, "KBD1"),
        ScriptedPrompt::new(),
        MemoryRepository::with("KBD1=0407\n"),
    );
    let mut session = harness.start();

    type_on(&mut session, &[1]);

    assert_eq!(harness.prompt.request_count(), 0);
    assert_eq!(harness.platform.broadcasts(), vec![GERMAN]);
    assert_eq!(session.engine().current_layout(), GERMAN);
}

#[test]
fn test_alternating_keyboards_with_different_layouts() {
    let harness = Harness::new(
        MockPlatform::new()
            .with_keyboard(1, "KBD1")
            .with_keyboard(2, "KBD2"),
        ScriptedPrompt::new(),
        MemoryRepository::with("KBD1=0407\nKBD2=0409\n"),
    );
    let mut session = harness.start();

    type_on(&mut session, &[1, 2, 1]);

    assert_eq!(harness.platform.broadcasts(), vec![GERMAN, ENGLISH, GERMAN]);
}

#[test]
fn test_alternating_keyboards_with_same_layout_broadcast_once() {
    let harness = Harness::new(
        MockPlatform::new()
            .with_keyboard(1, "KBD1")
            .with_keyboard(2, "KBD2"),
        ScriptedPrompt::new(),
        MemoryRepository::with("KBD1=0407\nKBD2=0407\n"),
    );
    let mut session = harness.start();

    let dispatches = type_on(&mut session, &[1, 2, 1]);

    assert_eq!(harness.platform.broadcasts(), vec![GERMAN]);
    assert!(matches!(dispatches[1], Dispatch::AlreadyActive { .. }));
}

#[test]
fn test_only_installed_layouts_are_offered() {
    let harness = Harness::new(
        MockPlatform::new()
            .with_keyboard(1, "KBD1")
            .with_installed(&[GERMAN]),
        ScriptedPrompt::new().then_choose(GERMAN),
        MemoryRepository::default(),
    );
    let mut session = harness.start();

    type_on(&mut session, &[1]);

    let offered: Vec<LayoutId> = harness.prompt.requests()[0].iter().map(|l| l.id).collect();
    assert_eq!(offered, vec![GERMAN]);
}

#[test]
fn test_cancelled_prompt_asks_again_on_next_keystroke() {
    // Arrange
    let harness = Harness::new(
        MockPlatform::new().with_keyboard(1, "KBD1"),
        ScriptedPrompt::new().then_cancel().then_choose(ENGLISH),
        MemoryRepository::default(),
    );
    let mut session = harness.start();

    // Act
    let dispatches = type_on(&mut session, &[1, 1]);

    // Assert
    assert_eq!(dispatches[0], Dispatch::Cancelled);
    assert_eq!(dispatches[1], Dispatch::Switched { layout: ENGLISH, prompted: true });
    assert_eq!(harness.prompt.request_count(), 2);
    assert_eq!(harness.platform.broadcasts(), vec![ENGLISH]);
}

#[test]
fn test_synthetic_and_power_events_change_nothing() {
    let harness = Harness::new(
        MockPlatform::new().with_keyboard(1, "KBD1"),
        ScriptedPrompt::new(),
        MemoryRepository::default(),
    );
    let mut session = harness.start();

    assert_eq!(
        session.dispatch(EngineEvent::RawInput(DeviceHandle::NULL)),
        Dispatch::Ignored
    );
    assert_eq!(
        session.dispatch(EngineEvent::Power(PowerEvent::Suspend)),
        Dispatch::Ignored
    );
    assert_eq!(harness.prompt.request_count(), 0);
    assert!(harness.platform.broadcasts().is_empty());
}

#[test]
fn test_failed_broadcast_is_retried_on_next_device_change() {
    // Arrange
    let harness = Harness::new(
        MockPlatform::new()
            .with_keyboard(1, "KBD1")
            .with_keyboard(2, "KBD2"),
        ScriptedPrompt::new(),
        MemoryRepository::with("KBD1=0407\nKBD2=0409\n"),
    );
    let mut session = harness.start();

    // Act
    harness.platform.set_fail_broadcast(true);
    type_on(&mut session, &[1]);
    harness.platform.set_fail_broadcast(false);
    type_on(&mut session, &[2, 1]);

    // Assert
    assert_eq!(harness.platform.broadcasts(), vec![ENGLISH, GERMAN]);
    assert!(harness
        .notifier
        .notices()
        .iter()
        .any(|n| matches!(n, Notice::SwitchFailed(_))));
}

#[test]
fn test_enumeration_failure_uses_one_layout_for_all_keyboards() {
    // Arrange
    let platform = MockPlatform::new()
        .with_keyboard(1, "KBD1")
        .with_keyboard(2, "KBD2");
    platform.set_fail_enumeration(true);
    let harness = Harness::new(
        platform,
        ScriptedPrompt::new().then_choose(GERMAN),
        MemoryRepository::with("KBD1=0409\n"),
    );
    let mut session = harness.start();

    // Act
    let dispatches = type_on(&mut session, &[1, 2, 1]);
    let written = session.shutdown().unwrap();

    // Assert
    assert!(dispatches[0].prompted());
    assert_eq!(dispatches[1], Dispatch::SameDevice);
    assert_eq!(harness.prompt.request_count(), 1);
    assert!(matches!(harness.notifier.notices()[0], Notice::DegradedMode(_)));
    assert_eq!(written, 0);
    assert!(harness.repository.writes().is_empty(), "saved mapping untouched");
}

#[test]
fn test_unnamed_keyboard_still_switches_but_is_not_saved() {
    let harness = Harness::new(
        MockPlatform::new()
            .with_keyboard(1, "KBD1")
            .with_device(2, DeviceKind::Keyboard, None),
        ScriptedPrompt::new().then_choose(GERMAN),
        MemoryRepository::default(),
    );
    let mut session = harness.start();

    type_on(&mut session, &[2]);
    session.shutdown().unwrap();

    assert_eq!(harness.platform.broadcasts(), vec![GERMAN]);
    assert_eq!(harness.repository.writes(), vec![String::new()]);
}
