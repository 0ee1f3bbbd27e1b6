// ── Startup orchestration ─────────────────────────────────────────────────────
//
// The single entry point of the association subsystem:
//
//   Idle → Registering → Detecting ─┬→ Done                      (already default,
//                                   │                              or asked before)
//                                   └→ AskingPrompt ─┬→ DoneNoLaunch
//                                                    └→ Launching → Done
//
// Everything up to `AskingPrompt` runs synchronously on the caller's thread.
// The prompt is posted to the UI scheduler and the machine resumes from that
// task with the user's answer; startup never waits for it.
//
// Nothing in here may take the host down: the synchronous part and the
// continuation are each run under `catch_unwind`, and every component below
// already swallows its own errors.

use std::{
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    rc::Rc,
};

use log::{debug, info, warn};

use super::{
    detect,
    gate::PromptGate,
    launcher::UiLauncher,
    prompt::{Prompt, PromptText},
    registrar::{self, Registration},
    store::RegistrationStore,
    AppIdentity,
};
use crate::error::Result;

/// Work posted to the UI thread.
pub type UiTask = Box<dyn FnOnce() + 'static>;

/// Posts work to the single UI thread/loop.  `schedule` must return without
/// running `task`; `Err` means the task was dropped and will never run.
pub trait UiScheduler {
    fn schedule(&self, task: UiTask) -> Result<()>;
}

// ── Phases ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Registering,
    Detecting,
    AskingPrompt,
    Launching,
    Done,
    /// The user declined or dismissed the prompt.
    DoneNoLaunch,
}

impl Phase {
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done | Self::DoneNoLaunch)
    }
}

/// Every phase entered during one run, shared with the scheduled
/// continuation.
#[derive(Debug, Clone, Default)]
pub struct PhaseLog(Rc<RefCell<Vec<Phase>>>);

impl PhaseLog {
    pub fn phases(&self) -> Vec<Phase> {
        self.0.borrow().clone()
    }

    pub fn current(&self) -> Phase {
        self.0.borrow().last().copied().unwrap_or(Phase::Idle)
    }

    pub fn visited(&self, phase: Phase) -> bool {
        self.0.borrow().contains(&phase)
    }

    fn enter(&self, phase: Phase) {
        debug!("association: {:?} -> {phase:?}", self.current());
        if phase.is_done() {
            info!("file association check finished ({phase:?})");
        }
        self.0.borrow_mut().push(phase);
    }

    /// Move to a terminal phase after a panic, unless already there.
    fn settle(&self) {
        let next = match self.current() {
            p if p.is_done() => return,
            Phase::AskingPrompt => Phase::DoneNoLaunch,
            _ => Phase::Done,
        };
        self.enter(next);
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct Orchestrator<'a> {
    identity: &'a AppIdentity,
    store: &'a dyn RegistrationStore,
    executable: Option<PathBuf>,
    prompt_text: PromptText,
    prompt: Box<dyn Prompt>,
    launcher: UiLauncher,
}

impl<'a> Orchestrator<'a> {
    /// Registers the running executable and asks in English unless told
    /// otherwise.
    pub fn new(
        identity: &'a AppIdentity,
        store: &'a dyn RegistrationStore,
        prompt: Box<dyn Prompt>,
        launcher: UiLauncher,
    ) -> Self {
        Self {
            identity,
            store,
            executable: std::env::current_exe().ok(),
            prompt_text: PromptText::localized(identity, "en"),
            prompt,
            launcher,
        }
    }

    pub fn with_executable(mut self, exe: impl Into<PathBuf>) -> Self {
        self.executable = Some(exe.into());
        self
    }

    pub fn with_prompt_text(mut self, text: PromptText) -> Self {
        self.prompt_text = text;
        self
    }

    /// Ensure registration and, if this is not the default handler and the
    /// user was never asked, schedule the one-time prompt.
    ///
    /// Consumes the orchestrator: the machine runs once per process.  On
    /// return the log is either terminal or parked in `AskingPrompt` waiting
    /// for the scheduled task.
    pub fn run(self, scheduler: &dyn UiScheduler) -> PhaseLog {
        let log = PhaseLog::default();
        log.enter(Phase::Idle);

        let sync = panic::catch_unwind(AssertUnwindSafe(|| self.drive(scheduler, &log)));
        if sync.is_err() {
            warn!("file association startup panicked; continuing without it");
            log.settle();
        }
        log
    }

    fn drive(self, scheduler: &dyn UiScheduler, log: &PhaseLog) {
        log.enter(Phase::Registering);
        let registration = match &self.executable {
            Some(exe) => registrar::register(self.store, self.identity, exe),
            None => Registration::Skipped,
        };
        debug!("registration: {registration:?}");

        log.enter(Phase::Detecting);
        let id = self.identity;
        if detect::is_default_handler(self.store, &id.extension, &id.prog_id) {
            log.enter(Phase::Done);
            return;
        }

        let gate = PromptGate::new(self.store, &id.app_root);
        if !gate.can_ask() {
            debug!("default-app prompt already shown once");
            log.enter(Phase::Done);
            return;
        }

        log.enter(Phase::AskingPrompt);

        let Self {
            prompt,
            prompt_text,
            launcher,
            ..
        } = self;
        let app_name = id.app_name.clone();
        let extension = id.extension.clone();
        let resume = log.clone();

        let posted = scheduler.schedule(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                if prompt.confirm(&prompt_text) {
                    resume.enter(Phase::Launching);
                    let launched = launcher.launch_default_apps_surface(&app_name, &extension);
                    debug!("default-apps surface launched: {launched}");
                    resume.enter(Phase::Done);
                } else {
                    resume.enter(Phase::DoneNoLaunch);
                }
            }));
            if outcome.is_err() {
                warn!("default-app prompt panicked");
                resume.settle();
            }
        }));

        match posted {
            // Before showing, not after answering: a dismissed dialog still
            // counts.  The task has not run yet.
            Ok(()) => gate.mark_asked(),
            Err(e) => {
                // Unasked, so the next run may try again.
                warn!("cannot schedule default-app prompt: {e}");
                log.enter(Phase::DoneNoLaunch);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        association::{
            fakes::{launcher, LaunchLog, ScriptedPrompt},
            store::{MemoryStore, RegValue},
            ASKED_VALUE,
        },
        error::{AssocError, Result},
        platform::headless::QueueScheduler,
    };

    use Phase::*;

    const EXT_URI: &str = "ms-settings:defaultapps?filetype=.md";

    fn exe() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().expect("temp exe")
    }

    fn orchestrator<'a>(
        identity: &'a AppIdentity,
        store: &'a dyn RegistrationStore,
        exe: &tempfile::NamedTempFile,
        prompt: ScriptedPrompt,
        launcher: UiLauncher,
    ) -> Orchestrator<'a> {
        Orchestrator::new(identity, store, Box::new(prompt), launcher).with_executable(exe.path())
    }

    fn asked(store: &MemoryStore) -> Option<RegValue> {
        store
            .get_value(r"Software\Markdown_Z", ASKED_VALUE)
            .expect("read")
    }

    #[test]
    fn fresh_store_registers_and_asks_once() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let exe = exe();
        let launches = LaunchLog::default();
        let (prompt, shown) = ScriptedPrompt::answering(true);
        let scheduler = QueueScheduler::default();

        let log = orchestrator(&id, &store, &exe, prompt, launcher(&launches, &[EXT_URI], Ok(0)))
            .run(&scheduler);

        // Registration happened and the prompt is pending, flag already set.
        assert!(store.key_exists(r"Software\Classes\Markdown_Z.md\shell\open\command"));
        assert!(store.key_exists(r"Software\Markdown_Z\Capabilities\FileAssociations"));
        let exe_name = exe.path().file_name().expect("file name").to_string_lossy();
        assert!(store.key_exists(&format!(
            r"Software\Classes\Applications\{exe_name}\shell\open\command"
        )));
        assert_eq!(
            store
                .get_value(r"Software\Classes\.md\OpenWithProgids", "Markdown_Z.md")
                .expect("read"),
            Some(RegValue::Empty)
        );
        assert_eq!(
            store
                .get_value(r"Software\RegisteredApplications", "Markdown_Z")
                .expect("read"),
            Some(RegValue::String(r"Software\Markdown_Z\Capabilities".into()))
        );
        assert_eq!(log.current(), AskingPrompt);
        assert_eq!(asked(&store), Some(RegValue::Dword(1)));
        assert!(shown.borrow().is_empty(), "prompt must not run synchronously");
        assert_eq!(scheduler.pending(), 1);

        scheduler.run_pending();
        assert_eq!(
            log.phases(),
            vec![Idle, Registering, Detecting, AskingPrompt, Launching, Done]
        );
        assert_eq!(shown.borrow().len(), 1);
        assert_eq!(launches.attempts(), vec![EXT_URI]);
    }

    #[test]
    fn declining_still_counts_as_asked() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let exe = exe();
        let launches = LaunchLog::default();
        let (prompt, _) = ScriptedPrompt::answering(false);
        let scheduler = QueueScheduler::default();

        let log = orchestrator(&id, &store, &exe, prompt, launcher(&launches, &[], Ok(0)))
            .run(&scheduler);
        scheduler.run_pending();

        assert_eq!(log.current(), DoneNoLaunch);
        assert!(!log.visited(Launching));
        assert!(launches.attempts().is_empty());
        assert_eq!(asked(&store), Some(RegValue::Dword(1)));
    }

    #[test]
    fn second_run_never_asks_again() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let exe = exe();

        for _ in 0..2 {
            let (prompt, _) = ScriptedPrompt::answering(false);
            let scheduler = QueueScheduler::default();
            orchestrator(&id, &store, &exe, prompt, launcher(&LaunchLog::default(), &[], Ok(0)))
                .run(&scheduler);
            scheduler.run_pending();
        }

        let (prompt, shown) = ScriptedPrompt::answering(true);
        let scheduler = QueueScheduler::default();
        let log = orchestrator(&id, &store, &exe, prompt, launcher(&LaunchLog::default(), &[], Ok(0)))
            .run(&scheduler);

        assert_eq!(log.phases(), vec![Idle, Registering, Detecting, Done]);
        assert_eq!(scheduler.pending(), 0);
        assert!(shown.borrow().is_empty());
    }

    #[test]
    fn already_default_finishes_without_touching_the_flag() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        store
            .set_value(
                r"Software\Microsoft\Windows\CurrentVersion\Explorer\FileExts\.md\UserChoice",
                "ProgId",
                &RegValue::String("Markdown_Z.md".into()),
            )
            .expect("write");
        let exe = exe();
        let (prompt, _) = ScriptedPrompt::answering(true);
        let scheduler = QueueScheduler::default();

        let log = orchestrator(&id, &store, &exe, prompt, launcher(&LaunchLog::default(), &[], Ok(0)))
            .run(&scheduler);

        assert_eq!(log.phases(), vec![Idle, Registering, Detecting, Done]);
        assert_eq!(asked(&store), None);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn asked_flag_wins_even_when_not_default() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        store
            .set_value(r"Software\Markdown_Z", ASKED_VALUE, &RegValue::Dword(1))
            .expect("write");
        let exe = exe();
        let (prompt, _) = ScriptedPrompt::answering(true);
        let scheduler = QueueScheduler::default();

        let log = orchestrator(&id, &store, &exe, prompt, launcher(&LaunchLog::default(), &[], Ok(0)))
            .run(&scheduler);

        assert!(!log.visited(AskingPrompt));
        assert_eq!(log.current(), Done);
    }

    #[test]
    fn failing_store_still_reaches_done() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        store.fail_reads(true);
        store.fail_writes(true);
        let exe = exe();
        let launches = LaunchLog::default();
        let (prompt, _) = ScriptedPrompt::answering(true);
        let scheduler = QueueScheduler::default();

        let log = orchestrator(&id, &store, &exe, prompt, launcher(&launches, &[], Err(())))
            .run(&scheduler);
        scheduler.run_pending();

        assert_eq!(log.current(), Done);
        assert_eq!(launches.attempts().len(), 5);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn missing_executable_still_detects() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().expect("temp dir");
        let (prompt, _) = ScriptedPrompt::answering(false);
        let scheduler = QueueScheduler::default();

        let log = Orchestrator::new(&id, &store, Box::new(prompt), launcher(&LaunchLog::default(), &[], Ok(0)))
            .with_executable(dir.path().join("gone.exe"))
            .run(&scheduler);

        assert!(log.visited(Detecting));
        assert_eq!(log.current(), AskingPrompt);
        assert!(!store.key_exists(r"Software\Classes\Markdown_Z.md"));
    }

    #[test]
    fn localized_text_reaches_the_prompt() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let exe = exe();
        let (prompt, shown) = ScriptedPrompt::answering(false);
        let scheduler = QueueScheduler::default();
        let text = PromptText::localized(&id, "zh-CN");

        orchestrator(&id, &store, &exe, prompt, launcher(&LaunchLog::default(), &[], Ok(0)))
            .with_prompt_text(text.clone())
            .run(&scheduler);
        scheduler.run_pending();

        assert_eq!(shown.borrow().as_slice(), &[text]);
    }

    /// Drains the UI queue before answering, like a modal dialog loop that
    /// dispatches the thread's messages while it is open.
    struct ModalPrompt {
        scheduler: Rc<QueueScheduler>,
        answer: bool,
    }

    impl Prompt for ModalPrompt {
        fn confirm(&self, _: &PromptText) -> bool {
            self.scheduler.run_pending();
            self.answer
        }
    }

    #[test]
    fn modal_prompt_loop_keeps_the_answer() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let exe = exe();
        let launches = LaunchLog::default();
        let scheduler = Rc::new(QueueScheduler::default());
        let prompt = ModalPrompt {
            scheduler: Rc::clone(&scheduler),
            answer: true,
        };

        let log = Orchestrator::new(&id, &store, Box::new(prompt), launcher(&launches, &[EXT_URI], Ok(0)))
            .with_executable(exe.path())
            .run(&*scheduler);

        // Only the prompt itself is queued; nothing can run behind it and
        // cut the dialog short.
        assert_eq!(scheduler.pending(), 1);
        scheduler.run_pending();

        assert_eq!(
            log.phases(),
            vec![Idle, Registering, Detecting, AskingPrompt, Launching, Done]
        );
        assert_eq!(launches.attempts(), vec![EXT_URI]);
    }

    struct RefusingScheduler;

    impl UiScheduler for RefusingScheduler {
        fn schedule(&self, _task: UiTask) -> Result<()> {
            Err(AssocError::Win32 {
                function: "PostMessageW",
                code: 1816, // ERROR_NOT_ENOUGH_QUOTA
            })
        }
    }

    #[test]
    fn unscheduled_prompt_leaves_the_user_unasked() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let exe = exe();
        let (prompt, shown) = ScriptedPrompt::answering(true);

        let log = orchestrator(&id, &store, &exe, prompt, launcher(&LaunchLog::default(), &[], Ok(0)))
            .run(&RefusingScheduler);

        assert_eq!(
            log.phases(),
            vec![Idle, Registering, Detecting, AskingPrompt, DoneNoLaunch]
        );
        assert!(shown.borrow().is_empty());
        assert_eq!(asked(&store), None);
        assert!(PromptGate::new(&store, &id.app_root).can_ask());
    }

    struct PanickingStore;

    impl RegistrationStore for PanickingStore {
        fn create_key(&self, _: &str) -> Result<()> {
            panic!("store exploded")
        }
        fn set_value(&self, _: &str, _: &str, _: &RegValue) -> Result<()> {
            panic!("store exploded")
        }
        fn get_value(&self, _: &str, _: &str) -> Result<Option<RegValue>> {
            panic!("store exploded")
        }
    }

    #[test]
    fn panics_are_contained() {
        let id = AppIdentity::default();
        let exe = exe();
        let (prompt, _) = ScriptedPrompt::answering(true);
        let scheduler = QueueScheduler::default();

        let log = orchestrator(&id, &PanickingStore, &exe, prompt, launcher(&LaunchLog::default(), &[], Ok(0)))
            .run(&scheduler);

        assert_eq!(log.current(), Done);
        assert_eq!(log.phases().iter().filter(|p| p.is_done()).count(), 1);
    }

    struct PanickingPrompt;

    impl Prompt for PanickingPrompt {
        fn confirm(&self, _: &PromptText) -> bool {
            panic!("dialog exploded")
        }
    }

    #[test]
    fn panicking_prompt_is_contained() {
        let id = AppIdentity::default();
        let store = MemoryStore::new();
        let exe = exe();
        let scheduler = QueueScheduler::default();

        let log = Orchestrator::new(&id, &store, Box::new(PanickingPrompt), launcher(&LaunchLog::default(), &[], Ok(0)))
            .with_executable(exe.path())
            .run(&scheduler);
        scheduler.run_pending();

        assert_eq!(log.current(), DoneNoLaunch);
    }
}
