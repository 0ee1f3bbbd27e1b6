// ── Headless bindings ─────────────────────────────────────────────────────────
//
// OS-independent implementations of the UI-facing seams, used on hosts that
// have no Windows shell.  The whole state machine still runs: registration
// goes to the JSON store, the prompt is logged and declined, and every launch
// target reports `Unsupported`.

use std::{cell::RefCell, collections::VecDeque};

use log::info;

use super::json_store::JsonStore;
use crate::{
    association::{
        launcher::{AssociationUi, ShellOpener, UiLauncher},
        orchestrator::{Orchestrator, UiScheduler, UiTask},
        prompt::{Prompt, PromptText},
        AppIdentity,
    },
    error::{AssocError, Result},
};

/// FIFO of tasks, drained explicitly by the owner of the "UI loop".
#[derive(Default)]
pub struct QueueScheduler {
    queue: RefCell<VecDeque<UiTask>>,
}

impl QueueScheduler {
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run tasks until the queue is empty, including any they schedule.
    pub fn run_pending(&self) {
        // Pop before running so a task may schedule more work.
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

impl UiScheduler for QueueScheduler {
    fn schedule(&self, task: UiTask) -> Result<()> {
        self.queue.borrow_mut().push_back(task);
        Ok(())
    }
}

/// Logs the question and answers "No".
pub struct DeclinePrompt;

impl Prompt for DeclinePrompt {
    fn confirm(&self, text: &PromptText) -> bool {
        info!("[{}] {} -> no (headless)", text.title, text.body);
        false
    }
}

pub struct UnsupportedShell;

impl ShellOpener for UnsupportedShell {
    fn open(&self, _target: &str, _args: Option<&str>) -> Result<()> {
        Err(AssocError::Unsupported("shell execute"))
    }
}

pub struct UnsupportedAssociationUi;

impl AssociationUi for UnsupportedAssociationUi {
    fn launch_advanced_association_ui(&self, _app_name: &str) -> Result<i32> {
        Err(AssocError::Unsupported("advanced association UI"))
    }
}

/// Run the startup sequence against the JSON store.
pub fn run() -> Result<()> {
    let identity = AppIdentity::default();
    let path = JsonStore::default_path(&identity.app_name)
        .ok_or(AssocError::Unsupported("per-user config directory"))?;
    let store = JsonStore::open(path);

    let scheduler = QueueScheduler::default();
    let launcher = UiLauncher::new(Box::new(UnsupportedShell), Box::new(UnsupportedAssociationUi));
    let phases = Orchestrator::new(&identity, &store, Box::new(DeclinePrompt), launcher).run(&scheduler);
    scheduler.run_pending();

    info!("association phases: {:?}", phases.phases());
    Ok(())
}
