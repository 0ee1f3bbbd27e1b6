// Test doubles shared by the association tests.

use std::{cell::RefCell, rc::Rc};

use super::{
    launcher::{AssociationUi, ShellOpener, UiLauncher},
    prompt::{Prompt, PromptText},
};
use crate::error::{AssocError, Result};

/// Records every launch attempt in order.
#[derive(Clone, Default)]
pub(crate) struct LaunchLog(Rc<RefCell<Vec<String>>>);

impl LaunchLog {
    pub(crate) fn attempts(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }
}

/// Accepts only the commands listed in `accept`.
pub(crate) struct FakeShell {
    log: LaunchLog,
    accept: Vec<String>,
}

impl ShellOpener for FakeShell {
    fn open(&self, target: &str, args: Option<&str>) -> Result<()> {
        let entry = match args {
            Some(a) => format!("{target} {a}"),
            None => target.to_owned(),
        };
        let accepted = self.accept.contains(&entry);
        self.log.push(entry);
        if accepted {
            Ok(())
        } else {
            Err(AssocError::Win32 {
                function: "ShellExecuteW",
                code: 2,
            })
        }
    }
}

/// `Err(())` simulates a component that cannot be activated.
pub(crate) struct FakeAssociationUi {
    log: LaunchLog,
    status: std::result::Result<i32, ()>,
}

impl AssociationUi for FakeAssociationUi {
    fn launch_advanced_association_ui(&self, app_name: &str) -> Result<i32> {
        self.log.push(format!("advanced:{app_name}"));
        self.status
            .map_err(|()| AssocError::Unsupported("advanced association UI"))
    }
}

pub(crate) fn launcher(
    log: &LaunchLog,
    accept: &[&str],
    status: std::result::Result<i32, ()>,
) -> UiLauncher {
    UiLauncher::new(
        Box::new(FakeShell {
            log: log.clone(),
            accept: accept.iter().map(|s| (*s).to_owned()).collect(),
        }),
        Box::new(FakeAssociationUi {
            log: log.clone(),
            status,
        }),
    )
}

/// Answers every prompt with `answer` and counts how often it was shown.
pub(crate) struct ScriptedPrompt {
    pub(crate) answer: bool,
    pub(crate) shown: Rc<RefCell<Vec<PromptText>>>,
}

impl ScriptedPrompt {
    pub(crate) fn answering(answer: bool) -> (Self, Rc<RefCell<Vec<PromptText>>>) {
        let shown = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                answer,
                shown: Rc::clone(&shown),
            },
            shown,
        )
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, text: &PromptText) -> bool {
        self.shown.borrow_mut().push(text.clone());
        self.answer
    }
}
