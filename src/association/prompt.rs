// ── Confirmation prompt ───────────────────────────────────────────────────────
//
// The question shown to the user before opening the default-apps surface.
// Text follows the OS UI language; the dialog itself is supplied by the
// platform layer and always runs on the UI thread.

use super::AppIdentity;

/// Title and body of the Yes/No question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    pub title: String,
    pub body: String,
}

impl PromptText {
    /// Pick the text for `ui_language`, a BCP 47 tag such as `zh-CN` or
    /// `en-US`.  Chinese for any `zh` tag, English otherwise.
    pub fn localized(identity: &AppIdentity, ui_language: &str) -> Self {
        let app = &identity.app_name;
        let ext = &identity.extension;
        let primary = ui_language.split(['-', '_']).next().unwrap_or_default();

        let body = if primary.eq_ignore_ascii_case("zh") {
            format!("是否打开系统‘默认应用’设置，将 {app} 设为 {ext} 默认打开方式？")
        } else {
            format!("Open the system \"Default apps\" settings to make {app} the default app for {ext} files?")
        };

        Self {
            title: app.clone(),
            body,
        }
    }
}

/// A modal Yes/No question.  `true` only for an explicit "Yes"; closing the
/// dialog counts as "No".
pub trait Prompt {
    fn confirm(&self, text: &PromptText) -> bool;
}
