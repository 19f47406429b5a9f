//! `{{…}}` placeholder substitution for notification templates.
//!
//! Placeholders are matched case-insensitively: `{{service.name}}`,
//! `{{failure.message}}` in bodies and argv entries, plus `{{to}}` and
//! `{{subject}}` in the mail command argv.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use sitemon_config::MailSpec;
use sitemon_probe::FailureRecord;

static SERVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{service\.name\}\}").unwrap());
static FAILURE_MESSAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{failure\.message\}\}").unwrap());
static TO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\{\{to\}\}").unwrap());
static SUBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\{\{subject\}\}").unwrap());

/// Substitute the failure placeholders in one template string.
pub fn render(source: &str, failure: &FailureRecord) -> String {
    let out = SERVICE_NAME.replace_all(source, NoExpand(&failure.service.name));
    FAILURE_MESSAGE
        .replace_all(&out, NoExpand(&failure.message()))
        .into_owned()
}

/// Build the mail command argv: `{{to}}` and `{{subject}}` first, then
/// the failure placeholders (the subject template may itself contain
/// them).
pub fn render_mail_args(app: &[String], mail: &MailSpec, failure: &FailureRecord) -> Vec<String> {
    app.iter()
        .map(|arg| {
            let arg = TO.replace_all(arg, NoExpand(mail.to.as_deref().unwrap_or("")));
            let arg = SUBJECT.replace_all(&arg, NoExpand(&mail.subject));
            render(&arg, failure)
        })
        .collect()
}
