//! HTML bodies for the two kinds of report email.

use crate::model::{FailureRecord, LeftBehindIssue};

const FRAME: &str = "<b>$MSG</b><br/>Here's what:<br/><br/><ul>";
const FRAME_END: &str = "</ul>";

const OK_MESSAGE: &str = "You forgot to move some issues on Jira, but i got you buddy.";
const ERROR_MESSAGE: &str =
    "I've tried to save your skin this night but something went terribly wrong.";

const ISSUE_ITEM: &str = "<li>($KEY) - $TITLE</li>";
const FAILURE_ITEM: &str = "<li>(at line $LINE) $MESSAGE</li>";
const FAILURE_ITEM_NO_LINE: &str = "<li>(attempt $ATTEMPT) $MESSAGE</li>";

/// What a notification is about.
#[derive(Debug, Clone, Copy)]
pub enum Report<'a> {
    /// Issues were found and moved back ("ok" status).
    LeftBehind(&'a [LeftBehindIssue]),
    /// Every attempt failed ("error" status).
    Failures(&'a [FailureRecord]),
}

impl Report<'_> {
    /// Status label, as used in logs.
    pub fn status(&self) -> &'static str {
        match self {
            Self::LeftBehind(_) => "ok",
            Self::Failures(_) => "error",
        }
    }

    /// Render the HTML body.
    pub fn render(&self) -> String {
        let message = match self {
            Self::LeftBehind(_) => OK_MESSAGE,
            Self::Failures(_) => ERROR_MESSAGE,
        };
        let mut html = substitute(FRAME, &[("$MSG", message)]);

        match self {
            Self::LeftBehind(issues) => {
                for issue in *issues {
                    let key = escape_html(&issue.key);
                    let title = escape_html(&issue.title);
                    html.push_str(&substitute(
                        ISSUE_ITEM,
                        &[("$KEY", key.as_str()), ("$TITLE", title.as_str())],
                    ));
                }
            }
            Self::Failures(failures) => {
                for failure in *failures {
                    let message = escape_html(&failure.message);
                    let item = match failure.line {
                        Some(line) => substitute(
                            FAILURE_ITEM,
                            &[
                                ("$LINE", line.to_string().as_str()),
                                ("$MESSAGE", message.as_str()),
                            ],
                        ),
                        None => substitute(
                            FAILURE_ITEM_NO_LINE,
                            &[
                                ("$ATTEMPT", failure.attempt.to_string().as_str()),
                                ("$MESSAGE", message.as_str()),
                            ],
                        ),
                    };
                    html.push_str(&item);
                }
            }
        }

        html.push_str(FRAME_END);
        html
    }
}

/// Single-pass placeholder substitution; substituted text is never rescanned.
fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match vars.iter().find(|(name, _)| tail.starts_with(name)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('$');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
