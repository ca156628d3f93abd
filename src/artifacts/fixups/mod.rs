//! Container build file fix-ups
//!
//! Inference output is patched by an ordered list of named [`Rule`]s. Every
//! rule is a total function of (text, descriptor, file list): text that does
//! not match a rule's pattern is returned unchanged, and no rule can fail.
//!
//! Two passes are exposed. [`de_heredoc`] rewrites here-document `COPY`/`RUN`
//! blocks into plain line-by-line commands and is idempotent.
//! [`normalize_syntax`] fixes base-image declarations, drops user-creation
//! directives, aligns the start command with the detected language and adds
//! a missing dependency install.

mod base_image;
mod dependency_install;
mod heredoc;
mod start_command;
mod user;

use crate::analysis::ProjectDescriptor;

pub use start_command::{node_entrypoint, python_entrypoint};

/// Inputs shared by all rules
#[derive(Debug, Clone, Copy)]
pub struct FixupContext<'a> {
    pub descriptor: &'a ProjectDescriptor,
    pub files: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `COPY <<EOF target` blocks become chained `echo` appends
    HeredocCopy,
    /// `RUN <<EOF` scripts become `&&`-chained commands
    HeredocRun,
    /// `FROM Python 3.11` becomes `FROM python:3.11`
    NormalizeBaseImage,
    /// Drops `useradd`/`adduser` directives and `USER` lines that refer to them
    StripUserCreation,
    /// Rewrites `CMD` when it launches the wrong runtime or a missing file
    AlignStartCommand,
    /// Adds `pip install`/`npm install` after the manifest `COPY` when no stage installs
    InsertDependencyInstall,
}

pub const DE_HEREDOC_RULES: &[Rule] = &[Rule::HeredocCopy, Rule::HeredocRun];

pub const NORMALIZE_RULES: &[Rule] = &[
    Rule::NormalizeBaseImage,
    Rule::StripUserCreation,
    Rule::AlignStartCommand,
    Rule::InsertDependencyInstall,
];

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::HeredocCopy => "heredoc-copy",
            Rule::HeredocRun => "heredoc-run",
            Rule::NormalizeBaseImage => "normalize-base-image",
            Rule::StripUserCreation => "strip-user-creation",
            Rule::AlignStartCommand => "align-start-command",
            Rule::InsertDependencyInstall => "insert-dependency-install",
        }
    }

    pub fn apply(&self, text: &str, ctx: &FixupContext<'_>) -> String {
        match self {
            Rule::HeredocCopy => heredoc::rewrite_copy(text),
            Rule::HeredocRun => heredoc::rewrite_run(text),
            Rule::NormalizeBaseImage => base_image::normalize(text),
            Rule::StripUserCreation => user::strip(text),
            Rule::AlignStartCommand => start_command::align(text, ctx),
            Rule::InsertDependencyInstall => dependency_install::insert(text, ctx),
        }
    }
}

/// Removes heredoc syntax; `de_heredoc(de_heredoc(x)) == de_heredoc(x)`.
///
/// A converted `RUN` script may itself contain a heredoc line, so both rules
/// are applied until the text stops changing. Each conversion removes at
/// least one line, which bounds the loop.
pub fn de_heredoc(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = DE_HEREDOC_RULES
            .iter()
            .fold(current.clone(), |acc, rule| match rule {
                Rule::HeredocCopy => heredoc::rewrite_copy(&acc),
                Rule::HeredocRun => heredoc::rewrite_run(&acc),
                _ => acc,
            });
        if next == current {
            return current;
        }
        current = next;
    }
}

pub fn normalize_syntax(text: &str, ctx: &FixupContext<'_>) -> String {
    NORMALIZE_RULES
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc, ctx))
}

/// Result of running both passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixupReport {
    pub text: String,
    /// Names of the rules that changed the text, in application order
    pub applied: Vec<&'static str>,
}

/// Runs the de-heredoc pass then syntax normalization, recording which rules fired
pub fn apply_all(text: &str, ctx: &FixupContext<'_>) -> FixupReport {
    let mut applied = Vec::new();

    let mut current = de_heredoc(text);
    if current != text {
        applied.push("de-heredoc");
    }

    for rule in NORMALIZE_RULES {
        let next = rule.apply(&current, ctx);
        if next != current {
            applied.push(rule.name());
            current = next;
        }
    }

    FixupReport {
        text: current,
        applied,
    }
}
