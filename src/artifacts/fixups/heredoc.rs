//! Here-document removal
//!
//! The regex crate has no backreferences, so blocks are found with a line
//! scanner: a header line names the delimiter and the block runs to the first
//! line equal to it. Headers without a terminator are left untouched.

use regex::Regex;
use std::sync::OnceLock;

fn copy_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)^\s*COPY\s+(?:--\S+\s+)*<<(-?)["']?(\w+)["']?\s+(\S.*?)\s*$"#)
            .expect("valid regex")
    })
}

fn run_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)^\s*RUN\s+<<(-?)["']?(\w+)["']?\s*$"#).expect("valid regex")
    })
}

/// Index of the delimiter line at or after `from`
fn find_terminator(lines: &[&str], from: usize, delimiter: &str, strip_tabs: bool) -> Option<usize> {
    (from..lines.len()).find(|&i| {
        let line = if strip_tabs {
            lines[i].trim_start_matches('\t')
        } else {
            lines[i]
        };
        line.trim_end() == delimiter
    })
}

fn body<'a>(lines: &[&'a str], strip_tabs: bool) -> Vec<&'a str> {
    lines
        .iter()
        .map(|l| {
            let l = l.strip_suffix('\r').unwrap_or(l);
            if strip_tabs {
                l.trim_start_matches('\t')
            } else {
                l
            }
        })
        .collect()
}

fn shell_escape_double_quoted(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '\\' | '"' | '$' | '`' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn echo_block(lines: &[&str], target: &str) -> String {
    if lines.is_empty() {
        return format!("RUN : > {}", target);
    }
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let escaped = shell_escape_double_quoted(line);
            if i == 0 {
                format!("RUN echo \"{}\" > {}", escaped, target)
            } else {
                format!("    echo \"{}\" >> {}", escaped, target)
            }
        })
        .collect::<Vec<_>>()
        .join(" && \\\n")
}

/// Shell commands of a script body, with `\` continuations joined
fn script_commands(lines: &[&str]) -> Vec<String> {
    let mut commands = Vec::new();
    let mut pending = String::new();

    for line in lines {
        let trimmed = line.trim();
        if pending.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }
        if let Some(head) = trimmed.strip_suffix('\\') {
            if !pending.is_empty() {
                pending.push(' ');
            }
            pending.push_str(head.trim_end());
            continue;
        }
        if !pending.is_empty() {
            pending.push(' ');
            pending.push_str(trimmed);
            commands.push(std::mem::take(&mut pending));
        } else {
            commands.push(trimmed.to_string());
        }
    }
    if !pending.trim().is_empty() {
        commands.push(pending.trim().to_string());
    }
    commands
}

enum Block {
    Copy,
    Run,
}

fn rewrite(text: &str, kind: Block) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let header = match kind {
            Block::Copy => copy_header().captures(lines[i]),
            Block::Run => run_header().captures(lines[i]),
        };

        if let Some(caps) = header {
            let strip_tabs = &caps[1] == "-";
            let delimiter = &caps[2];
            if let Some(end) = find_terminator(&lines, i + 1, delimiter, strip_tabs) {
                let content = body(&lines[i + 1..end], strip_tabs);
                match kind {
                    Block::Copy => out.push(echo_block(&content, &caps[3])),
                    Block::Run => {
                        let commands = script_commands(&content);
                        if !commands.is_empty() {
                            out.push(format!("RUN {}", commands.join(" && \\\n    ")));
                        }
                    }
                }
                i = end + 1;
                continue;
            }
        }

        out.push(lines[i].to_string());
        i += 1;
    }

    out.join("\n")
}

pub(super) fn rewrite_copy(text: &str) -> String {
    rewrite(text, Block::Copy)
}

pub(super) fn rewrite_run(text: &str) -> String {
    rewrite(text, Block::Run)
}
