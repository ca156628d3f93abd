use super::FixupContext;
use crate::analysis::LanguageFamily;
use regex::Regex;
use std::sync::OnceLock;

const PYTHON_ENTRYPOINTS: &[&str] = &[
    "main.py",
    "app.py",
    "server.py",
    "run.py",
    "__main__.py",
    "wsgi.py",
    "asgi.py",
    "manage.py",
];

const NODE_ENTRYPOINTS: &[&str] = &[
    "index.js", "server.js", "app.js", "main.js", "index.ts", "server.ts", "app.ts", "main.ts",
];

fn cmd_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\s*)CMD\s+(.*?)\s*$").expect("valid regex"))
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn find_entrypoint(files: &[String], candidates: &[&str], extensions: &[&str], default: &str) -> String {
    for candidate in candidates {
        if let Some(found) = files
            .iter()
            .filter(|f| basename(f) == *candidate)
            .min_by_key(|f| f.matches('/').count())
        {
            return found.clone();
        }
    }
    files
        .iter()
        .find(|f| !f.contains('/') && extensions.iter().any(|ext| f.ends_with(ext)))
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

/// Most likely Python entry file, relative to the project root
pub fn python_entrypoint(files: &[String]) -> String {
    find_entrypoint(files, PYTHON_ENTRYPOINTS, &[".py"], "main.py")
}

pub fn node_entrypoint(files: &[String]) -> String {
    find_entrypoint(files, NODE_ENTRYPOINTS, &[".js", ".ts"], "index.js")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Launcher {
    Python,
    PythonServer,
    Node,
    Other,
}

fn launcher(program: &str) -> Launcher {
    let name = basename(program).to_lowercase();
    if name == "python" || name.starts_with("python3") || name.starts_with("python2") {
        Launcher::Python
    } else if matches!(name.as_str(), "uvicorn" | "gunicorn" | "hypercorn" | "flask") {
        Launcher::PythonServer
    } else if matches!(name.as_str(), "node" | "npm" | "npx" | "yarn" | "pnpm" | "ts-node") {
        Launcher::Node
    } else {
        Launcher::Other
    }
}

struct Command {
    args: Vec<String>,
    /// Launched through `sh -c`; arguments then live inside one script string
    wrapped: bool,
}

impl Command {
    fn parse(rest: &str) -> Option<Self> {
        let args: Vec<String> = if rest.starts_with('[') {
            serde_json::from_str(rest).ok()?
        } else {
            rest.split_whitespace().map(str::to_string).collect()
        };
        if args.is_empty() {
            return None;
        }

        let shell = matches!(basename(&args[0]), "sh" | "bash");
        if shell && args.len() >= 3 && matches!(args[1].as_str(), "-c" | "-lc") {
            return Some(Self {
                args: args[2].split_whitespace().map(str::to_string).collect(),
                wrapped: true,
            });
        }
        Some(Self {
            args,
            wrapped: false,
        })
    }

    fn launcher(&self) -> Launcher {
        self.args.first().map(|p| launcher(p)).unwrap_or(Launcher::Other)
    }

    fn script_arg(&self, extensions: &[&str]) -> Option<usize> {
        self.args
            .iter()
            .position(|a| extensions.iter().any(|ext| a.ends_with(ext)))
    }
}

fn exec_form(indent: &str, args: &[String]) -> String {
    let quoted: Vec<String> = args
        .iter()
        .map(|a| serde_json::to_string(a).unwrap_or_else(|_| format!("\"{}\"", a)))
        .collect();
    format!("{}CMD [{}]", indent, quoted.join(", "))
}

fn file_present(files: &[String], reference: &str) -> bool {
    let reference = reference.trim_start_matches("./");
    files
        .iter()
        .any(|f| f == reference || reference.ends_with(&format!("/{}", f)))
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn align_line(indent: &str, rest: &str, ctx: &FixupContext<'_>) -> Option<String> {
    let command = Command::parse(rest)?;
    let launcher = command.launcher();
    let descriptor = ctx.descriptor;

    match descriptor.language_family() {
        LanguageFamily::Python => {
            let entry = python_entrypoint(ctx.files);
            if descriptor.has_framework("fastapi") && launcher == Launcher::Python {
                let module = entry.trim_end_matches(".py").replace('/', ".");
                let app = format!("{}:app", module);
                let port = descriptor.listen_port.to_string();
                return Some(exec_form(
                    indent,
                    &owned(&["uvicorn", app.as_str(), "--host", "0.0.0.0", "--port", port.as_str()]),
                ));
            }
            if launcher == Launcher::Node {
                return Some(exec_form(indent, &owned(&["python", entry.as_str()])));
            }
            if launcher == Launcher::Python && !command.wrapped && !ctx.files.is_empty() {
                let idx = command.script_arg(&[".py"])?;
                if !file_present(ctx.files, &command.args[idx]) && command.args[idx] != entry {
                    let mut args = command.args.clone();
                    args[idx] = entry;
                    return Some(exec_form(indent, &args));
                }
            }
            None
        }
        LanguageFamily::Node => {
            let entry = node_entrypoint(ctx.files);
            if matches!(launcher, Launcher::Python | Launcher::PythonServer) {
                return Some(exec_form(indent, &owned(&["node", entry.as_str()])));
            }
            let is_node = command.args.first().map(|p| basename(p) == "node").unwrap_or(false);
            if is_node && !command.wrapped && !ctx.files.is_empty() {
                let idx = command.script_arg(&[".js", ".ts", ".mjs", ".cjs"])?;
                if !file_present(ctx.files, &command.args[idx]) && command.args[idx] != entry {
                    let mut args = command.args.clone();
                    args[idx] = entry;
                    return Some(exec_form(indent, &args));
                }
            }
            None
        }
        _ => None,
    }
}

/// Rewrites `CMD` lines that launch the wrong runtime or a file absent from
/// the project; unparsable `CMD` lines are kept as-is
pub(super) fn align(text: &str, ctx: &FixupContext<'_>) -> String {
    text.split('\n')
        .map(|line| {
            cmd_line()
                .captures(line)
                .and_then(|caps| align_line(&caps[1], &caps[2], ctx))
                .unwrap_or_else(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confidence, ProjectDescriptor, ResourceTier};

    fn descriptor(language: &str, framework: Option<&str>, port: u16) -> ProjectDescriptor {
        ProjectDescriptor {
            primary_language: language.to_string(),
            primary_framework: framework.map(str::to_string),
            runtime_label: language.to_string(),
            listen_port: port,
            resource_tier: ResourceTier::Medium,
            database_requirement: None,
            confidence: Confidence::Medium,
            package_managers: vec![],
        }
    }

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn run(text: &str, d: &ProjectDescriptor, files: &[String]) -> String {
        align(text, &FixupContext { descriptor: d, files })
    }

    #[test]
    fn test_entrypoint_detection() {
        assert_eq!(python_entrypoint(&files(&["src/app.py", "server.py"])), "server.py");
        assert_eq!(python_entrypoint(&files(&["pkg/main.py", "main.py"])), "main.py");
        assert_eq!(python_entrypoint(&files(&["worker.py"])), "worker.py");
        assert_eq!(python_entrypoint(&[]), "main.py");
        assert_eq!(node_entrypoint(&files(&["src/server.ts", "app.js"])), "app.js");
        assert_eq!(node_entrypoint(&[]), "index.js");
    }

    #[test]
    fn test_python_cmd_on_node_project() {
        let d = descriptor("JavaScript", Some("Express"), 3000);
        let out = run("CMD [\"python\", \"app.py\"]", &d, &files(&["server.js", "package.json"]));
        assert_eq!(out, "CMD [\"node\", \"server.js\"]");
    }

    #[test]
    fn test_node_cmd_on_python_project() {
        let d = descriptor("Python", None, 8000);
        let out = run("CMD npm start", &d, &files(&["app.py"]));
        assert_eq!(out, "CMD [\"python\", \"app.py\"]");
    }

    #[test]
    fn test_fastapi_uses_uvicorn() {
        let d = descriptor("Python", Some("FastAPI"), 8080);
        let out = run("CMD [\"python\", \"main.py\"]", &d, &files(&["app/main.py"]));
        assert_eq!(
            out,
            "CMD [\"uvicorn\", \"app.main:app\", \"--host\", \"0.0.0.0\", \"--port\", \"8080\"]"
        );
        assert_eq!(run(&out, &d, &files(&["app/main.py"])), out);
    }

    #[test]
    fn test_missing_python_file_replaced() {
        let d = descriptor("Python", Some("Flask"), 8000);
        let out = run("CMD [\"python3\", \"-u\", \"app.py\"]", &d, &files(&["server.py"]));
        assert_eq!(out, "CMD [\"python3\", \"-u\", \"server.py\"]");
    }

    #[test]
    fn test_existing_file_kept() {
        let d = descriptor("Python", None, 8000);
        let text = "CMD [\"python\", \"/app/src/run.py\"]";
        assert_eq!(run(text, &d, &files(&["src/run.py", "main.py"])), text);
    }

    #[test]
    fn test_correct_commands_untouched() {
        let d = descriptor("Go", None, 8080);
        let text = "CMD [\"./app\"]";
        assert_eq!(run(text, &d, &[]), text);

        let d = descriptor("JavaScript", None, 3000);
        let text = "CMD [\"npm\", \"start\"]";
        assert_eq!(run(text, &d, &files(&["index.js"])), text);
    }

    #[test]
    fn test_malformed_cmd_passes_through() {
        let d = descriptor("Python", None, 8000);
        for text in ["CMD [\"python\", ", "CMD", "CMD []"] {
            assert_eq!(run(text, &d, &[]), text);
        }
    }
}
