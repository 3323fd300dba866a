//! Script emitter: a resolved configuration as an ordered shell script.
//!
//! Steps always appear in this order:
//!
//! 1. bootstrap prelude (sourced, only for targets that need one)
//! 2. `cmake` configure
//! 3. invocation-record rewrites, one per remap
//! 4. relocation of the invocation record to the repository root
//! 5. `ninja` build
//! 6. convenience symlinks (optional)

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::flags::{ResolvedConfig, COMPILE_COMMANDS, NINJA};
use crate::core::platform::HostOs;
use crate::core::remap::PathRemap;
use crate::util::fs::write_executable;
use crate::util::process::{shell_quote, ProcessBuilder};

/// File name of the emitted script inside the build directory.
pub const SCRIPT_NAME: &str = "config.sh";

/// One line of the emitted script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Bootstrap(PathBuf),
    Configure(ProcessBuilder),
    RewriteRecord { remap: PathRemap, record: PathBuf },
    RelocateRecord { record: PathBuf, dest: PathBuf },
    Build(ProcessBuilder),
    Link { target: PathBuf, link: PathBuf },
}

impl ScriptStep {
    /// Render as a single shell line for `host`.
    pub fn render(&self, host: HostOs) -> String {
        match self {
            ScriptStep::Bootstrap(path) => format!("source {}", quote_path(path)),
            ScriptStep::Configure(cmd) | ScriptStep::Build(cmd) => cmd.display_command(),
            ScriptStep::RewriteRecord { remap, record } => {
                let mut cmd = ProcessBuilder::new("sed").arg("-i");
                // BSD sed takes the backup suffix as a separate, possibly empty, word
                if host == HostOs::Darwin {
                    cmd = cmd.arg("");
                }
                cmd.arg("-E").arg(rewrite_expr(remap)).arg(record).display_command()
            }
            ScriptStep::RelocateRecord { record, dest } => {
                format!("mv {} {}", quote_path(record), quote_path(dest))
            }
            ScriptStep::Link { target, link } => {
                format!("ln -snf {} {}", quote_path(target), quote_path(link))
            }
        }
    }
}

/// An emitted script, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScript {
    pub steps: Vec<ScriptStep>,
    pub fingerprint: String,
    pub host: HostOs,
    /// Where [`BuildScript::write`] puts it
    pub path: PathBuf,
    label: String,
}

impl BuildScript {
    /// Full script text, newline terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("#!/bin/bash\n");
        out.push_str("set -ex\n");
        out.push_str(&format!("# generated by cmake-one for {}\n", self.label));
        out.push_str(&format!("# fingerprint: {}\n", self.fingerprint));
        for step in &self.steps {
            out.push_str(&step.render(self.host));
            out.push('\n');
        }
        out
    }

    /// Persist the script and return its text.
    pub fn write(&self) -> Result<String> {
        let text = self.render();
        write_executable(&self.path, &text)?;
        Ok(text)
    }

    /// Command that executes the written script.
    pub fn command(&self) -> ProcessBuilder {
        let cwd = self.path.parent().unwrap_or_else(|| Path::new("."));
        ProcessBuilder::new("bash").arg(&self.path).cwd(cwd)
    }
}

/// Serialize `config` into an ordered script.
pub fn emit(config: &ResolvedConfig) -> BuildScript {
    let paths = &config.paths;
    let record = paths.build_dir.join(COMPILE_COMMANDS);
    let mut steps = Vec::new();

    if let Some(ref bootstrap) = config.bootstrap {
        steps.push(ScriptStep::Bootstrap(bootstrap.clone()));
    }

    steps.push(ScriptStep::Configure(
        ProcessBuilder::new("cmake").args(config.configure_args()),
    ));

    for remap in &config.record_remaps {
        steps.push(ScriptStep::RewriteRecord {
            remap: remap.clone(),
            record: record.clone(),
        });
    }

    if paths.build_dir != paths.repo_dir {
        steps.push(ScriptStep::RelocateRecord {
            record,
            dest: paths.repo_dir.join(COMPILE_COMMANDS),
        });
    }

    steps.push(ScriptStep::Build(ProcessBuilder::new(NINJA).args(config.build_args())));

    if config.link_build_and_install {
        steps.push(ScriptStep::Link {
            target: paths.install_dir.clone(),
            link: paths.repo_dir.join("install"),
        });
        steps.push(ScriptStep::Link {
            target: paths.build_dir.clone(),
            link: paths.repo_dir.join("build"),
        });
    }

    let label = if config.platform.is_cross() {
        format!("{}-{} ({})", config.platform, config.arch, config.build_type)
    } else {
        format!("host {} ({})", config.arch, config.build_type)
    };

    BuildScript {
        steps,
        fingerprint: config.fingerprint(),
        host: config.host,
        path: paths.build_dir.join(SCRIPT_NAME),
        label,
    }
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.display().to_string())
}

/// Characters that continue a path component. A match of the remap source
/// followed by one of these is a sibling, not the SDK root.
const COMPONENT_CHARS: &str = "-A-Za-z0-9._+@~";

/// `sed -E` expression replacing the remap source wherever it ends at a
/// component boundary.
fn rewrite_expr(remap: &PathRemap) -> String {
    format!(
        "s#{}([^{}]|$)#{}\\1#g",
        sed_pattern(&remap.from().display().to_string()),
        COMPONENT_CHARS,
        sed_replacement(&remap.to().display().to_string())
    )
}

/// Escape a literal for the pattern side of an extended `s#..#..#`.
fn sed_pattern(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(
            c,
            '\\' | '#' | '.' | '*' | '[' | ']' | '^' | '$' | '+' | '?' | '(' | ')' | '{' | '}' | '|'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a literal for the replacement side of `s#..#..#`.
fn sed_replacement(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '\\' | '#' | '&') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
