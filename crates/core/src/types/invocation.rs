//! Invocation types describing a single external command run

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The executable part of a command line, always kept as a word vector.
///
/// The first word is the executable; any further words are fixed leading
/// arguments (e.g. `["conda", "build"]`). In shell mode these words are
/// passed to the shell verbatim, so they may contain shell syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Program(Vec<String>);

impl Program {
    /// Create a program from a single executable name
    #[must_use]
    pub fn new(executable: impl Into<String>) -> Self {
        Self(vec![executable.into()])
    }

    /// Create from a vector of words. Fails if `words` is empty.
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.is_empty() {
            return Err(Error::configuration("program must have at least one word"));
        }
        Ok(Self(words))
    }

    /// Split a command-line string into words using POSIX shell rules
    pub fn parse(command_line: &str) -> Result<Self> {
        let words = shlex::split(command_line).ok_or_else(|| {
            Error::configuration(format!("unbalanced quoting in command '{command_line}'"))
        })?;
        Self::from_words(words)
    }

    /// The executable name
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.0[0]
    }

    /// Words following the executable
    #[must_use]
    pub fn leading_args(&self) -> &[String] {
        &self.0[1..]
    }

    /// All words
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for Program {
    type Error = Error;

    fn try_from(words: Vec<String>) -> Result<Self> {
        Self::from_words(words)
    }
}

impl From<Program> for Vec<String> {
    fn from(program: Program) -> Self {
        program.0
    }
}

impl From<&str> for Program {
    fn from(executable: &str) -> Self {
        Self::new(executable)
    }
}

impl From<String> for Program {
    fn from(executable: String) -> Self {
        Self::new(executable)
    }
}

/// How output is surfaced to the terminal while a command runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verbosity {
    /// Suppress output; draw a self-overwriting progress line on stderr
    #[default]
    Indicator,
    /// Echo every chunk to stdout as it arrives
    Passthrough,
    /// Buffer only
    Silent,
}

impl Verbosity {
    /// Whether captured stdout is echoed to the caller's terminal
    #[must_use]
    pub fn echoes_output(&self) -> bool {
        matches!(self, Verbosity::Passthrough)
    }

    /// Whether the progress indicator runs
    #[must_use]
    pub fn shows_indicator(&self) -> bool {
        matches!(self, Verbosity::Indicator)
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verbosity::Indicator => "indicator",
            Verbosity::Passthrough => "passthrough",
            Verbosity::Silent => "silent",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Verbosity {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "indicator" => Ok(Verbosity::Indicator),
            "passthrough" | "verbose" => Ok(Verbosity::Passthrough),
            "silent" | "quiet" => Ok(Verbosity::Silent),
            other => Err(Error::configuration(format!(
                "unknown verbosity '{other}' (expected indicator, passthrough or silent)"
            ))),
        }
    }
}

/// A fully specified request to run one external program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    program: Program,
    arguments: Vec<String>,
    use_shell: bool,
    verbosity: Verbosity,
    environment_overrides: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Start building an invocation of `program`
    pub fn builder(program: impl Into<Program>) -> InvocationBuilder {
        InvocationBuilder::new(program.into())
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    #[must_use]
    pub fn use_shell(&self) -> bool {
        self.use_shell
    }

    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[must_use]
    pub fn environment_overrides(&self) -> &BTreeMap<String, String> {
        &self.environment_overrides
    }

    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Arguments handed to the executable: the program's leading words
    /// followed by the invocation arguments
    #[must_use]
    pub fn argv_tail(&self) -> Vec<String> {
        self.program
            .leading_args()
            .iter()
            .chain(self.arguments.iter())
            .cloned()
            .collect()
    }

    /// Command line as handed to a shell.
    ///
    /// Program words are kept verbatim (they are shell text); arguments are
    /// quoted so each survives as a single word.
    #[must_use]
    pub fn shell_command_line(&self) -> String {
        let mut parts: Vec<String> = self.program.words().to_vec();
        parts.extend(self.arguments.iter().map(|arg| quote_word(arg)));
        parts.join(" ")
    }

    /// Human-readable command line, used for progress lines and logs
    #[must_use]
    pub fn display_command(&self) -> String {
        if self.use_shell {
            return self.shell_command_line();
        }
        self.program
            .words()
            .iter()
            .chain(self.arguments.iter())
            .map(|word| quote_word(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_word(word: &str) -> String {
    match shlex::try_quote(word) {
        Ok(quoted) => quoted.into_owned(),
        // Words with NUL bytes cannot be quoted; show them as-is
        Err(_) => word.to_string(),
    }
}

/// Builder for [`Invocation`]
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    invocation: Invocation,
}

impl InvocationBuilder {
    fn new(program: Program) -> Self {
        Self {
            invocation: Invocation {
                program,
                arguments: Vec::new(),
                use_shell: false,
                verbosity: Verbosity::default(),
                environment_overrides: BTreeMap::new(),
                working_dir: None,
            },
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.invocation.arguments.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invocation
            .arguments
            .extend(args.into_iter().map(Into::into));
        self
    }

    /// Run through the platform shell instead of executing directly
    #[must_use]
    pub fn shell(mut self, use_shell: bool) -> Self {
        self.invocation.use_shell = use_shell;
        self
    }

    #[must_use]
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.invocation.verbosity = verbosity;
        self
    }

    /// Set one environment variable for the child
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.invocation
            .environment_overrides
            .insert(key.into(), value.into());
        self
    }

    /// Working directory of the child; relative path arguments resolve against it
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.invocation.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Invocation {
        self.invocation
    }
}
