use std::sync::Arc;

/// Command used when a launch carries no arguments at all.
pub const DEFAULT_COMMAND: &str = "lumen_samples";
pub const BENCHMARK_FLAG: &str = "--benchmark";
pub const HEADLESS_FLAG: &str = "--headless_surface";

/// Immutable, ordered argument list fixed at session start.
///
/// Cloning is cheap; every session of a coordinator shares the same list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentList(Arc<[String]>);

impl ArgumentList {
    /// Builds a list; an empty input falls back to [`DEFAULT_COMMAND`].
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Self::default();
        }
        Self(args.into())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First argument: `sample`, `test`, or a raw command.
    pub fn command(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or(DEFAULT_COMMAND)
    }

    /// Sample id for `sample <id> ...` launches.
    pub fn sample_id(&self) -> Option<&str> {
        match self.as_slice() {
            [cmd, id, ..] if cmd == "sample" && !id.starts_with("--") => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.iter().any(|a| a == flag)
    }

    pub fn is_benchmark(&self) -> bool {
        self.has_flag(BENCHMARK_FLAG)
    }

    pub fn is_headless(&self) -> bool {
        self.has_flag(HEADLESS_FLAG)
    }
}

impl Default for ArgumentList {
    fn default() -> Self {
        Self(Arc::from([DEFAULT_COMMAND.to_string()]))
    }
}

impl std::fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, arg) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(arg)?;
        }
        Ok(())
    }
}

/// What the user asked to launch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LaunchCommand {
    #[default]
    Default,
    Sample(String),
    Test(String),
    /// Pre-split command line, passed through untouched.
    Raw(Vec<String>),
}

/// A launch choice plus the mode toggles from the launcher menu.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchRequest {
    pub command: LaunchCommand,
    pub benchmark: bool,
    pub headless: bool,
}

impl LaunchRequest {
    pub fn sample(id: impl Into<String>) -> Self {
        Self {
            command: LaunchCommand::Sample(id.into()),
            ..Self::default()
        }
    }
}

/// Flattens a launch request into the engine's argument list.
///
/// Mode flags always follow the base command, benchmark before headless.
pub fn assemble_arguments(request: &LaunchRequest) -> ArgumentList {
    let mut args: Vec<String> = match &request.command {
        LaunchCommand::Default => vec![DEFAULT_COMMAND.to_string()],
        LaunchCommand::Sample(id) => vec!["sample".to_string(), id.clone()],
        LaunchCommand::Test(id) => vec!["test".to_string(), id.clone()],
        LaunchCommand::Raw(raw) if raw.is_empty() => vec![DEFAULT_COMMAND.to_string()],
        LaunchCommand::Raw(raw) => raw.clone(),
    };

    if request.benchmark {
        args.push(BENCHMARK_FLAG.to_string());
    }
    if request.headless {
        args.push(HEADLESS_FLAG.to_string());
    }

    log::info!("arguments:");
    for arg in &args {
        log::info!("  {arg}");
    }

    ArgumentList::new(args)
}
