use console::style;
use hourfill_core::config::API_KEY_VARS;
use hourfill_core::HourfillError;
use std::fmt;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Print a command failure with whatever guidance we have for it
pub fn report(err: &anyhow::Error) {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        cli_err.display();
    } else if let Some(domain) = err.downcast_ref::<HourfillError>() {
        let mut cli_err = from_domain(domain);
        // Outer anyhow context, if any, explains what we were doing
        if cli_err.context.is_none() && err.chain().count() > 1 {
            cli_err = cli_err.with_context(err.to_string());
        }
        cli_err.display();
    } else {
        CliError::new(format!("{:#}", err)).display();
    }
}

/// Map a domain error to a message with suggestions
pub fn from_domain(err: &HourfillError) -> CliError {
    let base = CliError::new(err.to_string());
    match err {
        HourfillError::ConfigMissing { .. } | HourfillError::InvalidCredential { .. } => base
            .with_suggestion(format!(
                "Export your 40-character API key: export {}=<key>",
                API_KEY_VARS[0]
            ))
            .with_suggestion(format!("{} is also read when {} is unset", API_KEY_VARS[1], API_KEY_VARS[0]))
            .with_help("Run: hourfill config"),
        HourfillError::CatalogNotFound { .. } => base
            .with_suggestion("Create a series catalog with api_path, frequency and series entries")
            .with_suggestion("Or point at an existing one: --catalog <path>")
            .with_help("Run: hourfill config"),
        HourfillError::LedgerWriteConflict { .. } => base
            .with_context("A backfill with --init would replace the existing run history.")
            .with_suggestion("Append to the existing ledger: drop --init")
            .with_suggestion("Or replace it: --init --overwrite")
            .with_help("Run: hourfill status"),
        HourfillError::LedgerMissing { .. } => base
            .with_suggestion("Create the dataset and ledger first: hourfill backfill --init --start <ts> --end <ts>")
            .with_help("Run: hourfill backfill --help"),
        HourfillError::InvalidArgument { .. } => base
            .with_suggestion("Timestamps must sit on the catalog frequency (e.g. 2024-01-01T00 for hourly)")
            .with_suggestion("The start must not be after the end")
            .with_help("Run: hourfill backfill --help"),
        HourfillError::Upstream { .. } | HourfillError::ChunkFetch { .. } => base
            .with_suggestion("Check network connectivity to the API")
            .with_suggestion("Allow more attempts: --max-retries <n>")
            .with_help("Run: hourfill probe"),
        HourfillError::ConfigInvalid { .. } => base.with_help("Run: hourfill config"),
        _ => base,
    }
}
