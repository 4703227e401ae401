//! Command implementations and dispatch logic.
//!
//! Every command loads the workspace once, mutates it in memory, then
//! reports (and with `--fix` writes) all changes in a single pass.

use camino::{Utf8Path, Utf8PathBuf};
use sonar_config::{ConfigLayering, ConfigLoader, ConfigOverrides, SonarConfig};
use sonar_core::error::{SonarError, SonarResult};
use sonar_core::utils::normalize_path;
use sonar_registry::{AuthConfig, RegistryClient, RegistryResolver, Resolve, RetryConfig};
use sonar_workspace::Workspace;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, info};

pub mod sync;
pub mod update;
pub mod validate;


use crate::output::progress::ProgressBar;
use crate::output::prompt::TerminalChooser;
use crate::{output::OutputHandler, Commands, CommonArgs};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    pub config: SonarConfig,
    pub fix: bool,
    pub fail: bool,
    pub yes: bool,
}

impl CommandContext {
    /// Resolve the run configuration from file, environment and flags
    pub async fn new(common: &CommonArgs, overrides: &ConfigOverrides) -> SonarResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| SonarError::io("Failed to get current directory".to_string(), e))?;
        let cwd_utf8 = Utf8PathBuf::from_path_buf(cwd.clone()).map_err(|path| SonarError::ConfigValidation {
            field: "folder".to_string(),
            reason: format!("{} is not valid UTF-8", path.display()),
        })?;

        let explicit = match &common.config {
            Some(path) => Some(Utf8Path::from_path(path).ok_or_else(|| SonarError::ConfigValidation {
                field: "config".to_string(),
                reason: format!("{} is not valid UTF-8", path.display()),
            })?),
            None => None,
        };

        let (file_config, source) = ConfigLoader::new(cwd_utf8).load_file_config(explicit).await?;
        debug!(?source, "Loaded configuration");
        let config = ConfigLayering::merge_configs(file_config, &ConfigLayering::collect_env_overrides(), overrides)?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            config,
            fix: common.fix,
            fail: common.fail,
            yes: common.yes,
        })
    }

    /// Workspace root the manifests are searched under
    pub fn folder(&self) -> PathBuf {
        normalize_path(&self.cwd.join(&self.config.folder))
    }

    /// Settings block and workspace counts printed before any work
    fn print_header(&self, settings: &[(&str, String)], workspace: &Workspace) {
        self.output.rule();
        self.output.log("");
        self.output.setting("Will fix?:", self.fix);
        self.output.setting("Will fail?:", self.fail);
        for (label, value) in settings {
            self.output.setting(label, value);
        }
        self.output.log("");
        self.output.rule();
        self.output.log("");
        self.output.log(&format!("Found {} workspace package.json files", workspace.package_count()));
        self.output.log(&format!("Found {} unique dependencies", workspace.dependency_count()));
        self.output.log("");
        self.output.rule();
    }
}

/// What a command leaves for the exit code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Something is, or was, out of line
    pub has_errors: bool,
}

impl Outcome {
    pub fn exit_code(self, fail: bool) -> ExitCode {
        if fail && self.has_errors {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> SonarResult<Outcome> {
    let mut workspace = Workspace::load(&ctx.folder(), ctx.config.concurrency).await?;
    let resolver = registry_resolver(&ctx.config)?;
    let chooser = TerminalChooser::new(ctx.yes);

    match command {
        Commands::Sync(args) => {
            info!("Syncing workspace (remote: {}, bump: {:?})", args.remote, args.bump);
            sync::execute(&args, ctx, &mut workspace, &resolver, &chooser).await
        },
        Commands::Update(args) => {
            info!("Updating dependencies (pattern: {:?})", args.pattern());
            update::execute(&args, ctx, &mut workspace, &resolver).await
        },
        Commands::Validate(args) => {
            info!("Validating workspace");
            validate::execute(&args, ctx, &mut workspace, &resolver, &chooser).await
        },
    }
}

/// Registry resolver for one run, honoring the configured registry and token
pub fn registry_resolver(config: &SonarConfig) -> SonarResult<RegistryResolver> {
    let auth = config.registry_token.clone().map(|token| AuthConfig {
        token: Some(token),
        ..AuthConfig::default()
    });
    let client = RegistryClient::with_config(auth, RetryConfig::default())?.with_base_url(&config.registry)?;
    Ok(RegistryResolver::new(client, config.concurrency))
}

/// Resolver wrapper that ticks a progress bar per lookup
pub(crate) struct ProgressResolver<'a, R> {
    inner: &'a R,
    bar: Mutex<ProgressBar>,
}

impl<'a, R: Resolve> ProgressResolver<'a, R> {
    pub(crate) fn new(inner: &'a R, total: usize, message: &str) -> Self {
        Self {
            inner,
            bar: Mutex::new(ProgressBar::new(total, message)),
        }
    }

    pub(crate) fn finish(&self) {
        if let Ok(bar) = self.bar.lock() {
            bar.finish();
        }
    }
}

impl<R: Resolve> Resolve for ProgressResolver<'_, R> {
    async fn resolve(&self, name: &str, canary: Option<&str>) -> Option<String> {
        let resolved = self.inner.resolve(name, canary).await;
        if let Ok(mut bar) = self.bar.lock() {
            bar.tick();
        }
        resolved
    }
}
