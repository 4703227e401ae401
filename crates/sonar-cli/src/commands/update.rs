//! `sonar update`: move third-party dependency ranges forward.

use clap::Args;
use regex::{Regex, RegexBuilder};
use sonar_config::SonarConfig;
use sonar_core::error::{SonarError, SonarResult};
use sonar_core::types::{Change, ChangeKind, KindFilter, SemVerChange};
use sonar_registry::Resolve;
use sonar_workspace::Workspace;

use super::{CommandContext, Outcome, ProgressResolver};
use crate::output::report::{Report, SemVerFilter};
use crate::output::{listify, Banner};

#[derive(Args, Debug, Clone, Default)]
pub struct UpdateArgs {
    /// Update only dependencies whose scope is in internalScopes
    #[arg(long)]
    pub internal: bool,

    /// Update only dependencies whose scope is neither internal nor ignored
    #[arg(long)]
    pub external: bool,

    /// Include new patch releases (default)
    #[arg(long, overrides_with = "no_patch")]
    pub patch: bool,

    #[arg(long, overrides_with = "patch")]
    pub no_patch: bool,

    /// Include new minor releases (default)
    #[arg(long, overrides_with = "no_minor")]
    pub minor: bool,

    #[arg(long, overrides_with = "minor")]
    pub no_minor: bool,

    /// Include new major releases
    #[arg(long)]
    pub major: bool,

    /// Update ranges in dependencies (default)
    #[arg(long, overrides_with = "no_deps")]
    pub deps: bool,

    #[arg(long, overrides_with = "deps")]
    pub no_deps: bool,

    /// Update ranges in devDependencies (default)
    #[arg(long, overrides_with = "no_dev")]
    pub dev: bool,

    #[arg(long, overrides_with = "dev")]
    pub no_dev: bool,

    /// Update ranges in peerDependencies (default)
    #[arg(long, overrides_with = "no_peer")]
    pub peer: bool,

    #[arg(long, overrides_with = "peer")]
    pub no_peer: bool,

    /// Update to the newest version whose prerelease tag contains this text
    #[arg(long, value_name = "TAG")]
    pub canary: Option<String>,

    /// Only update dependencies whose name matches this regex
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    #[arg(value_name = "PATTERN", hide = true)]
    pub implied_pattern: Option<String>,

    /// Use a regex from the groups config by name
    #[arg(long, value_name = "NAME")]
    pub group: Option<String>,

    /// Scopes treated as internal
    #[arg(long, value_name = "SCOPE", value_delimiter = ',', num_args = 1..)]
    pub internal_scopes: Option<Vec<String>>,

    /// Scopes never updated
    #[arg(long, value_name = "SCOPE", value_delimiter = ',', num_args = 1..)]
    pub ignore_scopes: Option<Vec<String>>,
}

impl UpdateArgs {
    pub fn semver_filter(&self) -> SemVerFilter {
        SemVerFilter {
            major: self.major,
            minor: self.minor || !self.no_minor,
            patch: self.patch || !self.no_patch,
        }
    }

    pub fn kinds(&self) -> KindFilter {
        KindFilter {
            dep: self.deps || !self.no_deps,
            dev: self.dev || !self.no_dev,
            peer: self.peer || !self.no_peer,
        }
    }

    /// `--pattern`, else the trailing positional
    pub fn pattern(&self) -> Option<&str> {
        self.pattern
            .as_deref()
            .or(self.implied_pattern.as_deref())
            .filter(|pattern| !pattern.is_empty())
    }

    pub fn canary(&self) -> Option<&str> {
        self.canary.as_deref().filter(|canary| !canary.is_empty())
    }

    /// Internal and external together cancel out
    fn scope_mode(&self) -> (bool, bool) {
        if self.internal && self.external {
            (false, false)
        } else {
            (self.internal, self.external)
        }
    }
}

/// Which dependencies an update run looks at
#[derive(Debug)]
pub struct DependencyFilter {
    internal: bool,
    external: bool,
    internal_scopes: Vec<String>,
    ignore_scopes: Vec<String>,
    pattern: Option<Regex>,
    group: Option<Regex>,
}

impl DependencyFilter {
    pub fn new(args: &UpdateArgs, config: &SonarConfig) -> SonarResult<Self> {
        let (internal, external) = args.scope_mode();
        let group = match args.group.as_deref().filter(|group| !group.is_empty()) {
            Some(name) => {
                let pattern = config.group(name).ok_or_else(|| SonarError::ConfigValidation {
                    field: "groups".to_string(),
                    reason: format!("no group named '{name}' is configured"),
                })?;
                Some(case_insensitive(pattern)?)
            },
            None => None,
        };

        Ok(Self {
            internal,
            external,
            internal_scopes: config.internal_scopes.clone(),
            ignore_scopes: config.ignore_scopes.clone(),
            pattern: args.pattern().map(case_insensitive).transpose()?,
            group,
        })
    }

    pub fn matches(&self, name: &str, scope: &str) -> bool {
        let internal = self.internal_scopes.iter().any(|s| s == scope);
        let ignored = self.ignore_scopes.iter().any(|s| s == scope);

        (!self.internal || internal)
            && (!self.external || (!internal && !ignored))
            && self.pattern.as_ref().map_or(true, |re| re.is_match(name))
            && self.group.as_ref().map_or(true, |re| re.is_match(name))
    }

    pub fn is_narrowed(&self) -> bool {
        self.pattern.is_some() || self.group.is_some()
    }
}

fn case_insensitive(pattern: &str) -> SonarResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| SonarError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Whether a found update is applied under the given flags
pub(crate) fn should_apply(change: SemVerChange, filter: SemVerFilter, canary: bool) -> bool {
    match change {
        _ if change.is_pre_bump() => canary,
        SemVerChange::Prerelease | SemVerChange::Patch => filter.patch,
        SemVerChange::Minor => filter.minor,
        _ => filter.major,
    }
}

/// Execute the `sonar update` command
pub async fn execute<R: Resolve>(
    args: &UpdateArgs,
    ctx: &CommandContext,
    workspace: &mut Workspace,
    resolver: &R,
) -> SonarResult<Outcome> {
    let filter = DependencyFilter::new(args, &ctx.config)?;
    let semver = args.semver_filter();
    let kinds = args.kinds();
    let canary = args.canary();

    // Workspace packages are kept in line by `sync`
    let mut names: Vec<String> = workspace
        .dependencies()
        .filter(|dependency| dependency.workspace_package().is_none())
        .filter(|dependency| filter.matches(dependency.name(), dependency.scope()))
        .map(|dependency| dependency.name().to_string())
        .collect();
    names.sort();

    let types: Vec<&str> = kinds.kinds().map(|kind| kind.manifest_key()).collect();
    let (internal, external) = args.scope_mode();
    let groups = match (internal, external, args.group.as_deref()) {
        (true, _, _) => "internal".to_string(),
        (_, true, _) => "external".to_string(),
        (_, _, Some(group)) => group.to_string(),
        _ => "internal, external".to_string(),
    };
    ctx.print_header(
        &[
            ("SemVer Filter:", semver.included().join(", ")),
            ("Types:", types.join(", ")),
            ("Groups:", groups),
            ("Pattern:", args.pattern().unwrap_or("none").to_string()),
        ],
        workspace,
    );
    if filter.is_narrowed() {
        ctx.output
            .log(&format!("Found {} dependencies (within groups + pattern)", names.len()));
    }

    let tracked = ProgressResolver::new(resolver, names.len(), "Checking dependency versions");
    let latest = workspace.latest_all(&names, &tracked, canary).await;
    tracked.finish();

    let mut report = Report::new(semver);
    for name in &names {
        let Some(latest) = latest.get(name) else {
            continue;
        };
        let Some(version) = latest.version() else {
            if canary.is_none() {
                ctx.output.error(&format!(
                    "Could not find the latest version of {name}, has it been published?"
                ));
            }
            continue;
        };
        let Some(change) = latest.change() else {
            continue;
        };

        let current = workspace
            .dependency(name)
            .and_then(|dependency| dependency.min_version())
            .map(str::to_string);
        report.save(&Change::dependency(
            ChangeKind::Bump(change),
            name.clone(),
            current,
            Some(version.to_string()),
        ));

        if should_apply(change, semver, canary.is_some()) {
            workspace.update_dependency_version(name, version, kinds);
        }
    }

    let (mut packages, mut dependencies) = (0, 0);
    workspace
        .changes(ctx.fix, |change| {
            if change.is_package() {
                packages += 1;
            } else {
                dependencies += 1;
                report.save(change);
            }
        })
        .await?;

    ctx.output.lines(&report.render());
    ctx.output
        .banner(&banner(ctx.fix, ctx.fail, packages, dependencies, &semver.included()));

    Ok(Outcome {
        has_errors: !report.is_empty(),
    })
}

pub(crate) fn banner(fix: bool, fail: bool, packages: usize, dependencies: usize, kinds: &[&str]) -> Banner {
    if fix {
        Banner::Success(format!("Updated {dependencies} dependencies within {packages} files"))
    } else if packages == 0 {
        Banner::Success("Found nothing to update".to_string())
    } else if fail {
        Banner::Error(format!("Found {dependencies} {} dependency updates", listify(kinds)))
    } else {
        Banner::Warning(format!("Found {dependencies} {} dependency updates", listify(kinds)))
    }
}
