//! `sonar validate`: report (and with `--fix` repair) ranges that disagree
//! across the workspace, and imports that do not match declarations.

use clap::Args;
use sonar_core::error::SonarResult;
use sonar_core::types::{KindFilter, Version, VersionReq};
use sonar_registry::Resolve;
use sonar_usage::{ImportScanner, UsageReconciler, UsageSummary};
use sonar_workspace::{Dependency, Workspace};
use tracing::{debug, warn};

use super::{CommandContext, Outcome};
use crate::output::prompt::{Candidate, Choose};
use crate::output::report::{Report, SemVerFilter};
use crate::output::{listify, Banner, Line};

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Check that every dependency is declared with a single range
    #[arg(long)]
    pub versions: bool,

    /// Check imports against declared dependencies
    #[arg(long, visible_alias = "dep-check")]
    pub unused: bool,
}

impl ValidateArgs {
    /// Selected checks; none selected means all of them
    pub fn tasks(&self) -> (bool, bool) {
        if !self.versions && !self.unused {
            (true, true)
        } else {
            (self.versions, self.unused)
        }
    }
}

/// One dependency whose declarations disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mismatch {
    pub name: String,
    pub peer: bool,
    /// Version of the workspace package of the same name
    pub workspace_version: Option<String>,
    /// `(range, usages)`, most used first
    pub versions: Vec<(String, usize)>,
}

impl Mismatch {
    fn note(&self) -> &'static str {
        if self.peer {
            "(peerDependencies)"
        } else {
            "(dev/dependencies)"
        }
    }

    fn filter(&self) -> KindFilter {
        if self.peer {
            KindFilter::peer_only()
        } else {
            KindFilter::non_peer()
        }
    }

    pub(crate) fn candidates(&self) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .workspace_version
            .iter()
            .map(|version| Candidate::new(format!("{version} (Workspace Version)"), version.clone()))
            .collect();
        candidates.extend(
            self.versions
                .iter()
                .map(|(range, count)| Candidate::new(format!("{range} ({count} usages)"), range.clone())),
        );
        candidates
    }
}

/// Version the workspace itself holds for a dependency, if it is one of ours
fn workspace_version(workspace: &Workspace, dependency: &Dependency) -> Option<String> {
    if let Some(min) = dependency.min_version().filter(|min| min.contains("workspace")) {
        return Some(min.to_string());
    }
    dependency
        .workspace_package()
        .and_then(|id| workspace.package_by_id(id))
        .and_then(|package| package.version())
        .map(str::to_string)
}

/// A declared range that already covers the workspace version
fn admits(range: &str, version: &str) -> bool {
    if range == version {
        return true;
    }
    match (VersionReq::parse(range), version.parse::<Version>()) {
        (Ok(req), Ok(version)) => req.matches(&version),
        _ => false,
    }
}

/// Dependencies declared with more than one range, dev/dependencies first
pub(crate) fn find_mismatches(workspace: &Workspace) -> Vec<Mismatch> {
    let mut dependencies: Vec<&Dependency> = workspace.dependencies().collect();
    dependencies.sort_by(|a, b| a.name().cmp(b.name()));

    let mut usage = Vec::new();
    let mut peer = Vec::new();
    for dependency in dependencies {
        let workspace_version = workspace_version(workspace, dependency);
        let versions = |filter: KindFilter| -> Vec<(String, usize)> {
            dependency
                .get_versions(filter)
                .into_iter()
                .map(|usage| (usage.version, usage.count))
                .collect()
        };

        let non_peer = versions(KindFilter::non_peer());
        let out_of_line = match &workspace_version {
            Some(version) => {
                !non_peer.is_empty() && !non_peer.iter().any(|(range, _)| !range.is_empty() && admits(range, version))
            },
            None => false,
        };
        if non_peer.len() > 1 || out_of_line {
            usage.push(Mismatch {
                name: dependency.name().to_string(),
                peer: false,
                workspace_version: workspace_version.clone(),
                versions: non_peer,
            });
        }

        let peers = versions(KindFilter::peer_only());
        if peers.len() > 1 {
            peer.push(Mismatch {
                name: dependency.name().to_string(),
                peer: true,
                workspace_version,
                versions: peers,
            });
        }
    }

    usage.extend(peer);
    usage
}

/// Execute the `sonar validate` command
pub async fn execute<R: Resolve, C: Choose>(
    args: &ValidateArgs,
    ctx: &CommandContext,
    workspace: &mut Workspace,
    resolver: &R,
    chooser: &C,
) -> SonarResult<Outcome> {
    let (versions, unused) = args.tasks();
    let mut tasks = Vec::new();
    if versions {
        tasks.push("versions");
    }
    if unused {
        tasks.push("unused");
    }
    ctx.print_header(&[("Tasks:", listify(&tasks))], workspace);

    let mut banners = Vec::new();
    let mut summary_lines = Vec::new();
    let mut has_errors = false;

    if versions {
        let mismatches = find_mismatches(workspace);
        debug!(count = mismatches.len(), "Found version mismatches");
        has_errors |= !mismatches.is_empty();

        for mismatch in &mismatches {
            if ctx.fix {
                let prompt = format!("Which version should \"{}\" be on {}?", mismatch.name, mismatch.note());
                let answer = chooser.choose(&prompt, &mismatch.candidates()).await?;
                workspace.set_dependency_range(&mismatch.name, &answer, mismatch.filter());

                if let Some(dependency) = workspace.dependency(&mismatch.name) {
                    let (peer, dep) = if mismatch.peer {
                        (Some(answer.as_str()), None)
                    } else {
                        (None, Some(answer.as_str()))
                    };
                    for rejected in dependency.peer_dependency_errors(peer, dep) {
                        warn!(
                            dependency = %mismatch.name,
                            "{} does not admit the chosen {answer}",
                            rejected.version
                        );
                    }
                }
            } else {
                ctx.output.warning(&format!("{} {}", mismatch.name, mismatch.note()));
                if let Some(version) = &mismatch.workspace_version {
                    ctx.output.log(&format!("        - {version}: is the workspace version."));
                }
                for (range, count) in &mismatch.versions {
                    ctx.output.log(&format!("        - {range}: has {count} usages."));
                }
            }
        }

        let (mut packages, mut dependencies) = (0, 0);
        workspace
            .changes(false, |change| {
                if change.is_package() {
                    packages += 1;
                } else {
                    dependencies += 1;
                }
            })
            .await?;
        banners.push(versions_banner(
            ctx.fix,
            ctx.fail,
            mismatches.len(),
            packages,
            dependencies,
        ));
    }

    if unused {
        let reconciler = UsageReconciler::new(ImportScanner::new()?, &ctx.config);
        let summary = reconciler.run(workspace, resolver).await?;
        has_errors |= summary.has_changes();

        for (package, files) in &summary.invalid_files {
            ctx.output.error(&format!("Could not read file in {package}"));
            for (path, reason) in files {
                ctx.output.error(&format!("  {}: {reason}", path.display()));
            }
        }
        banners.push(unused_banner(ctx.fix, ctx.fail, &summary));
        if summary.has_changes() {
            summary_lines.push(Line::Log(format!(" - {} missing dependencies", summary.missing_count)));
            summary_lines.push(Line::Log(format!(" - {} unused dependencies", summary.unused_count)));
        }
    }

    let mut report = Report::new(SemVerFilter::all());
    workspace.changes(ctx.fix, |change| report.save(change)).await?;

    ctx.output.lines(&report.render());
    for banner in &banners {
        ctx.output.banner(banner);
    }
    ctx.output.lines(&summary_lines);

    Ok(Outcome { has_errors })
}

pub(crate) fn versions_banner(
    fix: bool,
    fail: bool,
    mismatches: usize,
    packages: usize,
    dependencies: usize,
) -> Banner {
    if mismatches == 0 {
        Banner::Success("Found 0 dependency versions to update".to_string())
    } else if fix {
        Banner::Success(format!(
            "Updated {dependencies} dependency versions in {packages} packages"
        ))
    } else if fail {
        Banner::Error(format!("Found {mismatches} dependency versions to update"))
    } else {
        Banner::Warning(format!("Found {mismatches} dependency versions to update"))
    }
}

pub(crate) fn unused_banner(fix: bool, fail: bool, summary: &UsageSummary) -> Banner {
    let packages = summary.packages_with_changes;
    if !summary.has_changes() {
        Banner::Success("Found no missing or unused dependencies".to_string())
    } else if fix {
        Banner::Success(format!("Updated {packages} workspace packages"))
    } else if fail {
        Banner::Error(format!(
            "Found {packages} workspace packages with missing or unused dependencies"
        ))
    } else {
        Banner::Warning(format!(
            "Found {packages} workspace packages with missing or unused dependencies"
        ))
    }
}
