//! `sonar sync`: bring every usage of a workspace package in line with its
//! version, optionally taking versions from the registry or bumping them.

use clap::Args;
use futures::future::join_all;
use sonar_core::error::SonarResult;
use sonar_core::types::BumpKind;
use sonar_registry::Resolve;
use sonar_workspace::Workspace;
use tracing::warn;

use super::{CommandContext, Outcome, ProgressResolver};
use crate::output::prompt::Choose;
use crate::output::report::{Report, SemVerFilter};
use crate::output::Banner;

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Sync workspace package versions with what has already been released
    #[arg(long)]
    pub remote: bool,

    /// Bump every workspace package version (major, minor or patch)
    #[arg(long, value_name = "KIND")]
    pub bump: Option<BumpKind>,
}

/// Execute the `sonar sync` command
pub async fn execute<R: Resolve, C: Choose>(
    args: &SyncArgs,
    ctx: &CommandContext,
    workspace: &mut Workspace,
    resolver: &R,
    chooser: &C,
) -> SonarResult<Outcome> {
    let bump = match args.bump {
        Some(kind) => chooser
            .confirm(&format!("Bump every workspace package by a {kind} version?"))
            .await?
            .then_some(kind),
        None => None,
    };

    ctx.print_header(
        &[
            ("Sync with remote?:", args.remote.to_string()),
            ("Bump:", bump.map_or_else(|| "false".to_string(), |kind| kind.to_string())),
        ],
        workspace,
    );

    let mut names: Vec<String> = workspace.packages().map(|package| package.name().to_string()).collect();
    names.sort();

    let versions: Vec<(String, Option<String>)> = if args.remote {
        let tracked = ProgressResolver::new(resolver, names.len(), "Checking workspace package versions");
        let lookups = names.iter().map(|name| {
            let tracked = &tracked;
            async move { (name.clone(), tracked.resolve(name, None).await) }
        });
        let resolved = join_all(lookups).await;
        tracked.finish();
        resolved
            .into_iter()
            .map(|(name, remote)| {
                let version = remote.or_else(|| {
                    warn!(package = %name, "No published version, keeping the local one");
                    own_version(workspace, &name)
                });
                (name, version)
            })
            .collect()
    } else {
        names
            .iter()
            .map(|name| (name.clone(), own_version(workspace, name)))
            .collect()
    };

    for (name, version) in &versions {
        workspace.update_package_version(name, version.as_deref());
        if let Some(kind) = bump {
            workspace.bump_package(name, kind);
        }
    }

    let mut report = Report::new(SemVerFilter::all());
    let (mut packages, mut usages) = (0, 0);
    workspace
        .changes(ctx.fix, |change| {
            if change.is_package() {
                packages += 1;
            } else {
                usages += 1;
            }
            report.save(change);
        })
        .await?;

    ctx.output.lines(&report.render());
    ctx.output.banner(&banner(ctx.fix, ctx.fail, packages, usages));

    Ok(Outcome {
        has_errors: !report.is_empty(),
    })
}

fn own_version(workspace: &Workspace, name: &str) -> Option<String> {
    workspace
        .package(name)
        .and_then(|package| package.version())
        .map(str::to_string)
}

pub(crate) fn banner(fix: bool, fail: bool, packages: usize, usages: usize) -> Banner {
    if fix {
        Banner::Success(format!(
            "Updated {packages} workspace package versions and synced {usages} usages"
        ))
    } else if packages == 0 {
        Banner::Success("Found no out of sync dependencies".to_string())
    } else if fail {
        Banner::Error(format!("Found {packages} files with out of sync dependencies"))
    } else {
        Banner::Warning(format!(
            "Found {packages} workspace package versions to update with {usages} usages"
        ))
    }
}
