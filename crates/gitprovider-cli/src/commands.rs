//! Provider subcommands, generic over the adapter.

use anyhow::Result;
use clap::{Args, Subcommand};
use gitprovider_core::config::GITHUB_DOMAIN;
use gitprovider_core::{
    parse_org_repository_url, parse_organization_url, parse_user_repository_url, parse_user_url,
    Client, DeployKeyClient, DeployKeyInfo, OrgRepositoriesClient, OrganizationsClient,
    RepositoryCreateOptions, RepositoryInfo, RepositoryPermission, RepositoryRef,
    RepositoryVisibility, ResourceClient, ResourceObject, TeamAccessClient, TeamAccessInfo,
    UserRepositoriesClient,
};
use serde::Serialize;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum OrgCommands {
    /// Show one organization
    Get {
        /// Organization URL, e.g. https://gitlab.com/acme/infra
        url: String,
    },

    /// List organizations visible to the token
    List {
        /// Domain to list from
        #[arg(long, default_value = GITHUB_DOMAIN)]
        domain: String,
    },

    /// List direct sub-organizations
    Children {
        /// Organization URL
        url: String,
    },
}

/// A repository named on the command line.
#[derive(Args, Debug, Clone)]
pub struct RepoTarget {
    /// Repository URL, e.g. https://github.com/acme/app
    pub url: String,

    /// The URL names a user-owned repository
    #[arg(long)]
    pub user: bool,
}

impl RepoTarget {
    pub fn reference(&self) -> Result<RepositoryRef> {
        Ok(if self.user {
            parse_user_repository_url(&self.url)?.into()
        } else {
            parse_org_repository_url(&self.url)?.into()
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum RepoCommands {
    /// Show a repository's settings
    Get {
        #[command(flatten)]
        target: RepoTarget,
    },

    /// List the repositories of an organization or user
    List {
        /// Organization or user URL
        url: String,

        /// The URL names a user
        #[arg(long)]
        user: bool,
    },

    /// Create the repository or bring it to the given settings
    Reconcile {
        #[command(flatten)]
        target: RepoTarget,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        default_branch: Option<String>,

        /// public, internal or private
        #[arg(long)]
        visibility: Option<RepositoryVisibility>,

        /// Create an initial commit when creating the repository
        #[arg(long)]
        auto_init: bool,

        /// License template applied on creation
        #[arg(long)]
        license_template: Option<String>,
    },

    /// Delete a repository (needs destructive_actions)
    Delete {
        #[command(flatten)]
        target: RepoTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeployKeyCommands {
    /// List deploy keys
    List {
        #[command(flatten)]
        target: RepoTarget,
    },

    /// Add the key or bring it to the given settings
    Reconcile {
        #[command(flatten)]
        target: RepoTarget,

        /// Key title
        #[arg(long)]
        name: String,

        /// Public key in OpenSSH format
        #[arg(long)]
        key: String,

        /// Allow pushes with this key
        #[arg(long)]
        read_write: bool,
    },

    /// Remove a deploy key (needs destructive_actions)
    Delete {
        #[command(flatten)]
        target: RepoTarget,

        /// Key title
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TeamAccessCommands {
    /// List teams with access to a repository
    List {
        /// Organization repository URL
        url: String,
    },

    /// Grant the team access or change its permission
    Reconcile {
        /// Organization repository URL
        url: String,

        #[arg(long)]
        team: String,

        /// pull, triage, push, maintain or admin
        #[arg(long)]
        permission: Option<RepositoryPermission>,
    },

    /// Revoke a team's access (needs destructive_actions)
    Delete {
        /// Organization repository URL
        url: String,

        #[arg(long)]
        team: String,
    },
}

/// A subcommand that talks to a backend.
#[derive(Debug)]
pub enum ProviderCommand {
    Org(OrgCommands),
    Repo(RepoCommands),
    DeployKey(DeployKeyCommands),
    TeamAccess(TeamAccessCommands),
}

impl ProviderCommand {
    /// Domain of the backend the command targets.
    pub fn domain(&self) -> Result<String> {
        let domain = match self {
            ProviderCommand::Org(OrgCommands::List { domain }) => domain.clone(),
            ProviderCommand::Org(OrgCommands::Get { url } | OrgCommands::Children { url }) => {
                parse_organization_url(url)?.domain
            }
            ProviderCommand::Repo(RepoCommands::List { url, user: true }) => {
                parse_user_url(url)?.domain
            }
            ProviderCommand::Repo(RepoCommands::List { url, user: false }) => {
                parse_organization_url(url)?.domain
            }
            ProviderCommand::Repo(
                RepoCommands::Get { target }
                | RepoCommands::Reconcile { target, .. }
                | RepoCommands::Delete { target },
            )
            | ProviderCommand::DeployKey(
                DeployKeyCommands::List { target }
                | DeployKeyCommands::Reconcile { target, .. }
                | DeployKeyCommands::Delete { target, .. },
            ) => target.reference()?.domain().to_string(),
            ProviderCommand::TeamAccess(
                TeamAccessCommands::List { url }
                | TeamAccessCommands::Reconcile { url, .. }
                | TeamAccessCommands::Delete { url, .. },
            ) => parse_org_repository_url(url)?.domain().to_string(),
        };
        Ok(domain)
    }
}

// =============================================================================
// Output
// =============================================================================

#[derive(Serialize)]
struct Described<'a, T> {
    url: String,
    #[serde(flatten)]
    state: &'a T,
}

#[derive(Serialize)]
struct Report<T> {
    outcome: String,
    #[serde(flatten)]
    state: T,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Execution
// =============================================================================

async fn reconcile_resource<R>(
    client: &R,
    reference: &R::Ref,
    desired: R::Info,
    options: R::CreateOptions,
) -> Result<()>
where
    R: ResourceClient,
    R::Info: Serialize,
{
    let reconciled = client.reconcile(reference, desired, options).await?;
    info!(outcome = %reconciled.outcome, "Reconcile finished");
    print_json(&Report {
        outcome: reconciled.outcome.to_string(),
        state: reconciled.resource.get(),
    })
}

async fn delete_resource<R: ResourceClient>(client: &R, reference: &R::Ref) -> Result<()> {
    let resource = client.get(reference).await?;
    resource.delete().await?;
    info!(reference = ?reference, "Deleted");
    Ok(())
}

fn print_resources<R>(resources: &[R]) -> Result<()>
where
    R: ResourceObject,
    R::Info: Serialize,
{
    let states: Vec<R::Info> = resources.iter().map(|r| r.get()).collect();
    print_json(&states)
}

/// Run `command` against `client`.
pub async fn run<C: Client>(client: &C, command: ProviderCommand) -> Result<()> {
    match command {
        ProviderCommand::Org(command) => run_org(client, command).await,
        ProviderCommand::Repo(command) => run_repo(client, command).await,
        ProviderCommand::DeployKey(command) => run_deploy_key(client, command).await,
        ProviderCommand::TeamAccess(command) => run_team_access(client, command).await,
    }
}

async fn run_org<C: Client>(client: &C, command: OrgCommands) -> Result<()> {
    let organizations = client.organizations();
    match command {
        OrgCommands::Get { url } => {
            let organization = organizations.get(&parse_organization_url(&url)?).await?;
            print_json(&organization)
        }
        OrgCommands::List { .. } => print_json(&organizations.list().await?),
        OrgCommands::Children { url } => {
            let children = organizations
                .children(&parse_organization_url(&url)?)
                .await?;
            print_json(&children)
        }
    }
}

async fn run_repo<C: Client>(client: &C, command: RepoCommands) -> Result<()> {
    match command {
        RepoCommands::Get { target } => {
            let state = match target.reference()? {
                RepositoryRef::Org(reference) => {
                    client.org_repositories().get(&reference).await?.get()
                }
                RepositoryRef::User(reference) => {
                    client.user_repositories().get(&reference).await?.get()
                }
            };
            print_json(&Described {
                url: target.url.clone(),
                state: &state,
            })
        }
        RepoCommands::List { url, user } => {
            if user {
                let repositories = client
                    .user_repositories()
                    .list(&parse_user_url(&url)?)
                    .await?;
                print_resources(&repositories)
            } else {
                let repositories = client
                    .org_repositories()
                    .list(&parse_organization_url(&url)?)
                    .await?;
                print_resources(&repositories)
            }
        }
        RepoCommands::Reconcile {
            target,
            description,
            default_branch,
            visibility,
            auto_init,
            license_template,
        } => {
            let desired = RepositoryInfo {
                description,
                default_branch,
                visibility,
            };
            let options = RepositoryCreateOptions {
                auto_init: auto_init.then_some(true),
                license_template,
            };
            match target.reference()? {
                RepositoryRef::Org(reference) => {
                    reconcile_resource(&client.org_repositories(), &reference, desired, options)
                        .await
                }
                RepositoryRef::User(reference) => {
                    reconcile_resource(&client.user_repositories(), &reference, desired, options)
                        .await
                }
            }
        }
        RepoCommands::Delete { target } => match target.reference()? {
            RepositoryRef::Org(reference) => {
                delete_resource(&client.org_repositories(), &reference).await
            }
            RepositoryRef::User(reference) => {
                delete_resource(&client.user_repositories(), &reference).await
            }
        },
    }
}

async fn run_deploy_key<C: Client>(client: &C, command: DeployKeyCommands) -> Result<()> {
    match command {
        DeployKeyCommands::List { target } => {
            let keys = client.deploy_keys(&target.reference()?).list().await?;
            print_resources(&keys)
        }
        DeployKeyCommands::Reconcile {
            target,
            name,
            key,
            read_write,
        } => {
            let desired = DeployKeyInfo {
                name: name.clone(),
                key,
                read_only: Some(!read_write),
            };
            reconcile_resource(&client.deploy_keys(&target.reference()?), &name, desired, ())
                .await
        }
        DeployKeyCommands::Delete { target, name } => {
            delete_resource(&client.deploy_keys(&target.reference()?), &name).await
        }
    }
}

async fn run_team_access<C: Client>(client: &C, command: TeamAccessCommands) -> Result<()> {
    match command {
        TeamAccessCommands::List { url } => {
            let access = client
                .team_access(&parse_org_repository_url(&url)?)
                .list()
                .await?;
            print_resources(&access)
        }
        TeamAccessCommands::Reconcile {
            url,
            team,
            permission,
        } => {
            let desired = TeamAccessInfo {
                name: team.clone(),
                permission,
            };
            let access = client.team_access(&parse_org_repository_url(&url)?);
            reconcile_resource(&access, &team, desired, ()).await
        }
        TeamAccessCommands::Delete { url, team } => {
            let access = client.team_access(&parse_org_repository_url(&url)?);
            delete_resource(&access, &team).await
        }
    }
}
