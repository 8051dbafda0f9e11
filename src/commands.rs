// ─── CLI Commands ───
// Thin command handlers. Each one wires the core components together for a
// single user action; no logic of its own beyond ordering.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::core::auth::{
    AuthManager, DeviceCodePrompt, FileCredentialStore, LaunchAuthData, MicrosoftAuthClient,
};
use crate::core::downloader::{HttpFetcher, ProgressFn};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::Installer;
use crate::core::instance::{
    accept_eula, find_remote_release, modpack_manifest, remote_instance_dir, trial_manifest,
    OfflineModeGuard, ProjectInstance,
};
use crate::core::launch::{LaunchAssembler, LaunchOptions};
use crate::core::platform::Os;
use crate::core::process::{CrashTestProbe, Supervisor};
use crate::core::registry::RegistryClient;
use crate::core::state::{DataPaths, LauncherContext};

#[derive(Parser, Debug)]
#[command(
    name = "minepack",
    version,
    about = "Mod package manager and launcher for Minecraft modpacks"
)]
pub struct Cli {
    /// Project directory containing minepack.toml.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install the manifest's dependencies, or add new packages.
    Install(InstallArgs),
    /// Launch the modpack in the project directory, or a published one by name.
    Launch(LaunchArgs),
    /// Try a mod in a throwaway modpack that is deleted afterwards.
    Try(TryArgs),
    /// Log in with a Microsoft account.
    Login,
}

#[derive(Args, Debug)]
struct InstallArgs {
    /// Packages to add, as `name` or `name@requirement`.
    packages: Vec<String>,
    /// Also install `[dev.dependencies]`.
    #[arg(long)]
    dev: bool,
}

#[derive(Args, Debug)]
struct LaunchArgs {
    /// Published modpack to launch, as `name` or `name@requirement`.
    package: Option<String>,
    /// Start a dedicated server instead of the client.
    #[arg(short, long)]
    server: bool,
    /// Stop the server once it accepts connections; exit 69 if it never does.
    #[arg(long, requires = "server")]
    crashtest: bool,
    /// Download and assemble everything, then exit without launching.
    #[arg(long)]
    only_prepare: bool,
    /// Java binary to use instead of a managed runtime.
    #[arg(long, env = "MINEPACK_JAVA")]
    java: Option<PathBuf>,
    /// Run the server with online-mode disabled for this session.
    #[arg(long, requires = "server")]
    offline_server: bool,
    /// Accept the Minecraft EULA by writing eula.txt.
    #[arg(long, requires = "server")]
    accept_eula: bool,
    /// Include `[dev.dependencies]` in the instance.
    #[arg(long)]
    dev: bool,
    /// Launch with whatever is on disk, without downloading anything.
    #[arg(long)]
    skip_download: bool,
}

#[derive(Args, Debug)]
struct TryArgs {
    /// Package to try, as `name` or `name@requirement`.
    package: String,
    /// Start a dedicated server instead of the client.
    #[arg(short, long)]
    server: bool,
}

impl From<TryArgs> for LaunchArgs {
    fn from(args: TryArgs) -> Self {
        LaunchArgs {
            package: None,
            server: args.server,
            crashtest: false,
            only_prepare: false,
            java: None,
            offline_server: false,
            accept_eula: false,
            dev: false,
            skip_download: false,
        }
    }
}

impl Cli {
    pub async fn execute(self) -> LauncherResult<()> {
        let ctx = LauncherContext::new(DataPaths::from_env())?;
        match self.command {
            Command::Install(args) => install(&ctx, self.dir, args).await,
            Command::Launch(args) => launch(&ctx, self.dir, args).await,
            Command::Try(args) => try_package(&ctx, args).await,
            Command::Login => login(&ctx).await,
        }
    }
}

// ── install ─────────────────────────────────────────────

async fn install(ctx: &LauncherContext, dir: PathBuf, args: InstallArgs) -> LauncherResult<()> {
    let mut project = ProjectInstance::detect(&dir).await?;
    project.update_lockfile_requirements(&ctx.http_client).await?;

    let (bar, on_progress) = progress_bar("Downloading");
    let installer = installer(ctx)
        .with_progress(on_progress)
        .with_dev_dependencies(args.dev);
    let resolved = if args.packages.is_empty() {
        installer.install_manifest(&mut project).await
    } else {
        installer.install_packages(&mut project, &args.packages).await
    };
    bar.finish_and_clear();
    let resolved = resolved?;

    for (id, release) in resolved.iter() {
        println!("  {} {}", id, release.version);
    }
    println!("Installed {} packages", resolved.len());
    Ok(())
}

fn installer(ctx: &LauncherContext) -> Installer {
    Installer::new(
        Arc::new(registry(ctx)),
        Arc::new(HttpFetcher::new(ctx.http_client.clone())),
    )
}

fn registry(ctx: &LauncherContext) -> RegistryClient {
    RegistryClient::new(ctx.http_client.clone(), &ctx.settings.registry_url)
}

// ── launch ──────────────────────────────────────────────

async fn launch(ctx: &LauncherContext, dir: PathBuf, args: LaunchArgs) -> LauncherResult<()> {
    if args.crashtest && !args.server {
        return Err(LauncherError::Other(
            "can only crashtest servers, add --server".into(),
        ));
    }

    let mut project = match &args.package {
        Some(spec) => {
            let release = find_remote_release(&registry(ctx), spec).await?;
            let manifest = modpack_manifest(&release)?;
            let dir = remote_instance_dir(&ctx.paths, &release, manifest.requirements.loader);
            ProjectInstance::create(&dir, manifest).await?
        }
        None => ProjectInstance::detect(&dir).await?,
    };
    run_instance(ctx, &mut project, &args).await
}

async fn try_package(ctx: &LauncherContext, args: TryArgs) -> LauncherResult<()> {
    let release = find_remote_release(&registry(ctx), &args.package).await?;
    println!("Creating temporary modpack with {}", release.identifier());

    let temp = tempfile::Builder::new()
        .prefix("minepack-try-")
        .tempdir()
        .map_err(|e| LauncherError::io(std::env::temp_dir(), e))?;
    let mut project = ProjectInstance::create(temp.path(), trial_manifest(&release)).await?;
    let outcome = run_instance(ctx, &mut project, &args.into()).await;
    if let Err(e) = temp.close() {
        warn!("Could not remove the temporary instance: {}", e);
    }
    outcome
}

/// Pin, sync, authenticate, assemble and run one instance.
async fn run_instance(
    ctx: &LauncherContext,
    project: &mut ProjectInstance,
    args: &LaunchArgs,
) -> LauncherResult<()> {
    project.ensure_launchable()?;
    println!("Launching {}", project.manifest.describe());
    println!("Instance location: {}", project.dir.display());

    if !args.skip_download {
        project.update_lockfile_requirements(&ctx.http_client).await?;
        let (bar, on_progress) = progress_bar("Mods");
        let synced = installer(ctx)
            .with_progress(on_progress)
            .with_dev_dependencies(args.dev)
            .sync_manifest(project)
            .await;
        bar.finish_and_clear();
        synced?;
    }

    // The server needs no credentials.
    let auth: Option<LaunchAuthData> = if args.server {
        None
    } else {
        let manager = auth_manager(ctx);
        manager.restore().await?;
        Some(manager.launch_auth_data().await?)
    };

    let os = Os::current()?;
    let (bar, on_progress) = progress_bar("Game files");
    let assembler = LaunchAssembler::new(ctx, os).with_progress(on_progress);
    let opts = LaunchOptions {
        server: args.server,
        java_override: args.java.clone().or_else(|| ctx.settings.java_path.clone()),
        max_memory_mb: ctx.settings.max_memory_mb,
        game_dir: project.dir.clone(),
        skip_download: args.skip_download,
    };
    let prepared = assembler
        .prepare(&project.launch_manifest_id()?, auth.as_ref(), &opts)
        .await;
    bar.finish_and_clear();
    let prepared = prepared?;

    if args.server {
        if args.accept_eula {
            accept_eula(&project.dir).await?;
        } else if !project.dir.join("eula.txt").exists() {
            warn!("eula.txt is missing; the server will stop until the EULA is accepted (--accept-eula)");
        }
    }

    if args.only_prepare {
        println!("Skipping launch as requested");
        return Ok(());
    }

    let offline = if args.offline_server {
        Some(OfflineModeGuard::enable(&project.dir).await?)
    } else {
        None
    };

    println!("\nLaunching Minecraft …");
    let supervisor = Supervisor::new();
    let outcome = match supervisor.spawn(&mut prepared.command()) {
        Ok(mut child) if args.crashtest => {
            let probe = CrashTestProbe::new("127.0.0.1", ctx.settings.server_port);
            let result = supervisor.run_crash_test(&mut child, &probe).await;
            if result.is_ok() {
                println!("Crashtest went fine!");
            }
            result
        }
        Ok(mut child) => supervisor.run(&mut child).await,
        Err(e) => Err(e),
    };

    if let Some(guard) = offline {
        guard.restore().await?;
    }
    drop(prepared);
    outcome
}

// ── login ───────────────────────────────────────────────

async fn login(ctx: &LauncherContext) -> LauncherResult<()> {
    let manager = auth_manager(ctx);
    let data = manager
        .prompt(Box::new(|prompt: &DeviceCodePrompt| {
            if prompt.message.is_empty() {
                println!(
                    "Open {} and enter the code {}",
                    prompt.verification_uri, prompt.user_code
                );
            } else {
                println!("{}", prompt.message);
            }
        }))
        .await?;
    info!("Credentials stored in {:?}", ctx.paths.credentials_file());
    println!("Logged in as {}", data.player_name);
    Ok(())
}

fn auth_manager(ctx: &LauncherContext) -> AuthManager {
    let provider = MicrosoftAuthClient::new(
        ctx.http_client.clone(),
        ctx.settings.microsoft_client_id.clone(),
    );
    let store = FileCredentialStore::new(ctx.paths.credentials_file());
    AuthManager::new(Arc::new(provider), Arc::new(store))
}

// ── progress ────────────────────────────────────────────

fn progress_bar(prefix: &'static str) -> (ProgressBar, ProgressFn) {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_prefix(prefix);
    let handle = bar.clone();
    let on_progress: ProgressFn = Arc::new(move |percent| handle.set_position(u64::from(percent)));
    (bar, on_progress)
}
