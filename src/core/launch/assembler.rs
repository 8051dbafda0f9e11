// ─── Launch Assembler ───
// Descriptor → downloads → natives → classpath → command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::core::assets::AssetIndex;
use crate::core::auth::LaunchAuthData;
use crate::core::downloader::{DownloadEntry, DownloadManager, Fetch, HttpFetcher, ProgressFn};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaRuntimeManager;
use crate::core::platform::{append_env_path, Os};
use crate::core::state::{DataPaths, LauncherContext};
use crate::core::version::{
    DescriptorSource, DownloadArtifact, HttpDescriptorSource, LaunchManifest, VersionStore,
};

use super::arguments::{
    filter_descriptor_jvm_args, server_main_class, shell_escape, Placeholders, G1_FLAGS,
};
use super::classpath::{safe_path_str, ClasspathPlan};
use super::natives::extract_natives;

pub const LAUNCHER_NAME: &str = "minepack";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Start the dedicated server instead of the client.
    pub server: bool,
    /// Use this java binary instead of a managed runtime.
    pub java_override: Option<PathBuf>,
    pub max_memory_mb: Option<u32>,
    /// Working directory of the game, usually the instance directory.
    pub game_dir: PathBuf,
    /// Trust the files on disk and do not download anything.
    pub skip_download: bool,
}

/// A fully assembled launch. Natives live as long as this value.
#[derive(Debug)]
pub struct PreparedLaunch {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
    pub server: bool,
    natives: TempDir,
}

impl PreparedLaunch {
    pub fn natives_dir(&self) -> &Path {
        self.natives.path()
    }

    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.cwd);
        cmd
    }

    /// Copy/paste friendly rendering of the command line.
    pub fn format_for_logs(&self) -> String {
        std::iter::once(shell_escape(&self.program.to_string_lossy()))
            .chain(self.args.iter().map(|a| shell_escape(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct LaunchAssembler {
    paths: DataPaths,
    client: reqwest::Client,
    os: Os,
    versions: VersionStore,
    fetcher: Arc<dyn Fetch>,
    runtimes: JavaRuntimeManager,
    on_progress: Option<ProgressFn>,
}

impl LaunchAssembler {
    pub fn new(ctx: &LauncherContext, os: Os) -> Self {
        let client = ctx.http_client.clone();
        Self::with_sources(
            ctx.paths.clone(),
            client.clone(),
            os,
            Arc::new(HttpDescriptorSource::new(client.clone())),
            Arc::new(HttpFetcher::new(client)),
        )
    }

    pub fn with_sources(
        paths: DataPaths,
        client: reqwest::Client,
        os: Os,
        descriptors: Arc<dyn DescriptorSource>,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        Self {
            versions: VersionStore::new(paths.clone(), descriptors),
            runtimes: JavaRuntimeManager::new(client.clone(), paths.java_dir(), os),
            paths,
            client,
            os,
            fetcher,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub async fn prepare(
        &self,
        launch_id: &str,
        auth: Option<&LaunchAuthData>,
        opts: &LaunchOptions,
    ) -> LauncherResult<PreparedLaunch> {
        // Servers run without an account.
        let auth = if opts.server {
            None
        } else {
            let auth = auth.ok_or(LauncherError::MissingCredentials)?;
            if !auth.paid {
                return Err(LauncherError::AccountCannotLaunch);
            }
            Some(auth)
        };

        let manifest = self.versions.obtain(launch_id).await?;
        let jar_target = manifest.jar_target().to_string();
        let game_jar = self.game_jar(&jar_target, opts.server);
        let library_files = manifest.library_files(self.os)?;

        if !opts.skip_download {
            let mut queue = DownloadManager::new(self.fetcher.clone());
            if let Some(progress) = &self.on_progress {
                queue = queue.with_progress(progress.clone());
            }

            for file in &library_files {
                let dest = self.paths.libraries_dir().join(&file.path);
                if exists(&dest).await? {
                    continue;
                }
                queue.add(
                    DownloadEntry::new(file.url.clone(), dest)
                        .with_sha1(file.sha1.clone())
                        .with_size(file.size),
                );
            }

            if !exists(&game_jar).await? {
                let artifact = game_jar_artifact(&manifest, opts.server)?;
                queue.add(
                    DownloadEntry::new(artifact.url.clone(), game_jar.clone())
                        .with_sha1(artifact.sha1.clone())
                        .with_size(artifact.size),
                );
            }

            if !opts.server {
                if let Some(info) = &manifest.asset_index {
                    let index = AssetIndex::load_or_fetch(
                        &self.client,
                        info,
                        &self.paths.asset_indexes_dir(),
                    )
                    .await?;
                    queue.extend(index.missing_objects(&self.paths.asset_objects_dir()).await?);
                }
            }

            info!("Downloading {} missing files", queue.len());
            queue.start().await?;
        }

        let java = match &opts.java_override {
            Some(java) => java.clone(),
            None => self.runtimes.ensure(manifest.required_java_major()).await?,
        };

        let plan = ClasspathPlan::new(&library_files, &self.paths.libraries_dir(), &game_jar);
        let natives = extract_natives(plan.native_archives.clone(), self.os).await?;

        tokio::fs::create_dir_all(&opts.game_dir)
            .await
            .map_err(|e| LauncherError::io(&opts.game_dir, e))?;

        let args = self.build_args(&manifest, &plan, natives.path(), &game_jar, auth, opts)?;

        let native_path = safe_path_str(natives.path());
        let env_var = native_library_env_var(self.os);
        let env = vec![(
            env_var.to_string(),
            append_env_path(self.os, env_var, &native_path),
        )];

        let prepared = PreparedLaunch {
            program: java,
            args,
            env,
            cwd: opts.game_dir.clone(),
            server: opts.server,
            natives,
        };
        debug!("Command (copy/paste): {}", prepared.format_for_logs());
        Ok(prepared)
    }

    fn game_jar(&self, jar_target: &str, server: bool) -> PathBuf {
        if server {
            self.paths
                .versions_dir()
                .join(jar_target)
                .join(format!("{}-server.jar", jar_target))
        } else {
            self.paths.version_jar(jar_target)
        }
    }

    fn build_args(
        &self,
        manifest: &LaunchManifest,
        plan: &ClasspathPlan,
        natives_dir: &Path,
        game_jar: &Path,
        auth: Option<&LaunchAuthData>,
        opts: &LaunchOptions,
    ) -> LauncherResult<Vec<String>> {
        let natives = safe_path_str(natives_dir);
        let classpath = plan.join(self.os);
        let jar = safe_path_str(game_jar);

        let mut args = vec!["-Xss1M".to_string()];
        if let Some(mb) = opts.max_memory_mb {
            args.push(format!("-Xmx{}M", mb));
        }
        args.push(format!("-Djava.library.path={}", natives));
        args.push(format!("-Dminecraft.launcher.brand={}", LAUNCHER_NAME));
        args.push(format!("-Dminecraft.launcher.version={}", LAUNCHER_VERSION));
        args.push(format!("-Dminecraft.client.jar={}", jar));

        let jvm_values = Placeholders::new()
            .with("natives_directory", natives.clone())
            .with("library_directory", safe_path_str(&self.paths.libraries_dir()))
            .with("classpath_separator", self.os.classpath_separator())
            .with("launcher_name", LAUNCHER_NAME)
            .with("launcher_version", LAUNCHER_VERSION)
            .with("version_name", manifest.jar_target());
        args.extend(jvm_values.substitute(&filter_descriptor_jvm_args(&manifest.jvm_args(self.os))));

        args.push("-cp".to_string());
        args.push(classpath);
        args.extend(G1_FLAGS.iter().map(|f| f.to_string()));

        let main_class = manifest.main_class()?;
        if opts.server {
            args.push(server_main_class(main_class));
            args.push("nogui".to_string());
            return Ok(args);
        }
        args.push(main_class.to_string());

        let auth = auth.ok_or(LauncherError::MissingCredentials)?;
        let game_values = Placeholders::new()
            .with("auth_player_name", auth.player_name.clone())
            .with("version_name", manifest.jar_target())
            .with("game_directory", safe_path_str(&opts.game_dir))
            .with("assets_root", safe_path_str(&self.paths.assets_dir()))
            .with("assets_index_name", manifest.asset_index_id())
            .with("auth_uuid", auth.uuid.clone())
            .with("auth_access_token", auth.access_token.clone())
            .with("user_type", auth.user_type.clone())
            .with("user_properties", "{}")
            .with("version_type", manifest.version_type());
        args.extend(game_values.substitute(&manifest.game_args(self.os)));

        Ok(args)
    }
}

fn game_jar_artifact(manifest: &LaunchManifest, server: bool) -> LauncherResult<&DownloadArtifact> {
    let downloads = manifest.downloads.as_ref();
    let artifact = if server {
        downloads.and_then(|d| d.server.as_ref())
    } else {
        downloads.and_then(|d| d.client.as_ref())
    };
    artifact.ok_or_else(|| {
        LauncherError::Other(format!(
            "{} has no {} download",
            manifest.id,
            if server { "server" } else { "client" }
        ))
    })
}

fn native_library_env_var(os: Os) -> &'static str {
    match os {
        Os::Windows => "PATH",
        Os::Linux => "LD_LIBRARY_PATH",
        Os::Osx => "DYLD_LIBRARY_PATH",
    }
}

async fn exists(path: &Path) -> LauncherResult<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| LauncherError::io(path, e))
}
