// ─── minepack Core ───
// Package resolution, downloads and game launching for modpack projects.
//
// Architecture:
//   core/
//     manifest/   — minepack.toml + minepack-lock.toml models
//     registry/   — Package metadata provider + release selection
//     resolver/   — Concurrent, cycle-safe dependency resolution
//     downloader/ — Bounded-parallel downloads with SHA-1 validation
//     instance/   — Project directory, loader pins, server files
//     install.rs  — Resolve → download → lockfile → manifest
//     version/    — Version list, launch descriptors, inheritance
//     loaders/    — Fabric meta (loader pins, launch profiles)
//     maven/      — Artifact coordinates
//     assets/     — Asset index + object downloads
//     java/       — Managed java runtimes
//     launch/     — Classpath, natives, arguments, command assembly
//     process/    — Game process supervision + crash test
//     auth/       — Microsoft login, credential refresh + storage
//     platform.rs — Host OS differences
//     state/      — Data directory layout, settings, shared client

pub mod assets;
pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod instance;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod manifest;
pub mod maven;
pub mod platform;
pub mod process;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod version;
