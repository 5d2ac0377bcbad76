// ─── MinecraftMod Bootstrapper Core ───
// One stage per module, composed by `crate::pipeline`.
//
// Architecture:
//   core/
//     workspace/  — Fixed paths under app data, stale artifact cleanup, disk checks
//     downloader/ — Streaming archive download with milestone progress
//     extract/    — Zip reader with system archiver fallback
//     locate/     — Installer search heuristics
//     launch/     — Detached process start + liveness check
//     report/     — Success / failure summary
//     state/      — Settings file
//     http        — Shared reqwest client
//     error       — Central error type

pub mod downloader;
pub mod error;
pub mod extract;
pub mod http;
pub mod launch;
pub mod locate;
pub mod report;
pub mod state;
pub mod workspace;
