// ─── Launch Task ───
// Starts the located installer as an independent process and checks once,
// after a grace period, whether it is still running.

use std::path::Path;
use std::time::Duration;

use sysinfo::{Pid, ProcessStatus, System};
use tracing::{debug, info, instrument, warn};

use crate::core::error::{BootstrapError, BootstrapResult};

/// What the pipeline knows about the started installer. The process itself
/// is never waited on or owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchHandle {
    pub process_id: u32,
    pub process_name: String,
    pub is_alive_after_grace_period: bool,
}

/// Launch `executable_path` without elevation, working directory set to its
/// parent, no arguments, inherited environment.
///
/// A process that is already gone after `grace_period` is logged as a
/// warning only; the launch itself succeeded.
#[instrument]
pub async fn launch(executable_path: &Path, grace_period: Duration) -> BootstrapResult<LaunchHandle> {
    let working_dir = executable_path.parent().ok_or_else(|| {
        BootstrapError::Launch(format!(
            "installer path {:?} has no parent directory",
            executable_path
        ))
    })?;

    info!("Launching installer {:?}", executable_path);
    debug!("Working directory: {:?}", working_dir);

    let process_id = spawn_detached(executable_path, working_dir)?;
    info!("Installer started (PID {process_id})");

    tokio::time::sleep(grace_period).await;

    let fallback_name = executable_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let handle = match running_process_name(process_id) {
        Some(name) => {
            info!("Installer still running after {:?} ({name})", grace_period);
            LaunchHandle {
                process_id,
                process_name: name,
                is_alive_after_grace_period: true,
            }
        }
        None => {
            warn!(
                "Installer process {process_id} exited within {:?} (possibly quick installation)",
                grace_period
            );
            LaunchHandle {
                process_id,
                process_name: fallback_name,
                is_alive_after_grace_period: false,
            }
        }
    };

    Ok(handle)
}

/// Name of `pid` if it is alive. Zombies count as exited.
fn running_process_name(pid: u32) -> Option<String> {
    let system = System::new_all();
    let process = system.process(Pid::from_u32(pid))?;
    if matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead) {
        return None;
    }
    Some(process.name().to_string_lossy().to_string())
}

fn launch_failed(detail: impl std::fmt::Display) -> BootstrapError {
    BootstrapError::Launch(format!("failed to launch installer: {detail}"))
}

#[cfg(not(target_os = "windows"))]
fn spawn_detached(executable_path: &Path, working_dir: &Path) -> BootstrapResult<u32> {
    use std::process::{Command, Stdio};

    ensure_executable(executable_path)?;

    let mut cmd = Command::new(executable_path);
    cmd.current_dir(working_dir);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    configure_platform_spawn(&mut cmd);
    debug!("Command: {:?}", cmd);

    // The child is dropped without waiting; it keeps running on its own.
    let child = cmd.spawn().map_err(launch_failed)?;
    Ok(child.id())
}

#[cfg(not(target_os = "windows"))]
fn configure_platform_spawn(cmd: &mut std::process::Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Detach from the bootstrapper's process group.
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = cmd;
}

/// Archives built on Windows carry no execute bit.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> BootstrapResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata =
        std::fs::metadata(path).map_err(|e| launch_failed(format!("{}: {e}", path.display())))?;
    let mut perms = metadata.permissions();
    if perms.mode() & 0o100 == 0 {
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)
            .map_err(|e| launch_failed(format!("cannot mark {} executable: {e}", path.display())))?;
        debug!("Marked {:?} executable", path);
    }
    Ok(())
}

#[cfg(all(not(unix), not(target_os = "windows")))]
fn ensure_executable(_path: &Path) -> BootstrapResult<()> {
    Ok(())
}

/// Shell-based creation through `ShellExecuteExW` with the plain `open`
/// verb, so the executable gets normal Explorer semantics and no `runas`.
#[cfg(target_os = "windows")]
fn spawn_detached(executable_path: &Path, working_dir: &Path) -> BootstrapResult<u32> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;

    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::GetProcessId;
    use windows::Win32::UI::Shell::{ShellExecuteExW, SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW};
    use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    fn wide(value: &OsStr) -> Vec<u16> {
        value.encode_wide().chain(std::iter::once(0)).collect()
    }

    let file = wide(executable_path.as_os_str());
    let directory = wide(working_dir.as_os_str());

    let mut info = SHELLEXECUTEINFOW {
        cbSize: std::mem::size_of::<SHELLEXECUTEINFOW>() as u32,
        fMask: SEE_MASK_NOCLOSEPROCESS,
        lpVerb: w!("open"),
        lpFile: PCWSTR(file.as_ptr()),
        lpDirectory: PCWSTR(directory.as_ptr()),
        nShow: SW_SHOWNORMAL.0,
        ..Default::default()
    };

    // SAFETY: `info` and the wide strings it points to outlive the call.
    unsafe { ShellExecuteExW(&mut info) }.map_err(launch_failed)?;

    if info.hProcess.is_invalid() {
        return Err(launch_failed("no process handle returned"));
    }

    // SAFETY: `hProcess` is a live handle owned by us until closed here.
    let process_id = unsafe { GetProcessId(info.hProcess) };
    unsafe {
        let _ = CloseHandle(info.hProcess);
    }

    if process_id == 0 {
        return Err(launch_failed("process id unavailable"));
    }
    Ok(process_id)
}
