//! # Startup
//!
//! Host-facing entry point: runs the bundled patch once while the host is loading and reports whether loading should continue

use std::env;
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::definition::PatchDefinition;
use crate::engine::PatchEngine;
use crate::module::ModuleResolver;
use crate::presets;

/// Environment variable read by [`StartupConfig::from_env`]
pub const WAIT_FOR_DEBUGGER_VAR: &str = "SCANPATCH_WAIT_FOR_DEBUGGER";

/// How often [`wait_for_debugger`] checks for a debugger
const DEBUGGER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settings read once when the host loads us
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StartupConfig {
    /// Block until a debugger attaches before doing anything
    pub wait_for_debugger: bool,
}

impl StartupConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let wait_for_debugger = lookup(WAIT_FOR_DEBUGGER_VAR)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        Self { wait_for_debugger }
    }
}

/// Interprets an environment flag. Unrecognized values are off.
fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    ["1", "true", "yes", "on"]
        .iter()
        .any(|accepted| value.eq_ignore_ascii_case(accepted))
}

/// Whether a debugger is attached to this process
#[cfg(windows)]
pub fn debugger_present() -> bool {
    use windows::Win32::System::Diagnostics::Debug::IsDebuggerPresent;

    unsafe { IsDebuggerPresent() }.as_bool()
}

/// Whether a debugger is attached to this process
#[cfg(not(windows))]
pub fn debugger_present() -> bool {
    std::fs::read_to_string("/proc/self/status")
        .map(|status| tracer_attached(&status))
        .unwrap_or(false)
}

/// Whether a `/proc/<pid>/status` listing names a tracer
#[cfg(not(windows))]
fn tracer_attached(status: &str) -> bool {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|pid| pid.trim().parse::<u32>().ok())
        .map_or(false, |pid| pid != 0)
}

/// Blocks until a debugger is attached
pub fn wait_for_debugger() {
    info!("waiting for a debugger to attach");
    while !debugger_present() {
        thread::sleep(DEBUGGER_POLL_INTERVAL);
    }
}

/// Applies `definition` to `module`, logging the outcome. Returns whether the host should keep loading us.
///
/// Failures are logged and reported, never raised; the host carries on without the patch.
///
/// # Safety
///
/// See [`PatchEngine::apply`]
pub unsafe fn patch_module<R: ModuleResolver>(
    resolver: R,
    module: &str,
    definition: &PatchDefinition<'_>,
) -> bool {
    match PatchEngine::new(resolver).apply(module, definition) {
        Ok(applied) => {
            info!(
                location = format_args!("{:#x}", applied.patched.location()),
                section = %applied.section,
                "patch applied"
            );
            true
        }
        Err(e) => {
            error!(code = e.code(), "{e}");
            false
        }
    }
}

/// Runs the load sequence: optionally wait for a debugger, announce ourselves, and patch the host
///
/// # Safety
///
/// See [`PatchEngine::apply`]. Must run on the thread loading the host, before the patched code can execute.
pub unsafe fn load<R: ModuleResolver>(config: &StartupConfig, resolver: R) -> bool {
    if config.wait_for_debugger {
        wait_for_debugger();
    }

    let name = env!("CARGO_PKG_NAME");
    info!("{} v{}", name, env!("CARGO_PKG_VERSION"));

    if !patch_module(resolver, presets::HOST_MODULE, &presets::SET_COOPERATIVE_LEVEL) {
        return false;
    }

    info!("{} loaded.", name);
    true
}

/// [`load`] against the real module table, with configuration from the environment
///
/// # Safety
///
/// See [`load`]
#[cfg(windows)]
pub unsafe fn load_host() -> bool {
    load(&StartupConfig::from_env(), crate::module::LoadedModules::new())
}

#[cfg(test)]
mod tests {
    use super::{load, parse_flag, StartupConfig, WAIT_FOR_DEBUGGER_VAR};
    use crate::module::FixedModules;

    #[test]
    /// Only clear "on" values enable a flag
    fn test_parse_flag() {
        for value in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_flag(value), "{value} should be on");
        }
        for value in ["", "0", "false", "no", "off", "2", "enabled"] {
            assert!(!parse_flag(value), "{value} should be off");
        }
    }

    #[test]
    /// The flag is off unless the variable says otherwise
    fn test_config_lookup() {
        assert_eq!(StartupConfig::from_lookup(|_| None), StartupConfig::default());

        let config = StartupConfig::from_lookup(|name| {
            (name == WAIT_FOR_DEBUGGER_VAR).then(|| "true".to_string())
        });
        assert!(config.wait_for_debugger);
    }

    #[cfg(not(windows))]
    #[test]
    /// `TracerPid` is parsed out of the status listing
    fn test_tracer_attached() {
        use super::tracer_attached;

        assert!(!tracer_attached("Name:\tcat\nTracerPid:\t0\nUid:\t0\n"));
        assert!(tracer_attached("Name:\tcat\nTracerPid:\t4242\n"));
        assert!(!tracer_attached("Name:\tcat\n"));
    }

    #[test]
    /// Loading without the host module reports failure instead of panicking
    fn test_load_without_host() {
        let loaded = unsafe { load(&StartupConfig::default(), FixedModules::new()) };

        assert!(!loaded);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    /// Loading patches the host's SetCooperativeLevel call
    fn test_load_patches_host() {
        use crate::image::synthetic::SyntheticImage;
        use crate::presets::{
            HOST_MODULE, LOAD_HWND_OFFSET, SET_COOPERATIVE_LEVEL_SIGNATURE, ZERO_RDX,
        };

        let mut image = SyntheticImage::builder()
            .section(".text", 0x1000, 0x3000, 0x6000_0020)
            .entry_point(0x1010)
            .build();
        image.write(0x1234, &SET_COOPERATIVE_LEVEL_SIGNATURE);
        let resolver = unsafe { FixedModules::new().with_module(HOST_MODULE, image.base()) };

        let loaded = unsafe { load(&StartupConfig::default(), resolver) };

        assert!(loaded);
        let site = 0x1234 + LOAD_HWND_OFFSET;
        assert_eq!(&image.bytes()[site..site + ZERO_RDX.len()], &ZERO_RDX);
    }
}
