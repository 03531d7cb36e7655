//! # Presets
//!
//! Compiled-in patch definitions for known hosts

use crate::definition::PatchDefinition;

/// Main executable of the host process
pub const HOST_MODULE: &str = "SkyrimSE.exe";

/// Code that asks DirectInput for exclusive access to the keyboard:
///
/// ```text
/// 48 8B 4F 70          mov  rcx, qword ptr [rdi+70h]  ; IDirectInputDevice8*
/// 41 B8 15 00 00 00    mov  r8d, 15h                  ; dwFlags
/// 48 8B D0             mov  rdx, rax                  ; hWnd
/// FF 53 68             call qword ptr [rbx+68h]       ; IDirectInputDevice8::SetCooperativeLevel
/// ```
pub const SET_COOPERATIVE_LEVEL_SIGNATURE: [u8; 16] = [
    0x48, 0x8b, 0x4f, 0x70, 0x41, 0xb8, 0x15, 0x00, 0x00, 0x00, 0x48, 0x8b, 0xd0, 0xff, 0x53, 0x68,
];

/// `xor rdx, rdx`, the same length as the `mov rdx, rax` it replaces
pub const ZERO_RDX: [u8; 3] = [0x48, 0x31, 0xd2];

/// Offset of `mov rdx, rax` inside [`SET_COOPERATIVE_LEVEL_SIGNATURE`]
pub const LOAD_HWND_OFFSET: usize = 10;

/// Passes a null window to `SetCooperativeLevel`, so the cooperative level is never applied to the game window
pub const SET_COOPERATIVE_LEVEL: PatchDefinition<'static> =
    match PatchDefinition::new(&SET_COOPERATIVE_LEVEL_SIGNATURE, LOAD_HWND_OFFSET, &ZERO_RDX) {
        Ok(definition) => definition,
        Err(_) => panic!("SET_COOPERATIVE_LEVEL replacement doesn't fit its signature"),
    };
