//! Exit-address resolution for the stage that follows bring-up.
//!
//! The jump itself is the caller's; this crate only decides where it
//! goes. By convention the first 256 bytes of the flash window hold this
//! stage's own image, so the default entry point sits just past it.

/// Base of the mapped flash window.
pub const FLASH_WINDOW_BASE: u32 = 0x1000_0000;
/// Default entry offset within the window when the caller supplies none.
pub const DEFAULT_EXIT_OFFSET: u32 = 0x100;

/// Resolves the next stage's entry address. Zero means "use the default
/// window entry point"; any other value is returned verbatim.
#[inline]
pub const fn resolve_exit(requested: u32) -> u32 {
    if requested == 0 {
        FLASH_WINDOW_BASE + DEFAULT_EXIT_OFFSET
    } else {
        requested
    }
}
