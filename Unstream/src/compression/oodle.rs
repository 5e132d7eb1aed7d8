//! Runtime binding to the vendor Oodle library
//!
//! The library ships with the game (`oo2core_*.dll` / `liboo2core*.so`), so
//! it is loaded from disk instead of linked.
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use libloading::Library;

use super::Decompressor;
use crate::error::{Error, Result};

type OodleLzDecompress = unsafe extern "C" fn(
    comp_buf: *const u8,
    comp_len: isize,
    raw_buf: *mut u8,
    raw_len: isize,
    fuzz_safe: i32,
    check_crc: i32,
    verbosity: i32,
    dec_buf_base: *mut u8,
    dec_buf_size: isize,
    callback: *mut c_void,
    callback_user_data: *mut c_void,
    decoder_memory: *mut c_void,
    decoder_memory_size: isize,
    thread_phase: i32,
) -> isize;

/// File names tried by [`OodleLibrary::find_in`].
pub const LIBRARY_NAMES: &[&str] = &[
    "oo2core_9_win64.dll",
    "oo2core_8_win64.dll",
    "liboo2corelinux64.so.9",
    "liboo2corelinux64.so",
    "liboo2coremac64.dylib",
];

/// A loaded Oodle library exposing `OodleLZ_Decompress`.
pub struct OodleLibrary {
    decompress: OodleLzDecompress,
    path: PathBuf,
    // Keeps the function pointer valid.
    _library: Library,
}

impl std::fmt::Debug for OodleLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OodleLibrary").field("path", &self.path).finish()
    }
}

impl OodleLibrary {
    /// Load the library at `path`.
    ///
    /// # Errors
    /// Returns [`Error::CodecUnavailable`] if the library or its
    /// `OodleLZ_Decompress` export cannot be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |e: libloading::Error| Error::CodecUnavailable {
            message: format!("{}: {e}", path.display()),
        };

        // SAFETY: loading runs the library's initialisers; the Oodle core
        // library has none with preconditions on the caller.
        let library = unsafe { Library::new(path) }.map_err(unavailable)?;
        // SAFETY: the signature matches the documented OodleLZ_Decompress export.
        let decompress = *unsafe { library.get::<OodleLzDecompress>(b"OodleLZ_Decompress\0") }
            .map_err(unavailable)?;

        tracing::info!("Loaded Oodle from {}", path.display());
        Ok(Self {
            decompress,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Look for a known library file name inside `dir`.
    ///
    /// # Errors
    /// Returns [`Error::CodecUnavailable`] if none is present or loading fails.
    pub fn find_in<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        LIBRARY_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::CodecUnavailable {
                message: format!("no Oodle library found in {}", dir.display()),
            })
            .and_then(Self::load)
    }

    /// Path the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Decompressor for OodleLibrary {
    fn name(&self) -> &'static str {
        "oodle"
    }

    fn decompress_into(&self, compressed: &[u8], output: &mut [u8], expected: usize) -> Result<usize> {
        if expected > output.len() {
            return Err(Error::InvalidFormat(format!(
                "output buffer of {} bytes is smaller than {expected}",
                output.len()
            )));
        }

        // SAFETY: both buffers are valid for the lengths passed, and no
        // callback or decoder memory is supplied.
        let produced = unsafe {
            (self.decompress)(
                compressed.as_ptr(),
                compressed.len() as isize,
                output.as_mut_ptr(),
                expected as isize,
                1,
                0,
                0,
                std::ptr::null_mut(),
                0,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                0,
                3,
            )
        };

        Ok(usize::try_from(produced).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = OodleLibrary::find_in(dir.path()).unwrap_err();
        assert!(matches!(err, Error::CodecUnavailable { .. }));
    }

    #[test]
    fn test_invalid_library_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liboo2corelinux64.so");
        std::fs::write(&path, b"not a shared object").unwrap();

        match OodleLibrary::load(&path) {
            Err(Error::CodecUnavailable { message }) => {
                assert!(message.contains("liboo2corelinux64.so"));
            }
            Err(other) => panic!("expected CodecUnavailable, got {other}"),
            Ok(_) => panic!("garbage file loaded as a library"),
        }
    }
}
