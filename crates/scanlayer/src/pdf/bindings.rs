use once_cell::sync::Lazy;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use std::path::PathBuf;

/// Environment variable pointing at a directory that contains the Pdfium library.
pub const PDFIUM_LIB_DIR_ENV: &str = "PDFIUM_LIB_DIR";

/// Outcome of the first binding attempt.
///
/// Bindings are not `Clone`, so the state remembers where the library was found
/// (or why it was not) and fresh bindings are created from it on every call.
enum InitializationState {
    Uninitialized,
    Initialized { lib_dir: Option<PathBuf> },
    Failed(String),
}

static PDFIUM_STATE: Lazy<Mutex<InitializationState>> = Lazy::new(|| Mutex::new(InitializationState::Uninitialized));

fn bind_at(lib_dir: Option<&PathBuf>) -> Result<Box<dyn PdfiumLibraryBindings>, String> {
    match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .map_err(|e| format!("Failed to bind Pdfium in {}: {}", dir.display(), e)),
        None => Pdfium::bind_to_system_library().map_err(|e| format!("Failed to bind system Pdfium: {}", e)),
    }
}

fn bind_pdfium_impl() -> Result<(Option<PathBuf>, Box<dyn PdfiumLibraryBindings>), String> {
    if let Some(dir) = std::env::var_os(PDFIUM_LIB_DIR_ENV).map(PathBuf::from) {
        match bind_at(Some(&dir)) {
            Ok(bindings) => return Ok((Some(dir), bindings)),
            Err(err) => tracing::warn!("{}; falling back to the system library", err),
        }
    }
    bind_at(None).map(|bindings| (None, bindings))
}

/// Create Pdfium bindings, initializing lazily on first use.
///
/// A failed first attempt is cached so later pages fail fast with the same message.
pub(crate) fn bind_pdfium() -> Result<Box<dyn PdfiumLibraryBindings>, String> {
    let mut state = PDFIUM_STATE.lock();

    match &*state {
        InitializationState::Uninitialized => match bind_pdfium_impl() {
            Ok((lib_dir, bindings)) => {
                tracing::debug!("Pdfium initialized (library dir: {:?})", lib_dir);
                *state = InitializationState::Initialized { lib_dir };
                Ok(bindings)
            }
            Err(err) => {
                *state = InitializationState::Failed(err.clone());
                Err(format!("Pdfium initialization failed: {}", err))
            }
        },
        InitializationState::Initialized { lib_dir } => bind_at(lib_dir.as_ref()),
        InitializationState::Failed(err) => Err(format!("Pdfium initialization previously failed: {}", err)),
    }
}
