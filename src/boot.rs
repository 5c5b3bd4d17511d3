use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

/// Required directories that will be created if missing
const REQUIRED_DIRS: &[&str] = &[
    "website",
    "website/db",
    "website/uploads",
    "website/uploads/branding",
    "website/templates",
    "website/templates/admin",
];

/// Templates the admin needs to render invoices
const CRITICAL_TEMPLATES: &[&str] = &["website/templates/admin/invoice.html.tera"];

/// Run all boot checks. Call this before Rocket launches.
/// Creates missing directories, warns about missing files, and
/// aborts if the database directory is unusable.
pub fn run() {
    info!("Maison boot check starting...");

    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Directories ─────────────────────────────────
    for dir in REQUIRED_DIRS {
        let path = Path::new(dir);
        if !path.exists() {
            match fs::create_dir_all(path) {
                Ok(_) => info!("  Created directory: {}", dir),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir, e);
                    errors += 1;
                }
            }
        }
    }

    // ── 2. Templates ───────────────────────────────────
    for file in CRITICAL_TEMPLATES {
        if !Path::new(file).exists() {
            warn!("  Missing template: {} (invoices will 500)", file);
            warnings += 1;
        }
    }

    // ── 3. Database directory writable ──────────────────
    if !dir_is_writable(Path::new("website/db")) {
        error!("  Database directory not writable");
        errors += 1;
    }

    // ── 4. Branding directory writable ──────────────────
    if !dir_is_writable(Path::new(crate::branding::BRANDING_DIR)) {
        warn!("  Branding directory not writable (logo and hero uploads will fail)");
        warnings += 1;
    }

    // ── 5. Gemini key ───────────────────────────────────
    if std::env::var("GEMINI_API_KEY").map(|k| k.trim().is_empty()).unwrap_or(true) {
        info!("  GEMINI_API_KEY not set; falling back to the ai_gemini_api_key setting");
    }

    // ── 6. Rocket.toml exists ───────────────────────────
    if !Path::new("Rocket.toml").exists() {
        warn!("  Rocket.toml not found, using default config");
        warnings += 1;
    }

    // ── Summary ─────────────────────────────────────────
    if errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("Boot check passed. All systems go.");
    }
}

fn dir_is_writable(dir: &Path) -> bool {
    if !dir.exists() {
        return false;
    }
    let test_file = dir.join(".write_test");
    match fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = fs::remove_file(&test_file);
            true
        }
        Err(e) => {
            warn!("  {} is not writable: {}", dir.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dir_is_reported_unwritable() {
        let dir = std::env::temp_dir().join(format!("maison-boot-{}", uuid::Uuid::new_v4()));
        assert!(!dir_is_writable(&dir));
        fs::create_dir_all(&dir).unwrap();
        assert!(dir_is_writable(&dir));
        assert!(!dir.join(".write_test").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
