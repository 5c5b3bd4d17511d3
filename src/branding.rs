use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rocket::fs::TempFile;
use serde::Serialize;

use crate::store::Store;
use crate::svg_sanitizer;

pub const BRANDING_DIR: &str = "website/uploads/branding";
const PUBLIC_PREFIX: &str = "/uploads/branding";

const DEFAULT_ALLOWED: &str = "jpeg,jpg,png,gif,svg,ico,webp";
const DEFAULT_MAX_KB: i64 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandAsset {
    Logo,
    Favicon,
    Hero,
}

impl BrandAsset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Favicon => "favicon",
            Self::Hero => "hero",
        }
    }

    pub fn setting_key(&self) -> &'static str {
        match self {
            Self::Logo => "brand_logo",
            Self::Favicon => "brand_favicon",
            Self::Hero => "brand_hero",
        }
    }

    fn file_stem(&self) -> String {
        format!("brand_{}", self.as_str())
    }
}

impl FromStr for BrandAsset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logo" => Ok(Self::Logo),
            "favicon" => Ok(Self::Favicon),
            "hero" => Ok(Self::Hero),
            other => Err(format!("Unknown branding type '{}'", other)),
        }
    }
}

/// Public brand identity served to the storefront.
#[derive(Debug, Serialize)]
pub struct BrandIdentity {
    pub name: String,
    pub logo: Option<String>,
    pub favicon: Option<String>,
    pub hero: Option<String>,
}

pub fn identity(store: &dyn Store) -> BrandIdentity {
    let url = |asset: BrandAsset| store.setting_get(asset.setting_key()).filter(|v| !v.is_empty());
    BrandIdentity {
        name: store.setting_get_or("brand_name", "Maison 2030"),
        logo: url(BrandAsset::Logo),
        favicon: url(BrandAsset::Favicon),
        hero: url(BrandAsset::Hero),
    }
}

// ── Upload rules ──

pub struct UploadRules {
    pub allowed: Vec<String>,
    pub max_bytes: u64,
}

impl UploadRules {
    pub fn from_store(store: &dyn Store) -> Self {
        let allowed = store
            .setting_get_or("branding_allowed_types", DEFAULT_ALLOWED)
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let max_kb = store.setting_get_i64_or("branding_max_upload_kb", DEFAULT_MAX_KB).max(1);
        UploadRules {
            allowed,
            max_bytes: max_kb as u64 * 1024,
        }
    }

    pub fn check(&self, ext: &str, len: u64) -> Result<(), String> {
        if !self.allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)) {
            return Err(format!(
                "File type '{}' is not allowed (allowed: {})",
                ext,
                self.allowed.join(", ")
            ));
        }
        if len == 0 {
            return Err("The file is empty".to_string());
        }
        if len > self.max_bytes {
            return Err(format!("The file exceeds {} KB", self.max_bytes / 1024));
        }
        Ok(())
    }
}

/// File extension for an image MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime.trim().to_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Split `data:<mime>;base64,<payload>` into its MIME type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), String> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| "Not a data URI".to_string())?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "Malformed data URI".to_string())?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| "Only base64 data URIs are supported".to_string())?;
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| format!("Invalid base64 payload: {}", e))?;
    Ok((mime.to_string(), bytes))
}

// ── Storage ──

/// Remove stored files for an asset, whatever their extension, except `keep`.
pub fn remove_files(dir: &Path, asset: BrandAsset, keep: Option<&str>) -> usize {
    let stem = asset.file_stem();
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return 0,
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if keep == Some(name.as_str()) {
            continue;
        }
        let matches = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy() == stem)
            .unwrap_or(false);
        if matches && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    removed
}

/// Hidden scratch name in the same directory, so the final rename stays atomic.
fn staging_path(dir: &Path, asset: BrandAsset, ext: &str) -> PathBuf {
    dir.join(format!(".{}.{}.{}.part", asset.file_stem(), uuid::Uuid::new_v4(), ext))
}

/// Move a fully written staging file into place, then retire the other
/// files of that asset and point the setting at the new one.
fn promote(store: &dyn Store, dir: &Path, asset: BrandAsset, staged: &Path, ext: &str) -> Result<String, String> {
    let filename = format!("{}.{}", asset.file_stem(), ext);
    if let Err(e) = fs::rename(staged, dir.join(&filename)) {
        let _ = fs::remove_file(staged);
        return Err(format!("Could not save {}: {}", filename, e));
    }
    remove_files(dir, asset, Some(&filename));

    let url = public_url(&filename);
    store.setting_set(asset.setting_key(), &url)?;
    Ok(url)
}

fn sanitize_if_svg(ext: &str, bytes: Vec<u8>) -> Result<Vec<u8>, String> {
    if ext == "svg" {
        svg_sanitizer::sanitize_svg(&bytes)
    } else {
        Ok(bytes)
    }
}

fn public_url(filename: &str) -> String {
    // Same filename on every replace, so a version query busts caches
    format!(
        "{}/{}?v={}",
        PUBLIC_PREFIX,
        filename,
        chrono::Utc::now().timestamp()
    )
}

/// Write `bytes` as `brand_<type>.<ext>`, replacing older files of that type,
/// and record the public URL in settings. On failure the current asset stays.
pub fn store_bytes(
    store: &dyn Store,
    dir: &Path,
    asset: BrandAsset,
    ext: &str,
    bytes: &[u8],
) -> Result<String, String> {
    let ext = ext.to_lowercase();
    UploadRules::from_store(store).check(&ext, bytes.len() as u64)?;
    let bytes = sanitize_if_svg(&ext, bytes.to_vec())?;

    fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let staged = staging_path(dir, asset, &ext);
    if let Err(e) = fs::write(&staged, &bytes) {
        let _ = fs::remove_file(&staged);
        return Err(e.to_string());
    }
    let url = promote(store, dir, asset, &staged, &ext)?;
    log::info!("Branding {} updated ({} bytes)", asset.as_str(), bytes.len());
    Ok(url)
}

pub fn store_data_uri(store: &dyn Store, dir: &Path, asset: BrandAsset, uri: &str) -> Result<String, String> {
    let (mime, bytes) = decode_data_uri(uri)?;
    let ext = extension_for_mime(&mime).ok_or_else(|| format!("Unsupported image type '{}'", mime))?;
    store_bytes(store, dir, asset, ext, &bytes)
}

/// Extension of an uploaded file: content type first, then the client filename.
fn upload_extension(file: &TempFile<'_>) -> Option<String> {
    file.content_type()
        .and_then(|ct| ct.extension())
        .map(|e| e.to_string().to_lowercase())
        .or_else(|| {
            file.raw_name().and_then(|rn| {
                let s = rn.dangerous_unsafe_unsanitized_raw().as_str().to_string();
                s.rsplit_once('.').map(|(_, e)| e.to_lowercase())
            })
        })
}

pub async fn store_upload(
    store: &dyn Store,
    dir: &Path,
    asset: BrandAsset,
    file: &mut TempFile<'_>,
) -> Result<String, String> {
    let ext = upload_extension(file).ok_or_else(|| "Could not determine the file type".to_string())?;
    UploadRules::from_store(store).check(&ext, file.len())?;

    fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let staged = staging_path(dir, asset, &ext);
    if let Err(e) = file.move_copy_to(&staged).await {
        let _ = fs::remove_file(&staged);
        return Err(e.to_string());
    }
    if ext == "svg" {
        let cleaned = fs::read(&staged)
            .map_err(|e| e.to_string())
            .and_then(|raw| sanitize_if_svg(&ext, raw))
            .and_then(|clean| fs::write(&staged, clean).map_err(|e| e.to_string()));
        if let Err(e) = cleaned {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }
    }

    let url = promote(store, dir, asset, &staged, &ext)?;
    log::info!("Branding {} uploaded as .{}", asset.as_str(), ext);
    Ok(url)
}

/// Delete an asset's files and fall back to the default look.
pub fn clear(store: &dyn Store, dir: &Path, asset: BrandAsset) -> Result<usize, String> {
    let removed = remove_files(dir, asset, None);
    store.setting_set(asset.setting_key(), "")?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> UploadRules {
        UploadRules {
            allowed: DEFAULT_ALLOWED.split(',').map(String::from).collect(),
            max_bytes: 2048 * 1024,
        }
    }

    #[test]
    fn asset_names_round_trip_through_settings_keys() {
        let logo: BrandAsset = "Logo".parse().unwrap();
        assert_eq!(logo.setting_key(), "brand_logo");
        assert_eq!("hero".parse::<BrandAsset>().unwrap(), BrandAsset::Hero);
        assert!("banner".parse::<BrandAsset>().is_err());
    }

    #[test]
    fn upload_rules_enforce_type_and_size() {
        let r = rules();
        assert!(r.check("png", 10).is_ok());
        assert!(r.check("ICO", 10).is_ok());
        assert!(r.check("exe", 10).is_err());
        assert!(r.check("png", 0).is_err());
        assert!(r.check("png", 2048 * 1024).is_ok());
        assert!(r.check("png", 2048 * 1024 + 1).is_err());
    }

    #[test]
    fn decodes_base64_data_uri() {
        let (mime, bytes) = decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
        assert_eq!(extension_for_mime(&mime), Some("png"));
    }

    #[test]
    fn rejects_malformed_data_uris() {
        assert!(decode_data_uri("https://example.com/logo.png").is_err());
        assert!(decode_data_uri("data:image/png,plain").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn remove_files_matches_only_the_asset() {
        let dir = std::env::temp_dir().join(format!("maison_brand_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("brand_logo.png"), b"a").unwrap();
        fs::write(dir.join("brand_logo.svg"), b"b").unwrap();
        fs::write(dir.join("brand_favicon.ico"), b"c").unwrap();

        assert_eq!(remove_files(&dir, BrandAsset::Logo, None), 2);
        assert!(dir.join("brand_favicon.ico").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
