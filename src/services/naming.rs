//! Download file naming

use crate::config::DownloadConfig;

/// Base name used when the upload name yields nothing usable
const FALLBACK_BASE: &str = "image";

/// Derives download names from uploaded file names
pub struct DownloadNamer;

impl DownloadNamer {
    /// `prefix + base + suffix + ".png"`
    ///
    /// ```rust
    /// use monk_bgremove::{config::DownloadConfig, services::DownloadNamer};
    ///
    /// let name = DownloadNamer::file_name("holiday.photo.jpg", &DownloadConfig::default());
    /// assert_eq!(name, "monk_removed_bg_holiday.png");
    /// ```
    #[must_use]
    pub fn file_name(upload_name: &str, config: &DownloadConfig) -> String {
        format!(
            "{}{}{}.png",
            config.prefix,
            Self::base_name(upload_name),
            config.suffix
        )
    }

    /// File name without directories, cut at its first `.`, with characters
    /// unsafe in a `Content-Disposition` header replaced by `_`
    #[must_use]
    pub fn base_name(upload_name: &str) -> String {
        let file = upload_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let stem = file.split('.').next().unwrap_or_default().trim();

        if stem.is_empty() {
            return FALLBACK_BASE.to_string();
        }

        stem.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}
