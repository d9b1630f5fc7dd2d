//! Extraction option profiles per platform and tier

use crate::core::types::{Platform, Tier};
use std::path::Path;

/// Fixed mobile-client fingerprint sent to the TikTok extractor.
pub const TIKTOK_DEVICE_FINGERPRINT: &[(&str, &str)] = &[
    ("api_hostname", "api16-normal-c-useast1a.tiktokv.com"),
    ("app_version", "20.2.1"),
    ("device_id", "7168534261740988934"),
    ("channel", "googleplay"),
    ("mcc_mnc", "310260"),
    ("os_version", "10"),
    ("version_code", "200201"),
    ("device_type", "Pixel 4"),
    ("language", "en"),
    ("resolution", "1080*1920"),
    ("openudid", "a1b2c3d4e5f6g7h8"),
    ("sys_region", "US"),
    ("os_api", "29"),
    ("timezone_name", "America/New_York"),
    ("residence", "US"),
    ("app_language", "en"),
    ("ac2_wifi", "0"),
    ("dpi", "420"),
    ("carrier_region", "US"),
    ("ac", "wifi"),
    ("app_name", "trill"),
    ("device_platform", "android"),
    ("build_number", "10.2.1"),
    ("version_name", "10.2.1"),
    ("timezone_offset", "-14400"),
    ("is_my_cn", "0"),
    ("aid", "1340"),
    ("ssmix", "a"),
    ("as", "a1qwert123"),
    ("cp", "androide1"),
    ("mas", "0123456789abcdef"),
];

const INSTAGRAM_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Options bundle handed to the extraction backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsProfile {
    pub format: String,
    /// Size ceiling in megabytes, `None` for unrestricted.
    pub max_filesize_mb: Option<u64>,
    pub no_playlist: bool,
    pub quiet: bool,
    pub merge_output_format: Option<&'static str>,
    /// Extractor arguments impersonating a fixed client, keyed by extractor name.
    pub extractor_args: Option<(&'static str, &'static [(&'static str, &'static str)])>,
}

impl OptionsProfile {
    /// Profile for a first attempt on `platform` with the given size ceiling.
    pub fn for_platform(platform: Platform, ceiling_mb: u64) -> Self {
        match platform {
            Platform::TikTok => Self {
                format: format!("best[filesize<{}M]", ceiling_mb),
                max_filesize_mb: Some(ceiling_mb),
                no_playlist: true,
                quiet: true,
                merge_output_format: None,
                extractor_args: Some(("tiktok", TIKTOK_DEVICE_FINGERPRINT)),
            },
            Platform::Instagram => Self {
                format: INSTAGRAM_FORMAT.to_string(),
                max_filesize_mb: Some(ceiling_mb),
                no_playlist: true,
                quiet: true,
                merge_output_format: Some("mp4"),
                extractor_args: None,
            },
        }
    }

    /// Reduced profile used for the single format fallback: best available stream,
    /// no ceiling, no fingerprint.
    pub fn generic() -> Self {
        Self {
            format: "best".to_string(),
            max_filesize_mb: None,
            no_playlist: true,
            quiet: true,
            merge_output_format: None,
            extractor_args: None,
        }
    }

    /// yt-dlp command-line arguments for this profile, without the URL.
    pub fn to_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            "--format".to_string(),
            self.format.clone(),
            "--force-overwrites".to_string(),
            "--no-part".to_string(),
            "--socket-timeout".to_string(),
            "30".to_string(),
        ];

        if self.no_playlist {
            args.push("--no-playlist".to_string());
        }
        if self.quiet {
            args.push("--quiet".to_string());
            args.push("--no-warnings".to_string());
        }
        if let Some(mb) = self.max_filesize_mb {
            args.push("--max-filesize".to_string());
            args.push(format!("{}M", mb));
        }
        if let Some(container) = self.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }
        if let Some((extractor, pairs)) = self.extractor_args {
            let joined = pairs
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(";");
            args.push("--extractor-args".to_string());
            args.push(format!("{}:{}", extractor, joined));
        }

        args
    }
}

/// Size ceiling policy by tier, in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCeilings {
    pub free_mb: u64,
    pub premium_mb: u64,
}

impl SizeCeilings {
    pub fn for_tier(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Free => self.free_mb,
            Tier::Premium => self.premium_mb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_tiktok_profile_carries_fingerprint_and_ceiling() {
        let profile = OptionsProfile::for_platform(Platform::TikTok, 15);
        let args = profile.to_args(Path::new("downloads/1_2_3.mp4"));

        assert_eq!(arg_after(&args, "--format"), Some("best[filesize<15M]"));
        assert_eq!(arg_after(&args, "--max-filesize"), Some("15M"));
        let extractor = arg_after(&args, "--extractor-args").unwrap();
        assert!(extractor.starts_with("tiktok:api_hostname=api16-normal-c-useast1a.tiktokv.com;"));
        assert!(extractor.contains("device_type=Pixel 4"));
        assert!(extractor.ends_with("mas=0123456789abcdef"));
    }

    #[test]
    fn test_fingerprint_keys_are_unique() {
        let mut keys: Vec<&str> = TIKTOK_DEVICE_FINGERPRINT.iter().map(|(k, _)| *k).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_instagram_profile_has_no_fingerprint() {
        let profile = OptionsProfile::for_platform(Platform::Instagram, 100);
        let args = profile.to_args(Path::new("out.mp4"));

        assert!(!args.iter().any(|a| a == "--extractor-args"));
        assert_eq!(arg_after(&args, "--max-filesize"), Some("100M"));
        assert_eq!(arg_after(&args, "--merge-output-format"), Some("mp4"));
    }

    #[test]
    fn test_generic_profile_is_unrestricted() {
        let args = OptionsProfile::generic().to_args(Path::new("out.mp4"));

        assert_eq!(arg_after(&args, "--format"), Some("best"));
        assert!(!args.iter().any(|a| a == "--max-filesize"));
        assert!(!args.iter().any(|a| a == "--extractor-args"));
        assert!(args.iter().any(|a| a == "--no-playlist"));
    }

    #[test]
    fn test_ceilings_by_tier() {
        let ceilings = SizeCeilings {
            free_mb: 15,
            premium_mb: 100,
        };
        assert_eq!(ceilings.for_tier(Tier::Free), 15);
        assert_eq!(ceilings.for_tier(Tier::Premium), 100);
    }
}
