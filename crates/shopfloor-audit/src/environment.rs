//! Client environment facts attached to audit entries.
//!
//! Only trails running in a client context attach these; server-side
//! trails leave them out.

use serde::{Deserialize, Serialize};

/// Display dimensions of the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenGeometry {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Facts about the environment the operation was performed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentFacts {
    /// Agent string identifying the client
    pub user_agent: String,

    /// IANA timezone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Locale tag (e.g. `en-US`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Display geometry, when the client has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenGeometry>,

    /// Machine name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Normalize a POSIX locale (`en_US.UTF-8`) to a tag (`en-US`).
fn locale_tag(raw: &str) -> Option<String> {
    let base = raw.split(['.', '@']).next().unwrap_or_default();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

impl EnvironmentFacts {
    /// Detect facts from the process environment.
    ///
    /// Reads `TZ` for the timezone and `LC_ALL`, `LC_MESSAGES` or `LANG`
    /// (first one set) for the locale. Screen geometry is never detected;
    /// hosts that know it call [`with_screen`](Self::with_screen).
    pub fn detect() -> Self {
        let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .and_then(|v| locale_tag(&v));

        Self {
            user_agent: format!(
                "{}/{} ({}; {})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            timezone: std::env::var("TZ").ok().filter(|tz| !tz.is_empty()),
            locale,
            screen: None,
            hostname: detect_hostname(),
        }
    }

    /// Override the agent string.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set the timezone.
    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    /// Set the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the display geometry.
    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = Some(ScreenGeometry { width, height });
        self
    }
}

#[cfg(feature = "host-facts")]
fn detect_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

#[cfg(not(feature = "host-facts"))]
fn detect_hostname() -> Option<String> {
    None
}
