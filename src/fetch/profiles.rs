//! Browser profiles and their round-robin rotation.
//!
//! A [`ClientProfile`] is a label such as `chrome131_android` or
//! `safari17_2_ios`. The transport turns it into an [`Impersonation`]: the
//! browser build whose TLS ClientHello, HTTP/2 settings and default headers
//! are reproduced on the wire.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;
use wreq_util::{Emulation, EmulationOS, EmulationOption};

/// Stock profile catalog, mixing desktop and mobile builds of several
/// browser families.
pub const DEFAULT_PROFILES: &[&str] = &[
    "chrome110",
    "chrome116",
    "chrome119",
    "chrome120",
    "chrome123",
    "chrome124",
    "chrome131",
    "chrome99_android",
    "chrome131_android",
    "safari15_3",
    "safari15_5",
    "safari17_0",
    "safari17_2_ios",
    "safari18_0",
    "safari18_0_ios",
    "edge99",
    "edge101",
];

/// Opaque label naming a browser fingerprint to impersonate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientProfile(String);

impl ClientProfile {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the label to the browser build the transport emulates.
    ///
    /// The label is `<family><version>[_<platform>]`, with version parts
    /// separated by `_` (`safari17_2_ios` is Safari 17.2 on iOS). Versions
    /// without an exact emulation map to the closest supported build of the
    /// same family; unknown families fall back to desktop Chrome 131.
    ///
    /// # Returns
    ///
    /// The [`Impersonation`] holding the emulated build and operating system.
    pub fn impersonation(&self) -> Impersonation {
        let label = self.0.to_ascii_lowercase();
        let split = label
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(label.len());
        let (family, rest) = label.split_at(split);

        let mut parts: Vec<&str> = rest.split('_').filter(|p| !p.is_empty()).collect();
        let platform = match parts.last().copied() {
            Some("android") => {
                parts.pop();
                Platform::Android
            }
            Some("ios") => {
                parts.pop();
                Platform::Ios
            }
            _ => Platform::Desktop,
        };
        let version = parts.join(".");

        let family = match family {
            "chrome" => Family::Chrome,
            "edge" => Family::Edge,
            "safari" => Family::Safari,
            "firefox" => Family::Firefox,
            other => {
                debug!(profile = %self, family = other, "Unknown browser family; using chrome");
                Family::Chrome
            }
        };
        Impersonation::resolve(family, platform, &version)
    }

    /// Emulation settings handed to the HTTP client builder.
    pub fn emulation(&self) -> EmulationOption {
        self.impersonation().option()
    }
}

impl fmt::Display for ClientProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientProfile {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for ClientProfile {
    fn from(label: String) -> Self {
        Self(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Chrome,
    Edge,
    Safari,
    Firefox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    Desktop,
    Android,
    Ios,
}

/// A concrete browser build and the OS it claims to run on.
///
/// The build fixes the TLS ClientHello (cipher order, GREASE, extensions),
/// the HTTP/2 SETTINGS and pseudo-header order, and the default request
/// headers including User-Agent and client hints. The OS adjusts the
/// platform-dependent headers.
#[derive(Debug)]
pub struct Impersonation {
    pub emulation: Emulation,
    pub os: EmulationOS,
}

impl Impersonation {
    fn resolve(family: Family, platform: Platform, version: &str) -> Self {
        let emulation = match (family, platform, version) {
            (Family::Chrome, _, "99" | "100") => Emulation::Chrome100,
            (Family::Chrome, _, "110") => Emulation::Chrome110,
            (Family::Chrome, _, "116") => Emulation::Chrome116,
            (Family::Chrome, _, "119") => Emulation::Chrome119,
            (Family::Chrome, _, "120") => Emulation::Chrome120,
            (Family::Chrome, _, "123") => Emulation::Chrome123,
            (Family::Chrome, _, "124") => Emulation::Chrome124,
            (Family::Chrome, _, _) => Emulation::Chrome131,
            (Family::Edge, _, "99" | "101") => Emulation::Edge101,
            (Family::Edge, _, _) => Emulation::Edge131,
            (Family::Safari, Platform::Ios, "17.2") => Emulation::SafariIos17_2,
            (Family::Safari, Platform::Ios, _) => Emulation::SafariIos18_1_1,
            (Family::Safari, _, "15.3") => Emulation::Safari15_3,
            (Family::Safari, _, "15.5") => Emulation::Safari15_5,
            (Family::Safari, _, "17.0") => Emulation::Safari17_0,
            (Family::Safari, _, _) => Emulation::Safari18,
            (Family::Firefox, _, _) => Emulation::Firefox133,
        };
        let os = match (family, platform) {
            (_, Platform::Android) => EmulationOS::Android,
            (_, Platform::Ios) => EmulationOS::IOS,
            (Family::Safari, Platform::Desktop) => EmulationOS::MacOS,
            (_, Platform::Desktop) => EmulationOS::Windows,
        };
        Self { emulation, os }
    }

    pub fn option(self) -> EmulationOption {
        EmulationOption::builder()
            .emulation(self.emulation)
            .emulation_os(self.os)
            .skip_http2(false)
            .skip_headers(false)
            .build()
    }
}

/// Round-robin dispenser over a fixed profile catalog.
///
/// Owned by one fetcher; the index advances atomically so concurrent callers
/// each observe a distinct slot per cycle.
#[derive(Debug)]
pub struct ProfileRotator {
    catalog: Vec<ClientProfile>,
    index: AtomicUsize,
}

impl ProfileRotator {
    /// Returns `None` for an empty catalog.
    pub fn new(catalog: Vec<ClientProfile>) -> Option<Self> {
        if catalog.is_empty() {
            return None;
        }
        Some(Self {
            catalog,
            index: AtomicUsize::new(0),
        })
    }

    pub fn with_default_catalog() -> Self {
        Self {
            catalog: DEFAULT_PROFILES.iter().map(|p| ClientProfile::from(*p)).collect(),
            index: AtomicUsize::new(0),
        }
    }

    /// Profile at the current position; advances the position by one.
    pub fn next(&self) -> ClientProfile {
        let len = self.catalog.len();
        let slot = match self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
        {
            Ok(i) | Err(i) => i,
        };
        self.catalog[slot].clone()
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}
