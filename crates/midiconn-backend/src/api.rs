//! Backend identifiers and compiled-backend discovery.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// MIDI API specifier.
///
/// Ordered the way the default-backend search visits them. `Unspecified` asks
/// the factory to pick the first compiled API that has ports available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Api {
    #[serde(rename = "unspecified")]
    Unspecified,
    /// Macintosh OS-X CoreMIDI.
    #[serde(rename = "core")]
    MacOsxCore,
    /// Advanced Linux Sound Architecture.
    #[serde(rename = "alsa")]
    LinuxAlsa,
    /// JACK low-latency MIDI server.
    #[serde(rename = "jack")]
    UnixJack,
    /// Microsoft Multimedia MIDI.
    #[serde(rename = "winmm")]
    WindowsMm,
    /// Compilable but non-functional.
    #[serde(rename = "dummy")]
    Dummy,
}

impl Api {
    pub const ALL: [Api; 6] = [
        Api::Unspecified,
        Api::MacOsxCore,
        Api::LinuxAlsa,
        Api::UnixJack,
        Api::WindowsMm,
        Api::Dummy,
    ];

    /// Lower case identifier.
    pub fn name(self) -> &'static str {
        match self {
            Api::Unspecified => "unspecified",
            Api::MacOsxCore => "core",
            Api::LinuxAlsa => "alsa",
            Api::UnixJack => "jack",
            Api::WindowsMm => "winmm",
            Api::Dummy => "dummy",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Api::Unspecified => "Unknown",
            Api::MacOsxCore => "CoreMidi",
            Api::LinuxAlsa => "ALSA",
            Api::UnixJack => "Jack",
            Api::WindowsMm => "Windows MultiMedia",
            Api::Dummy => "Dummy",
        }
    }

    /// Case-insensitive lookup by short name.
    pub fn from_name(name: &str) -> Option<Api> {
        Api::ALL
            .into_iter()
            .find(|api| api.name().eq_ignore_ascii_case(name))
    }

    pub fn is_compiled(self) -> bool {
        compiled_apis().contains(&self)
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The API the `midi-io` feature binds to on this target.
#[cfg(feature = "midi-io")]
pub(crate) const NATIVE_API: Api = if cfg!(feature = "jack") {
    Api::UnixJack
} else if cfg!(target_os = "macos") {
    Api::MacOsxCore
} else if cfg!(target_os = "windows") {
    Api::WindowsMm
} else {
    Api::LinuxAlsa
};

static COMPILED: OnceLock<Vec<Api>> = OnceLock::new();

/// APIs this build can open, in search order. Never empty: the dummy API is
/// always compiled in. Computed once per process.
pub fn compiled_apis() -> &'static [Api] {
    COMPILED.get_or_init(|| {
        let mut apis = Vec::with_capacity(2);
        #[cfg(feature = "midi-io")]
        apis.push(NATIVE_API);
        apis.push(Api::Dummy);
        tracing::debug!("Compiled MIDI APIs: {:?}", apis);
        apis
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiled_apis_non_empty() {
        let apis = compiled_apis();
        assert!(!apis.is_empty());
        assert!(apis.contains(&Api::Dummy));
        assert!(apis.iter().all(|api| !api.name().is_empty()));
        assert!(!apis.contains(&Api::Unspecified));
    }

    #[test]
    fn test_compiled_apis_is_stable() {
        let first = compiled_apis().as_ptr();
        let second = compiled_apis().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_api_names() {
        let names: Vec<_> = Api::ALL.iter().map(|api| api.name()).collect();
        insta::assert_debug_snapshot!(names, @r###"
        [
            "unspecified",
            "core",
            "alsa",
            "jack",
            "winmm",
            "dummy",
        ]
        "###);
    }

    #[test]
    fn test_display_names() {
        for api in Api::ALL {
            if api == Api::Unspecified {
                assert_eq!(api.display_name(), "Unknown");
                continue;
            }
            assert!(!api.display_name().is_empty());
            assert_ne!(api.display_name(), "Unknown");
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Api::from_name("alsa"), Some(Api::LinuxAlsa));
        assert_eq!(Api::from_name("WINMM"), Some(Api::WindowsMm));
        assert_eq!(Api::from_name("web"), None);
        assert_eq!(Api::LinuxAlsa.to_string(), "alsa");
    }

    #[cfg(feature = "midi-io")]
    #[test]
    fn test_native_api_compiled_first() {
        assert_eq!(compiled_apis()[0], NATIVE_API);
    }
}
