//! Catalog of named browser profiles.
//!
//! Each entry carries the JA3 the browser emits, its JA4, and the matching
//! User-Agent. Several entries share a fingerprint on purpose (Edge 120 is
//! byte-identical to Chrome 120); the value of an entry is the named target.

/// A predefined browser TLS fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ja3Profile {
    /// Human-readable name
    pub name: &'static str,
    /// JA3 string the browser emits
    pub ja3: &'static str,
    /// JA4 fingerprint
    pub ja4: &'static str,
    /// Matching User-Agent header value
    pub user_agent: &'static str,
}

/// Built-in imitation target for the TLS engine when no byte-exact spec can
/// be built from a profile name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelloId {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Ios,
    Android,
}

const CHROME_120_JA3: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-21,29-23-24,0";

static PROFILES: &[(&str, Ja3Profile)] = &[
    (
        "chrome_120",
        Ja3Profile {
            name: "Chrome 120",
            ja3: CHROME_120_JA3,
            ja4: "t13d1715h2_8daaf6152771_02713d6af862",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        },
    ),
    (
        "chrome_108",
        Ja3Profile {
            name: "Chrome 108",
            ja3: "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513-21,29-23-24,0",
            ja4: "t13d1516h2_8daaf6152771_e5627efa2ab1",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
        },
    ),
    (
        "firefox_120",
        Ja3Profile {
            name: "Firefox 120",
            ja3: "771,4865-4867-4866-49195-49199-52393-52392-49196-49200-49162-49161-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-51-43-13-45-28-21,29-23-24-25-256-257,0",
            ja4: "t13d1517h2_5b57614c22b0_3d5424432c57",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
        },
    ),
    (
        "firefox_102",
        Ja3Profile {
            name: "Firefox 102 ESR",
            ja3: "771,4865-4867-4866-49195-49199-52393-52392-49196-49200-49162-49161-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-51-43-13-45-28-21,29-23-24-25,0",
            ja4: "t13d1515h2_5b57614c22b0_cd85d2d88918",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:102.0) Gecko/20100101 Firefox/102.0",
        },
    ),
    (
        "safari_17",
        Ja3Profile {
            name: "Safari 17 (macOS)",
            ja3: "771,4865-4866-4867-49196-49195-52393-49200-49199-52392-49162-49161-49172-49171-157-156-53-47-49160-49170-10,0-23-65281-10-11-16-5-13-18-51-45-43-27-21,29-23-24-25,0",
            ja4: "t13d1714h2_9e7b989ebec8_4e5db9f566cb",
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        },
    ),
    (
        "safari_ios_17",
        Ja3Profile {
            name: "Safari iOS 17",
            ja3: "771,4865-4866-4867-49196-49195-52393-49200-49199-52392-49162-49161-49172-49171-157-156-53-47,0-23-65281-10-11-16-5-13,29-23-24-25,0",
            ja4: "t13d1312h2_9e7b989ebec8_37e0c9b7f7e5",
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        },
    ),
    (
        "edge_120",
        Ja3Profile {
            name: "Edge 120 (Chromium)",
            ja3: CHROME_120_JA3,
            ja4: "t13d1715h2_8daaf6152771_02713d6af862",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
        },
    ),
    (
        "android_chrome",
        Ja3Profile {
            name: "Chrome Android 120",
            ja3: "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-51-45-43-27-21,29-23-24,0",
            ja4: "t13d1614h2_8daaf6152771_a7f0724e1fa9",
            user_agent: "Mozilla/5.0 (Linux; Android 13) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36",
        },
    ),
    (
        "okhttp_android",
        Ja3Profile {
            name: "OkHttp Android Client",
            ja3: "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13,29-23-24,0",
            ja4: "t13d1413h2_8daaf6152771_224e4e1f2d0a",
            user_agent: "okhttp/4.11.0",
        },
    ),
    (
        "curl_8",
        Ja3Profile {
            name: "curl 8.x",
            ja3: "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13,29-23-24,0",
            ja4: "t13d1413h2_8daaf6152771_2a623c22973b",
            user_agent: "curl/8.1.2",
        },
    ),
    (
        "go_http",
        Ja3Profile {
            name: "Go HTTP Client",
            ja3: "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13,29-23-24,0",
            ja4: "t13d1413h2_8daaf6152771_3b786b34c4ab",
            user_agent: "Go-http-client/2.0",
        },
    ),
];

/// Look up a profile by its lower-snake id (lookup lowercases the name).
pub fn profile(name: &str) -> Option<&'static Ja3Profile> {
    let name = name.to_lowercase();
    PROFILES.iter().find(|(k, _)| *k == name).map(|(_, p)| p)
}

/// The JA3 string for a profile, if known.
pub fn profile_ja3(name: &str) -> Option<&'static str> {
    profile(name).map(|p| p.ja3)
}

/// The User-Agent for a profile, if known.
pub fn profile_user_agent(name: &str) -> Option<&'static str> {
    profile(name).map(|p| p.user_agent)
}

/// All profile ids, in catalog order.
pub fn profile_names() -> Vec<&'static str> {
    PROFILES.iter().map(|(k, _)| *k).collect()
}

/// Map a profile word to a built-in imitation target by family.
///
/// Used when the name is not in the catalog: `chrome_125` still dials as a
/// generic Chrome. Returns `None` when no family word matches.
pub fn family_fallback(profile: &str) -> Option<HelloId> {
    let p = profile.to_lowercase();
    // ios/android before the browser words: "android_chrome" is an Android
    // target even though it contains "chrome"
    if p.contains("ios") || p.contains("iphone") || p.contains("ipad") {
        return Some(HelloId::Ios);
    }
    if p.contains("android") {
        return Some(HelloId::Android);
    }
    if p.contains("edge") {
        return Some(HelloId::Edge);
    }
    if p.contains("chrome") {
        return Some(HelloId::Chrome);
    }
    if p.contains("firefox") {
        return Some(HelloId::Firefox);
    }
    if p.contains("safari") {
        return Some(HelloId::Safari);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Ja3;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(profile("chrome_120").is_some());
        assert!(profile("CHROME_120").is_some());
        assert!(profile("netscape_4").is_none());
    }

    #[test]
    fn every_catalog_ja3_round_trips() {
        for name in profile_names() {
            let p = profile(name).unwrap();
            let parsed: Ja3 = p.ja3.parse().unwrap_or_else(|e| {
                panic!("profile {} has unparseable JA3: {}", name, e)
            });
            assert_eq!(parsed.to_string(), p.ja3, "round trip for {}", name);
        }
    }

    #[test]
    fn every_catalog_ja4_parses() {
        use crate::fingerprint::Ja4;
        for name in profile_names() {
            let p = profile(name).unwrap();
            assert!(
                p.ja4.parse::<Ja4>().is_ok(),
                "profile {} has invalid JA4 {}",
                name,
                p.ja4
            );
        }
    }

    #[test]
    fn edge_shares_chrome_fingerprint() {
        assert_eq!(profile_ja3("edge_120"), profile_ja3("chrome_120"));
    }

    #[test]
    fn family_words_resolve() {
        assert_eq!(family_fallback("chrome_999"), Some(HelloId::Chrome));
        assert_eq!(family_fallback("Firefox_nightly"), Some(HelloId::Firefox));
        assert_eq!(family_fallback("safari_ios_20"), Some(HelloId::Ios));
        assert_eq!(family_fallback("android_chrome_99"), Some(HelloId::Android));
        assert_eq!(family_fallback("edge_canary"), Some(HelloId::Edge));
        assert_eq!(family_fallback("lynx"), None);
    }
}
