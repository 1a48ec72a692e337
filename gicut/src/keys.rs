use std::{fmt, str::FromStr};

const KEY_MASK: u64 = 0xFF_FFFF_FFFF_FFFF;
const ZERO_KEY: u64 = 0x100_0000_0000_0000;

/// Clips sharing the key of `MDAQ001_OP`.
const OPENING_ALIASES: [&str; 3] = [
    "MDAQ001_OPNew_Part1",
    "MDAQ001_OPNew_Part2_PlayerBoy",
    "MDAQ001_OPNew_Part2_PlayerGirl",
];

/// Key derived from the file stem of a cutscene.
pub fn key_from_name(name: &str) -> u64 {
    let name = if OPENING_ALIASES.contains(&name) {
        "MDAQ001_OP"
    } else {
        name
    };

    let key = name
        .encode_utf16()
        .fold(0u64, |key, c| key.wrapping_mul(3).wrapping_add(c as u64));

    non_zero(key & KEY_MASK)
}

/// Name key combined with a second, version specific key.
pub fn key_from_name_with(name: &str, key2: u64) -> u64 {
    non_zero(key_from_name(name).wrapping_add(key2) & KEY_MASK)
}

fn non_zero(key: u64) -> u64 {
    if key == 0 { ZERO_KEY } else { key }
}

/// Accepts decimal or `0x` prefixed hexadecimal keys.
pub fn parse_key(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let result = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse::<u64>(),
    };

    result.map_err(|_| format!("`{}` isn't a valid 64-bit key.", s))
}

/// Where the key of every file comes from. Keys of all enabled sources are added together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyMode {
    /// Key listed for the file in the version map.
    pub external: bool,
    /// Key given on the command line.
    pub provided: bool,
    /// Key derived from the file name.
    pub name: bool,
    /// Version map key when listed, command line key otherwise.
    pub prefer_external: bool,
}

impl KeyMode {
    pub const DEFAULT: Self = Self {
        external: false,
        provided: false,
        name: true,
        prefer_external: true,
    };

    /// Composes the key of one file. `None` means the file has to be skipped.
    pub fn key(&self, name: &str, provided: u64, external: Option<u64>) -> Option<u64> {
        let mut key = if self.name { key_from_name(name) } else { 0 };

        if self.prefer_external {
            match external {
                Some(external) => key = key.wrapping_add(external),
                None => {
                    log::warn!("No version info for {}, using provided key.", name);
                    key = key.wrapping_add(provided);
                }
            }

            return Some(key);
        }

        if self.provided {
            key = key.wrapping_add(provided);
        }

        if self.external {
            match external {
                Some(external) => key = key.wrapping_add(external),
                None => {
                    log::warn!("No version info for {}, skipping.", name);
                    return None;
                }
            }
        }

        Some(key)
    }
}

impl FromStr for KeyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mode = Self::default();

        for flag in s.split(',').map(|x| x.trim().to_ascii_lowercase()) {
            match flag.as_str() {
                "" | "none" => (),
                "default" => {
                    mode.name = true;
                    mode.prefer_external = true;
                }
                "from-external" => mode.external = true,
                "from-provided" => mode.provided = true,
                "from-name" => mode.name = true,
                "prefer-external-fallback-provided" => mode.prefer_external = true,
                x => return Err(format!("unknown key mode `{}`.", x)),
            }
        }

        if mode.prefer_external && (mode.external || mode.provided) {
            return Err(
                "prefer-external-fallback-provided can't be combined with from-external or from-provided."
                    .to_owned(),
            );
        }

        Ok(mode)
    }
}

impl fmt::Display for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.external, "from-external"),
            (self.provided, "from-provided"),
            (self.name, "from-name"),
            (self.prefer_external, "prefer-external-fallback-provided"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect::<Vec<_>>();

        if flags.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", flags.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_keys() {
        assert_eq!(key_from_name("abc"), 1266);
        assert_eq!(key_from_name("MDAQ001_OP"), 0x21477E);
        assert_eq!(
            key_from_name("Cs_4131904_HaiDaoChuXian_Boy"),
            0x3377B08706465
        );
        assert_eq!(key_from_name(""), ZERO_KEY);
    }

    #[test]
    fn opening_clips_share_a_key() {
        for name in OPENING_ALIASES {
            assert_eq!(key_from_name(name), key_from_name("MDAQ001_OP"));
        }
    }

    #[test]
    fn second_key_is_added_and_masked() {
        assert_eq!(key_from_name_with("abc", 1), 1267);
        assert_eq!(key_from_name_with("abc", u64::MAX), 0x4F1);
        assert_eq!(key_from_name_with("abc", ZERO_KEY - 1266), ZERO_KEY);
    }

    #[test]
    fn keys_in_both_radixes() {
        assert_eq!(parse_key("1234"), Ok(1234));
        assert_eq!(parse_key("0x1F"), Ok(0x1F));
        assert_eq!(parse_key("0xFFFF_FFFF_FFFF_FFFF"), Ok(u64::MAX));
        assert!(parse_key("0x1_0000_0000_0000_0000").is_err());
        assert!(parse_key("key").is_err());
    }

    #[test]
    fn key_mode_flags() {
        assert_eq!("default".parse::<KeyMode>(), Ok(KeyMode::DEFAULT));
        assert_eq!(
            "from-name, From-Provided".parse::<KeyMode>(),
            Ok(KeyMode {
                name: true,
                provided: true,
                ..Default::default()
            })
        );
        assert!("prefer-external-fallback-provided,from-external".parse::<KeyMode>().is_err());
        assert!("sideways".parse::<KeyMode>().is_err());
        assert_eq!(KeyMode::DEFAULT.to_string(), "from-name,prefer-external-fallback-provided");
    }

    #[test]
    fn key_composition() {
        let mode = KeyMode::DEFAULT;
        assert_eq!(mode.key("abc", 5, Some(10)), Some(1276));
        assert_eq!(mode.key("abc", 5, None), Some(1271));

        let mode: KeyMode = "from-external".parse().unwrap();
        assert_eq!(mode.key("abc", 5, None), None);
        assert_eq!(mode.key("abc", 5, Some(u64::MAX)), Some(u64::MAX));

        let mode: KeyMode = "from-provided,from-external".parse().unwrap();
        assert_eq!(mode.key("abc", 2, Some(u64::MAX)), Some(1));
    }
}
