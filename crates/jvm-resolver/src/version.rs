use std::fmt;

use crate::errors::JvmError;

/// A Java runtime version, normalised so that legacy `1.x` numbering maps to
/// major `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JavaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub update: u32,
}

impl JavaVersion {
    pub fn new(major: u32) -> Self {
        Self {
            major,
            minor: 0,
            patch: 0,
            update: 0,
        }
    }

    /// Parse a version token such as `17.0.2+8`, `1.8.0_292` or `21`.
    pub fn parse(token: &str) -> Option<Self> {
        let nums: Vec<u32> = token
            .split(|ch: char| !ch.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<_>>()?;
        let mut nums = nums.into_iter();

        let mut major = nums.next()?;
        if major == 1 {
            major = nums.next()?;
        }
        Some(Self {
            major,
            minor: nums.next().unwrap_or(0),
            patch: nums.next().unwrap_or(0),
            update: nums.next().unwrap_or(0),
        })
    }

    /// Version from the `release` file shipped in every JDK/JRE home.
    pub fn from_release_file(contents: &str) -> Option<Self> {
        contents.lines().find_map(|line| {
            let value = line.trim().strip_prefix("JAVA_VERSION=")?;
            Self::parse(value.trim().trim_matches('"'))
        })
    }

    /// Version from `java -version` output; the quoted token on the first
    /// line mentioning "version".
    pub fn from_version_output(output: &str) -> Option<Self> {
        for line in output.lines() {
            if !line.to_ascii_lowercase().contains("version") {
                continue;
            }
            let Some(start) = line.find('"') else {
                continue;
            };
            let rest = &line[start + 1..];
            let Some(end) = rest.find('"') else {
                continue;
            };
            if let Some(version) = Self::parse(&rest[..end]) {
                return Some(version);
            }
        }
        None
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.update > 0 {
            write!(f, "_{}", self.update)?;
        }
        Ok(())
    }
}

/// What `JVMVersion` asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaVersionRequirement {
    Any,
    Exact(u32),
    AtLeast(u32),
}

impl JavaVersionRequirement {
    /// `""` → any, `"11"` → exactly 11, `"11+"` → 11 or newer, `"1.8"` → 8.
    pub fn parse(text: &str) -> Result<Self, JvmError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::Any);
        }
        let (token, at_least) = match trimmed.strip_suffix('+') {
            Some(token) => (token.trim(), true),
            None => (trimmed, false),
        };
        if token.is_empty() || !token.chars().all(|ch| ch.is_ascii_digit() || ch == '.') {
            return Err(JvmError::InvalidVersion(text.to_string()));
        }
        let major = JavaVersion::parse(token)
            .ok_or_else(|| JvmError::InvalidVersion(text.to_string()))?
            .major;
        Ok(if at_least {
            Self::AtLeast(major)
        } else {
            Self::Exact(major)
        })
    }

    pub fn matches(&self, version: &JavaVersion) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(major) => version.major == *major,
            Self::AtLeast(major) => version.major >= *major,
        }
    }

    /// Argument for macOS `java_home -v`, which still expects `1.x` for
    /// Java 8 and older.
    pub fn java_home_arg(&self) -> Option<String> {
        let format_major = |major: u32| {
            if major <= 8 {
                format!("1.{major}")
            } else {
                major.to_string()
            }
        };
        match self {
            Self::Any => None,
            Self::Exact(major) => Some(format_major(*major)),
            Self::AtLeast(major) => Some(format!("{}+", format_major(*major))),
        }
    }
}

impl fmt::Display for JavaVersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Exact(major) => write!(f, "{major}"),
            Self::AtLeast(major) => write!(f, "{major}+"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modern_and_legacy_tokens() {
        assert_eq!(
            JavaVersion::parse("17.0.2+8"),
            Some(JavaVersion {
                major: 17,
                minor: 0,
                patch: 2,
                update: 8
            })
        );
        let legacy = JavaVersion::parse("1.8.0_292").expect("legacy");
        assert_eq!(legacy.major, 8);
        assert_eq!(legacy.update, 292);
        assert_eq!(JavaVersion::parse("21"), Some(JavaVersion::new(21)));
        assert_eq!(JavaVersion::parse("abc"), None);
    }

    #[test]
    fn overflowing_component_rejects_the_whole_token() {
        assert_eq!(JavaVersion::parse("17.0.99999999999.5"), None);
        assert_eq!(JavaVersion::parse("99999999999"), None);
        assert!(JavaVersionRequirement::parse("99999999999+").is_err());
    }

    #[test]
    fn ordering_prefers_newer_patch_levels() {
        let older = JavaVersion::parse("17.0.2").expect("older");
        let newer = JavaVersion::parse("17.0.10").expect("newer");
        assert!(newer > older);
        assert!(JavaVersion::new(21) > newer);
    }

    #[test]
    fn reads_release_file_and_version_output() {
        let release = "IMPLEMENTOR=\"Eclipse Adoptium\"\nJAVA_VERSION=\"21.0.1\"\nOS_NAME=\"Darwin\"\n";
        assert_eq!(
            JavaVersion::from_release_file(release).map(|v| v.major),
            Some(21)
        );

        let output = "openjdk version \"1.8.0_382\"\nOpenJDK Runtime Environment (build 1.8.0_382-b05)\n";
        assert_eq!(
            JavaVersion::from_version_output(output).map(|v| v.major),
            Some(8)
        );
        assert_eq!(JavaVersion::from_version_output("no quotes here"), None);
    }

    #[test]
    fn requirement_parsing_and_matching() {
        assert_eq!(JavaVersionRequirement::parse("").expect("any"), JavaVersionRequirement::Any);
        assert_eq!(
            JavaVersionRequirement::parse("11").expect("exact"),
            JavaVersionRequirement::Exact(11)
        );
        assert_eq!(
            JavaVersionRequirement::parse(" 17+ ").expect("at least"),
            JavaVersionRequirement::AtLeast(17)
        );
        assert_eq!(
            JavaVersionRequirement::parse("1.8").expect("legacy"),
            JavaVersionRequirement::Exact(8)
        );
        assert!(JavaVersionRequirement::parse("latest").is_err());
        assert!(JavaVersionRequirement::parse("+").is_err());

        let java17 = JavaVersion::new(17);
        assert!(JavaVersionRequirement::AtLeast(11).matches(&java17));
        assert!(!JavaVersionRequirement::Exact(11).matches(&java17));
        assert!(JavaVersionRequirement::Any.matches(&java17));
    }

    #[test]
    fn java_home_arguments_use_legacy_numbering() {
        assert_eq!(JavaVersionRequirement::Exact(8).java_home_arg().as_deref(), Some("1.8"));
        assert_eq!(JavaVersionRequirement::AtLeast(11).java_home_arg().as_deref(), Some("11+"));
        assert_eq!(JavaVersionRequirement::Any.java_home_arg(), None);
    }
}
