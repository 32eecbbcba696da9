use std::path::Path;

/// Absolute interpreter the shell family requires. If it is missing the
/// whole family is unsupported; there is no fallback to `$SHELL`.
pub const SHELL_INTERPRETER: &str = "/bin/sh";

/// The closed set of runnable language families. Tags outside this set
/// resolve to unsupported before any process is spawned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LanguageFamily {
    Python,
    JavaScript,
    Shell,
}

impl LanguageFamily {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "python" | "python3" | "py" => Some(Self::Python),
            "javascript" | "js" | "node" => Some(Self::JavaScript),
            "sh" | "shell" | "bash" | "zsh" => Some(Self::Shell),
            _ => None,
        }
    }

    /// Interpreters to try, in preference order. Only "binary not found"
    /// advances to the next candidate.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Python => &["python3", "python"],
            Self::JavaScript => &["node"],
            Self::Shell => &[SHELL_INTERPRETER],
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::JavaScript => "js",
            Self::Shell => "sh",
        }
    }

    /// Pre-flight availability. Families probed through PATH report
    /// available here; their absence surfaces as a spawn fall-through.
    pub fn available(self) -> bool {
        match self {
            Self::Shell => Path::new(SHELL_INTERPRETER).exists(),
            Self::Python | Self::JavaScript => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LanguageFamily;

    #[test]
    fn recognized_tags_map_to_their_family() {
        assert_eq!(LanguageFamily::from_tag("python"), Some(LanguageFamily::Python));
        assert_eq!(LanguageFamily::from_tag("py"), Some(LanguageFamily::Python));
        assert_eq!(LanguageFamily::from_tag("js"), Some(LanguageFamily::JavaScript));
        assert_eq!(LanguageFamily::from_tag("node"), Some(LanguageFamily::JavaScript));
        assert_eq!(LanguageFamily::from_tag("bash"), Some(LanguageFamily::Shell));
        assert_eq!(LanguageFamily::from_tag("sh"), Some(LanguageFamily::Shell));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert_eq!(LanguageFamily::from_tag("ruby"), None);
        assert_eq!(LanguageFamily::from_tag("plaintext"), None);
        assert_eq!(LanguageFamily::from_tag(""), None);
    }

    #[test]
    fn python_prefers_python3() {
        assert_eq!(LanguageFamily::Python.candidates(), ["python3", "python"]);
    }

    #[cfg(unix)]
    #[test]
    fn shell_family_is_available_where_bin_sh_exists() {
        assert!(LanguageFamily::Shell.available());
    }
}
