//! Editable VCS requirement parsing
//!
//! pip cannot install `-e git+https://...` requirements inside Lambda because
//! there is no git binary. These entries are split out of requirements files,
//! cloned directly, and their package directories copied into the layer.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// `<vcs>+<scheme>://<host>/<owner>/<repo>[.git][@<ref>][#egg=<name>[<extras or version>][&...]]`
///
/// The egg name ends at the first character that cannot be part of a
/// distribution name, so `#egg=pkg==1.0` and `#egg=pkg[cli]` name `pkg`.
static EDITABLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<vcs>\w+)\+(?P<url>\w+://[\w.\-]+(?::\d+)?/[\w.\-]+/[\w.\-]+?)(?:\.git)?(?:@(?P<ref>[\w.\-/]+))?(?:#egg=(?P<egg>[\w.\-]+)[^&\s]*(?:&\S*)?)?$",
    )
    .expect("editable requirement pattern is valid")
});

/// A parsed editable requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableRequirement {
    /// Version control prefix, e.g. `git`
    pub vcs: String,
    /// Repository URL, always ending in `.git`
    pub repo_url: String,
    /// Branch or ref to check out
    pub branch: Option<String>,
    /// Name from the `#egg=` fragment
    pub egg: Option<String>,
}

impl EditableRequirement {
    /// Parse the target of an editable requirement (the part after `-e`)
    pub fn parse(target: &str) -> Option<Self> {
        let caps = EDITABLE_URL.captures(target.trim())?;
        Some(Self {
            vcs: caps["vcs"].to_string(),
            repo_url: format!("{}.git", &caps["url"]),
            branch: caps.name("ref").map(|m| m.as_str().to_string()),
            egg: caps.name("egg").map(|m| m.as_str().to_string()),
        })
    }

    /// Repository name, the last URL segment without `.git`
    pub fn repo_name(&self) -> &str {
        let last = self.repo_url.rsplit('/').next().unwrap_or(&self.repo_url);
        last.strip_suffix(".git").unwrap_or(last)
    }

    /// Account segment of the URL (`owner` in `https://host/owner/repo.git`)
    pub fn owner(&self) -> Option<&str> {
        self.repo_url.split('/').nth(3)
    }

    /// Directory name the repository is cloned into
    pub fn module_name(&self) -> String {
        match &self.egg {
            Some(egg) => egg.to_lowercase().replace('_', "-"),
            None => self.repo_name().to_string(),
        }
    }

    /// Directories copied from the clone into the layer's `python/` dir
    pub fn module_dirs(&self) -> Vec<String> {
        match &self.egg {
            Some(egg) => {
                let package = egg.replace('-', "_");
                vec![package.to_lowercase(), format!("{}.egg-info", package)]
            }
            None => vec![self.repo_name().replace('-', "_")],
        }
    }
}

impl fmt::Display for EditableRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.vcs, self.repo_url)?;
        if let Some(branch) = &self.branch {
            write!(f, "@{}", branch)?;
        }
        if let Some(egg) = &self.egg {
            write!(f, "#egg={}", egg)?;
        }
        Ok(())
    }
}

/// Return the editable target of a requirements line, if it is one
pub fn editable_target(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line
        .strip_prefix("--editable")
        .or_else(|| line.strip_prefix("-e"))?;
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim();
    let target = rest.split_whitespace().next()?;
    Some(target)
}

/// Whether an editable target is a `<vcs>+<scheme>://` URL
///
/// Anything else (`.`, `./vendored`, `file:///...`) is local and pip can
/// install it on its own.
pub fn is_vcs_target(target: &str) -> bool {
    target.split_once('+').is_some_and(|(vcs, rest)| {
        !vcs.is_empty() && vcs.chars().all(|c| c.is_ascii_alphanumeric()) && rest.contains("://")
    })
}

/// Result of splitting a requirements file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementsScan {
    /// Editable VCS requirements that parsed
    pub editable: Vec<EditableRequirement>,
    /// Editable VCS targets that did not match the expected form
    pub unparsed: Vec<String>,
    /// Every other line, local editables included, suitable for `pip install -r`
    pub installable: Vec<String>,
}

impl RequirementsScan {
    /// Split requirements file content into editable and installable entries
    pub fn scan(content: &str) -> Self {
        let mut scan = Self::default();
        for line in content.lines() {
            let trimmed = line.trim();
            match editable_target(line) {
                Some(target) if is_vcs_target(target) => {
                    match EditableRequirement::parse(target) {
                        Some(req) => scan.editable.push(req),
                        None => scan.unparsed.push(target.to_string()),
                    }
                }
                _ => {
                    if !trimmed.is_empty() && !trimmed.starts_with('#') {
                        scan.installable.push(trimmed.to_string());
                    }
                }
            }
        }
        scan
    }

    /// Requirements file content without editable VCS entries
    pub fn installable_file(&self) -> String {
        let mut out = self.installable.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_reference() {
        let req =
            EditableRequirement::parse("git+https://github.com/octocat/shared-utils.git@develop#egg=Shared_Utils")
                .unwrap();
        assert_eq!(req.vcs, "git");
        assert_eq!(req.repo_url, "https://github.com/octocat/shared-utils.git");
        assert_eq!(req.branch.as_deref(), Some("develop"));
        assert_eq!(req.egg.as_deref(), Some("Shared_Utils"));
        assert_eq!(req.owner(), Some("octocat"));
        assert_eq!(req.repo_name(), "shared-utils");
    }

    #[test]
    fn parse_adds_git_suffix() {
        let req = EditableRequirement::parse("git+https://github.com/octocat/tools").unwrap();
        assert_eq!(req.repo_url, "https://github.com/octocat/tools.git");
        assert!(req.branch.is_none());
        assert!(req.egg.is_none());
    }

    #[test]
    fn parse_keeps_dots_inside_repo_name() {
        let req = EditableRequirement::parse("git+https://github.com/octocat/my.lib@v1.2.0").unwrap();
        assert_eq!(req.repo_url, "https://github.com/octocat/my.lib.git");
        assert_eq!(req.branch.as_deref(), Some("v1.2.0"));
        assert_eq!(req.repo_name(), "my.lib");
    }

    #[test]
    fn parse_ignores_extra_fragment_params() {
        let req = EditableRequirement::parse(
            "git+https://github.com/octocat/mono.git#egg=mono-core&subdirectory=core",
        )
        .unwrap();
        assert_eq!(req.egg.as_deref(), Some("mono-core"));
    }

    #[test]
    fn egg_name_stops_at_version_specifier() {
        let req = EditableRequirement::parse("git+https://github.com/octocat/tools.git#egg=pkg==1.0")
            .unwrap();
        assert_eq!(req.egg.as_deref(), Some("pkg"));
        assert_eq!(req.module_name(), "pkg");

        let req = EditableRequirement::parse(
            "git+https://github.com/octocat/tools.git@v2#egg=tools[cli]>=2.0&subdirectory=py",
        )
        .unwrap();
        assert_eq!(req.egg.as_deref(), Some("tools"));
        assert_eq!(req.branch.as_deref(), Some("v2"));
        assert_eq!(req.to_string(), "git+https://github.com/octocat/tools.git@v2#egg=tools");
    }

    #[test]
    fn parse_rejects_malformed_targets() {
        assert!(EditableRequirement::parse("https://github.com/octocat/tools.git").is_none());
        assert!(EditableRequirement::parse("git+https://github.com/octocat").is_none());
        assert!(EditableRequirement::parse("./local/package").is_none());
        assert!(EditableRequirement::parse("").is_none());
    }

    #[test]
    fn parse_is_idempotent() {
        let inputs = [
            "git+https://github.com/octocat/shared-utils.git@develop#egg=Shared_Utils",
            "git+https://github.com/octocat/tools",
            "git+ssh://git.example.com:2222/team/lib.git@release/2.0",
            "hg+https://hg.example.com/team/legacy#egg=legacy",
        ];
        for input in inputs {
            let first = EditableRequirement::parse(input).unwrap();
            let second = EditableRequirement::parse(&first.to_string()).unwrap();
            assert_eq!(first, second, "not idempotent for {input}");
        }
    }

    #[test]
    fn egg_naming() {
        let req = EditableRequirement::parse("git+https://github.com/octocat/x.git#egg=Shared_Utils-Core")
            .unwrap();
        assert_eq!(req.module_name(), "shared-utils-core");
        assert_eq!(
            req.module_dirs(),
            vec!["shared_utils_core", "Shared_Utils_Core.egg-info"]
        );
    }

    #[test]
    fn naming_without_egg_uses_repo_name() {
        let req = EditableRequirement::parse("git+https://github.com/octocat/data-tools.git").unwrap();
        assert_eq!(req.module_name(), "data-tools");
        assert_eq!(req.module_dirs(), vec!["data_tools"]);
    }

    #[test]
    fn editable_target_forms() {
        assert_eq!(
            editable_target("-e git+https://h/o/r.git"),
            Some("git+https://h/o/r.git")
        );
        assert_eq!(
            editable_target("  --editable=git+https://h/o/r.git  # pinned"),
            Some("git+https://h/o/r.git")
        );
        assert_eq!(editable_target("-egit+https://h/o/r.git"), Some("git+https://h/o/r.git"));
        assert_eq!(editable_target("requests==2.31.0"), None);
        assert_eq!(editable_target("-e"), None);
    }

    #[test]
    fn scan_splits_requirements() {
        let content = "\
# runtime deps
requests==2.31.0
-e git+https://github.com/octocat/shared-utils.git@main#egg=shared_utils
-e ./vendored
boto3>=1.28

";
        let scan = RequirementsScan::scan(content);
        assert_eq!(scan.editable.len(), 1);
        assert!(scan.unparsed.is_empty());
        assert_eq!(
            scan.installable,
            vec!["requests==2.31.0", "-e ./vendored", "boto3>=1.28"]
        );
        assert_eq!(
            scan.installable_file(),
            "requests==2.31.0\n-e ./vendored\nboto3>=1.28\n"
        );
    }

    #[test]
    fn local_editables_stay_installable() {
        let content = "-e .\n--editable=./libs/common\n-e file:///opt/pkgs/extra\n";
        let scan = RequirementsScan::scan(content);
        assert!(scan.editable.is_empty());
        assert!(scan.unparsed.is_empty());
        assert_eq!(
            scan.installable,
            vec!["-e .", "--editable=./libs/common", "-e file:///opt/pkgs/extra"]
        );
    }

    #[test]
    fn unparseable_vcs_editables_are_reported_not_installed() {
        let scan = RequirementsScan::scan("-e git+ssh://git@github.com/octocat/tools.git\nflask\n");
        assert_eq!(scan.unparsed, vec!["git+ssh://git@github.com/octocat/tools.git"]);
        assert_eq!(scan.installable, vec!["flask"]);
    }

    #[test]
    fn vcs_target_detection() {
        assert!(is_vcs_target("git+https://github.com/octocat/tools.git"));
        assert!(is_vcs_target("hg+ssh://hg.example.com/team/legacy"));
        assert!(!is_vcs_target("./vendored"));
        assert!(!is_vcs_target("."));
        assert!(!is_vcs_target("file:///opt/pkgs/extra"));
        assert!(!is_vcs_target("./pkgs/c++://weird"));
    }
}
