// ABOUTME: Deterministic resource names derived from a sandbox name
// ABOUTME: Every cluster object of a sandbox is addressable from its name and namespace

/// Name of the volume claim template on the sandbox stateful set.
pub const CLAIM_TEMPLATE: &str = "workspace";

/// Label key carrying the normalized project identifier.
pub const PROJECT_LABEL: &str = "kubedev.io/project";
/// Label key carrying the sandbox name; also the pod selector.
pub const SANDBOX_LABEL: &str = "kubedev.io/sandbox";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "kubedev";

const LABEL_VALUE_MAX: usize = 63;

/// Derived names for one sandbox. The sandbox name doubles as the stateful set
/// name and as the name of its primary container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxNames {
    sandbox: String,
}

impl SandboxNames {
    pub fn new(sandbox: impl Into<String>) -> Self {
        Self {
            sandbox: sandbox.into(),
        }
    }

    pub fn sandbox(&self) -> &str {
        &self.sandbox
    }

    pub fn stateful_set(&self) -> &str {
        &self.sandbox
    }

    pub fn primary_container(&self) -> &str {
        &self.sandbox
    }

    pub fn service(&self) -> String {
        format!("{}-service", self.sandbox)
    }

    pub fn app_ingress(&self) -> String {
        format!("{}-app-ingress", self.sandbox)
    }

    pub fn ttyd_ingress(&self) -> String {
        format!("{}-ttyd-ingress", self.sandbox)
    }

    pub fn filebrowser_ingress(&self) -> String {
        format!("{}-filebrowser-ingress", self.sandbox)
    }

    /// The three route names in app, terminal, file browser order.
    pub fn ingresses(&self) -> [String; 3] {
        [
            self.app_ingress(),
            self.ttyd_ingress(),
            self.filebrowser_ingress(),
        ]
    }

    /// The single pod of the stateful set.
    pub fn pod(&self) -> String {
        format!("{}-0", self.sandbox)
    }

    pub fn persistent_volume_claim(&self) -> String {
        format!("{}-{}-0", CLAIM_TEMPLATE, self.sandbox)
    }

    pub fn app_host(&self, domain: &str) -> String {
        format!("{}-app.{}", self.sandbox, domain)
    }

    pub fn ttyd_host(&self, domain: &str) -> String {
        format!("{}-ttyd.{}", self.sandbox, domain)
    }

    pub fn filebrowser_host(&self, domain: &str) -> String {
        format!("{}-filebrowser.{}", self.sandbox, domain)
    }
}

/// Normalize an opaque project identifier into a valid label value:
/// lowercase alphanumerics plus `-`, `_`, `.`, at most 63 characters,
/// starting and ending with an alphanumeric.
pub fn project_label_value(project: &str) -> String {
    let mapped: String = project
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .take(LABEL_VALUE_MAX)
        .collect();

    mapped
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_derived_names() {
        let names = SandboxNames::new("acme-x1");

        assert_eq!(names.stateful_set(), "acme-x1");
        assert_eq!(names.primary_container(), "acme-x1");
        assert_eq!(names.service(), "acme-x1-service");
        assert_eq!(names.app_ingress(), "acme-x1-app-ingress");
        assert_eq!(names.ttyd_ingress(), "acme-x1-ttyd-ingress");
        assert_eq!(names.filebrowser_ingress(), "acme-x1-filebrowser-ingress");
        assert_eq!(names.pod(), "acme-x1-0");
        assert_eq!(names.persistent_volume_claim(), "workspace-acme-x1-0");
    }

    #[test]
    fn test_hosts() {
        let names = SandboxNames::new("acme-x1");

        assert_eq!(names.app_host("usw.example.io"), "acme-x1-app.usw.example.io");
        assert_eq!(names.ttyd_host("usw.example.io"), "acme-x1-ttyd.usw.example.io");
        assert_eq!(
            names.filebrowser_host("usw.example.io"),
            "acme-x1-filebrowser.usw.example.io"
        );
    }

    #[rstest]
    #[case("proj_123", "proj_123")]
    #[case("My Project", "my-project")]
    #[case("  --weird//id--  ", "weird--id")]
    #[case("Ünïcode", "n-code")]
    #[case("", "")]
    fn test_project_label_value(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(project_label_value(input), expected);
    }

    #[test]
    fn test_project_label_value_is_truncated() {
        let long = "a".repeat(100);
        assert_eq!(project_label_value(&long).len(), 63);
    }
}
