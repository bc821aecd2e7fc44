// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names read by kubedev

// Cluster Placement
pub const KUBEDEV_NAMESPACE: &str = "KUBEDEV_NAMESPACE";
pub const KUBEDEV_INGRESS_DOMAIN: &str = "KUBEDEV_INGRESS_DOMAIN";
pub const KUBEDEV_INGRESS_CLASS: &str = "KUBEDEV_INGRESS_CLASS";

// Workload Images
pub const KUBEDEV_RUNTIME_IMAGE: &str = "KUBEDEV_RUNTIME_IMAGE";
pub const KUBEDEV_FILEBROWSER_IMAGE: &str = "KUBEDEV_FILEBROWSER_IMAGE";

// Storage & Sizing
pub const KUBEDEV_STORAGE_CLASS: &str = "KUBEDEV_STORAGE_CLASS";
pub const KUBEDEV_RESOURCE_TIER: &str = "KUBEDEV_RESOURCE_TIER";

// Terminal Access
pub const KUBEDEV_TTYD_USER: &str = "KUBEDEV_TTYD_USER";

/// Sandbox env var carrying the terminal access token. When present in the
/// env map passed to create, the terminal URL embeds a basic-auth credential.
pub const TTYD_ACCESS_TOKEN: &str = "TTYD_ACCESS_TOKEN";

/// Sandbox env var naming the terminal basic-auth user. Defaults to
/// `KUBEDEV_TTYD_USER`; a value in the create env map takes precedence.
pub const TTYD_USER: &str = "TTYD_USER";
