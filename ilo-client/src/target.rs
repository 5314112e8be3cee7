use std::fmt;

/// Redfish service root appended to bare host names.
pub const SERVICE_ROOT: &str = "/redfish/v1";

/// One controller and the credentials for a single scrape.
///
/// A target is built by the HTTP layer from the inbound request and dropped
/// with it. The password is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Target {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Base URL of the controller, `https://{host}` unless the host
    /// already carries a scheme.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("https://") || host.starts_with("http://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }

    /// Absolute URL for a resource path.
    ///
    /// Paths returned by the controller (`@odata.id`) already start with the
    /// service root; short paths such as `/Systems/1/` get it prepended.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with(SERVICE_ROOT) {
            format!("{}{}", self.base_url(), path)
        } else {
            format!("{}{}{}", self.base_url(), SERVICE_ROOT, path)
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_short_path() {
        let target = Target::new("10.0.0.5", "admin", "secret");
        assert_eq!(
            target.url_for("/Systems/1/"),
            "https://10.0.0.5/redfish/v1/Systems/1/"
        );
    }

    #[test]
    fn test_url_for_odata_id() {
        let target = Target::new("10.0.0.5", "admin", "secret");
        assert_eq!(
            target.url_for("/redfish/v1/Systems/1/Memory/proc1dimm1/"),
            "https://10.0.0.5/redfish/v1/Systems/1/Memory/proc1dimm1/"
        );
    }

    #[test]
    fn test_host_with_scheme() {
        let target = Target::new("http://127.0.0.1:8080/", "admin", "secret");
        assert_eq!(
            target.url_for("/Managers/1/"),
            "http://127.0.0.1:8080/redfish/v1/Managers/1/"
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let target = Target::new("ilo01", "admin", "hunter2");
        let printed = format!("{:?}", target);

        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
    }
}
