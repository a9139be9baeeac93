//! Instance bootstrap scripts
//!
//! User data is executed once by the instance's init system on first boot.
//! Its content is opaque here; it is only assembled and base64-wrapped.

use serde_json::Value;
use webstack_cloud::intrinsic;

const LINUX_SHEBANG: &str = "#!/bin/bash";

/// Built-in script: Apache httpd serving a hello page
pub const HTTPD_HELLO_WORLD: &[&str] = &[
    "yum update -y",
    "yum install -y httpd",
    "systemctl start httpd",
    "systemctl enable httpd",
    r#"echo "<h1>Hello World from $(hostname -f)</h1>" > /var/www/html/index.html"#,
];

/// Get the commands for a built-in script name
pub fn get_builtin_script(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "httpd-hello-world" => Some(HTTPD_HELLO_WORLD),
        _ => None,
    }
}

/// Shell commands run at first boot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    commands: Vec<String>,
}

impl UserData {
    pub fn for_linux() -> Self {
        Self::default()
    }

    pub fn add_commands<S: AsRef<str>>(&mut self, commands: &[S]) {
        self.commands
            .extend(commands.iter().map(|c| c.as_ref().to_string()));
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Script text: shebang line followed by one command per line
    pub fn render(&self) -> String {
        std::iter::once(LINUX_SHEBANG)
            .chain(self.commands.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `UserData` property value
    pub fn to_property(&self) -> Value {
        intrinsic::base64(self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        let mut user_data = UserData::for_linux();
        user_data.add_commands(&["yum update -y", "yum install -y httpd"]);
        assert_eq!(
            user_data.render(),
            "#!/bin/bash\nyum update -y\nyum install -y httpd"
        );
    }

    #[test]
    fn test_empty_renders_shebang_only() {
        let user_data = UserData::for_linux();
        assert!(user_data.is_empty());
        assert_eq!(user_data.render(), "#!/bin/bash");
    }

    #[test]
    fn test_property_is_base64_wrapped() {
        let mut user_data = UserData::for_linux();
        user_data.add_commands(&["echo hi"]);
        assert_eq!(
            user_data.to_property(),
            json!({"Fn::Base64": "#!/bin/bash\necho hi"})
        );
    }

    #[test]
    fn test_builtin_scripts() {
        let httpd = get_builtin_script("httpd-hello-world").unwrap();
        assert_eq!(httpd.len(), 5);
        assert_eq!(httpd[1], "yum install -y httpd");
        assert!(get_builtin_script("unknown").is_none());
    }
}
