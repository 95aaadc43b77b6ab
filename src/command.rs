use std::collections::BTreeMap;

use crate::host::{HostRecord, DEFAULT_SSH_PORT};
use crate::profile::TerminalProfile;

pub const SSH_PROGRAM: &str = "ssh";

/// The `ssh` argument vector for `host`, program name included.
///
/// Each field stays a separate argument; this is what gets executed, never
/// a joined shell string.
pub fn build_ssh_args(host: &HostRecord) -> Vec<String> {
    let mut args = vec![SSH_PROGRAM.to_string()];
    if !host.certificate.is_empty() {
        args.push("-i".to_string());
        args.push(host.certificate.clone());
    }
    if host.port != DEFAULT_SSH_PORT {
        args.push("-p".to_string());
        args.push(host.port.to_string());
    }
    args.push(host.target());
    args
}

/// Shell-quoted rendering of [`build_ssh_args`], for display only.
pub fn build_display_command(host: &HostRecord) -> String {
    shell_words::join(build_ssh_args(host))
}

/// Git identity variables a profile launch exports.
pub fn build_environment(profile: &TerminalProfile) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("GIT_AUTHOR_NAME".to_string(), profile.git_username.clone());
    env.insert("GIT_COMMITTER_NAME".to_string(), profile.git_username.clone());
    env.insert("GIT_AUTHOR_EMAIL".to_string(), profile.git_email.clone());
    env.insert("GIT_COMMITTER_EMAIL".to_string(), profile.git_email.clone());

    if !profile.ssh_key_path.is_empty() {
        env.insert(
            "GIT_SSH_COMMAND".to_string(),
            format!(
                "{} -i {} -o IdentitiesOnly=yes",
                SSH_PROGRAM,
                shell_words::quote(&profile.ssh_key_path)
            ),
        );
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(ip: &str, username: &str, port: u16, certificate: &str) -> HostRecord {
        HostRecord {
            ip: ip.into(),
            username: username.into(),
            port,
            certificate: certificate.into(),
            ..HostRecord::new("test", ip)
        }
    }

    #[test]
    fn test_minimal_ssh_args() {
        assert_eq!(build_ssh_args(&host("h", "", 22, "")), vec!["ssh", "h"]);
    }

    #[test]
    fn test_full_ssh_args() {
        assert_eq!(
            build_ssh_args(&host("h", "u", 2222, "/k")),
            vec!["ssh", "-i", "/k", "-p", "2222", "u@h"]
        );
    }

    #[test]
    fn test_links_never_reach_ssh() {
        let mut h = host("h", "", 22, "");
        h.links.push(crate::host::Link {
            name: "x".into(),
            url: "https://x".into(),
        });
        assert_eq!(build_ssh_args(&h), vec!["ssh", "h"]);
    }

    #[test]
    fn test_hostile_fields_stay_single_arguments() {
        let args = build_ssh_args(&host("h; rm -rf ~", "", 22, "/keys/my key"));
        assert_eq!(args, vec!["ssh", "-i", "/keys/my key", "h; rm -rf ~"]);
    }

    #[test]
    fn test_display_command_is_quoted() {
        let display = build_display_command(&host("h", "u", 22, "/keys/my key"));
        assert_eq!(display, "ssh -i '/keys/my key' u@h");
        assert_eq!(build_display_command(&host("h", "", 22, "")), "ssh h");
    }

    #[test]
    fn test_environment_without_key() {
        let env = build_environment(&TerminalProfile::new("w", "Jane", "jane@corp.com"));
        assert_eq!(env.len(), 4);
        assert_eq!(env["GIT_AUTHOR_NAME"], "Jane");
        assert_eq!(env["GIT_COMMITTER_NAME"], "Jane");
        assert_eq!(env["GIT_AUTHOR_EMAIL"], "jane@corp.com");
        assert_eq!(env["GIT_COMMITTER_EMAIL"], "jane@corp.com");
        assert!(!env.contains_key("GIT_SSH_COMMAND"));
    }

    #[test]
    fn test_environment_with_key_quotes_path() {
        let mut profile = TerminalProfile::new("w", "Jane", "jane@corp.com");
        profile.ssh_key_path = "/home/jane/my keys/id_work".into();
        let env = build_environment(&profile);
        assert_eq!(
            env["GIT_SSH_COMMAND"],
            "ssh -i '/home/jane/my keys/id_work' -o IdentitiesOnly=yes"
        );

        profile.ssh_key_path = "/keys/id".into();
        let env = build_environment(&profile);
        assert_eq!(env["GIT_SSH_COMMAND"], "ssh -i /keys/id -o IdentitiesOnly=yes");
    }
}
