pub use clap::Parser;

use url::Url;

#[derive(Parser, Debug)]
#[command(name = "reprocess")]
#[command(about = "Queue entities and their ancestors for reprocessing")]
pub struct Args {
    /// Base URL of a running reprocess daemon
    #[arg(long, global = true, default_value = "http://localhost:3000")]
    pub remote: Url,

    #[command(subcommand)]
    pub command: crate::Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    #[test]
    fn test_submit_args() {
        let args = Args::try_parse_from([
            "reprocess",
            "submit",
            "--pi",
            "01KA1H53CP2TAW8P8VSZ8JX3S5",
            "--phases",
            "pinax,description",
            "--cascade",
            "--stop-at-pi",
            "01KA1H53CP2TAW8P8VSZ8JX3S6",
        ])
        .unwrap();

        assert_eq!(args.remote.as_str(), "http://localhost:3000/");
        let Command::Submit(submit) = args.command else {
            panic!("expected submit");
        };
        assert_eq!(submit.phases, vec!["pinax", "description"]);
        assert!(submit.cascade);
        assert_eq!(
            submit.stop_at_pi.as_deref(),
            Some("01KA1H53CP2TAW8P8VSZ8JX3S6")
        );
    }

    #[test]
    fn test_daemon_args() {
        let args = Args::try_parse_from([
            "reprocess",
            "--remote",
            "http://10.0.0.2:3000",
            "daemon",
            "--dev",
            "--port",
            "4000",
            "--dev-fixtures",
            "fixtures.json",
            "--staging-dir",
            "/tmp/staging",
        ])
        .unwrap();

        assert_eq!(args.remote.host_str(), Some("10.0.0.2"));
        let Command::Daemon(daemon) = args.command else {
            panic!("expected daemon");
        };
        assert!(daemon.dev);
        assert_eq!(daemon.port, Some(4000));
        assert!(daemon.dev_fixtures.is_some());
        assert!(daemon.config.is_none());
    }

    #[test]
    fn test_submit_requires_phases() {
        assert!(Args::try_parse_from(["reprocess", "submit", "--pi", "x"]).is_err());
    }
}
