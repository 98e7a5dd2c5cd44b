//! wykop-monitor CLI - prints new Wykop content as JSON lines.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clap::builder::PossibleValuesParser;
use wykop_monitor::{
    Credentials, Event, Listing, Login, Monitor, MonitorConfig, NotificationType, TagContent,
};

/// Watch Wykop feeds and print every new item as a JSON line.
#[derive(Parser)]
#[command(name = "wykop-monitor")]
#[command(about = "Polling change notifications for Wykop")]
#[command(version)]
pub struct Cli {
    /// Seconds between checks
    #[arg(long, env = "WYKOP_INTERVAL", default_value = "60")]
    interval: u64,

    /// Application key
    #[arg(long, env = "WYKOP_APPKEY")]
    appkey: Option<String>,

    /// Application secret
    #[arg(long, env = "WYKOP_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Pre-issued access token
    #[arg(long, env = "WYKOP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Pre-issued refresh token
    #[arg(long, env = "WYKOP_RTOKEN", hide_env_values = true)]
    rtoken: Option<String>,

    /// API root URL
    #[arg(long, env = "WYKOP_ENVIRONMENT")]
    environment: Option<String>,

    /// Log in as this user (requires --password)
    #[arg(long, env = "WYKOP_USERNAME", requires = "password")]
    username: Option<String>,

    /// Password for --username
    #[arg(long, env = "WYKOP_PASSWORD", hide_env_values = true, requires = "username")]
    password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Log every API request
    #[arg(long)]
    debug_api: bool,

    /// Watch new upcoming links
    #[arg(long)]
    links: bool,

    /// Watch new microblog entries
    #[arg(long)]
    entries: bool,

    /// Category for --links / --entries
    #[arg(long)]
    category: Option<String>,

    /// Watch a tag (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Watch links added by a user (repeatable)
    #[arg(long = "user-links", value_name = "USERNAME")]
    user_links: Vec<String>,

    /// Watch entries added by a user (repeatable)
    #[arg(long = "user-entries", value_name = "USERNAME")]
    user_entries: Vec<String>,

    /// Watch comments under a link (repeatable)
    #[arg(long = "link-comments", value_name = "LINK_ID")]
    link_comments: Vec<u64>,

    /// Watch comments under an entry (repeatable)
    #[arg(long = "entry-comments", value_name = "ENTRY_ID")]
    entry_comments: Vec<u64>,

    /// Watch personal notifications (requires login)
    #[arg(long)]
    notifications: bool,

    /// Only deliver these notification types (repeatable)
    #[arg(
        long = "notification-type",
        value_name = "TYPE",
        requires = "notifications",
        value_parser = PossibleValuesParser::new(NotificationType::ALL)
    )]
    notification_types: Vec<String>,

    /// Watch private-message conversations (requires login)
    #[arg(long)]
    pms: bool,

    /// Watch the conversation with a user (repeatable, requires login)
    #[arg(long = "conversation", value_name = "USERNAME")]
    conversations: Vec<String>,

    /// Skip messages you wrote yourself
    #[arg(long)]
    exclude_self: bool,
}

impl Cli {
    fn config(&self) -> MonitorConfig {
        let login = match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Login {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        MonitorConfig {
            interval: Duration::from_secs(self.interval),
            credentials: Credentials {
                appkey: self.appkey.clone(),
                secret: self.secret.clone(),
                token: self.token.clone(),
                refresh_token: self.rtoken.clone(),
                environment: self.environment.clone(),
            },
            login,
            debug: self.debug,
            debug_api: self.debug_api,
            ..MonitorConfig::default()
        }
    }

    fn register(&self, monitor: &Monitor) -> Result<()> {
        let listing = Listing {
            category: self.category.clone(),
            bucket: None,
        };

        if self.links {
            monitor.links(listing.clone(), print_event)?;
        }
        if self.entries {
            monitor.entries(listing, print_event)?;
        }
        for tag in &self.tags {
            monitor.tags(tag, Some(TagContent::All), print_event)?;
        }
        for username in &self.user_links {
            monitor.user_links(username, print_event)?;
        }
        for username in &self.user_entries {
            monitor.user_entries(username, print_event)?;
        }
        for &link_id in &self.link_comments {
            monitor.link_comments(link_id, print_event)?;
        }
        for &entry_id in &self.entry_comments {
            monitor.entry_comments(entry_id, print_event)?;
        }
        if self.notifications {
            let types = (!self.notification_types.is_empty())
                .then(|| self.notification_types.clone());
            monitor.notifications(types, print_event)?;
        }
        if self.pms {
            monitor.pms(self.exclude_self, print_event)?;
        }
        for username in &self.conversations {
            monitor.conversation(username, self.exclude_self, print_event)?;
        }
        Ok(())
    }
}

fn print_event(event: Event) -> Result<()> {
    let line = serde_json::to_string(&event.payload).context("Failed to serialize event")?;
    println!("{line}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new("wykop_monitor=debug,info")
    } else {
        EnvFilter::new("wykop_monitor=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let monitor = Monitor::new();
    cli.register(&monitor)?;

    monitor
        .start(cli.config())
        .await
        .context("Monitoring did not start")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    monitor.stop();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_accepts_known_types() {
        let cli = Cli::try_parse_from([
            "wykop-monitor",
            "--notifications",
            "--notification-type",
            NotificationType::NEW_FOLLOWER,
            "--notification-type",
            "system",
        ])
        .unwrap();
        assert_eq!(cli.notification_types, ["new_follower", "system"]);
    }

    #[test]
    fn test_notification_type_rejects_unknown_types() {
        let result = Cli::try_parse_from([
            "wykop-monitor",
            "--notifications",
            "--notification-type",
            "new_folower",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_login_requires_password() {
        let result = Cli::try_parse_from(["wykop-monitor", "--username", "alice"]);
        assert!(result.is_err());
    }
}
