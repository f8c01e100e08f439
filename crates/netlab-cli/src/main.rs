//! NETLAB operator CLI
//!
//! The `netlab` command inspects what the generator hands out to a student
//! without touching a container engine or the grading database.
//!
//! ## Commands
//!
//! - `topics`: List topics with their tasks, deadlines and capabilities
//! - `variant`: Print the full variant of a student in a topic
//! - `answer`: Grade a free-text answer against a student's variant
//! - `check-plan`: Show the containers, log files and predicate of each check

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use netlab_core::config::{DEFAULT_SOCKET_PATH, DEFAULT_VPN_IMAGE};
use netlab_core::{LabConfig, TopicRegistry};
use netlab_runtime::ContainerSpec;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "netlab")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-student network lab variants", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Generator settings. Each flag falls back to its environment variable.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Secret every variant is derived from
    #[arg(long, env = "SECRET_SEED", hide_env_values = true, global = true)]
    secret_seed: Option<String>,

    /// Host path of the bot callback socket
    #[arg(long, env = "SOCKET_PATH", default_value = DEFAULT_SOCKET_PATH, global = true)]
    socket_path: String,

    /// Image of the per-lab VPN container
    #[arg(long, env = "VPN_IMAGE", default_value = DEFAULT_VPN_IMAGE, global = true)]
    vpn_image: String,

    /// Answer pattern for the DNS `ip` task
    #[arg(long, env = "DNS_REGEXP_IP", global = true)]
    dns_regexp_ip: Option<String>,

    /// Answer pattern for the DNS `servers` task
    #[arg(long, env = "DNS_REGEXP_SERVERS", global = true)]
    dns_regexp_servers: Option<String>,

    /// Seconds to wait for checker containers
    #[arg(long, env = "CHECK_TIMEOUT_SECS", global = true)]
    check_timeout_secs: Option<u64>,
}

impl ConfigArgs {
    fn to_config(&self) -> Result<LabConfig> {
        let secret = self
            .secret_seed
            .clone()
            .filter(|s| !s.is_empty())
            .context("SECRET_SEED is required (flag --secret-seed or environment)")?;

        let mut config = LabConfig::new(secret)
            .with_socket_path(self.socket_path.clone())
            .with_vpn_image(self.vpn_image.clone());
        if let Some(pattern) = &self.dns_regexp_ip {
            config.dns_ip_pattern = pattern.clone();
        }
        if let Some(pattern) = &self.dns_regexp_servers {
            config.dns_servers_pattern = pattern.clone();
        }
        if let Some(secs) = self.check_timeout_secs {
            config = config.with_check_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List available topics
    Topics,

    /// Print the variant of a student
    Variant {
        /// Topic slug (ip, dhcp, dhcpd, dns, firewall, practice)
        topic: String,

        /// Student id
        #[arg(short, long)]
        subject: i64,
    },

    /// Grade an answer without recording it
    Answer {
        /// Topic slug
        topic: String,

        /// Task slug
        task: String,

        /// Submitted answer
        answer: String,

        /// Student id
        #[arg(short, long)]
        subject: i64,
    },

    /// Show how the checks of a student's variant would run
    CheckPlan {
        /// Topic slug
        topic: String,

        /// Student id
        #[arg(short, long)]
        subject: i64,

        /// Only this check
        #[arg(short, long)]
        check: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    netlab_core::init_tracing(cli.json, level);

    let registry = TopicRegistry::standard();
    let output = match cli.command {
        Commands::Topics => cmd_topics(&registry)?,
        Commands::Variant { topic, subject } => {
            cmd_variant(&registry, &cli.config.to_config()?, &topic, subject)?
        }
        Commands::Answer {
            topic,
            task,
            answer,
            subject,
        } => cmd_answer(
            &registry,
            &cli.config.to_config()?,
            &topic,
            &task,
            &answer,
            subject,
        )?,
        Commands::CheckPlan {
            topic,
            subject,
            check,
        } => cmd_check_plan(
            &registry,
            &cli.config.to_config()?,
            &topic,
            subject,
            check.as_deref(),
        )?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Serialize)]
struct TopicSummary {
    slug: &'static str,
    title: &'static str,
    deadline: Option<String>,
    capabilities: Vec<netlab_core::Capability>,
    tasks: Vec<netlab_core::TopicTask>,
    max_points: f64,
}

fn cmd_topics(registry: &TopicRegistry) -> Result<Value> {
    let topics: Vec<_> = registry
        .iter()
        .map(|topic| TopicSummary {
            slug: topic.slug(),
            title: topic.title(),
            deadline: topic.deadline().map(|d| d.to_rfc3339()),
            capabilities: topic.capabilities().to_vec(),
            tasks: topic.tasks().to_vec(),
            max_points: topic.tasks().iter().map(|t| t.points).sum(),
        })
        .collect();
    Ok(serde_json::to_value(topics)?)
}

fn cmd_variant(
    registry: &TopicRegistry,
    config: &LabConfig,
    topic: &str,
    subject: i64,
) -> Result<Value> {
    let variant = registry
        .build_variant(topic, config, subject)
        .with_context(|| format!("failed to build {topic} variant for {subject}"))?;
    Ok(serde_json::to_value(&variant)?)
}

fn cmd_answer(
    registry: &TopicRegistry,
    config: &LabConfig,
    topic: &str,
    task: &str,
    answer: &str,
    subject: i64,
) -> Result<Value> {
    let variant = registry.build_variant(topic, config, subject)?;
    let matcher = variant
        .matcher(task)
        .with_context(|| format!("topic {topic} has no free-text task {task}"))?;
    let correct = matcher.matches(answer);
    info!(topic, task, subject, correct, "answer evaluated");
    Ok(serde_json::json!({
        "topic": topic,
        "task": task,
        "subject": subject,
        "correct": correct,
    }))
}

#[derive(Serialize)]
struct CheckPlan<'a> {
    containers: &'a [ContainerSpec],
    logs: &'a BTreeMap<usize, String>,
    predicate: Option<&'static str>,
}

fn cmd_check_plan(
    registry: &TopicRegistry,
    config: &LabConfig,
    topic: &str,
    subject: i64,
    only: Option<&str>,
) -> Result<Value> {
    let variant = registry.build_variant(topic, config, subject)?;
    if let Some(name) = only {
        anyhow::ensure!(
            variant.check(name).is_some(),
            "topic {topic} has no check {name}"
        );
    }

    let plans: BTreeMap<_, _> = variant
        .checks
        .iter()
        .filter(|(name, _)| only.map_or(true, |o| o == name.as_str()))
        .map(|(name, def)| {
            let plan = CheckPlan {
                containers: &def.containers,
                logs: &def.logs,
                predicate: def.predicate.as_ref().map(|p| p.name()),
            };
            (name.as_str(), plan)
        })
        .collect();
    Ok(serde_json::to_value(plans)?)
}
