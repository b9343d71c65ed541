//! Command-line interface.

use std::io::{self, Write};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::api::{self, BlockingClient, FieldDefinition, Fields, Issue, SearchService};
use crate::config::{Config, Profile};
use crate::error::Result;
use crate::walker::{MemorySink, Walker};

/// Fields requested when `--fields` is not given; enough for one line per issue.
const LISTING_FIELDS: [&str; 2] = ["summary", "status"];

/// Walk JIRA search results from the terminal.
#[derive(Debug, Parser)]
#[command(name = "jira-walker", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every issue matching a JQL query.
    Search(SearchArgs),
    /// Print the number of issues matching a JQL query.
    Count(CountArgs),
    /// Show a single issue.
    Show {
        /// Issue key, e.g. PROJ-123.
        key: String,
        /// Profile to use instead of the default.
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// List the fields the instance knows about.
    Fields {
        /// Only list custom fields.
        #[arg(long)]
        custom: bool,
        /// Profile to use instead of the default.
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Store credentials for a JIRA instance.
    Login(LoginArgs),
    /// Forget a profile and its stored token.
    Logout {
        /// Profile to remove.
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// The JQL query.
    pub jql: String,
    /// Comma-separated field IDs to request.
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,
    /// Issues per page (defaults to the configured page size).
    #[arg(long)]
    pub page_size: Option<u32>,
    /// Stop after this many issues.
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show custom fields under their names (also `automap_fields` in the config).
    #[arg(long)]
    pub field_names: bool,
    /// Profile to use instead of the default.
    #[arg(short, long)]
    pub profile: Option<String>,
}

#[derive(Debug, Args)]
pub struct CountArgs {
    /// The JQL query.
    pub jql: String,
    /// Profile to use instead of the default.
    #[arg(short, long)]
    pub profile: Option<String>,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Name for the new profile.
    #[arg(long)]
    pub name: String,
    /// JIRA instance URL.
    #[arg(long)]
    pub url: String,
    /// Account email address.
    #[arg(long)]
    pub email: String,
    /// API token.
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub token: String,
}

/// Outcome of listing a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Issues written.
    pub printed: usize,
    /// Issues the server reported; zero if no page was fetched.
    pub total: u32,
    /// Fetch failures that ended the listing early.
    pub failures: Vec<String>,
}

/// Run a parsed command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Search(args) => search(args),
        Command::Count(args) => count(args),
        Command::Show { key, profile } => show(&key, profile.as_deref()),
        Command::Fields { custom, profile } => fields(custom, profile.as_deref()),
        Command::Login(args) => login(args),
        Command::Logout { name } => logout(&name),
    }
}

fn connect(config: &Config, profile: Option<&str>) -> Result<BlockingClient> {
    let profile = config.resolve_profile(profile)?;
    info!(profile = %profile.name, "Connecting");
    Ok(BlockingClient::connect(profile)?)
}

fn search(args: SearchArgs) -> Result<()> {
    let config = Config::load()?;
    let client = connect(&config, args.profile.as_deref())?
        .with_automap_fields(args.field_names || config.settings.automap_fields);

    let fields = if args.fields.is_empty() {
        Fields::from(&LISTING_FIELDS[..])
    } else {
        Fields::List(args.fields)
    };
    let page_size = args.page_size.unwrap_or(config.settings.page_size);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let listing = list_issues(&client, &args.jql, fields, page_size, args.limit, &mut out)?;

    eprintln!("{} of {} issues", listing.printed, listing.total);
    for failure in &listing.failures {
        eprintln!("warning: listing stopped early: {}", failure);
    }
    Ok(())
}

/// Write one line per issue matching `jql` to `out`.
pub fn list_issues<S: SearchService>(
    service: S,
    jql: &str,
    fields: Fields,
    page_size: u32,
    limit: Option<usize>,
    out: &mut impl Write,
) -> Result<Listing> {
    let sink = MemorySink::new();
    let mut walker = Walker::with_page_size(service, page_size)?
        .with_diagnostics(sink.clone())
        .map(|issue| Ok(format_line(issue)));
    walker.configure(jql, Some(fields));

    let mut printed = 0;
    for line in walker.iter().take(limit.unwrap_or(usize::MAX)) {
        writeln!(out, "{}", line?)?;
        printed += 1;
    }

    Ok(Listing {
        printed,
        total: walker.total_known().unwrap_or(0),
        failures: sink.messages(),
    })
}

/// `KEY<TAB>STATUS<TAB>SUMMARY`, with `-` for fields that were not returned.
pub fn format_line(issue: &Issue) -> String {
    format!(
        "{}\t{}\t{}",
        issue.key,
        issue.status().unwrap_or("-"),
        issue.summary().unwrap_or("-")
    )
}

fn count(args: CountArgs) -> Result<()> {
    let config = Config::load()?;
    let client = connect(&config, args.profile.as_deref())?;

    let mut walker = Walker::with_page_size(&client, 1)?;
    walker.configure(args.jql, Some(Fields::List(vec!["key".to_string()])));
    println!("{}", walker.count()?);
    Ok(())
}

fn show(key: &str, profile: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let client = connect(&config, profile)?;

    let issue = client.get_issue(key)?;
    println!("{}", render_issue(&issue));
    println!("\n{}", client.browse_url(&issue.key));
    Ok(())
}

/// A multi-line summary of one issue, omitting fields that are not set.
pub fn render_issue(issue: &Issue) -> String {
    let mut text = issue.to_string();
    let details = [
        ("Type", issue.issue_type()),
        ("Status", issue.status()),
        ("Priority", issue.priority()),
        ("Assignee", issue.assignee()),
    ];
    for (label, value) in details {
        if let Some(value) = value {
            text.push_str(&format!("\n{:<9} {}", format!("{}:", label), value));
        }
    }

    let description = issue.description_text();
    if !description.is_empty() {
        text.push_str("\n\n");
        text.push_str(&description);
    }
    text
}

fn fields(custom_only: bool, profile: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let client = connect(&config, profile)?;

    for field in client.get_fields()?.iter().filter(|f| f.custom || !custom_only) {
        println!("{}", format_field(field));
    }
    Ok(())
}

/// `ID<TAB>NAME`.
pub fn format_field(field: &FieldDefinition) -> String {
    format!("{}\t{}", field.id, field.name)
}

fn login(args: LoginArgs) -> Result<()> {
    let mut config = Config::load()?;
    let profile = Profile::new(args.name, args.url, args.email);
    profile.validate()?;

    let client = BlockingClient::with_credentials(&profile.url, &profile.email, &args.token)?;
    let user = client.validate_connection()?;

    api::auth::store_token(&profile.name, &args.token)?;
    if config.settings.default_profile.is_none() {
        config.settings.default_profile = Some(profile.name.clone());
    }
    println!("Logged in to {} as {}", profile.url, user.display_name);
    config.upsert_profile(profile);
    config.save()?;
    Ok(())
}

fn logout(name: &str) -> Result<()> {
    let mut config = Config::load()?;
    let profile = config.remove_profile(name)?;
    if let Err(e) = api::auth::delete_token(&profile.name) {
        warn!(profile = %profile.name, error = %e, "Could not delete stored token");
    }
    config.save()?;
    println!("Removed profile '{}'", profile.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, PageResult, Query};
    use serde_json::{json, Value};

    struct TwoPages;

    impl SearchService for TwoPages {
        fn search(&self, _query: &Query, start_at: u32, _page_size: u32) -> api::Result<PageResult> {
            let issue = |n: u32| {
                Issue::new(n.to_string(), format!("PROJ-{}", n))
                    .with_field("summary", format!("Issue {}", n))
                    .with_field("status", json!({"id": "1", "name": "Open"}))
            };
            match start_at {
                0 => Ok(PageResult::new(3, 0, vec![issue(1), issue(2)])),
                2 => Ok(PageResult::new(3, 2, vec![issue(3)])),
                _ => Err(ApiError::ServerError("no such page".to_string())),
            }
        }
    }

    struct Broken;

    impl SearchService for Broken {
        fn search(&self, _query: &Query, start_at: u32, _page_size: u32) -> api::Result<PageResult> {
            if start_at == 0 {
                Ok(PageResult::new(4, 0, vec![Issue::new("1", "PROJ-1")]))
            } else {
                Err(ApiError::ServerError("gateway timeout".to_string()))
            }
        }
    }

    #[test]
    fn test_list_issues_writes_every_page() {
        let mut out = Vec::new();
        let listing =
            list_issues(TwoPages, "project = PROJ", Fields::All, 2, None, &mut out).unwrap();

        assert_eq!(listing.printed, 3);
        assert_eq!(listing.total, 3);
        assert!(listing.failures.is_empty());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "PROJ-1\tOpen\tIssue 1\nPROJ-2\tOpen\tIssue 2\nPROJ-3\tOpen\tIssue 3\n"
        );
    }

    #[test]
    fn test_list_issues_respects_limit() {
        let mut out = Vec::new();
        let listing = list_issues(TwoPages, "x", Fields::All, 2, Some(1), &mut out).unwrap();
        assert_eq!(listing.printed, 1);
        assert_eq!(listing.total, 3);
    }

    #[test]
    fn test_list_issues_reports_early_stop() {
        let mut out = Vec::new();
        let listing = list_issues(Broken, "x", Fields::All, 1, None, &mut out).unwrap();
        assert_eq!(listing.printed, 1);
        assert_eq!(listing.total, 4);
        assert_eq!(listing.failures.len(), 1);
        assert!(listing.failures[0].contains("gateway timeout"));
    }

    #[derive(Default)]
    struct Down {
        calls: std::cell::Cell<u32>,
    }

    impl SearchService for Down {
        fn search(&self, _query: &Query, _start: u32, _size: u32) -> api::Result<PageResult> {
            self.calls.set(self.calls.get() + 1);
            Err(ApiError::ServerError("down".to_string()))
        }
    }

    #[test]
    fn test_list_issues_unreachable_server_fetches_once() {
        let service = Down::default();
        let mut out = Vec::new();
        let listing = list_issues(&service, "x", Fields::All, 5, None, &mut out).unwrap();

        assert_eq!(service.calls.get(), 1);
        assert_eq!(listing.printed, 0);
        assert_eq!(listing.total, 0);
        assert_eq!(listing.failures.len(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_format_line_without_fields() {
        assert_eq!(format_line(&Issue::new("1", "PROJ-1")), "PROJ-1\t-\t-");
    }

    #[test]
    fn test_render_issue() {
        let issue = Issue::new("1", "PROJ-1")
            .with_field("summary", "Fix login")
            .with_field("issuetype", json!({"name": "Bug"}))
            .with_field("status", json!({"name": "In Progress"}))
            .with_field("assignee", Value::Null)
            .with_field("description", "Steps to reproduce");

        assert_eq!(
            render_issue(&issue),
            "PROJ-1: Fix login\nType:     Bug\nStatus:   In Progress\n\nSteps to reproduce"
        );
        assert_eq!(render_issue(&Issue::new("2", "PROJ-2")), "PROJ-2");
    }

    #[test]
    fn test_format_field() {
        let field = FieldDefinition {
            id: "customfield_10010".to_string(),
            name: "Story Points".to_string(),
            custom: true,
        };
        assert_eq!(format_field(&field), "customfield_10010\tStory Points");
    }

    #[test]
    fn test_parse_show_and_fields() {
        let cli = Cli::try_parse_from(["jira-walker", "show", "PROJ-7", "-p", "work"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Show { ref key, ref profile }
                if key == "PROJ-7" && profile.as_deref() == Some("work")
        ));

        let cli = Cli::try_parse_from(["jira-walker", "fields", "--custom"]).unwrap();
        assert!(matches!(cli.command, Command::Fields { custom: true, profile: None }));
    }

    #[test]
    fn test_parse_search_args() {
        let cli = Cli::try_parse_from([
            "jira-walker",
            "search",
            "project = PROJ",
            "--fields",
            "summary,status",
            "--page-size",
            "20",
            "-p",
            "work",
        ])
        .unwrap();

        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.jql, "project = PROJ");
                assert_eq!(args.fields, vec!["summary", "status"]);
                assert_eq!(args.page_size, Some(20));
                assert_eq!(args.profile.as_deref(), Some("work"));
                assert!(args.limit.is_none());
                assert!(!args.field_names);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_login_token_flag() {
        let cli = Cli::try_parse_from([
            "jira-walker",
            "login",
            "--name",
            "work",
            "--url",
            "https://company.atlassian.net",
            "--email",
            "me@company.com",
            "--token",
            "secret",
        ])
        .unwrap();

        assert!(matches!(cli.command, Command::Login(ref args) if args.token == "secret"));
    }
}
