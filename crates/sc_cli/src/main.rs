use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser};
use sc_core::config::DEFAULT_BASE_URL;
use sc_core::{ArticleQuery, ArticleUpdate, ClientConfig, ProfileUpdate, StorageKind, Tags, WxLoginRequest};
use sc_stores::Stores;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Debug, Clone, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_value = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| format!("Duration is too large: {}", s))?;
                let scale = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(scale)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| format!("Duration is too large: {}", s))?;
                current_number.clear();
                has_value = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number counts as seconds
        if !current_number.is_empty() {
            total_seconds = current_number
                .parse::<u64>()
                .ok()
                .and_then(|secs| total_seconds.checked_add(secs))
                .ok_or_else(|| format!("Duration is too large: {}", s))?;
            has_value = true;
        }

        if !has_value {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for the scissor article service", long_about = None)]
struct Cli {
    #[arg(long, env = "SCISSOR_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,
    #[arg(long, env = "SCISSOR_STORAGE", default_value = "file", help = "Where the session token is kept: file (default) or memory")]
    storage: String,
    #[arg(long, env = "SCISSOR_STORAGE_PATH")]
    storage_path: Option<PathBuf>,
    #[arg(long, env = "SCISSOR_TIMEOUT", help = "Request timeout (e.g. 30s, 1m); no timeout when unset")]
    timeout: Option<HumanDuration>,
    /// Log out when the server rejects the stored token
    #[arg(long)]
    logout_on_unauthorized: bool,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> anyhow::Result<ClientConfig> {
        let storage: StorageKind = self.storage.parse()?;
        Ok(ClientConfig::new(&self.api_url)?
            .with_storage(storage, self.storage_path.clone())
            .with_timeout(self.timeout.as_ref().map(|t| t.0))
            .with_clear_session_on_unauthorized(self.logout_on_unauthorized))
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Sign in with username and password
    Login {
        username: String,
        #[arg(long, env = "SCISSOR_PASSWORD")]
        password: String,
    },
    /// Sign in with a WeChat authorization code
    WxLogin {
        code: String,
        #[arg(long)]
        open_id: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
    },
    /// Create an account (does not sign in)
    Register {
        username: String,
        email: String,
        #[arg(long, env = "SCISSOR_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Update the signed-in user's profile
    Profile {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
    },
    Articles {
        #[command(subcommand)]
        command: ArticleCommands,
    },
    /// Generate a summary for an article
    Summarize { id: u64 },
}

#[derive(clap::Subcommand, Debug)]
enum ArticleCommands {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        tag: Option<String>,
    },
    Recent,
    Favorites,
    Tags,
    Search { query: String },
    Show { id: u64 },
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        summary: Option<String>,
        /// Comma-separated labels
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        source_url: Option<String>,
    },
    Delete { id: u64 },
    /// Toggle the favorite flag
    Favorite { id: u64 },
    ClearHistory,
    ClearFavorites,
    /// The public article feed
    Feed,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The store already recorded why a session action failed; surface that.
fn session_failure(stores: &Stores, fallback: &str) -> anyhow::Error {
    anyhow!(stores
        .session
        .status()
        .error
        .unwrap_or_else(|| fallback.to_string()))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    let stores = Stores::from_config(&config)
        .await
        .with_context(|| format!("Failed to initialize client for {}", config.base_url))?;
    let stores = &stores;

    match cli.command {
        Commands::Login { username, password } => {
            if stores.session.login(&username, &password).await.is_err() {
                return Err(session_failure(stores, "login failed"));
            }
            println!("✅ Signed in as {}", signed_in_name(stores, &username));
        }
        Commands::WxLogin { code, open_id, nickname } => {
            let request = WxLoginRequest {
                code,
                open_id: open_id.unwrap_or_default(),
                nickname: nickname.unwrap_or_default(),
            };
            if stores.session.wx_login(&request).await.is_err() {
                return Err(session_failure(stores, "wechat login failed"));
            }
            println!("✅ Signed in as {}", signed_in_name(stores, "WeChat user"));
        }
        Commands::Register { username, email, password } => {
            let user = stores.session.register(&username, &password, &email).await?;
            println!("🆕 Created account {} (id {})", user.username, user.id);
        }
        Commands::Logout => {
            stores.session.logout().await;
            println!("👋 Signed out");
        }
        Commands::Whoami => {
            if !stores.session.is_authenticated() {
                println!("Not signed in");
                return Ok(());
            }
            match stores.session.fetch_user_info().await {
                Ok(Some(user)) => render::print_user(&user),
                Ok(None) => println!("Not signed in"),
                Err(_) => return Err(session_failure(stores, "failed to fetch user info")),
            }
        }
        Commands::Profile { email, nickname } => {
            let update = ProfileUpdate { email, nickname };
            if update.is_empty() {
                return Err(anyhow!("Nothing to update: pass --email and/or --nickname"));
            }
            let user = stores.session.update_profile(&update).await?;
            render::print_user(&user);
        }
        Commands::Articles { command } => run_article_command(stores, command).await?,
        Commands::Summarize { id } => {
            let summary = stores.summaries.summarize(id).await?;
            info!("Summary length: {} chars", summary.summary.len());
            println!("{}", summary.summary);
        }
    }
    Ok(())
}

fn signed_in_name(stores: &Stores, fallback: &str) -> String {
    stores
        .session
        .current_user()
        .map(|user| user.display_name().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

async fn run_article_command(stores: &Stores, command: ArticleCommands) -> anyhow::Result<()> {
    let articles = &stores.articles;
    match command {
        ArticleCommands::List { page, page_size, tag } => {
            let mut query = ArticleQuery::new();
            if let Some(page) = page {
                query = query.page(page);
            }
            if let Some(page_size) = page_size {
                query = query.page_size(page_size);
            }
            if let Some(tag) = tag {
                query = query.tag(&tag);
            }
            articles.refresh(query).await?;
            render::print_articles(&articles.articles());
        }
        ArticleCommands::Recent => render::print_articles(&articles.get_recent_articles().await?),
        ArticleCommands::Favorites => render::print_articles(&articles.get_favorite_articles().await?),
        ArticleCommands::Tags => {
            articles.refresh_tags().await?;
            render::print_tags(&articles.tags());
        }
        ArticleCommands::Search { query } => render::print_articles(&articles.search_articles(&query).await?),
        ArticleCommands::Show { id } => render::print_article(&articles.get_article(id).await?),
        ArticleCommands::Update { id, title, content, summary, tags, source_url } => {
            let update = ArticleUpdate {
                title,
                content,
                summary,
                tags: tags.as_deref().map(Tags::parse),
                source_url,
            };
            let article = articles.update_article(id, &update).await?;
            println!("📝 Updated article {}", article.id);
            render::print_article(&article);
        }
        ArticleCommands::Delete { id } => {
            articles.delete_article(id).await?;
            println!("🗑️ Deleted article {}", id);
        }
        ArticleCommands::Favorite { id } => {
            let article = articles.toggle_favorite(id).await?;
            println!("⭐ Toggled favorite for \"{}\"", article.title);
        }
        ArticleCommands::ClearHistory => {
            articles.clear_history().await?;
            println!("🧹 History cleared");
        }
        ArticleCommands::ClearFavorites => {
            articles.clear_favorites().await?;
            println!("🧹 Favorites cleared");
        }
        ArticleCommands::Feed => render::print_articles(&articles.list_feed().await?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        assert_eq!("30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(30));
        assert_eq!("1m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("45".parse::<HumanDuration>().unwrap().0, Duration::from_secs(45));
        assert!("10x".parse::<HumanDuration>().is_err());
        assert!("".parse::<HumanDuration>().is_err());
        assert!("0s".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_human_duration_rejects_overflow() {
        assert!("9999999999999999h".parse::<HumanDuration>().is_err());
        assert!("5124095576030431h1h".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999999s".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999999".parse::<HumanDuration>().is_err());
        assert!(Cli::try_parse_from(["scissor", "--timeout", "9999999999999999h", "logout"]).is_err());
    }

    #[test]
    fn test_cli_builds_config() {
        let cli = Cli::try_parse_from([
            "scissor",
            "--api-url",
            "http://api.example.com:9000",
            "--storage",
            "memory",
            "--timeout",
            "10s",
            "--logout-on-unauthorized",
            "articles",
            "search",
            "rust",
        ])
        .unwrap();

        let config = cli.config().unwrap();
        assert_eq!(config.base_url.as_str(), "http://api.example.com:9000/");
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert!(config.clear_session_on_unauthorized);
        assert!(matches!(
            cli.command,
            Commands::Articles { command: ArticleCommands::Search { ref query } } if query == "rust"
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_storage() {
        let cli = Cli::try_parse_from(["scissor", "--storage", "redis", "logout"]).unwrap();
        assert!(cli.config().is_err());
    }

    #[test]
    fn test_update_parses_tags() {
        let cli = Cli::try_parse_from([
            "scissor", "articles", "update", "3", "--tags", "rust, ,web",
        ])
        .unwrap();
        match cli.command {
            Commands::Articles { command: ArticleCommands::Update { id, tags, .. } } => {
                assert_eq!(id, 3);
                assert_eq!(Tags::parse(&tags.unwrap()).labels(), &["rust", "web"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
