use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use countries_core::{
    App, Config, FavoriteChange, Record, Route, SessionStore, services_from_config,
};
use inquire::{Password, Text};

use crate::browse;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "countries", version, about = "Browse countries, capital weather and favorites")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the weather API key and the data platform credentials.
    Configure,

    /// List countries, optionally filtered by name.
    List {
        /// Case-insensitive part of the common name.
        #[arg(long, short)]
        search: Option<String>,

        /// 1-based page number.
        #[arg(long, short, default_value_t = 1)]
        page: usize,
    },

    /// Show one country with the weather in its capital.
    Show {
        /// Country code, e.g. "FIN".
        code: String,
    },

    /// Open any route, e.g. "/countries/NOR" or "/favorites".
    Open { path: String },

    /// Show the public test table.
    Test,

    /// Show the protected table, or add a row to it.
    Protected {
        /// Field of a new row as key=value; repeat for more fields.
        #[arg(long = "add", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Show, add or remove favorites of the signed-in user.
    Favorites {
        #[arg(long, value_name = "CODE", conflicts_with = "remove")]
        add: Option<String>,

        #[arg(long, value_name = "CODE")]
        remove: Option<String>,
    },

    /// Sign in to the data platform.
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign out and forget the stored session.
    Logout,

    /// Interactive session: navigate, search and page through views.
    Browse,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Values that parse as JSON keep their type; everything else is a string.
pub(crate) fn record_from_fields(fields: &[(String, String)]) -> Record {
    fields
        .iter()
        .map(|(k, v)| {
            let value = serde_json::from_str(v)
                .unwrap_or_else(|_| serde_json::Value::String(v.clone()));
            (k.clone(), value)
        })
        .collect()
}

pub(crate) fn describe_change(change: &FavoriteChange) -> String {
    match change {
        FavoriteChange::Added(name) => format!("Added {name} to favorites."),
        FavoriteChange::AlreadyPresent(code) => format!("{code} is already a favorite."),
        FavoriteChange::Removed(name) => format!("Removed {name} from favorites."),
        FavoriteChange::NotPresent(code) => format!("{code} is not among your favorites."),
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let file_config = Config::load()?;
        let mut config = file_config.clone();
        config.apply_env_overrides(|name| std::env::var(name).ok());

        let sessions = SessionStore::default_location()?;
        let session = sessions.load()?;
        let mut app = App::new(services_from_config(&config), &config).with_session(session);

        match self.command {
            Command::Configure => configure(file_config)?,
            Command::List { search, page } => {
                if let Some(query) = search {
                    app.search(&query);
                }
                app.go_to_page(page);
                show(&mut app, &Route::Countries.to_string()).await;
            }
            Command::Show { code } => {
                show(&mut app, &Route::CountryDetail(code).to_string()).await;
            }
            Command::Open { path } => show(&mut app, &path).await,
            Command::Test => show(&mut app, &Route::Test.to_string()).await,
            Command::Protected { fields } => {
                app.navigate(&Route::Protected.to_string()).await;
                if !fields.is_empty() && app.session().is_some() {
                    app.create_protected_entry(record_from_fields(&fields))
                        .await
                        .context("Failed to create entry")?;
                }
                println!("{}", app.render());
            }
            Command::Favorites { add, remove } => {
                app.navigate(&Route::Favorites.to_string()).await;
                if app.session().is_some() {
                    if let Some(code) = add {
                        println!("{}", describe_change(&app.add_favorite(&code).await?));
                    }
                    if let Some(code) = remove {
                        println!("{}", describe_change(&app.remove_favorite(&code).await?));
                    }
                }
                println!("{}", app.render());
            }
            Command::Login { email } => {
                login(&mut app, email).await?;
                let session = app.session().ok_or_else(|| anyhow!("sign-in returned no session"))?;
                sessions.save(session)?;
                println!("Signed in as {}.", session.email);
            }
            Command::Logout => {
                let result = app.sign_out().await;
                sessions.clear()?;
                result.context("Platform sign-out failed; local session removed anyway")?;
                println!("Signed out.");
            }
            Command::Browse => browse::run(&mut app, &sessions).await?,
        }

        Ok(())
    }
}

async fn show(app: &mut App, path: &str) {
    app.navigate(path).await;
    println!("{}", app.render());
}

pub(crate) async fn login(app: &mut App, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => Text::new("Email:").prompt()?,
    };
    let password = Password::new("Password:").without_confirmation().prompt()?;

    app.sign_in(email.trim(), &password).await?;
    Ok(())
}

fn configure(mut config: Config) -> Result<()> {
    let key = Text::new("OpenWeather API key:")
        .with_initial_value(config.weather_api_key().unwrap_or(""))
        .prompt()?;
    if !key.trim().is_empty() {
        config.set_weather_api_key(key.trim().to_string());
    }

    let url = Text::new("Data platform URL (blank to skip):")
        .with_initial_value(config.platform.url.as_deref().unwrap_or(""))
        .prompt()?;
    if !url.trim().is_empty() {
        let anon_key = Text::new("Data platform anon key:")
            .with_initial_value(config.platform.anon_key.as_deref().unwrap_or(""))
            .prompt()?;
        config.set_platform(url.trim().to_string(), anon_key.trim().to_string());
    }

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}
