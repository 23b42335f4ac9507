//! Interactive loop over one [`App`]: the state persists between commands,
//! so search, paging and retry behave like they do in a long-lived client.

use anyhow::Result;
use countries_core::{App, SessionStore};
use inquire::{InquireError, Text};

use crate::cli::{describe_change, login, record_from_fields};

const HELP: &str = "\
Commands:
  go <path>          open a route: /, /countries, /countries/FIN, /test,
                     /protected, /favorites, /login
  search <text>      filter the country list (empty text clears)
  page <n>           jump to a page of the country list
  retry              try loading the country list again
  fav add <code>     add a favorite
  fav rm <code>      remove a favorite
  add key=value ...  add a row to the protected table
  login | logout
  help | quit";

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Go(String),
    Search(String),
    Page(usize),
    Retry,
    FavoriteAdd(String),
    FavoriteRemove(String),
    AddEntry(Vec<(String, String)>),
    Login,
    Logout,
    Help,
    Quit,
}

pub(crate) fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match word {
        "go" | "open" if !rest.is_empty() => Ok(Input::Go(rest.to_string())),
        "search" => Ok(Input::Search(rest.to_string())),
        "page" => rest.parse().map(Input::Page).map_err(|_| format!("not a page number: `{rest}`")),
        "retry" => Ok(Input::Retry),
        "fav" => match rest.split_once(char::is_whitespace) {
            Some(("add", code)) => Ok(Input::FavoriteAdd(code.trim().to_string())),
            Some(("rm" | "remove", code)) => Ok(Input::FavoriteRemove(code.trim().to_string())),
            _ => Err("usage: fav add <code> | fav rm <code>".to_string()),
        },
        "add" => rest
            .split_whitespace()
            .map(|pair| {
                pair.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| format!("expected key=value, got `{pair}`"))
            })
            .collect::<Result<Vec<_>, _>>()
            .and_then(|fields| {
                if fields.is_empty() {
                    Err("usage: add key=value ...".to_string())
                } else {
                    Ok(Input::AddEntry(fields))
                }
            }),
        "login" => Ok(Input::Login),
        "logout" => Ok(Input::Logout),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command `{other}`, try `help`")),
    }
}

pub async fn run(app: &mut App, sessions: &SessionStore) -> Result<()> {
    app.navigate("/").await;
    println!("{}", app.render());
    println!("{HELP}");

    loop {
        let line = match Text::new("countries>").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(msg) => {
                if !msg.is_empty() {
                    println!("{msg}");
                }
                continue;
            }
        };

        match input {
            Input::Quit => break,
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Go(path) => {
                app.navigate(&path).await;
            }
            Input::Search(query) => app.search(&query),
            Input::Page(page) => app.go_to_page(page),
            Input::Retry => app.retry().await,
            Input::FavoriteAdd(code) => match app.add_favorite(&code).await {
                Ok(change) => println!("{}", describe_change(&change)),
                Err(e) => println!("Error: {e}"),
            },
            Input::FavoriteRemove(code) => match app.remove_favorite(&code).await {
                Ok(change) => println!("{}", describe_change(&change)),
                Err(e) => println!("Error: {e}"),
            },
            Input::AddEntry(fields) => {
                if let Err(e) = app.create_protected_entry(record_from_fields(&fields)).await {
                    println!("Error: {e}");
                }
            }
            Input::Login => match login(app, None).await {
                Ok(()) => {
                    if let Some(session) = app.session() {
                        sessions.save(session)?;
                        println!("Signed in as {}.", session.email);
                    }
                }
                Err(e) => println!("Error: {e}"),
            },
            Input::Logout => {
                let result = app.sign_out().await;
                sessions.clear()?;
                if let Err(e) = result {
                    tracing::warn!(error = %e, "platform sign-out failed");
                }
                println!("Signed out.");
            }
        }

        println!("{}", app.render());
    }

    Ok(())
}
