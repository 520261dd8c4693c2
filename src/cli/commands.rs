//! CLI command implementations
//!
//! `dispatch` maps one line of the text grammar onto an engine call and
//! returns the JSON payload of the response:
//!
//! ```text
//! SHOW DATABASES | SHOW TABLES | USE <db>
//! CREATE DATABASE <db> | DROP DATABASE <db>
//! CREATE TABLE <t> <field-spec>... | DROP TABLE <t> | DESCRIBE <t>
//! INSERT INTO <t> <row>...
//! SELECT <*|c1,c2> FROM <t> [WHERE <cond>...]
//! DELETE * FROM <t> | DELETE FROM <t> WHERE <cond>...
//! GRANT <cap> ON <db> TO <user> | REVOKE <cap> ON <db> FROM|TO <user>
//! CREATE USER <name> IDENTIFIED BY <password> | SU <name> <password>
//! ```
//!
//! Keywords are case-insensitive. There is no interactive confirmation.

use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::auth::hash_password;
use crate::config::Config;
use crate::engine::{Engine, Projection, Session};
use crate::errors::{DbError, DbResult};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_commands, write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Init {
            config,
            data_dir,
            root_password,
        } => init(&config, &data_dir, root_password.as_deref()),
        Command::Exec {
            config,
            user,
            password,
            command,
        } => exec(&config, &user, &password, &command.join(" ")),
        Command::Shell {
            config,
            user,
            password,
        } => shell(&config, &user, &password),
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides `filter`.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    // A second install (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Writes a configuration file and bootstraps the data directory.
pub fn init(config_path: &Path, data_dir: &Path, root_password: Option<&str>) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::already_initialized(config_path));
    }

    let mut config = Config::for_data_dir(data_dir);
    if let Some(password) = root_password {
        config.password_policy().validate(password)?;
        config = config.with_root_password_hash(hash_password(password)?);
    }
    init_tracing(&config.log_filter);

    Engine::open(config.clone())?;
    config.save(config_path)?;

    write_response(json!({
        "config": config_path.display().to_string(),
        "data_dir": config.data_dir.display().to_string(),
    }))
}

fn open(config_path: &Path, user: &str, password: &str) -> CliResult<(Engine, Session)> {
    let config = Config::load(config_path)?;
    init_tracing(&config.log_filter);

    let engine = Engine::open(config)?;
    let session = engine.login(user, password)?;
    Ok((engine, session))
}

/// Runs one command and exits non-zero if it fails.
pub fn exec(config_path: &Path, user: &str, password: &str, line: &str) -> CliResult<()> {
    let (engine, mut session) = open(config_path, user, password)?;
    match dispatch(&engine, &mut session, line) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            Err(e.into())
        }
    }
}

/// Runs commands from stdin until EOF, `QUIT` or `EXIT`.
///
/// A failing command is reported and the loop continues.
pub fn shell(config_path: &Path, user: &str, password: &str) -> CliResult<()> {
    let (engine, mut session) = open(config_path, user, password)?;

    for line in read_commands() {
        let line = line?;
        let trimmed = line.trim();
        if keyword(trimmed, "quit") || keyword(trimmed, "exit") {
            break;
        }

        match dispatch(&engine, &mut session, trimmed) {
            Ok(data) => write_response(data)?,
            Err(e) => write_error(e.code(), &e.to_string())?,
        }
    }

    Ok(())
}

/// Splits a command line on whitespace.
///
/// A quote opening a token or following `:` or `=` runs to its match and
/// is kept in one token, quotes included, so literals such as
/// `name:string:default='John Doe'` survive intact.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, '\'' | '"') if current.is_empty() || current.ends_with([':', '=']) => {
                quote = Some(c);
                current.push(c);
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Statement forms accepted by `dispatch`, with a short description
const COMMANDS: &[(&str, &str)] = &[
    ("HELP", "list the available commands"),
    ("QUIT | EXIT", "leave the shell"),
    ("SHOW DATABASES", "list databases"),
    ("CREATE DATABASE <db>", "create a database"),
    ("DROP DATABASE <db>", "delete a database and all of its tables"),
    ("USE <db>", "select the active database"),
    ("SHOW TABLES", "list tables of the active database"),
    ("DESCRIBE <table>", "show a table's fields"),
    ("CREATE TABLE <table> <field-spec>...", "create a table, e.g. id:int:pk:auto name:str"),
    ("DROP TABLE <table>", "delete a table"),
    ("INSERT INTO <table> <row>...", "insert colon-separated rows, e.g. 1:pen:2.5"),
    ("SELECT <*|col,col> FROM <table> [WHERE <cond>...]", "query records"),
    ("DELETE * FROM <table>", "delete every record"),
    ("DELETE FROM <table> WHERE <cond>...", "delete matching records"),
    ("CREATE USER <name> IDENTIFIED BY <password>", "create an account"),
    ("GRANT <capability> ON <db> TO <user>", "grant create, read, delete or update"),
    ("REVOKE <capability> ON <db> FROM <user>", "revoke a capability"),
    ("SU <user> <password>", "switch to another account"),
];

fn help() -> Value {
    Value::Array(
        COMMANDS
            .iter()
            .map(|(form, description)| json!({ "command": form, "description": description }))
            .collect(),
    )
}

fn usage(form: &str) -> DbError {
    DbError::InvalidArgument(format!("usage: {}", form))
}

fn keyword(token: &str, expected: &str) -> bool {
    token.eq_ignore_ascii_case(expected)
}

/// Executes one command line for `session`.
pub fn dispatch(engine: &Engine, session: &mut Session, line: &str) -> DbResult<Value> {
    let tokens = tokenize(line);
    let Some(verb) = tokens.first() else {
        return Err(DbError::InvalidArgument("empty command".into()));
    };
    let args = &tokens[1..];
    debug!(user = session.user(), verb = %verb, "dispatch");

    match verb.to_ascii_uppercase().as_str() {
        "HELP" => Ok(help()),
        "SHOW" => show(engine, session, args),
        "USE" => match args {
            [db] => {
                engine.use_database(session, db)?;
                Ok(json!({ "database": db }))
            }
            _ => Err(usage("USE <db>")),
        },
        "CREATE" => create_object(engine, session, args),
        "DROP" => drop_object(engine, session, args),
        "DESCRIBE" => match args {
            [table] => Ok(serde_json::to_value(engine.describe_table(session, table)?)?),
            _ => Err(usage("DESCRIBE <table>")),
        },
        "INSERT" => match args {
            [into, table, rows @ ..] if keyword(into, "into") && !rows.is_empty() => {
                let inserted = engine.insert(session, table, rows)?;
                Ok(json!({ "inserted": inserted }))
            }
            _ => Err(usage("INSERT INTO <table> <row>...")),
        },
        "SELECT" => select(engine, session, args),
        "DELETE" => delete(engine, session, args),
        "GRANT" => grant(engine, session, args, true),
        "REVOKE" => grant(engine, session, args, false),
        "SU" => match args {
            [user, password] => {
                engine.switch_user(session, user, password)?;
                Ok(json!({ "user": user }))
            }
            _ => Err(usage("SU <user> <password>")),
        },
        other => Err(DbError::InvalidArgument(format!(
            "unknown command '{}'",
            other
        ))),
    }
}

fn show(engine: &Engine, session: &mut Session, args: &[String]) -> DbResult<Value> {
    match args {
        [what] if keyword(what, "databases") => {
            Ok(json!(engine.list_databases(session)?))
        }
        [what] if keyword(what, "tables") => Ok(json!(engine.list_tables(session)?)),
        _ => Err(usage("SHOW DATABASES | SHOW TABLES")),
    }
}

fn create_object(engine: &Engine, session: &mut Session, args: &[String]) -> DbResult<Value> {
    match args {
        [kind, db] if keyword(kind, "database") => {
            engine.create_database(session, db)?;
            Ok(json!({ "created": db }))
        }
        [kind, table, specs @ ..] if keyword(kind, "table") && !specs.is_empty() => {
            let schema = engine.create_table(session, table, specs)?;
            Ok(serde_json::to_value(schema)?)
        }
        [kind, name, identified, by, password]
            if keyword(kind, "user")
                && keyword(identified, "identified")
                && keyword(by, "by") =>
        {
            engine.create_user(session, name, password)?;
            Ok(json!({ "created": name }))
        }
        _ => Err(usage(
            "CREATE DATABASE <db> | CREATE TABLE <table> <field-spec>... | \
             CREATE USER <name> IDENTIFIED BY <password>",
        )),
    }
}

fn drop_object(engine: &Engine, session: &mut Session, args: &[String]) -> DbResult<Value> {
    match args {
        [kind, db] if keyword(kind, "database") => {
            engine.drop_database(session, db)?;
            Ok(json!({ "dropped": db }))
        }
        [kind, table] if keyword(kind, "table") => {
            engine.drop_table(session, table)?;
            Ok(json!({ "dropped": table }))
        }
        _ => Err(usage("DROP DATABASE <db> | DROP TABLE <table>")),
    }
}

/// Splits `<table> [WHERE <cond>...]`.
fn table_and_conditions<'a>(
    args: &'a [String],
    form: &str,
) -> DbResult<(&'a String, &'a [String])> {
    match args {
        [table] => Ok((table, &[])),
        [table, kw, conditions @ ..] if keyword(kw, "where") && !conditions.is_empty() => {
            Ok((table, conditions))
        }
        _ => Err(usage(form)),
    }
}

fn select(engine: &Engine, session: &mut Session, args: &[String]) -> DbResult<Value> {
    const FORM: &str = "SELECT <*|col,col> FROM <table> [WHERE <cond>...]";

    let from = args
        .iter()
        .position(|t| keyword(t, "from"))
        .filter(|&i| i > 0)
        .ok_or_else(|| usage(FORM))?;
    let projection = Projection::parse(&args[..from].concat());
    let (table, conditions) = table_and_conditions(&args[from + 1..], FORM)?;

    let result = engine.select(session, table, conditions, &projection)?;
    Ok(serde_json::to_value(result)?)
}

fn delete(engine: &Engine, session: &mut Session, args: &[String]) -> DbResult<Value> {
    const FORM: &str = "DELETE * FROM <table> | DELETE FROM <table> WHERE <cond>...";

    let (table, conditions) = match args {
        [star, from, table] if star == "*" && keyword(from, "from") => (table, &args[3..]),
        [from, rest @ ..] if keyword(from, "from") => {
            match table_and_conditions(rest, FORM)? {
                (table, conditions) if !conditions.is_empty() => (table, conditions),
                _ => return Err(usage(FORM)),
            }
        }
        _ => return Err(usage(FORM)),
    };

    let deleted = engine.delete(session, table, conditions)?;
    Ok(json!({ "deleted": deleted }))
}

fn grant(engine: &Engine, session: &mut Session, args: &[String], add: bool) -> DbResult<Value> {
    let form = if add {
        "GRANT <capability> ON <db> TO <user>"
    } else {
        "REVOKE <capability> ON <db> FROM <user>"
    };

    let [cap, on, db, to, user] = args else {
        return Err(usage(form));
    };
    let to_ok = keyword(to, "to") || (!add && keyword(to, "from"));
    if !keyword(on, "on") || !to_ok {
        return Err(usage(form));
    }

    if add {
        engine.grant(session, cap, db, user)?;
    } else {
        engine.revoke(session, cap, db, user)?;
    }
    Ok(json!({ "user": user, "database": db, "capability": cap }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir) -> (Engine, Session) {
        let engine = Engine::open(Config::for_data_dir(tmp.path())).unwrap();
        let session = engine.root_session();
        (engine, session)
    }

    fn run(engine: &Engine, session: &mut Session, line: &str) -> Value {
        dispatch(engine, session, line).unwrap()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("  SELECT *   FROM t "), vec!["SELECT", "*", "FROM", "t"]);
        assert_eq!(
            tokenize("CREATE TABLE t name:string:default='John Doe'"),
            vec!["CREATE", "TABLE", "t", "name:string:default='John Doe'"]
        );
        assert_eq!(tokenize("INSERT INTO t \"a b\":1"), vec!["INSERT", "INTO", "t", "\"a b\":1"]);
        assert_eq!(tokenize("INSERT INTO t 1:O'Brien"), vec!["INSERT", "INTO", "t", "1:O'Brien"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_full_session() {
        let tmp = TempDir::new().unwrap();
        let (engine, mut s) = setup(&tmp);

        run(&engine, &mut s, "create database shop");
        run(&engine, &mut s, "USE shop");
        run(
            &engine,
            &mut s,
            "CREATE TABLE items id:int:pk:auto label:str price:float:default=1.5",
        );
        assert_eq!(
            run(&engine, &mut s, "INSERT INTO items :pen:2 :cup"),
            json!({ "inserted": 2 })
        );

        let result = run(&engine, &mut s, "SELECT id, label FROM items WHERE price:>:1");
        assert_eq!(result["columns"], json!(["id", "label"]));
        assert_eq!(result["rows"], json!([[1, "pen"], [2, "cup"]]));

        assert_eq!(run(&engine, &mut s, "SHOW TABLES"), json!(["items"]));
        assert_eq!(run(&engine, &mut s, "SHOW DATABASES"), json!(["shop"]));

        assert_eq!(
            run(&engine, &mut s, "DELETE FROM items WHERE label:==:pen"),
            json!({ "deleted": 1 })
        );
        assert_eq!(run(&engine, &mut s, "DELETE * FROM items"), json!({ "deleted": 1 }));
    }

    #[test]
    fn test_describe() {
        let tmp = TempDir::new().unwrap();
        let (engine, mut s) = setup(&tmp);
        run(&engine, &mut s, "CREATE DATABASE shop");
        run(&engine, &mut s, "USE shop");
        run(&engine, &mut s, "CREATE TABLE t id:integer:pk name:string");

        let schema = run(&engine, &mut s, "DESCRIBE t");
        assert_eq!(schema["name"], "t");
        assert_eq!(schema["fields"][0]["column"], "id");
        assert_eq!(schema["fields"][0]["type"], "integer");
        assert_eq!(schema["fields"][0]["primary_key"], true);
    }

    #[test]
    fn test_help_lists_every_command() {
        let tmp = TempDir::new().unwrap();
        let (engine, mut s) = setup(&tmp);

        let help = run(&engine, &mut s, "help");
        let forms: Vec<&str> = help
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["command"].as_str().unwrap())
            .collect();
        for verb in [
            "HELP", "SHOW", "CREATE", "DROP", "USE", "DESCRIBE", "INSERT", "SELECT", "DELETE",
            "GRANT", "REVOKE", "SU",
        ] {
            assert!(forms.iter().any(|f| f.starts_with(verb)), "{}", verb);
        }
    }

    #[test]
    fn test_usage_errors() {
        let tmp = TempDir::new().unwrap();
        let (engine, mut s) = setup(&tmp);

        for line in ["", "FROB x", "USE", "SELECT FROM t", "DELETE FROM t", "GRANT read shop bob"] {
            assert!(
                matches!(dispatch(&engine, &mut s, line), Err(DbError::InvalidArgument(_))),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_engine_errors_pass_through() {
        let tmp = TempDir::new().unwrap();
        let (engine, mut s) = setup(&tmp);
        assert_eq!(
            dispatch(&engine, &mut s, "SHOW TABLES").unwrap_err(),
            DbError::NoDatabaseSelected
        );
        assert_eq!(
            dispatch(&engine, &mut s, "USE nowhere").unwrap_err(),
            DbError::UnknownDatabase("nowhere".into())
        );
    }

    #[test]
    fn test_users_and_grants() {
        let tmp = TempDir::new().unwrap();
        let (engine, mut root) = setup(&tmp);
        run(&engine, &mut root, "CREATE DATABASE shop");
        run(&engine, &mut root, "CREATE USER bob IDENTIFIED BY bobsecret");
        run(&engine, &mut root, "GRANT r ON shop TO bob");

        let mut bob = engine.login("bob", "bobsecret").unwrap();
        run(&engine, &mut bob, "USE shop");
        assert_eq!(run(&engine, &mut bob, "SHOW TABLES"), json!([]));
        assert!(matches!(
            dispatch(&engine, &mut bob, "CREATE TABLE t id:int:pk"),
            Err(DbError::PermissionDenied(_))
        ));

        run(&engine, &mut root, "REVOKE read ON shop FROM bob");
        assert!(matches!(
            dispatch(&engine, &mut bob, "SHOW TABLES"),
            Err(DbError::PermissionDenied(_))
        ));

        run(&engine, &mut bob, "SU bob bobsecret");
        assert!(matches!(
            dispatch(&engine, &mut bob, "SU bob wrong"),
            Err(DbError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_init_writes_config() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("realdb.json");
        let data_dir = tmp.path().join("data");

        init(&config_path, &data_dir, Some("rootpassword")).unwrap();
        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.data_dir, data_dir);

        let engine = Engine::open(config).unwrap();
        assert!(engine.login("root", "rootpassword").unwrap().is_super_user());

        assert_eq!(
            init(&config_path, &data_dir, None).unwrap_err().code_str(),
            "REALDB_CLI_ALREADY_INITIALIZED"
        );
    }
}
