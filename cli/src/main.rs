mod script;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use script::ScriptError;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --session-token or set GYMDESK_SESSION_TOKEN")]
    MissingSessionToken,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("server returned {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

#[derive(Parser, Debug)]
#[command(name = "gymctl", about = "GymDesk API and database CLI")]
struct Cli {
    #[arg(long, env = "GYMDESK_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "GYMDESK_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    session_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    /// Request an access code, or exchange one for a session token.
    Login {
        email: String,
        #[arg(long)]
        code: Option<String>,
    },
    Me,
    Sql(SqlCommand),
    Member(MemberCommand),
    Attendance(AttendanceCommand),
    Dashboard,
}

#[derive(Args, Debug)]
struct SqlCommand {
    #[command(subcommand)]
    command: SqlSubcommand,
}

#[derive(Subcommand, Debug)]
enum SqlSubcommand {
    /// Execute a script statement by statement.
    Apply {
        file: PathBuf,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        #[arg(long)]
        stop_on_error: bool,
    },
    /// Print the statements a script splits into, without running them.
    Split { file: PathBuf },
}

#[derive(Args, Debug)]
struct MemberCommand {
    #[command(subcommand)]
    command: MemberSubcommand,
}

#[derive(Subcommand, Debug)]
enum MemberSubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },
    Read {
        member_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct AttendanceCommand {
    #[command(subcommand)]
    command: AttendanceSubcommand,
}

#[derive(Subcommand, Debug)]
enum AttendanceSubcommand {
    /// Open visits right now.
    Open,
    CheckIn {
        member_id: Uuid,
    },
    CheckOut {
        member_id: Uuid,
    },
    /// Close stale visits for the caller's gym immediately.
    AutoCheckout,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gymctl=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, session_token: cli.session_token };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Login { email, code } => run_login(&ctx, &email, code.as_deref()).await,
        Command::Me => print_api(&ctx, reqwest::Method::GET, "/api/auth/me", &[], None).await,
        Command::Sql(sql) => run_sql(sql).await,
        Command::Member(member) => run_member(&ctx, member).await,
        Command::Attendance(attendance) => run_attendance(&ctx, attendance).await,
        Command::Dashboard => print_api(&ctx, reqwest::Method::GET, "/api/dashboard", &[], None).await,
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = api_url(&cli.base_url, "/healthz");
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: "health check failed".into() });
    }
    println!("ok");
    Ok(())
}

async fn run_login(cli: &CliContext, email: &str, code: Option<&str>) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let Some(code) = code else {
        let response = client
            .post(api_url(&cli.base_url, "/api/auth/request-code"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        read_response(response).await?;
        eprintln!("access code sent to {email}; rerun with --code");
        return Ok(());
    };

    let response = client
        .post(api_url(&cli.base_url, "/api/auth/verify-code"))
        .json(&serde_json::json!({ "email": email, "code": code }))
        .send()
        .await?;
    let body = read_response(response).await?;
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .ok_or(CliError::MissingField("token"))?;
    println!("{token}");
    Ok(())
}

async fn run_sql(sql: SqlCommand) -> Result<(), CliError> {
    match sql.command {
        SqlSubcommand::Apply { file, database_url, stop_on_error } => {
            let source = tokio::fs::read_to_string(&file).await.map_err(ScriptError::Io)?;
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .connect(&database_url)
                .await
                .map_err(ScriptError::Connect)?;
            let report = script::apply_script(&pool, &source, stop_on_error).await?;
            tracing::info!(
                file = %file.display(),
                succeeded = report.succeeded,
                failed = report.failed,
                "script applied"
            );
            print_json(&serde_json::to_value(&report)?)
        }
        SqlSubcommand::Split { file } => {
            let source = tokio::fs::read_to_string(&file).await.map_err(ScriptError::Io)?;
            for (index, statement) in script::split_statements(&source).iter().enumerate() {
                println!("-- [{}]\n{statement};\n", index + 1);
            }
            Ok(())
        }
    }
}

async fn run_member(cli: &CliContext, member: MemberCommand) -> Result<(), CliError> {
    match member.command {
        MemberSubcommand::List { search, status, limit } => {
            let query = present_params([("search", search), ("status", status), ("limit", limit.map(|l| l.to_string()))]);
            print_api(cli, reqwest::Method::GET, "/api/members", &query, None).await
        }
        MemberSubcommand::Read { member_id } => {
            print_api(cli, reqwest::Method::GET, &format!("/api/members/{member_id}"), &[], None).await
        }
    }
}

async fn run_attendance(cli: &CliContext, attendance: AttendanceCommand) -> Result<(), CliError> {
    match attendance.command {
        AttendanceSubcommand::Open => {
            let query = [("open_only", "true".to_owned())];
            print_api(cli, reqwest::Method::GET, "/api/attendance", &query, None).await
        }
        AttendanceSubcommand::CheckIn { member_id } => {
            let body = serde_json::json!({ "member_id": member_id });
            print_api(cli, reqwest::Method::POST, "/api/attendance/check-in", &[], Some(body)).await
        }
        AttendanceSubcommand::CheckOut { member_id } => {
            let body = serde_json::json!({ "member_id": member_id });
            print_api(cli, reqwest::Method::POST, "/api/attendance/check-out", &[], Some(body)).await
        }
        AttendanceSubcommand::AutoCheckout => {
            print_api(cli, reqwest::Method::POST, "/api/attendance/auto-checkout", &[], None).await
        }
    }
}

// =============================================================================
// HTTP
// =============================================================================

fn api_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Drop the optional parameters that were not given.
fn present_params<const N: usize>(params: [(&'static str, Option<String>); N]) -> Vec<(&'static str, String)> {
    params.into_iter().filter_map(|(key, value)| value.map(|v| (key, v))).collect()
}

async fn read_response(response: reqwest::Response) -> Result<Value, CliError> {
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_owned);
        return Err(CliError::ServerError { status: status.as_u16(), message });
    }
    Ok(value)
}

fn build_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
) -> Result<reqwest::RequestBuilder, CliError> {
    let session_token = cli.session_token.as_deref().ok_or(CliError::MissingSessionToken)?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {session_token}"))?);

    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let request = client.request(method, api_url(&cli.base_url, path)).query(query);
    Ok(if let Some(json) = body { request.json(&json) } else { request })
}

async fn api_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
) -> Result<Value, CliError> {
    let request = build_request(cli, method, path, query, body)?;
    read_response(request.send().await?).await
}

async fn print_api(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
) -> Result<(), CliError> {
    let json = api_request(cli, method, path, query, body).await?;
    print_json(&json)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_joins_without_double_slash() {
        assert_eq!(api_url("http://localhost:3000/", "/healthz"), "http://localhost:3000/healthz");
        assert_eq!(api_url("http://localhost:3000", "/healthz"), "http://localhost:3000/healthz");
    }

    fn context() -> CliContext {
        CliContext { base_url: "http://localhost:3000/".into(), session_token: Some("tok".into()) }
    }

    #[test]
    fn present_params_skips_absent_values() {
        assert!(present_params([("search", None), ("limit", None)]).is_empty());
        assert_eq!(
            present_params([("search", Some("ann lee".into())), ("status", None), ("limit", Some("5".into()))]),
            vec![("search", "ann lee".to_owned()), ("limit", "5".to_owned())]
        );
    }

    #[test]
    fn request_carries_encoded_query_and_bearer() {
        let query = present_params([("search", Some("o'neil & co".into())), ("status", None)]);
        let request = build_request(&context(), reqwest::Method::GET, "/api/members", &query, None)
            .expect("builder")
            .build()
            .expect("request");
        assert_eq!(request.url().path(), "/api/members");
        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("search".to_owned(), "o'neil & co".to_owned())]);
        assert!(!request.url().as_str().contains(' '));
    }

    #[test]
    fn request_without_query_has_no_question_mark() {
        let request = build_request(&context(), reqwest::Method::GET, "/api/dashboard", &[], None)
            .expect("builder")
            .build()
            .expect("request");
        assert_eq!(request.url().as_str(), "http://localhost:3000/api/dashboard");
    }

    #[test]
    fn request_requires_session_token() {
        let cli = CliContext { base_url: "http://localhost:3000".into(), session_token: None };
        let err = build_request(&cli, reqwest::Method::GET, "/api/auth/me", &[], None).unwrap_err();
        assert!(matches!(err, CliError::MissingSessionToken));
    }

    #[test]
    fn cli_parses_sql_apply() {
        let cli = Cli::try_parse_from([
            "gymctl",
            "sql",
            "apply",
            "policies.sql",
            "--database-url",
            "postgres://localhost/gym",
            "--stop-on-error",
        ])
        .expect("should parse");
        match cli.command {
            Command::Sql(SqlCommand { command: SqlSubcommand::Apply { file, stop_on_error, .. } }) => {
                assert_eq!(file, PathBuf::from("policies.sql"));
                assert!(stop_on_error);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_check_in() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["gymctl", "attendance", "check-in", &id.to_string()]).expect("should parse");
        assert!(matches!(
            cli.command,
            Command::Attendance(AttendanceCommand { command: AttendanceSubcommand::CheckIn { member_id } }) if member_id == id
        ));
    }
}
