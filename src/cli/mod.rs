use clap::{ Parser, Subcommand };
use std::num::NonZeroU32;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    // --- Remote Assistant Args ---
    /// Chatbot endpoint that receives `{ "message": ... }` POSTs (e.g., https://xxxx.execute-api.us-east-1.amazonaws.com/prod/chat)
    #[arg(long, env = "ASSISTANT_URL", global = true)]
    pub assistant_url: Option<String>,

    /// Seconds to wait for the assistant before giving up on a request.
    #[arg(
        long,
        env = "ASSISTANT_TIMEOUT_SECS",
        default_value = "8",
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub assistant_timeout_secs: u64,

    // --- Student Records Args ---
    /// Base URL of the student-record REST API (the client appends /students).
    #[arg(long, env = "STUDENTS_API_URL", global = true)]
    pub students_api_url: Option<String>,

    /// API key sent in the x-api-key header on every student-record call.
    #[arg(long, env = "STUDENTS_API_KEY", global = true)]
    pub students_api_key: Option<String>,

    /// Seconds to wait for the student-record API.
    #[arg(
        long,
        env = "STUDENTS_TIMEOUT_SECS",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub students_timeout_secs: u64,

    // --- FAQ / Session Args ---
    /// Optional JSON file replacing the built-in FAQ intents.
    #[arg(long, env = "FAQ_PATH", global = true)]
    pub faq_path: Option<String>,

    /// File holding the signed-in user between runs.
    #[arg(long, env = "SESSION_PATH", default_value = ".studentlytics/session.json", global = true)]
    pub session_path: String,

    // --- Server Args ---
    /// Host address and port for the WebSocket chat server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000", global = true)]
    pub server_addr: String,

    /// Port for the HTTP API. The API is disabled when unset.
    #[arg(long, env = "HTTP_PORT", global = true)]
    pub http_port: Option<u16>,

    /// Optional secret for WebSocket clients. If set, clients must sign the `ts` query param with HMAC-SHA256.
    #[arg(long, env = "SERVER_API_KEY", global = true)]
    pub server_api_key: Option<String>,

    /// Maximum new WebSocket connections accepted per second.
    #[arg(long, env = "WS_RATE_LIMIT", default_value = "10", global = true)]
    pub ws_rate_limit: NonZeroU32,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false", global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Answer a question from the FAQ table.
    Faq {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Send one question to the remote assistant.
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Interactive chat with the remote assistant.
    Chat,
    /// Run the HTTP API and WebSocket chat server.
    Serve,
    /// Student-record operations.
    Students {
        #[command(subcommand)]
        action: StudentsAction,
    },
    /// Sign in with an email or a Google ID token.
    Login {
        #[arg(long, conflicts_with = "google_credential", required_unless_present = "google_credential")]
        email: Option<String>,
        #[arg(long, default_value = "")]
        name: String,
        /// Google ID token (JWT) from the sign-in widget.
        #[arg(long)]
        google_credential: Option<String>,
        /// teacher or student
        #[arg(long, default_value = "student")]
        role: String,
    },
    /// Sign out and clear the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Switch the dashboard role of the signed-in user.
    Role {
        role: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum StudentsAction {
    Get {
        record_id: String,
    },
    /// Fetch several records; defaults to the demo records.
    List {
        record_ids: Vec<String>,
    },
    /// Create a record from a JSON document.
    Add {
        json: String,
    },
    Update {
        record_id: String,
        json: String,
    },
    Delete {
        record_id: String,
    },
}

pub fn join_query(parts: &[String]) -> String {
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_faq_query_words() {
        let args = Args::try_parse_from(["studentlytics-assistant", "faq", "how", "does", "it", "work"]).unwrap();
        match args.command {
            Command::Faq { query } => assert_eq!(join_query(&query), "how does it work"),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.assistant_timeout_secs, 8);
        assert_eq!(args.ws_rate_limit.get(), 10);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let args = Args::try_parse_from([
            "studentlytics-assistant",
            "ask",
            "hello",
            "--assistant-url",
            "https://assistant.test/chat",
            "--assistant-timeout-secs",
            "2",
        ]).unwrap();
        assert_eq!(args.assistant_url.as_deref(), Some("https://assistant.test/chat"));
        assert_eq!(args.assistant_timeout_secs, 2);
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        assert!(
            Args::try_parse_from(["studentlytics-assistant", "ask", "hi", "--assistant-timeout-secs", "0"]).is_err()
        );
        assert!(
            Args::try_parse_from(["studentlytics-assistant", "students", "list", "--students-timeout-secs", "0"]).is_err()
        );
        let args = Args::try_parse_from(["studentlytics-assistant", "ask", "hi", "--assistant-timeout-secs", "1"]).unwrap();
        assert_eq!(args.assistant_timeout_secs, 1);
    }

    #[test]
    fn login_needs_email_or_credential() {
        assert!(Args::try_parse_from(["studentlytics-assistant", "login"]).is_err());
        assert!(
            Args::try_parse_from(["studentlytics-assistant", "login", "--email", "a@b.c", "--google-credential", "x"]).is_err()
        );
        assert!(Args::try_parse_from(["studentlytics-assistant", "login", "--google-credential", "x.y.z"]).is_ok());
    }
}
