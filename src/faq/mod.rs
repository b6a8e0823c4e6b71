//! Keyword-driven FAQ responder for the help widget.
//!
//! Lookup is first-match-wins over the table's insertion order: the query is
//! lowercased and each keyword is tested as a plain substring. There is no
//! scoring, so a broad keyword placed early shadows narrower ones after it.

pub mod config;

use once_cell::sync::Lazy;
use serde::{ Deserialize, Serialize };

pub use config::{ load_intents, FaqConfigError };

/// Number of suggested questions listed in the fallback reply.
pub const MAX_SUGGESTIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEntry {
    pub keyword: String,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct IntentTable {
    intents: Vec<IntentEntry>,
    suggestions: Vec<String>,
    fallback: String,
}

impl IntentTable {
    pub fn new(
        intents: Vec<IntentEntry>,
        suggestions: Vec<String>,
        contact: &str
    ) -> Result<Self, FaqConfigError> {
        let mut normalized = Vec::with_capacity(intents.len());
        for (index, entry) in intents.into_iter().enumerate() {
            let keyword = entry.keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(FaqConfigError::EmptyKeyword(index));
            }
            normalized.push(IntentEntry { keyword, response: entry.response });
        }

        let fallback = build_fallback(&suggestions, contact);
        Ok(Self {
            intents: normalized,
            suggestions,
            fallback,
        })
    }

    /// Returns the first entry whose keyword occurs in the lowercased query.
    pub fn lookup(&self, query: &str) -> Option<&IntentEntry> {
        let query = query.to_lowercase();
        self.intents.iter().find(|entry| query.contains(entry.keyword.as_str()))
    }

    pub fn respond(&self, query: &str) -> &str {
        match self.lookup(query) {
            Some(entry) => &entry.response,
            None => &self.fallback,
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn entries(&self) -> &[IntentEntry] {
        &self.intents
    }
}

fn build_fallback(suggestions: &[String], contact: &str) -> String {
    let mut reply = String::from(
        "I'm not sure I understood that. Here are some questions I can help with:\n"
    );
    for question in suggestions.iter().take(MAX_SUGGESTIONS) {
        reply.push_str(&format!("• {}\n", question));
    }
    reply.push('\n');
    reply.push_str(contact);
    reply
}

const BUILTIN_CONTACT: &str =
    "Still stuck? Reach our team at support@studentlytics.com and we'll get back to you within one business day.";

const BUILTIN_SUGGESTIONS: [&str; 6] = [
    "How does it work?",
    "What is the pricing?",
    "What features do you offer?",
    "How is attendance tracked?",
    "Is student data kept private?",
    "Can I book a demo?",
];

const BUILTIN_INTENTS: [(&str, &str); 15] = [
    (
        "how does it work",
        "Studentlytics works in three steps: your class session is recorded or checked in, our pipeline recognises attendees and measures engagement, and the results appear on the teacher and student dashboards within minutes of the session ending.",
    ),
    (
        "pricing",
        "We offer a free pilot for a single class, a per-teacher plan for schools, and institution-wide licences. Contact us for a quote tailored to your enrolment size.",
    ),
    (
        "cost",
        "We offer a free pilot for a single class, a per-teacher plan for schools, and institution-wide licences. Contact us for a quote tailored to your enrolment size.",
    ),
    (
        "features",
        "Key features: real-time attendance, engagement analytics, AI-powered insights that flag at-risk students, multi-role dashboards, performance tracking and instant notifications.",
    ),
    (
        "attendance",
        "Attendance is captured automatically with QR check-ins or facial recognition from the session recording, so marking a class takes seconds instead of minutes.",
    ),
    (
        "facial recognition",
        "Facial recognition matches students against the photos indexed for your class. Matching only runs on session media your institution uploads.",
    ),
    (
        "privacy",
        "Student data stays in your institution's account. Media is processed only to compute attendance and engagement, and you can request deletion at any time.",
    ),
    (
        "private",
        "Student data stays in your institution's account. Media is processed only to compute attendance and engagement, and you can request deletion at any time.",
    ),
    (
        "engagement",
        "Engagement analytics track participation, questions asked and attention over the course of each session, so teachers can see how classroom dynamics change over time.",
    ),
    (
        "at-risk",
        "Our predictive models combine attendance, engagement and grades to flag students who may need support early, along with suggested interventions.",
    ),
    (
        "dashboard",
        "Teachers see class-wide attendance, engagement trends and alerts; students see their own attendance, participation and progress. Each role only sees the data relevant to it.",
    ),
    (
        "demo",
        "You can explore the demo dashboard after signing in as a teacher or a student. For a guided walkthrough, contact our team and we'll schedule a session.",
    ),
    (
        "login",
        "Sign in with your email or with Google, and choose whether you are a teacher or a student. You can switch roles later from the dashboard.",
    ),
    (
        "contact",
        "You can reach the Studentlytics team at support@studentlytics.com.",
    ),
    (
        "support",
        "You can reach the Studentlytics team at support@studentlytics.com.",
    ),
];

static BUILTIN_TABLE: Lazy<IntentTable> = Lazy::new(|| IntentTable {
    intents: BUILTIN_INTENTS.iter()
        .map(|(keyword, response)| IntentEntry {
            keyword: keyword.to_string(),
            response: response.to_string(),
        })
        .collect(),
    suggestions: BUILTIN_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
    fallback: build_fallback(
        &BUILTIN_SUGGESTIONS.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        BUILTIN_CONTACT
    ),
});

pub fn builtin() -> &'static IntentTable {
    &BUILTIN_TABLE
}

/// Answers a query from the built-in table.
pub fn answer(query: &str) -> &'static str {
    builtin().respond(query)
}
