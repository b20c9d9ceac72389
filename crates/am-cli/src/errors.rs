use am_local_db::{Database, ErrorQuery, ErrorStore, RecordOutcome};
use anyhow::Result;
use clap::Args;

/// Arguments for recording an error pattern.
#[derive(Args)]
pub struct RecordErrorArgs {
    /// Error signature used as the dedup key
    #[arg(long = "pattern", value_name = "TEXT")]
    pub pattern: String,

    /// Where the error occurred
    #[arg(long = "context", value_name = "TEXT")]
    pub context: Option<String>,

    /// Known fix or workaround
    #[arg(long = "solution", value_name = "TEXT")]
    pub solution: Option<String>,
}

impl RecordErrorArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        let outcome = db.with_conn(|conn| {
            ErrorStore::new(conn).record(
                &self.pattern,
                self.context.as_deref(),
                self.solution.as_deref(),
            )
        })?;
        match outcome {
            RecordOutcome::Added => println!("error added: {}", self.pattern),
            RecordOutcome::Deduplicated { occurrences } => {
                println!("error updated (occurrences={}): {}", occurrences, self.pattern)
            }
        }
        Ok(())
    }
}

/// Arguments for querying error patterns.
#[derive(Args)]
pub struct QueryErrorsArgs {
    /// Substring to search for in pattern, context, and solution
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Show the N most recently seen patterns instead (takes precedence)
    #[arg(long = "recent", value_name = "N")]
    pub recent: Option<u32>,
}

impl QueryErrorsArgs {
    pub fn run(self, db: &Database) -> Result<()> {
        // Precedence: recent > search > top-10 by occurrences.
        let query = if let Some(n) = self.recent {
            ErrorQuery::Recent(n)
        } else if let Some(text) = self.query {
            ErrorQuery::Search(text)
        } else {
            ErrorQuery::Top
        };

        let patterns = db.with_conn(|conn| ErrorStore::new(conn).query(&query))?;
        if patterns.is_empty() {
            println!("no errors");
            return Ok(());
        }
        for p in &patterns {
            let ctx = p.context.as_deref().map(|c| format!(" [{}]", c)).unwrap_or_default();
            let sol = p.solution.as_deref().map(|s| format!(" -> {}", s)).unwrap_or_default();
            println!("#{} x{}{} {}{}", p.id, p.occurrences, ctx, p.pattern, sol);
        }
        Ok(())
    }
}
