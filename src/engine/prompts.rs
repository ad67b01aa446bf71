// chatsql Engine — Prompt templates
// The two fixed instruction templates of the pipeline (plus the optional
// failure variant). Pure string composition; no I/O.

// ── Query stage ────────────────────────────────────────────────────────────────

/// Prompt for the SQL synthesis stage. The model must answer with a single
/// bare statement: no prose, no fences.
pub fn query_prompt(schema: &str, history: &str, question: &str) -> String {
    format!(
        "You are a data analyst at a company. You are interacting with a user who is asking you \
         questions about the company's database.\n\
         Based on the table schema below, write a SQL query that would answer the user's question. \
         Take the conversation history into account.\n\
         \n\
         <SCHEMA>{schema}</SCHEMA>\n\
         \n\
         Conversation History: {history}\n\
         \n\
         Write only the SQL query and nothing else. Do not wrap the SQL query in any other text, \
         not even backticks.\n\
         \n\
         For example:\n\
         Question: How many phones are in the database that are cheaper than 500 dollars?\n\
         SQL Query: SELECT COUNT(*) FROM \"tbl_phones\" WHERE \"price\" < 500;\n\
         Question: Name 5 brand models?\n\
         SQL Query: SELECT \"model\" FROM \"tbl_phones\" LIMIT 5;\n\
         \n\
         Your turn:\n\
         \n\
         Question: {question}\n\
         SQL Query:"
    )
}

// ── Answer stage ───────────────────────────────────────────────────────────────

/// Prompt for the streamed answer stage. The reply must not reveal that a
/// database was consulted.
pub fn answer_prompt(
    schema: &str,
    history: &str,
    question: &str,
    query: &str,
    result: &str,
) -> String {
    format!(
        "You are a data analyst at a company. You are interacting with a user who is asking you \
         questions about the company's database.\n\
         Based on the table schema below, the question, the SQL query, and the SQL response, \
         write a natural language response.\n\
         You do not let the user know that you are accessing the database. \
         You reply saying \"As far as I know\".\n\
         \n\
         <SCHEMA>{schema}</SCHEMA>\n\
         \n\
         Conversation History: {history}\n\
         SQL Query: <SQL>{query}</SQL>\n\
         User Question: {question}\n\
         SQL Response: {result}"
    )
}

/// Answer-stage variant used when the query failed at the database and
/// `explain_failures` is on.
pub fn failure_prompt(
    schema: &str,
    history: &str,
    question: &str,
    query: &str,
    error: &str,
) -> String {
    format!(
        "You are a data analyst at a company. You are interacting with a user who is asking you \
         questions about the company's database.\n\
         You tried to answer the question below, but the lookup failed with the error shown. \
         Tell the user, in plain language, that you could not find the answer and what seems to be \
         wrong with the request. Do not invent any data. Do not mention SQL or the database.\n\
         \n\
         <SCHEMA>{schema}</SCHEMA>\n\
         \n\
         Conversation History: {history}\n\
         Attempted Query: <SQL>{query}</SQL>\n\
         User Question: {question}\n\
         Error: {error}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "CREATE TABLE \"tbl_phones\" (\n\t\"price\" numeric\n)";

    #[test]
    fn query_prompt_embeds_inputs_in_order() {
        let p = query_prompt(SCHEMA, "Assistant: hi", "How many phones cost less than 500?");
        let schema_at = p.find("<SCHEMA>").unwrap();
        let history_at = p.find("Assistant: hi").unwrap();
        let question_at = p.rfind("How many phones cost less than 500?").unwrap();
        assert!(schema_at < history_at && history_at < question_at);
        assert!(p.contains(SCHEMA));
        assert!(p.ends_with("SQL Query:"));
    }

    #[test]
    fn query_prompt_forbids_decoration() {
        let p = query_prompt("", "", "q");
        assert!(p.contains("Write only the SQL query and nothing else"));
        assert!(p.contains("not even backticks"));
        assert!(p.contains("SELECT COUNT(*) FROM \"tbl_phones\""));
    }

    #[test]
    fn answer_prompt_carries_all_five_inputs() {
        let p = answer_prompt(SCHEMA, "User: earlier", "Name 5 models", "SELECT 1", "count\n7");
        let needles = [
            SCHEMA,
            "User: earlier",
            "Name 5 models",
            "<SQL>SELECT 1</SQL>",
            "SQL Response: count\n7",
        ];
        for needle in needles {
            assert!(p.contains(needle), "missing {:?}", needle);
        }
        assert!(p.contains("As far as I know"));
    }

    #[test]
    fn failure_prompt_passes_error_verbatim() {
        let p = failure_prompt(
            SCHEMA,
            "",
            "what colours?",
            "SELECT colour FROM t",
            "no such column: colour",
        );
        assert!(p.contains("Error: no such column: colour"));
        assert!(p.contains("Do not invent any data"));
    }
}
