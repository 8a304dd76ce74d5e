/// Double-quotes a SQL identifier, doubling any embedded quote.
pub fn quote_ident(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}
