use serde::{Deserialize, Serialize};

/// One whitespace-delimited unit of a query line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryToken {
    /// Text as typed, quotes included for quoted tokens
    pub text: String,
    /// Token was written inside single or double quotes
    pub quoted: bool,
}

impl QueryToken {
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }
}

/// A lexed query line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub raw: String,
    pub tokens: Vec<QueryToken>,
}

impl Query {
    /// Split a raw line on whitespace, keeping quoted runs together.
    ///
    /// `greet "hello world"` yields `greet` and `"hello world"`. An unterminated
    /// quote runs to the end of the line. Backslash escapes are kept verbatim inside
    /// quotes so the literal grammar sees them unchanged.
    pub fn parse(raw: &str) -> Self {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        let mut quoted = false;
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match quote {
                Some(open) => {
                    current.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            current.push(escaped);
                        }
                    } else if c == open {
                        quote = None;
                    }
                }
                None if c == '"' || c == '\'' => {
                    quote = Some(c);
                    quoted = true;
                    current.push(c);
                }
                None if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(QueryToken {
                            text: std::mem::take(&mut current),
                            quoted,
                        });
                    }
                    quoted = false;
                }
                None => current.push(c),
            }
        }

        if !current.is_empty() {
            tokens.push(QueryToken {
                text: current,
                quoted,
            });
        }

        Self {
            raw: raw.to_string(),
            tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Lower-cased leading tokens eligible to match names (stops at the first quoted token)
    pub fn name_tokens(&self) -> Vec<String> {
        self.tokens
            .iter()
            .take_while(|t| !t.quoted)
            .map(|t| t.text.to_lowercase())
            .collect()
    }

    /// Raw token texts after the first `consumed` tokens
    pub fn arguments_after(&self, consumed: usize) -> Vec<String> {
        self.tokens
            .iter()
            .skip(consumed)
            .map(|t| t.text.clone())
            .collect()
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.raw.trim())
    }
}
