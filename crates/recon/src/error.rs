use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad group, unknown alias type, etc.).
    ConfigValidation(String),
    /// Missing required column in a reference table.
    MissingColumn { file: String, column: String },
    /// A reference table cell could not be parsed.
    FieldParse {
        file: String,
        row: usize,
        column: String,
        value: String,
    },
    /// An identifier has no canonical ingredient. Reference data and
    /// ground truth are out of sync.
    UnknownIngredientId(u32),
    /// The LLM answer is not a parseable JSON object.
    AnswerParse(String),
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { file, column } => {
                write!(f, "table '{file}': missing column '{column}'")
            }
            Self::FieldParse { file, row, column, value } => {
                write!(f, "table '{file}', row {row}: cannot parse {column} '{value}'")
            }
            Self::UnknownIngredientId(id) => {
                write!(f, "ingredient id {id} is not in the alias table")
            }
            Self::AnswerParse(msg) => write!(f, "cannot parse answer: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}
