//! Listing parsers for backend output
//!
//! This module provides:
//! - Column names recognised in listing headers (including localized aliases)
//! - Fixed-width table parsing driven by header offsets

mod table;

pub use table::TableParser;

/// Columns a listing must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Id,
    Version,
    Available,
    Source,
}

impl Column {
    /// Every expected column, in canonical order
    pub const ALL: [Column; 5] = [
        Column::Name,
        Column::Id,
        Column::Version,
        Column::Available,
        Column::Source,
    ];

    /// Canonical header name
    pub fn header(&self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Id => "Id",
            Column::Version => "Version",
            Column::Available => "Available",
            Column::Source => "Source",
        }
    }

    /// Header spellings accepted for this column (compared case-insensitively)
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Name => &["name", "nom", "nombre", "nome"],
            Column::Id => &["id"],
            Column::Version => &["version", "versión", "versione", "versão"],
            Column::Available => &["available", "verfügbar", "disponible", "disponibile", "disponível"],
            Column::Source => &["source", "quelle", "origen", "origine", "origem"],
        }
    }

    /// Recognise a header token
    pub fn from_header(token: &str) -> Option<Column> {
        let token = token.to_lowercase();
        Column::ALL
            .into_iter()
            .find(|column| column.aliases().contains(&token.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_case_insensitive() {
        assert_eq!(Column::from_header("NAME"), Some(Column::Name));
        assert_eq!(Column::from_header("iD"), Some(Column::Id));
        assert_eq!(Column::from_header("available"), Some(Column::Available));
    }

    #[test]
    fn test_from_header_localized() {
        assert_eq!(Column::from_header("Verfügbar"), Some(Column::Available));
        assert_eq!(Column::from_header("Quelle"), Some(Column::Source));
        assert_eq!(Column::from_header("Versión"), Some(Column::Version));
    }

    #[test]
    fn test_from_header_unknown() {
        assert_eq!(Column::from_header("Match"), None);
        assert_eq!(Column::from_header("source:"), None);
    }

    #[test]
    fn test_header_names() {
        let names: Vec<&str> = Column::ALL.iter().map(|c| c.header()).collect();
        assert_eq!(names, vec!["Name", "Id", "Version", "Available", "Source"]);
    }
}
